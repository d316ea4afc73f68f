//! Single-entry cache with replace-on-miss.

/// Holds at most one loaded partition, keyed by `K`.
///
/// A partition known to be absent is cached as well, so repeated queries into
/// a region with no data do not touch the filesystem again.
#[derive(Debug)]
pub struct CacheSlot<K, V> {
    current: Option<(K, Option<V>)>,
    loads: usize,
}

impl<K, V> Default for CacheSlot<K, V> {
    fn default() -> Self {
        Self {
            current: None,
            loads: 0,
        }
    }
}

impl<K: Copy + PartialEq, V> CacheSlot<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the partition for `key`, calling `load` if a different key (or
    /// nothing) is cached. `Ok(None)` means the partition does not exist.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; the slot is left empty in that case.
    pub fn get_or_load<E>(
        &mut self,
        key: K,
        load: impl FnOnce(K) -> Result<Option<V>, E>,
    ) -> Result<Option<&V>, E> {
        let hit = matches!(&self.current, Some((cached, _)) if *cached == key);
        if !hit {
            // release the old partition before reading the new one
            self.current = None;
            self.loads += 1;
            let value = load(key)?;
            self.current = Some((key, value));
        }
        Ok(self.current.as_ref().and_then(|(_, value)| value.as_ref()))
    }

    /// Number of times the loader has run
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads
    }

    #[must_use]
    pub fn key(&self) -> Option<K> {
        self.current.as_ref().map(|(key, _)| *key)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
