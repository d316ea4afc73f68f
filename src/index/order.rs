use serde::Serialize;

use crate::core::chrom::{ChromIndex, PerChromosome};

/// A source position lower than the one before it on the same chromosome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderViolation {
    pub chrom: ChromIndex,
    /// Zero-based record number within the chromosome
    pub index: usize,
    pub position: u32,
    pub previous: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    last: Option<u32>,
    seen: usize,
}

/// Streaming check that source positions ascend within each chromosome
#[derive(Debug, Default)]
pub struct SourceOrder {
    cursors: PerChromosome<Cursor>,
}

impl SourceOrder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next source position for `chrom`.
    ///
    /// # Errors
    ///
    /// Returns the violation if `position` is below the previous one.
    pub fn observe(&mut self, chrom: ChromIndex, position: u32) -> Result<(), OrderViolation> {
        let cursor = self.cursors.get_mut(chrom);
        let index = cursor.seen;
        cursor.seen += 1;
        match cursor.last {
            Some(previous) if position < previous => Err(OrderViolation {
                chrom,
                index,
                position,
                previous,
            }),
            _ => {
                cursor.last = Some(position);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn seen(&self, chrom: ChromIndex) -> usize {
        self.cursors.get(chrom).seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chrom::normalize;

    #[test]
    fn test_ascending_with_ties() {
        let mut order = SourceOrder::new();
        let c = normalize("1").unwrap();
        for pos in [5, 5, 6, 100] {
            order.observe(c, pos).unwrap();
        }
        assert_eq!(order.seen(c), 4);
    }

    #[test]
    fn test_reports_first_regression() {
        let mut order = SourceOrder::new();
        let c = normalize("2").unwrap();
        order.observe(c, 10).unwrap();
        order.observe(c, 20).unwrap();
        let err = order.observe(c, 15).unwrap_err();
        assert_eq!((err.index, err.position, err.previous), (2, 15, 20));
    }

    #[test]
    fn test_chromosomes_tracked_independently() {
        let mut order = SourceOrder::new();
        order.observe(normalize("1").unwrap(), 1000).unwrap();
        order.observe(normalize("2").unwrap(), 1).unwrap();
    }
}
