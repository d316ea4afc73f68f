use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chromosome names accepted by every store, in index order.
pub const ACCEPTED_CHROMOSOMES: [&str; 24] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y",
];

/// Number of accepted chromosomes
pub const CHROMOSOME_COUNT: usize = ACCEPTED_CHROMOSOMES.len();

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown chromosome: `{0}`")]
pub struct UnknownChromosome(pub String);

/// Dense index of an accepted chromosome (always < 24)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChromIndex(u8);

impl ChromIndex {
    /// Normalize a chromosome name to its index.
    ///
    /// Accepts both bare (`1`, `X`) and UCSC-prefixed (`chr1`, `chrX`) names.
    /// Matching is case-sensitive, so `chrx` and `Chr1` are rejected.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChromosome` for any name outside the accepted list.
    pub fn parse(name: &str) -> Result<Self, UnknownChromosome> {
        let bare = name.strip_prefix("chr").unwrap_or(name);
        ACCEPTED_CHROMOSOMES
            .iter()
            .position(|accepted| *accepted == bare)
            .map(|idx| Self(idx as u8))
            .ok_or_else(|| UnknownChromosome(name.to_string()))
    }

    /// Build an index from its raw value
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        (index < CHROMOSOME_COUNT).then(|| Self(index as u8))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Bare chromosome name (`1`..`22`, `X`, `Y`)
    #[must_use]
    pub fn name(self) -> &'static str {
        ACCEPTED_CHROMOSOMES[self.index()]
    }

    /// Iterate over all accepted chromosomes in index order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CHROMOSOME_COUNT).map(|idx| Self(idx as u8))
    }
}

impl std::fmt::Display for ChromIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for ChromIndex {
    type Error = UnknownChromosome;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as usize).ok_or_else(|| UnknownChromosome(format!("#{value}")))
    }
}

impl From<ChromIndex> for u8 {
    fn from(value: ChromIndex) -> Self {
        value.0
    }
}

/// Normalize a chromosome name to its dense index.
///
/// # Errors
///
/// Returns `UnknownChromosome` if the name is not one of the 24 accepted chromosomes.
pub fn normalize(name: &str) -> Result<ChromIndex, UnknownChromosome> {
    ChromIndex::parse(name)
}

/// One value per accepted chromosome, addressed by `ChromIndex`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerChromosome<T> {
    values: Vec<T>,
}

impl<T: Default> Default for PerChromosome<T> {
    fn default() -> Self {
        Self {
            values: (0..CHROMOSOME_COUNT).map(|_| T::default()).collect(),
        }
    }
}

impl<T> PerChromosome<T> {
    #[must_use]
    pub fn get(&self, chrom: ChromIndex) -> &T {
        &self.values[chrom.index()]
    }

    pub fn get_mut(&mut self, chrom: ChromIndex) -> &mut T {
        &mut self.values[chrom.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChromIndex, &T)> {
        ChromIndex::all().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ChromIndex, &mut T)> {
        ChromIndex::all().zip(self.values.iter_mut())
    }
}
