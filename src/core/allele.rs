//! Allele keys and the indel placeholder convention.
//!
//! Every store, at build time and at query time, sees alleles in one form:
//! an insertion has reference `-`, a deletion has alternate `-`, and the
//! position points one past the shared anchor base. [`AlleleKey::normalize`]
//! is the only place that shift is applied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::chrom::{ChromIndex, UnknownChromosome};

/// Placeholder for the empty side of an insertion or deletion
pub const INDEL_PLACEHOLDER: &str = "-";

/// Shape of a normalized allele, used to pick the table it lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantShape {
    /// Single-base substitution
    Snp,
    /// Reference is `-`
    Insertion,
    /// Alternate is `-`
    Deletion,
    /// Multi-base substitution; not held by the population stores
    Complex,
}

/// Normalized `(chromosome, position, reference, alternate)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlleleKey {
    pub chrom: ChromIndex,
    /// One-based; for indels, one past the anchor base
    pub position: u32,
    pub reference: String,
    pub alternate: String,
}

impl AlleleKey {
    /// Normalize a raw allele to placeholder form.
    ///
    /// Alleles of unequal length that share a leading prefix lose that prefix,
    /// the position moves forward by its length, and an emptied side becomes
    /// `-`. Alleles already in placeholder form, and equal-length alleles,
    /// are kept as given.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChromosome` if `chrom` is not accepted.
    pub fn normalize(
        chrom: &str,
        position: u32,
        reference: &str,
        alternate: &str,
    ) -> Result<Self, UnknownChromosome> {
        let chrom = ChromIndex::parse(chrom)?;
        let (position, reference, alternate) = trim_anchor(position, reference, alternate);
        Ok(Self {
            chrom,
            position,
            reference,
            alternate,
        })
    }

    #[must_use]
    pub fn shape(&self) -> VariantShape {
        shape_of(&self.reference, &self.alternate)
    }

    /// Sequence stored alongside an indel (inserted or deleted bases)
    #[must_use]
    pub fn indel_sequence(&self) -> Option<&str> {
        match self.shape() {
            VariantShape::Insertion => Some(&self.alternate),
            VariantShape::Deletion => Some(&self.reference),
            VariantShape::Snp | VariantShape::Complex => None,
        }
    }
}

impl std::fmt::Display for AlleleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.chrom, self.position, self.reference, self.alternate
        )
    }
}

/// Classify an already-normalized allele pair
#[must_use]
pub fn shape_of(reference: &str, alternate: &str) -> VariantShape {
    if reference == INDEL_PLACEHOLDER {
        VariantShape::Insertion
    } else if alternate == INDEL_PLACEHOLDER {
        VariantShape::Deletion
    } else if reference.len() == 1 && alternate.len() == 1 {
        VariantShape::Snp
    } else {
        VariantShape::Complex
    }
}

fn trim_anchor(position: u32, reference: &str, alternate: &str) -> (u32, String, String) {
    if reference == INDEL_PLACEHOLDER
        || alternate == INDEL_PLACEHOLDER
        || reference.len() == alternate.len()
    {
        return (position, reference.to_string(), alternate.to_string());
    }

    let (bases, shared) = reference
        .chars()
        .zip(alternate.chars())
        .take_while(|(r, a)| r == a)
        .fold((0usize, 0usize), |(n, bytes), (r, _)| (n + 1, bytes + r.len_utf8()));

    let placeholder = |s: &str| {
        if s.is_empty() {
            INDEL_PLACEHOLDER.to_string()
        } else {
            s.to_string()
        }
    };

    #[allow(clippy::cast_possible_truncation)]
    let shifted = position.saturating_add(bases as u32);
    (
        shifted,
        placeholder(&reference[shared..]),
        placeholder(&alternate[shared..]),
    )
}

/// One record as handed over by a variant reader
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestRecord {
    pub chromosome: String,
    /// One-based source position (before indel normalization)
    pub position: u32,
    pub id: Option<String>,
    pub reference: String,
    pub alternate: String,
    pub filters: Vec<String>,
    pub info: HashMap<String, String>,
}

impl IngestRecord {
    #[must_use]
    pub fn new(chromosome: &str, position: u32, reference: &str, alternate: &str) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            position,
            reference: reference.to_string(),
            alternate: alternate.to_string(),
            ..Self::default()
        }
    }

    /// Builder-style INFO insertion, mostly for tests and fixtures
    #[must_use]
    pub fn with_info(mut self, key: &str, value: &str) -> Self {
        self.info.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    /// Parse an INFO value, treating `.` and unparsable values as missing
    #[must_use]
    pub fn info_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.info(key).and_then(|v| v.parse().ok())
    }

    /// True if any FILTER entry is in `names`
    #[must_use]
    pub fn has_filter(&self, names: &[String]) -> bool {
        self.filters.iter().any(|f| names.contains(f))
    }

    /// Normalize this record's allele. Bases are upper-cased first, as VCF
    /// allows either case.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChromosome` if the chromosome is not accepted.
    pub fn key(&self) -> Result<AlleleKey, UnknownChromosome> {
        AlleleKey::normalize(
            &self.chromosome,
            self.position,
            &self.reference.to_ascii_uppercase(),
            &self.alternate.to_ascii_uppercase(),
        )
    }
}
