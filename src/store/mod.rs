//! Persisted allele stores.
//!
//! | Store | Partitioning | Payload |
//! |-------|--------------|---------|
//! | [`population`] | `{chrom}/{chunk}.arc` | packed status byte |
//! | [`frequency`] | one archive | raw allele frequency |
//! | [`curated`] | one archive | curated record, plus id and transcript indices |
//! | [`annotation`] | `{chrom}.arc` + `meta.arc` | annotation payload string |
//! | [`dvd`] | one archive | hearing-loss variant record |
//! | [`coverage`] | one archive | coverage class per run of positions |
//!
//! All stores are built once from a record stream and are read-only afterwards.
//! The partitioned stores keep one partition in memory and swap it on demand,
//! so their `find` methods take `&mut self`: they are not internally
//! thread-safe. Share them across threads behind a `Mutex`, or use one
//! instance per thread.

use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::core::allele::{AlleleKey, IngestRecord};
use crate::core::chrom::UnknownChromosome;
use crate::core::status::CodecError;
use crate::index::order::OrderViolation;
use crate::parsing::ParseError;
use crate::utils::validation::invalid_record_reason;

pub mod annotation;
pub mod coverage;
pub mod curated;
pub mod dvd;
pub mod frequency;
pub mod layout;
pub mod population;
pub mod slot;

/// Records between build progress log lines
pub const PROGRESS_INTERVAL: usize = 500_000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    UnknownChromosome(#[from] UnknownChromosome),

    #[error(
        "Unsorted input on chromosome {chrom}{}: entry {index} at position {position} follows position {previous}",
        chunk_label(.chunk)
    )]
    UnsortedInput {
        chrom: String,
        chunk: Option<u32>,
        index: usize,
        position: u32,
        previous: u32,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Corrupt status byte: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to parse input: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn chunk_label(chunk: &Option<u32>) -> String {
    chunk.map(|c| format!(" (chunk {c})")).unwrap_or_default()
}

impl StoreError {
    pub(crate) fn unsorted(violation: OrderViolation, chunk: Option<u32>) -> Self {
        Self::UnsortedInput {
            chrom: violation.chrom.name().to_string(),
            chunk,
            index: violation.index,
            position: violation.position,
            previous: violation.previous,
        }
    }
}

/// Records turned away before reaching a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IntakeCounts {
    pub accepted: usize,
    pub invalid: usize,
    pub unknown_chromosome: usize,
}

impl std::ops::AddAssign for IntakeCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.accepted += rhs.accepted;
        self.invalid += rhs.invalid;
        self.unknown_chromosome += rhs.unknown_chromosome;
    }
}

/// Shared front door of every builder: validation and normalization
#[derive(Debug, Default)]
pub struct Intake {
    counts: IntakeCounts,
    warned: HashSet<String>,
}

impl Intake {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `record`, or log and count why it is skipped
    pub fn admit(&mut self, record: &IngestRecord) -> Option<AlleleKey> {
        if let Some(reason) = invalid_record_reason(record) {
            debug!(
                "Skipping {}:{}: {reason}",
                record.chromosome, record.position
            );
            self.counts.invalid += 1;
            return None;
        }
        match record.key() {
            Ok(key) => {
                self.counts.accepted += 1;
                if self.counts.accepted % PROGRESS_INTERVAL == 0 {
                    debug!("Processed {} records (at {key})", self.counts.accepted);
                }
                Some(key)
            }
            Err(e) => {
                if self.warned.insert(record.chromosome.clone()) {
                    warn!("{e}; skipping its records");
                }
                self.counts.unknown_chromosome += 1;
                None
            }
        }
    }

    #[must_use]
    pub fn counts(&self) -> IntakeCounts {
        self.counts
    }
}

/// Normalize a query allele the same way builders normalize records.
///
/// # Errors
///
/// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome.
pub fn query_key(
    chrom: &str,
    position: u32,
    reference: &str,
    alternate: &str,
) -> Result<AlleleKey, StoreError> {
    Ok(AlleleKey::normalize(
        chrom,
        position,
        &reference.to_ascii_uppercase(),
        &alternate.to_ascii_uppercase(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_counts() {
        let mut intake = Intake::new();
        assert!(intake.admit(&IngestRecord::new("chr1", 10, "c", "ct")).is_some());
        assert!(intake.admit(&IngestRecord::new("MT", 10, "A", "G")).is_none());
        assert!(intake.admit(&IngestRecord::new("MT", 11, "A", "G")).is_none());
        assert!(intake.admit(&IngestRecord::new("1", 12, "A", "<DEL>")).is_none());
        assert_eq!(
            intake.counts(),
            IntakeCounts {
                accepted: 1,
                invalid: 1,
                unknown_chromosome: 2
            }
        );
    }

    #[test]
    fn test_intake_uppercases_and_shifts() {
        let mut intake = Intake::new();
        let key = intake.admit(&IngestRecord::new("1", 10, "c", "ct")).unwrap();
        assert_eq!((key.position, key.reference.as_str(), key.alternate.as_str()), (11, "-", "T"));
    }

    #[test]
    fn test_unsorted_message_names_location() {
        let err = StoreError::UnsortedInput {
            chrom: "2".to_string(),
            chunk: Some(3),
            index: 7,
            position: 100,
            previous: 200,
        };
        assert_eq!(
            err.to_string(),
            "Unsorted input on chromosome 2 (chunk 3): entry 7 at position 100 follows position 200"
        );
    }
}
