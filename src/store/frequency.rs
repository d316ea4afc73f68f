//! Single-archive allele-frequency store.
//!
//! Holds the raw `AF` value of every SNP, insertion and deletion of a
//! genome-wide call set, all chromosomes in one archive. Small enough to load
//! whole, so lookups take `&self`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::{self, ArchiveHeader, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::allele::{AlleleKey, IngestRecord, VariantShape};
use crate::core::chrom::{ChromIndex, PerChromosome};
use crate::core::status::Base;
use crate::core::types::{BuildInfo, Lookup};
use crate::index::order::SourceOrder;
use crate::index::tables::{ShapeCounts, VariantTables};
use crate::parsing::vcf::{VcfReader, UNKNOWN_VERSION};
use crate::store::{query_key, Intake, StoreError, PROGRESS_INTERVAL};

/// SNP entry: the alternate base and its frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnpFrequency {
    pub alt: Base,
    pub frequency: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyStore {
    tables: PerChromosome<VariantTables<SnpFrequency, f32>>,
}

impl Archived for FrequencyStore {
    const KIND: &'static str = "allele_frequency";
}

impl FrequencyStore {
    /// Look up the allele frequency of a raw allele.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome.
    pub fn find(
        &self,
        chrom: &str,
        position: u32,
        reference: &str,
        alternate: &str,
    ) -> Result<Lookup<f32>, StoreError> {
        Ok(self.find_key(&query_key(chrom, position, reference, alternate)?))
    }

    #[must_use]
    pub fn find_key(&self, key: &AlleleKey) -> Lookup<f32> {
        let tables = self.tables.get(key.chrom);
        let found = match key.shape() {
            VariantShape::Snp => Base::from_ascii(key.alternate.as_bytes()[0])
                .ok()
                .and_then(|alt| tables.find_snp(key.position, |s| s.alt == alt))
                .map(|s| s.frequency),
            VariantShape::Insertion => tables.find_insertion(key.position, &key.alternate).copied(),
            VariantShape::Deletion => tables.find_deletion(key.position, &key.reference).copied(),
            VariantShape::Complex => None,
        };
        found.into()
    }

    #[must_use]
    pub fn counts(&self, chrom: ChromIndex) -> ShapeCounts {
        self.tables.get(chrom).counts()
    }

    #[must_use]
    pub fn total_counts(&self) -> ShapeCounts {
        let mut total = ShapeCounts::default();
        for (_, tables) in self.tables.iter() {
            total += tables.counts();
        }
        total
    }

    /// # Errors
    ///
    /// Returns an archive error if the file cannot be written.
    pub fn save(&self, path: &Path, info: &BuildInfo, compression: Compression) -> Result<(), StoreError> {
        archive::save(path, self, info, compression)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an archive error if the file is missing or corrupt.
    pub fn load(path: &Path) -> Result<(ArchiveHeader, Self), StoreError> {
        let (header, store) = archive::load::<Self>(path)?;
        info!(
            "Loaded frequency store {} (source {}, built {})",
            path.display(),
            header.info.source_version,
            header.info.built_at
        );
        Ok((header, store))
    }
}

/// Accumulates a [`FrequencyStore`] from source records
#[derive(Debug, Default)]
pub struct FrequencyStoreBuilder {
    store: FrequencyStore,
    intake: Intake,
    order: SourceOrder,
    skipped: usize,
}

impl FrequencyStoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record; `AF` defaults to 0 when absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnsortedInput` if source positions go backwards.
    pub fn push(&mut self, record: &IngestRecord) -> Result<(), StoreError> {
        let Some(key) = self.intake.admit(record) else {
            return Ok(());
        };
        self.order
            .observe(key.chrom, record.position)
            .map_err(|v| StoreError::unsorted(v, None))?;

        let frequency: f32 = record.info_parsed("AF").unwrap_or(0.0);
        let tables = self.store.tables.get_mut(key.chrom);
        match key.shape() {
            VariantShape::Snp => match Base::from_ascii(key.alternate.as_bytes()[0]) {
                Ok(alt) => tables.push_snp(key.position, SnpFrequency { alt, frequency }),
                Err(e) => {
                    debug!("Skipping {key}: {e}");
                    self.skipped += 1;
                }
            },
            VariantShape::Insertion => tables.push_insertion(key.position, &key.alternate, frequency),
            VariantShape::Deletion => tables.push_deletion(key.position, &key.reference, frequency),
            VariantShape::Complex => {
                debug!("Skipping multi-base substitution {key}");
                self.skipped += 1;
            }
        }
        Ok(())
    }

    /// Sort every chromosome for lookup.
    ///
    /// # Errors
    ///
    /// Infallible once every record was accepted by [`Self::push`]; the
    /// `Result` matches the other builders.
    pub fn finish(mut self) -> Result<FrequencyStore, StoreError> {
        for (chrom, tables) in self.store.tables.iter_mut() {
            // push rejected backwards source positions; this re-sort only
            // absorbs the shift of normalized indels
            tables.sort_stable();
            debug_assert!(tables.first_unsorted().is_none());
            let counts = tables.counts();
            if counts.total() > 0 {
                info!(
                    "Chromosome {chrom}: {} SNPs, {} insertions, {} deletions",
                    counts.snps, counts.insertions, counts.deletions
                );
            }
        }
        let intake = self.intake.counts();
        info!(
            "Frequency store: {} records accepted, {} invalid, {} on unknown chromosomes, {} unrepresentable",
            intake.accepted, intake.invalid, intake.unknown_chromosome, self.skipped
        );
        Ok(self.store)
    }
}

/// Build and save a frequency store from one or more VCF sources.
///
/// # Errors
///
/// Returns the first parse, ordering or write error.
pub fn build_frequency_store(
    sources: &[PathBuf],
    output: &Path,
    config: &StoreConfig,
) -> Result<FrequencyStore, StoreError> {
    let mut builder = FrequencyStoreBuilder::new();
    let mut version = None;
    for source in sources {
        let reader = VcfReader::open(source)?;
        version.get_or_insert_with(|| reader.header().source_version());
        info!("Reading {}", source.display());
        for (n, record) in reader.enumerate() {
            builder.push(&record?)?;
            if (n + 1) % PROGRESS_INTERVAL == 0 {
                info!("{}: parsed {} records", source.display(), n + 1);
            }
        }
    }
    let store = builder.finish()?;
    let info = BuildInfo::now(version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()));
    store.save(output, &info, config.compression())?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chrom: &str, pos: u32, reference: &str, alt: &str, af: &str) -> IngestRecord {
        IngestRecord::new(chrom, pos, reference, alt).with_info("AF", af)
    }

    #[test]
    fn test_lookup_by_shape() {
        let mut builder = FrequencyStoreBuilder::new();
        for r in [
            record("1", 16103, "T", "G", "0.02"),
            record("1", 83911, "CAGAG", "C", "0.16"),
            record("1", 91551, "A", "AT", "0.07"),
        ] {
            builder.push(&r).unwrap();
        }
        let store = builder.finish().unwrap();

        assert_eq!(store.find("1", 16103, "T", "G").unwrap(), Lookup::Found(0.02));
        assert!(!store.find("1", 16103, "T", "A").unwrap().is_found());
        assert_eq!(store.find("1", 83912, "AGAG", "-").unwrap(), Lookup::Found(0.16));
        assert_eq!(store.find("1", 91552, "-", "T").unwrap(), Lookup::Found(0.07));
        assert_eq!(store.total_counts().total(), 3);
    }

    #[test]
    fn test_missing_af_defaults_to_zero() {
        let mut builder = FrequencyStoreBuilder::new();
        builder.push(&IngestRecord::new("X", 5, "A", "C")).unwrap();
        let store = builder.finish().unwrap();
        assert_eq!(store.find("chrX", 5, "A", "C").unwrap(), Lookup::Found(0.0));
    }

    #[test]
    fn test_anchor_shift_reorders_within_chromosome() {
        // the deletion normalizes to 101, after the SNP at 100 it was read before
        let mut builder = FrequencyStoreBuilder::new();
        builder.push(&record("2", 100, "AC", "A", "0.3")).unwrap();
        builder.push(&record("2", 100, "A", "G", "0.4")).unwrap();
        builder.push(&record("2", 101, "C", "T", "0.5")).unwrap();
        let store = builder.finish().unwrap();
        assert_eq!(store.find("2", 101, "C", "-").unwrap(), Lookup::Found(0.3));
        assert_eq!(store.find("2", 101, "C", "T").unwrap(), Lookup::Found(0.5));
    }

    #[test]
    fn test_unsorted_source() {
        let mut builder = FrequencyStoreBuilder::new();
        builder.push(&record("3", 50, "A", "G", "0.1")).unwrap();
        assert!(matches!(
            builder.push(&record("3", 40, "A", "G", "0.1")),
            Err(StoreError::UnsortedInput { position: 40, previous: 50, .. })
        ));
    }
}
