//! Hearing-loss variant store (Deafness Variation Database style).
//!
//! A second curated source, kept apart from [`curated`](super::curated)
//! because its records carry different fields and no id or transcript
//! indices. Records are looked up by allele, and the gene at a position can
//! be read without knowing the allele.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::archive::{self, ArchiveHeader, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::allele::{AlleleKey, IngestRecord};
use crate::core::chrom::ChromIndex;
use crate::core::types::{BuildInfo, Lookup};
use crate::index::order::SourceOrder;
use crate::index::position::SortedPositionIndex;
use crate::parsing::vcf::VcfReader;
use crate::store::{query_key, Intake, StoreError, PROGRESS_INTERVAL};

/// One source record, fields as given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvdRecord {
    pub reference: String,
    pub alternate: String,
    pub id: Option<String>,
    /// `GENE`
    pub gene_symbol: String,
    /// `FINAL_PATHOGENICITY`
    pub pathogenicity: String,
    /// `FINAL_DISEASE`
    pub disease: String,
    /// `FINAL_COMMENTS`
    pub comments: String,
    /// `FINAL_PMID`
    pub pmids: String,
}

impl DvdRecord {
    fn from_record(record: &IngestRecord, key: &AlleleKey) -> Self {
        let text = |k: &str| record.info(k).unwrap_or_default().to_string();
        Self {
            reference: key.reference.clone(),
            alternate: key.alternate.clone(),
            id: record.id.clone(),
            gene_symbol: text("GENE"),
            pathogenicity: text("FINAL_PATHOGENICITY"),
            disease: text("FINAL_DISEASE"),
            comments: text("FINAL_COMMENTS"),
            pmids: text("FINAL_PMID"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DvdStore {
    records: SortedPositionIndex<DvdRecord>,
}

impl Archived for DvdStore {
    const KIND: &'static str = "dvd";
}

impl DvdStore {
    /// Look up the record for an allele.
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
    ) -> Result<Lookup<&DvdRecord>, StoreError> {
        Ok(self.find_key(&query_key(chrom, position, reference, alternate)?))
    }

    #[must_use]
    pub fn find_key(&self, key: &AlleleKey) -> Lookup<&DvdRecord> {
        self.records
            .find(key.chrom, key.position, |r| {
                r.reference == key.reference && r.alternate == key.alternate
            })
            .into()
    }

    #[must_use]
    pub fn at_position(&self, chrom: ChromIndex, position: u32) -> &[DvdRecord] {
        self.records.find_range(chrom, position)
    }

    /// Gene of the first record at `position` that names one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome.
    pub fn gene_symbol(&self, chrom: &str, position: u32) -> Result<Lookup<&str>, StoreError> {
        self.gene_symbol_where(chrom, position, |_| true)
    }

    /// Gene of the first record at `position` that names one and is accepted
    /// by `accept`. Callers pass their own significance rule here.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome.
    pub fn gene_symbol_where(
        &self,
        chrom: &str,
        position: u32,
        accept: impl Fn(&DvdRecord) -> bool,
    ) -> Result<Lookup<&str>, StoreError> {
        let chrom = ChromIndex::parse(chrom)?;
        Ok(self
            .at_position(chrom, position)
            .iter()
            .find(|r| !r.gene_symbol.is_empty() && accept(r))
            .map(|r| r.gene_symbol.as_str())
            .into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.total_len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len_on(&self, chrom: ChromIndex) -> usize {
        self.records.len(chrom)
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
            "Loaded dvd store {} ({} records, source {}, built {})",
            path.display(),
            store.len(),
            header.info.source_version,
            header.info.built_at
        );
        Ok((header, store))
    }
}

/// Accumulates a [`DvdStore`] from source records
#[derive(Debug, Default)]
pub struct DvdStoreBuilder {
    store: DvdStore,
    intake: Intake,
    order: SourceOrder,
}

impl DvdStoreBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record.
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
        if record.info("GENE").is_none() {
            debug!("Record {key} names no gene");
        }
        self.store
            .records
            .insert(key.chrom, key.position, DvdRecord::from_record(record, &key));
        Ok(())
    }

    #[must_use]
    pub fn finish(mut self) -> DvdStore {
        for chrom in ChromIndex::all() {
            // push rejected backwards source positions; this re-sort only
            // absorbs the shift of normalized indels
            self.store.records.sort_stable(chrom);
            debug_assert!(self.store.records.verify_sorted(chrom));
        }
        let intake = self.intake.counts();
        info!(
            "DVD store: {} records ({} invalid, {} on unaccepted chromosomes)",
            self.store.len(),
            intake.invalid,
            intake.unknown_chromosome
        );
        self.store
    }
}

/// Build and save a DVD store from a VCF source.
///
/// # Errors
///
/// Returns the first parse, ordering or write error.
pub fn build_dvd_store(source: &Path, output: &Path, config: &StoreConfig) -> Result<DvdStore, StoreError> {
    let reader = VcfReader::open(source)?;
    let info = BuildInfo::now(reader.header().source_version());

    let mut builder = DvdStoreBuilder::new();
    for (n, record) in reader.enumerate() {
        builder.push(&record?)?;
        if (n + 1) % PROGRESS_INTERVAL == 0 {
            info!("DVD source: parsed {} records", n + 1);
        }
    }
    let store = builder.finish();
    store.save(output, &info, config.compression())?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pos: u32, reference: &str, alt: &str, pathogenicity: &str, gene: &str) -> IngestRecord {
        IngestRecord::new("chr1", pos, reference, alt)
            .with_info("FINAL_PATHOGENICITY", pathogenicity)
            .with_info("FINAL_DISEASE", ".")
            .with_info("GENE", gene)
    }

    fn store() -> DvdStore {
        let mut builder = DvdStoreBuilder::new();
        for r in [
            record(6_425_205, "G", "T", "Benign", "ESPN"),
            record(6_425_207, "C", "G", "Unknown_significance", "ESPN"),
            record(6_425_219, "G", "A", "Pathogenic", "ESPN"),
            record(6_426_292, "AC", "A", "Unknown_significance", "ESPN"),
            record(6_426_487, "G", "C", "Unknown_significance", ""),
            record(6_426_487, "G", "T", "Pathogenic", "ESPN"),
        ] {
            builder.push(&r).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_find_keeps_fields_as_given() {
        let store = store();
        let hit = store.find("chr1", 6_425_219, "G", "A").unwrap().found().unwrap();
        assert_eq!(hit.pathogenicity, "Pathogenic");
        assert_eq!(hit.gene_symbol, "ESPN");
        assert_eq!(hit.disease, ".");
        assert_eq!(
            store.find("1", 6_425_205, "G", "T").unwrap().found().unwrap().pathogenicity,
            "Benign"
        );
        assert!(!store.find("1", 1000, "A", "T").unwrap().is_found());
        assert!(store.find("MT", 5, "A", "G").is_err());
    }

    #[test]
    fn test_deletion_found_in_placeholder_form() {
        let store = store();
        let del = store.find("1", 6_426_293, "C", "-").unwrap().found().unwrap();
        assert_eq!(del.pathogenicity, "Unknown_significance");
        // the anchored form normalizes to the same key
        assert!(store.find("1", 6_426_292, "AC", "A").unwrap().is_found());
    }

    #[test]
    fn test_same_position_alleles() {
        let store = store();
        assert!(store.find("1", 6_426_487, "G", "C").unwrap().is_found());
        assert!(store.find("1", 6_426_487, "G", "T").unwrap().is_found());
        assert_eq!(store.at_position(ChromIndex::parse("1").unwrap(), 6_426_487).len(), 2);
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_gene_symbol_at_position() {
        let store = store();
        // the first record at the position has no gene; the second names one
        assert_eq!(store.gene_symbol("1", 6_426_487).unwrap(), Lookup::Found("ESPN"));
        let pathogenic = |r: &DvdRecord| r.pathogenicity.eq_ignore_ascii_case("pathogenic");
        assert_eq!(
            store.gene_symbol_where("1", 6_425_207, pathogenic).unwrap(),
            Lookup::from(None)
        );
        assert_eq!(
            store.gene_symbol_where("1", 6_425_219, pathogenic).unwrap(),
            Lookup::Found("ESPN")
        );
        assert!(!store.gene_symbol("2", 6_425_219).unwrap().is_found());
    }

    #[test]
    fn test_backwards_source_rejected() {
        let mut builder = DvdStoreBuilder::new();
        builder.push(&record(200, "A", "G", "Benign", "X1")).unwrap();
        let err = builder.push(&record(100, "A", "G", "Benign", "X1")).unwrap_err();
        assert!(matches!(err, StoreError::UnsortedInput { position: 100, previous: 200, .. }));
    }
}
