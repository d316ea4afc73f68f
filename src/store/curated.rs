//! Curated pathogenicity store.
//!
//! Curated records are kept byte-exact and looked up three ways:
//!
//! - by allele, through a position index
//! - by stable variation id, through an [`IdIndex`]
//! - by coding or protein coordinate window on a transcript, through a
//!   [`TranscriptIndex`] built from the records' missense annotation entries

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveHeader, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::allele::{AlleleKey, IngestRecord};
use crate::core::chrom::ChromIndex;
use crate::core::types::{BuildInfo, Lookup};
use crate::index::cross::{CoordinateEntry, IdEntry, IdIndex, Projection, TranscriptIndex};
use crate::index::order::SourceOrder;
use crate::index::position::SortedPositionIndex;
use crate::parsing::csq::{feature_normalize, parse_vep_position, CsqLayout};
use crate::parsing::vcf::VcfReader;
use crate::store::{query_key, Intake, StoreError, PROGRESS_INTERVAL};

/// INFO key holding per-transcript annotation entries
pub const ANNOTATION_KEY: &str = "CSQ";

const MISSENSE: &str = "missense_variant";

/// One curated record, as found in the source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedRecord {
    pub reference: String,
    pub alternate: String,
    pub variation_id: Option<u64>,
    pub allele_id: Option<u64>,
    pub significance: String,
    pub review_status: String,
    pub disease_names: String,
    pub gene_info: String,
    /// Protein change from the UniProtKB variant identifier, if any
    pub protein_change: Option<String>,
}

impl CuratedRecord {
    fn from_record(record: &IngestRecord, key: &AlleleKey) -> Self {
        let text = |k: &str| record.info(k).unwrap_or_default().to_string();
        Self {
            reference: key.reference.clone(),
            alternate: key.alternate.clone(),
            variation_id: record.id.as_deref().and_then(|id| id.parse().ok()),
            allele_id: record.info_parsed("ALLELEID"),
            significance: text("CLNSIG"),
            review_status: text("CLNREVSTAT"),
            disease_names: text("CLNDN"),
            gene_info: text("GENEINFO"),
            protein_change: record.info("CLNVI").and_then(uniprot_change),
        }
    }

    /// Gene symbols from `SYMBOL:ID|SYMBOL:ID`
    #[must_use]
    pub fn genes(&self) -> Vec<&str> {
        self.gene_info
            .split('|')
            .filter_map(|entry| entry.split(':').next())
            .filter(|symbol| !symbol.is_empty())
            .collect()
    }

    /// Review stars (0-4) for the review status
    #[must_use]
    pub fn stars(&self) -> u8 {
        match self.review_status.as_str() {
            "criteria_provided,_conflicting_interpretations"
            | "criteria_provided,_single_submitter" => 1,
            "criteria_provided,_multiple_submitters,_no_conflicts" => 2,
            "reviewed_by_expert_panel" => 3,
            "practice_guideline" => 4,
            _ => 0,
        }
    }
}

/// Variant part of the first UniProtKB identifier: the text after `#`, or
/// after the accession separator when there is no `#`
fn uniprot_change(identifiers: &str) -> Option<String> {
    let entry = identifiers
        .split('|')
        .find_map(|vi| vi.strip_prefix("UniProtKB_").or_else(|| vi.strip_prefix("UniProtKB:")))?;
    let (_, change) = entry.split_once('#').or_else(|| entry.split_once(':'))?;
    (!change.is_empty()).then(|| change.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuratedStore {
    records: SortedPositionIndex<CuratedRecord>,
    ids: IdIndex,
    transcripts: TranscriptIndex,
}

impl Archived for CuratedStore {
    const KIND: &'static str = "curated";
}

impl CuratedStore {
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
    ) -> Result<Lookup<&CuratedRecord>, StoreError> {
        Ok(self.find_key(&query_key(chrom, position, reference, alternate)?))
    }

    #[must_use]
    pub fn find_key(&self, key: &AlleleKey) -> Lookup<&CuratedRecord> {
        self.records
            .find(key.chrom, key.position, |r| {
                r.reference == key.reference && r.alternate == key.alternate
            })
            .into()
    }

    /// All records at one position, whatever their alleles
    #[must_use]
    pub fn at_position(&self, chrom: ChromIndex, position: u32) -> &[CuratedRecord] {
        self.records.find_range(chrom, position)
    }

    #[must_use]
    pub fn find_by_id(&self, id: u64) -> Lookup<&CuratedRecord> {
        self.ids
            .find(id)
            .and_then(|(chrom, index)| self.records.get(chrom, index))
            .map(|(_, record)| record)
            .into()
    }

    /// Ids of records whose coordinate on `transcript` lies in `lo..=hi`
    #[must_use]
    pub fn find_ids_in_range(
        &self,
        transcript: &str,
        lo: u32,
        hi: u32,
        projection: Projection,
    ) -> BTreeSet<u64> {
        self.transcripts
            .find_in_range(feature_normalize(transcript), lo, hi, projection)
    }

    /// Records whose coordinate on `transcript` lies in `lo..=hi`, ordered by id
    #[must_use]
    pub fn find_in_range(
        &self,
        transcript: &str,
        lo: u32,
        hi: u32,
        projection: Projection,
    ) -> Vec<&CuratedRecord> {
        self.find_ids_in_range(transcript, lo, hi, projection)
            .into_iter()
            .filter_map(|id| self.find_by_id(id).found())
            .collect()
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

    #[must_use]
    pub fn id_count(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn transcript_count(&self) -> usize {
        self.transcripts.transcript_count()
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
            "Loaded curated store {} ({} records, source {}, built {})",
            path.display(),
            store.len(),
            header.info.source_version,
            header.info.built_at
        );
        Ok((header, store))
    }
}

/// Accumulates a [`CuratedStore`] from source records
#[derive(Debug, Default)]
pub struct CuratedStoreBuilder {
    store: CuratedStore,
    layout: Option<CsqLayout>,
    intake: Intake,
    order: SourceOrder,
    without_id: usize,
}

impl CuratedStoreBuilder {
    /// `layout` describes the annotation entries used for the transcript
    /// index; without one, no transcript index is built.
    #[must_use]
    pub fn new(layout: Option<CsqLayout>) -> Self {
        Self {
            layout,
            ..Self::default()
        }
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

        let curated = CuratedRecord::from_record(record, &key);
        match curated.variation_id {
            Some(id) => self.index_coordinates(record, id),
            None => {
                debug!("Record {key} has no integer id; not reachable by id");
                self.without_id += 1;
            }
        }
        self.store.records.insert(key.chrom, key.position, curated);
        Ok(())
    }

    fn index_coordinates(&mut self, record: &IngestRecord, id: u64) {
        let (Some(layout), Some(payload)) = (&self.layout, record.info(ANNOTATION_KEY)) else {
            return;
        };
        for entry in layout.entries(payload) {
            if !entry.field("Consequence").is_some_and(|c| c.contains(MISSENSE)) {
                continue;
            }
            let transcript = feature_normalize(entry.field("Feature").unwrap_or_default());
            let coding = entry.field("CDS_position").and_then(parse_vep_position);
            let protein = entry.field("Protein_position").and_then(parse_vep_position);
            if let (false, Some(coding), Some(protein)) = (transcript.is_empty(), coding, protein) {
                self.store
                    .transcripts
                    .insert(transcript, CoordinateEntry { coding, protein, id });
            }
        }
    }

    /// Sort the position index, then build the id and transcript indices.
    ///
    /// # Errors
    ///
    /// Infallible once every record was accepted by [`Self::push`]; the
    /// `Result` matches the other builders.
    pub fn finish(mut self) -> Result<CuratedStore, StoreError> {
        let records = &mut self.store.records;
        let mut ids = Vec::new();
        for chrom in ChromIndex::all() {
            // push rejected backwards source positions; this re-sort only
            // absorbs the shift of normalized indels
            records.sort_stable(chrom);
            debug_assert!(records.verify_sorted(chrom));
            for (index, record) in records.payloads(chrom).iter().enumerate() {
                if let Some(id) = record.variation_id {
                    #[allow(clippy::cast_possible_truncation)]
                    ids.push(IdEntry {
                        id,
                        chrom,
                        index: index as u32,
                    });
                }
            }
        }
        self.store.ids = IdIndex::build(ids);
        self.store.transcripts.finish();

        if self.layout.is_none() {
            warn!("No {ANNOTATION_KEY} layout in source header; transcript index is empty");
        }
        info!(
            "Curated store: {} records, {} ids ({} without id), {} transcripts",
            self.store.len(),
            self.store.id_count(),
            self.without_id,
            self.store.transcript_count()
        );
        Ok(self.store)
    }
}

/// Build and save a curated store from a VCF source.
///
/// # Errors
///
/// Returns the first parse, ordering or write error.
pub fn build_curated_store(
    source: &Path,
    output: &Path,
    config: &StoreConfig,
) -> Result<CuratedStore, StoreError> {
    let reader = VcfReader::open(source)?;
    let info = BuildInfo::now(reader.header().source_version());
    let layout = reader
        .header()
        .info_description(ANNOTATION_KEY)
        .map(CsqLayout::from_description)
        .transpose()?;

    let mut builder = CuratedStoreBuilder::new(layout);
    for (n, record) in reader.enumerate() {
        builder.push(&record?)?;
        if (n + 1) % PROGRESS_INTERVAL == 0 {
            info!("Curated source: parsed {} records", n + 1);
        }
    }
    let store = builder.finish()?;
    store.save(output, &info, config.compression())?;
    Ok(store)
}
