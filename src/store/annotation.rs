//! Per-chromosome functional-annotation cache.
//!
//! Stores the annotation payload previously computed for each allele so it
//! does not have to be recomputed. Layout under the cache directory:
//!
//! ```text
//! vep_cache/
//!   meta.arc      CacheMeta: payload field layout, chromosomes, record count
//!   1.arc         AnnotationTable for chromosome 1
//!   ...
//! ```
//!
//! A query loads the table of the requested chromosome and keeps it until a
//! query arrives for another chromosome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::{self, archive_path, ArchiveHeader, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::allele::{AlleleKey, IngestRecord};
use crate::core::chrom::ChromIndex;
use crate::core::types::{Absence, BuildInfo, Lookup};
use crate::index::order::SourceOrder;
use crate::index::position::{apply_permutation, equal_range, first_unsorted, sort_permutation};
use crate::parsing::csq::{CsqEntry, CsqLayout};
use crate::parsing::vcf::VcfReader;
use crate::parsing::ParseError;
use crate::store::curated::ANNOTATION_KEY;
use crate::store::slot::CacheSlot;
use crate::store::{query_key, Intake, IntakeCounts, StoreError, PROGRESS_INTERVAL};

/// Stem of the cache metadata archive
pub const META_STEM: &str = "meta";

/// One chromosome's alleles and payloads as four parallel columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTable {
    pub chrom: ChromIndex,
    positions: Vec<u32>,
    references: Vec<String>,
    alternates: Vec<String>,
    payloads: Vec<String>,
}

impl Archived for AnnotationTable {
    const KIND: &'static str = "annotation_table";
}

impl AnnotationTable {
    #[must_use]
    pub fn new(chrom: ChromIndex) -> Self {
        Self {
            chrom,
            positions: Vec::new(),
            references: Vec::new(),
            alternates: Vec::new(),
            payloads: Vec::new(),
        }
    }

    pub fn push(&mut self, key: &AlleleKey, payload: &str) {
        self.positions.push(key.position);
        self.references.push(key.reference.clone());
        self.alternates.push(key.alternate.clone());
        self.payloads.push(payload.to_string());
    }

    /// Payload for a normalized allele
    #[must_use]
    pub fn find(&self, key: &AlleleKey) -> Option<&str> {
        equal_range(&self.positions, key.position)
            .find(|&idx| self.references[idx] == key.reference && self.alternates[idx] == key.alternate)
            .map(|idx| self.payloads[idx].as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn first_unsorted(&self) -> Option<usize> {
        first_unsorted(&self.positions)
    }

    /// Stable re-sort by position, keeping the four columns aligned
    pub fn sort_stable(&mut self) {
        if let Some(order) = sort_permutation(&self.positions) {
            apply_permutation(&mut self.positions, &order);
            apply_permutation(&mut self.references, &order);
            apply_permutation(&mut self.alternates, &order);
            apply_permutation(&mut self.payloads, &order);
        }
    }
}

/// Cache-wide metadata, written once per build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub layout: CsqLayout,
    pub chromosomes: Vec<ChromIndex>,
    pub records: usize,
}

impl Archived for CacheMeta {
    const KIND: &'static str = "annotation_meta";
}

impl CacheMeta {
    /// Split a cached payload into per-transcript entries
    pub fn entries<'a>(&'a self, payload: &'a str) -> impl Iterator<Item = CsqEntry<'a>> + 'a {
        self.layout.entries(payload)
    }
}

#[must_use]
pub fn table_path(dir: &Path, chrom: ChromIndex) -> PathBuf {
    archive_path(dir, chrom.name())
}

/// Chromosomes with a table file in `dir`
#[must_use]
pub fn list_tables(dir: &Path) -> Vec<ChromIndex> {
    ChromIndex::all()
        .filter(|chrom| table_path(dir, *chrom).is_file())
        .collect()
}

/// Outcome of a cache build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    pub tables_written: usize,
    pub records: usize,
    pub without_payload: usize,
    pub intake: IntakeCounts,
}

/// Accumulates one [`AnnotationTable`] per chromosome
#[derive(Debug)]
pub struct AnnotationCacheBuilder {
    layout: CsqLayout,
    tables: BTreeMap<ChromIndex, AnnotationTable>,
    intake: Intake,
    order: SourceOrder,
    without_payload: usize,
}

impl AnnotationCacheBuilder {
    #[must_use]
    pub fn new(layout: CsqLayout) -> Self {
        Self {
            layout,
            tables: BTreeMap::new(),
            intake: Intake::new(),
            order: SourceOrder::new(),
            without_payload: 0,
        }
    }

    /// Add one annotated record; records without a payload are skipped.
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
        let Some(payload) = record.info(ANNOTATION_KEY) else {
            debug!("No {ANNOTATION_KEY} payload for {key}");
            self.without_payload += 1;
            return Ok(());
        };
        self.tables
            .entry(key.chrom)
            .or_insert_with(|| AnnotationTable::new(key.chrom))
            .push(&key, payload);
        Ok(())
    }

    /// Sort every table, then write the tables and the metadata.
    ///
    /// # Errors
    ///
    /// Returns an archive error if a file cannot be written.
    pub fn finish(
        self,
        dir: &Path,
        info: &BuildInfo,
        compression: Compression,
    ) -> Result<AnnotationSummary, StoreError> {
        let mut summary = AnnotationSummary {
            without_payload: self.without_payload,
            intake: self.intake.counts(),
            ..AnnotationSummary::default()
        };
        let mut chromosomes = Vec::new();
        for (chrom, mut table) in self.tables {
            // push rejected backwards source positions; this re-sort only
            // absorbs the shift of normalized indels
            table.sort_stable();
            debug_assert!(table.first_unsorted().is_none());
            let path = table_path(dir, chrom);
            archive::save(&path, &table, info, compression)?;
            info!("Wrote {} ({} records)", path.display(), table.len());
            summary.tables_written += 1;
            summary.records += table.len();
            chromosomes.push(chrom);
        }

        let meta = CacheMeta {
            layout: self.layout,
            chromosomes,
            records: summary.records,
        };
        archive::save(&archive_path(dir, META_STEM), &meta, info, compression)?;
        info!(
            "Annotation cache: {} tables, {} records, {} without payload",
            summary.tables_written, summary.records, summary.without_payload
        );
        Ok(summary)
    }
}

/// Build an annotation cache from an annotated VCF.
///
/// # Errors
///
/// Returns `ParseError::MissingHeader` if the source declares no annotation
/// layout, or the first parse, ordering or write error.
pub fn build_annotation_cache(
    source: &Path,
    dir: &Path,
    config: &StoreConfig,
) -> Result<AnnotationSummary, StoreError> {
    let reader = VcfReader::open(source)?;
    let header = reader.header();
    let info = BuildInfo::now(header.source_version());
    let description = header.info_description(ANNOTATION_KEY).ok_or_else(|| {
        ParseError::MissingHeader(format!("no ##INFO=<ID={ANNOTATION_KEY}> declaration"))
    })?;
    let mut builder = AnnotationCacheBuilder::new(CsqLayout::from_description(description)?);

    for (n, record) in reader.enumerate() {
        builder.push(&record?)?;
        if (n + 1) % PROGRESS_INTERVAL == 0 {
            info!("Annotation source: parsed {} records", n + 1);
        }
    }
    builder.finish(dir, &info, config.compression())
}

/// Counts from [`AnnotationCache::query_file`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryFileSummary {
    pub records: usize,
    pub found: usize,
    pub unknown_chromosome: usize,
}

/// Read side of the annotation cache
#[derive(Debug)]
pub struct AnnotationCache {
    dir: PathBuf,
    header: ArchiveHeader,
    meta: CacheMeta,
    slot: CacheSlot<ChromIndex, AnnotationTable>,
}

impl AnnotationCache {
    /// Open a cache directory by reading its metadata archive.
    ///
    /// # Errors
    ///
    /// Returns an archive error if `meta.arc` is missing or corrupt.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let (header, meta): (_, CacheMeta) = archive::load(&archive_path(dir, META_STEM))?;
        info!(
            "Opened annotation cache {} ({} records, source {}, built {})",
            dir.display(),
            meta.records,
            header.info.source_version,
            header.info.built_at
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            header,
            meta,
            slot: CacheSlot::new(),
        })
    }

    #[must_use]
    pub fn meta(&self) -> &CacheMeta {
        &self.meta
    }

    #[must_use]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Number of table loads so far
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.slot.load_count()
    }

    /// Look up the payload of an allele. The returned slice borrows the
    /// loaded table and must be copied out before the next query.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome, or
    /// an archive error if the table is corrupt. A missing table is
    /// `Lookup::Missing(Absence::MissingPartition)`.
    pub fn find(
        &mut self,
        chrom: &str,
        position: u32,
        reference: &str,
        alternate: &str,
    ) -> Result<Lookup<&str>, StoreError> {
        let key = query_key(chrom, position, reference, alternate)?;
        self.find_key(&key)
    }

    /// Look up an already-normalized allele.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find`].
    pub fn find_key(&mut self, key: &AlleleKey) -> Result<Lookup<&str>, StoreError> {
        let dir = &self.dir;
        let table = self.slot.get_or_load(key.chrom, |chrom| load_table(dir, chrom))?;
        Ok(match table {
            None => Lookup::Missing(Absence::MissingPartition),
            Some(table) => table.find(key).into(),
        })
    }

    /// Look up every record of a VCF and write `chrom pos ref alt payload`
    /// TSV lines, with an empty payload where nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns a parse, archive or write error.
    pub fn query_file(&mut self, input: &Path, out: &mut impl Write) -> Result<QueryFileSummary, StoreError> {
        let mut summary = QueryFileSummary::default();
        for record in VcfReader::open(input)? {
            let record = record?;
            summary.records += 1;
            let payload = match record.key() {
                Ok(key) => self.find_key(&key)?.found().map(str::to_string),
                Err(e) => {
                    debug!("{e}");
                    summary.unknown_chromosome += 1;
                    None
                }
            };
            summary.found += usize::from(payload.is_some());
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                record.chromosome,
                record.position,
                record.reference,
                record.alternate,
                payload.unwrap_or_default()
            )?;
        }
        if summary.unknown_chromosome > 0 {
            warn!(
                "{} records on unaccepted chromosomes were not looked up",
                summary.unknown_chromosome
            );
        }
        Ok(summary)
    }
}

fn load_table(dir: &Path, chrom: ChromIndex) -> Result<Option<AnnotationTable>, StoreError> {
    let path = table_path(dir, chrom);
    if !path.exists() {
        debug!("No annotation table at {}", path.display());
        return Ok(None);
    }
    debug!("Swapping in annotation table {}", path.display());
    let (_, table): (_, AnnotationTable) = archive::load(&path)?;
    Ok(Some(table))
}
