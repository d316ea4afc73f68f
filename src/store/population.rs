//! Chunked population-frequency store.
//!
//! Each chromosome is cut into fixed-width position ranges ("chunks"); every
//! chunk is an independent archive at `{dir}/{chrom}/{chunk}.arc`. A query
//! loads only the chunk it needs and keeps it until a query falls outside it.
//!
//! Alleles are stored as one packed status byte (see
//! [`CompactStatus`]). SNPs are told apart by the base packed in the byte;
//! insertions and deletions by their inserted or deleted bases.
//!
//! ## Build
//!
//! Sources are streamed in position order. Chunk assignment uses the
//! normalized position, which can lie past the source position for anchored
//! indels, so a chunk stays open until the *source* position has moved past
//! its end. Each source file is handled by one worker on a local pool sized by
//! [`StoreConfig::workers`]. Workers write into private staging directories,
//! which are moved into place together once every worker has succeeded.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::{self, archive_path, ArchiveError, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::allele::{AlleleKey, IngestRecord, VariantShape};
use crate::core::chrom::ChromIndex;
use crate::core::status::{Base, CompactStatus, FrequencyBucket, HomozygoteBucket};
use crate::core::types::{Absence, BuildInfo, Lookup};
use crate::index::order::SourceOrder;
use crate::index::tables::{ShapeCounts, VariantTables};
use crate::parsing::vcf::{VcfReader, UNKNOWN_VERSION};
use crate::store::slot::CacheSlot;
use crate::store::{query_key, Intake, IntakeCounts, StoreError};

/// Stem of the per-store metadata archive
pub const MANIFEST_STEM: &str = "meta";

/// Prefix of per-worker build directories inside the store directory
const STAGING_PREFIX: &str = ".staging-";

/// Frequency and homozygote classes of one allele
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStatus {
    pub frequency: FrequencyBucket,
    pub homozygotes: HomozygoteBucket,
}

impl PopulationStatus {
    /// Status a caller should assume for an allele the store does not hold
    #[must_use]
    pub fn absent() -> Self {
        Self {
            frequency: FrequencyBucket::Absent,
            homozygotes: HomozygoteBucket::None,
        }
    }
}

/// One chunk's SNP / insertion / deletion tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationChunk {
    pub chrom: ChromIndex,
    pub chunk: u32,
    tables: VariantTables<u8, u8>,
}

impl Archived for PopulationChunk {
    const KIND: &'static str = "population_chunk";
}

impl PopulationChunk {
    #[must_use]
    pub fn new(chrom: ChromIndex, chunk: u32) -> Self {
        Self {
            chrom,
            chunk,
            tables: VariantTables::new(),
        }
    }

    /// Add an allele; `Complex` keys are ignored
    pub fn push(&mut self, key: &AlleleKey, base: Base, status: PopulationStatus) {
        let byte = CompactStatus::new(base, status.frequency, status.homozygotes).encode();
        match key.shape() {
            VariantShape::Snp => self.tables.push_snp(key.position, byte),
            VariantShape::Insertion => {
                self.tables.push_insertion(key.position, &key.alternate, byte);
            }
            VariantShape::Deletion => self.tables.push_deletion(key.position, &key.reference, byte),
            VariantShape::Complex => {}
        }
    }

    /// Look up a normalized allele within this chunk.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the stored byte does not decode.
    pub fn find(&self, key: &AlleleKey) -> Result<Option<PopulationStatus>, StoreError> {
        let byte = match key.shape() {
            VariantShape::Snp => {
                let Ok(alt) = Base::from_ascii(key.alternate.as_bytes()[0]) else {
                    return Ok(None);
                };
                self.tables
                    .find_snp(key.position, |b| CompactStatus::packed_base(*b) == alt)
            }
            VariantShape::Insertion => self.tables.find_insertion(key.position, &key.alternate),
            VariantShape::Deletion => self.tables.find_deletion(key.position, &key.reference),
            VariantShape::Complex => None,
        };
        let Some(byte) = byte else {
            return Ok(None);
        };
        let status = CompactStatus::decode(*byte)?;
        Ok(Some(PopulationStatus {
            frequency: status.frequency,
            homozygotes: status.homozygotes,
        }))
    }

    #[must_use]
    pub fn counts(&self) -> ShapeCounts {
        self.tables.counts()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Order the tables for binary search. Source order was already checked
    /// record by record in [`ChunkWriter::push`]; this only absorbs the
    /// position shift of normalized indels.
    fn seal(&mut self) {
        self.tables.sort_stable();
        debug_assert!(self.tables.first_unsorted().is_none());
    }
}

/// Store-wide parameters persisted next to the chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationManifest {
    pub chunk_size: u32,
}

impl Archived for PopulationManifest {
    const KIND: &'static str = "population_meta";
}

/// `{dir}/{chrom}/{chunk}.arc`
#[must_use]
pub fn chunk_path(dir: &Path, chrom: ChromIndex, chunk: u32) -> PathBuf {
    archive_path(&dir.join(chrom.name()), &chunk.to_string())
}

/// Outcome of a population build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationSummary {
    pub chromosomes: BTreeSet<ChromIndex>,
    pub chunks_written: usize,
    pub counts: ShapeCounts,
    pub skipped_by_filter: usize,
    pub skipped_unrepresentable: usize,
    pub intake: IntakeCounts,
}

impl PopulationSummary {
    fn merge(&mut self, other: Self) {
        self.chromosomes.extend(other.chromosomes);
        self.chunks_written += other.chunks_written;
        self.counts += other.counts;
        self.skipped_by_filter += other.skipped_by_filter;
        self.skipped_unrepresentable += other.skipped_unrepresentable;
        self.intake += other.intake;
    }
}

/// Streams one position-ordered source into chunk archives
pub struct ChunkWriter<'a> {
    dir: PathBuf,
    config: &'a StoreConfig,
    info: BuildInfo,
    compression: Compression,
    intake: Intake,
    order: SourceOrder,
    chrom: Option<ChromIndex>,
    open: BTreeMap<u32, PopulationChunk>,
    summary: PopulationSummary,
}

impl<'a> ChunkWriter<'a> {
    #[must_use]
    pub fn new(dir: &Path, config: &'a StoreConfig, info: BuildInfo) -> Self {
        Self {
            dir: dir.to_path_buf(),
            config,
            info,
            compression: config.compression(),
            intake: Intake::new(),
            order: SourceOrder::new(),
            chrom: None,
            open: BTreeMap::new(),
            summary: PopulationSummary::default(),
        }
    }

    /// Add one source record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnsortedInput` if the source position goes
    /// backwards, `StoreError::InvalidRecord` if a chromosome reappears after
    /// another one, or an archive error if a completed chunk cannot be written.
    pub fn push(&mut self, record: &IngestRecord) -> Result<(), StoreError> {
        let Some(key) = self.intake.admit(record) else {
            return Ok(());
        };
        if key.shape() == VariantShape::Complex {
            self.summary.skipped_unrepresentable += 1;
            return Ok(());
        }
        let config = self.config;
        let fields = &config.population;
        if record.has_filter(&fields.skip_filters) {
            self.summary.skipped_by_filter += 1;
            return Ok(());
        }

        let base = match key.shape() {
            VariantShape::Snp => match Base::from_ascii(key.alternate.as_bytes()[0]) {
                Ok(base) => base,
                Err(e) => {
                    debug!("Skipping {key}: {e}");
                    self.summary.skipped_unrepresentable += 1;
                    return Ok(());
                }
            },
            _ => Base::A,
        };

        self.enter_chromosome(key.chrom)?;
        let chunk_size = config.chunk_size;
        let source_chunk = record.position / chunk_size;
        self.order
            .observe(key.chrom, record.position)
            .map_err(|v| StoreError::unsorted(v, Some(source_chunk)))?;
        self.flush_before(source_chunk)?;

        let status = PopulationStatus {
            frequency: config.thresholds.bucket(
                !record.has_filter(&fields.fail_filters),
                record.info_parsed(&fields.allele_number).unwrap_or(0),
                record.info_parsed(&fields.allele_count).unwrap_or(0),
                record.info_parsed(&fields.allele_frequency),
            ),
            homozygotes: HomozygoteBucket::from_count(
                record.info_parsed(&fields.homozygotes).unwrap_or(0),
            ),
        };
        let target = key.position / chunk_size;
        self.open
            .entry(target)
            .or_insert_with(|| PopulationChunk::new(key.chrom, target))
            .push(&key, base, status);
        Ok(())
    }

    fn enter_chromosome(&mut self, chrom: ChromIndex) -> Result<(), StoreError> {
        if self.chrom == Some(chrom) {
            return Ok(());
        }
        self.flush_all()?;
        if self.summary.chromosomes.contains(&chrom) {
            return Err(StoreError::InvalidRecord(format!(
                "chromosome {chrom} reappears after other chromosomes; sources must be grouped by chromosome"
            )));
        }
        self.summary.chromosomes.insert(chrom);
        self.chrom = Some(chrom);
        Ok(())
    }

    /// Persist every open chunk with index below `chunk`
    fn flush_before(&mut self, chunk: u32) -> Result<(), StoreError> {
        let keep = self.open.split_off(&chunk);
        let ready = std::mem::replace(&mut self.open, keep);
        self.persist(ready)
    }

    fn flush_all(&mut self) -> Result<(), StoreError> {
        let ready = std::mem::take(&mut self.open);
        self.persist(ready)
    }

    fn persist(&mut self, ready: BTreeMap<u32, PopulationChunk>) -> Result<(), StoreError> {
        for (_, mut sealed) in ready {
            if sealed.is_empty() {
                continue;
            }
            sealed.seal();
            let path = chunk_path(&self.dir, sealed.chrom, sealed.chunk);
            archive::save(&path, &sealed, &self.info, self.compression)?;
            let counts = sealed.counts();
            info!(
                "Wrote chunk {} ({} SNPs, {} insertions, {} deletions)",
                path.display(),
                counts.snps,
                counts.insertions,
                counts.deletions
            );
            self.summary.counts += counts;
            self.summary.chunks_written += 1;
        }
        Ok(())
    }

    /// Flush the remaining chunks and write the store manifest.
    ///
    /// # Errors
    ///
    /// Returns an archive error if a chunk or the manifest cannot be written.
    pub fn finish(mut self) -> Result<PopulationSummary, StoreError> {
        self.flush_all()?;
        write_manifest(&self.dir, self.config, &self.info)?;
        self.summary.intake = self.intake.counts();
        Ok(self.summary)
    }
}

fn write_manifest(dir: &Path, config: &StoreConfig, info: &BuildInfo) -> Result<(), StoreError> {
    let manifest = PopulationManifest {
        chunk_size: config.chunk_size,
    };
    archive::save(
        &archive_path(dir, MANIFEST_STEM),
        &manifest,
        info,
        config.compression(),
    )?;
    Ok(())
}

/// Build chunks from one VCF source.
///
/// # Errors
///
/// Returns the first parse, ordering or write error.
pub fn build_population_source(
    source: &Path,
    dir: &Path,
    config: &StoreConfig,
) -> Result<PopulationSummary, StoreError> {
    let reader = VcfReader::open(source)?;
    let info = BuildInfo::now(reader.header().source_version());
    info!("Building population chunks from {}", source.display());

    let mut writer = ChunkWriter::new(dir, config, info);
    for record in reader {
        writer.push(&record?)?;
    }
    writer.finish()
}

/// Build a population store from per-chromosome sources on a worker pool.
///
/// Each worker writes into its own staging directory under `dir`. Chromosome
/// directories are moved into place, and the manifest written, only once
/// every source has succeeded and no chromosome appears in two sources; a
/// rejected build leaves `dir` as it was.
///
/// # Errors
///
/// Returns the first error of any worker, or `StoreError::InvalidRecord` if
/// two sources hold the same chromosome.
pub fn build_population_store(
    sources: &[PathBuf],
    dir: &Path,
    config: &StoreConfig,
) -> Result<PopulationSummary, StoreError> {
    std::fs::create_dir_all(dir)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| {
            StoreError::Io(std::io::Error::other(format!(
                "Failed to create thread pool: {e}"
            )))
        })?;

    let staged = pool.install(|| {
        sources
            .par_iter()
            .map(|source| {
                let staging = tempfile::Builder::new()
                    .prefix(STAGING_PREFIX)
                    .tempdir_in(dir)?;
                let summary = build_population_source(source, staging.path(), config)?;
                Ok((staging, summary))
            })
            .collect::<Result<Vec<_>, StoreError>>()
    })?;

    let mut total = PopulationSummary::default();
    for (_, summary) in &staged {
        if let Some(shared) = summary.chromosomes.intersection(&total.chromosomes).next() {
            return Err(StoreError::InvalidRecord(format!(
                "chromosome {shared} appears in more than one source"
            )));
        }
        total.merge(summary.clone());
    }

    let mut info = None;
    for (staging, summary) in &staged {
        if info.is_none() {
            let header = archive::read_header(&archive_path(staging.path(), MANIFEST_STEM))?;
            info = Some(header.info);
        }
        for chrom in &summary.chromosomes {
            let from = staging.path().join(chrom.name());
            if !from.is_dir() {
                continue;
            }
            let to = dir.join(chrom.name());
            if to.exists() {
                std::fs::remove_dir_all(&to)?;
            }
            std::fs::rename(&from, &to)?;
        }
    }
    let info = info.unwrap_or_else(|| BuildInfo::now(UNKNOWN_VERSION));
    write_manifest(dir, config, &info)?;

    info!(
        "Population store: {} chunks over {} chromosomes, {} alleles",
        total.chunks_written,
        total.chromosomes.len(),
        total.counts.total()
    );
    Ok(total)
}

/// Read side of the chunked store
#[derive(Debug)]
pub struct PopulationStore {
    dir: PathBuf,
    chunk_size: u32,
    slot: CacheSlot<(ChromIndex, u32), PopulationChunk>,
}

impl PopulationStore {
    /// Open a store directory. Chunk width comes from the stored manifest,
    /// falling back to `config.chunk_size` when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or the manifest is corrupt.
    pub fn open(dir: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("population store directory {} not found", dir.display()),
            )));
        }
        let manifest_path = archive_path(dir, MANIFEST_STEM);
        let chunk_size = if manifest_path.exists() {
            let (header, manifest): (_, PopulationManifest) = archive::load(&manifest_path)?;
            if manifest.chunk_size == 0 {
                return Err(ArchiveError::InvalidContent {
                    path: manifest_path,
                    message: "chunk size is zero".to_string(),
                }
                .into());
            }
            info!(
                "Opened population store {} (source {}, built {})",
                dir.display(),
                header.info.source_version,
                header.info.built_at
            );
            manifest.chunk_size
        } else {
            warn!(
                "No manifest in {}; assuming chunk size {}",
                dir.display(),
                config.chunk_size
            );
            config.chunk_size
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            chunk_size,
            slot: CacheSlot::new(),
        })
    }

    #[must_use]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunk loads so far
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.slot.load_count()
    }

    /// Look up an allele by raw chromosome name and alleles.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome, or
    /// an archive/codec error if the chunk is corrupt. A missing chunk is
    /// `Lookup::Missing(Absence::MissingPartition)`, not an error.
    pub fn find(
        &mut self,
        chrom: &str,
        position: u32,
        reference: &str,
        alternate: &str,
    ) -> Result<Lookup<PopulationStatus>, StoreError> {
        let key = query_key(chrom, position, reference, alternate)?;
        self.find_key(&key)
    }

    /// Look up an already-normalized allele.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find`].
    pub fn find_key(&mut self, key: &AlleleKey) -> Result<Lookup<PopulationStatus>, StoreError> {
        let dir = &self.dir;
        let chunk = self
            .slot
            .get_or_load((key.chrom, key.position / self.chunk_size), |(chrom, idx)| {
                load_chunk(dir, chrom, idx)
            })?;
        match chunk {
            None => Ok(Lookup::Missing(Absence::MissingPartition)),
            Some(chunk) => Ok(chunk.find(key)?.into()),
        }
    }
}

fn load_chunk(dir: &Path, chrom: ChromIndex, chunk: u32) -> Result<Option<PopulationChunk>, StoreError> {
    let path = chunk_path(dir, chrom, chunk);
    if !path.exists() {
        debug!("No population chunk at {}", path.display());
        return Ok(None);
    }
    debug!("Loading population chunk {}", path.display());
    let (_, loaded): (_, PopulationChunk) = archive::load(&path)?;
    Ok(Some(loaded))
}

/// Chunk files per chromosome directory, for inspection
#[must_use]
pub fn list_chunks(dir: &Path) -> BTreeMap<ChromIndex, usize> {
    ChromIndex::all()
        .filter_map(|chrom| {
            let entries = std::fs::read_dir(dir.join(chrom.name())).ok()?;
            let count = entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == archive::ARCHIVE_EXTENSION)
                })
                .count();
            (count > 0).then_some((chrom, count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(chunk_size: u32) -> StoreConfig {
        StoreConfig {
            chunk_size,
            ..StoreConfig::default()
        }
    }

    fn record(chrom: &str, pos: u32, reference: &str, alt: &str, af: &str) -> IngestRecord {
        IngestRecord::new(chrom, pos, reference, alt)
            .with_info("AN", "40000")
            .with_info("AC", "10")
            .with_info("AF", af)
            .with_info("nhomalt", "1")
    }

    fn build(dir: &Path, config: &StoreConfig, records: &[IngestRecord]) -> PopulationSummary {
        let mut writer = ChunkWriter::new(dir, config, BuildInfo::now("test"));
        for r in records {
            writer.push(r).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_snp_and_indels_in_one_chunk() {
        let dir = TempDir::new().unwrap();
        let config = config(1_000);
        let summary = build(
            dir.path(),
            &config,
            &[
                record("1", 100, "T", "G", "0.02"),
                record("1", 100, "T", "C", "0.0001"),
                record("1", 200, "C", "CT", "0.004"),
                record("1", 300, "CAG", "C", "0.0006"),
            ],
        );
        assert_eq!(summary.chunks_written, 1);
        assert_eq!(summary.counts.total(), 4);

        let mut store = PopulationStore::open(dir.path(), &config).unwrap();
        let g = store.find("1", 100, "T", "G").unwrap().found().unwrap();
        assert_eq!(g.frequency, FrequencyBucket::Common);
        assert_eq!(g.homozygotes, HomozygoteBucket::One);
        let c = store.find("chr1", 100, "T", "C").unwrap().found().unwrap();
        assert_eq!(c.frequency, FrequencyBucket::Rare);
        assert_eq!(
            store.find("1", 100, "T", "A").unwrap(),
            Lookup::Missing(Absence::NoRecord)
        );
        // anchored and placeholder forms hit the same entry
        assert!(store.find("1", 200, "C", "CT").unwrap().is_found());
        assert!(store.find("1", 201, "-", "T").unwrap().is_found());
        assert!(store.find("1", 301, "AG", "-").unwrap().is_found());
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn test_filters() {
        let dir = TempDir::new().unwrap();
        let config = config(1_000);
        let mut skipped = record("1", 10, "A", "G", "0.5");
        skipped.filters = vec!["AC0".to_string()];
        let mut failed = record("1", 20, "A", "G", "0.5");
        failed.filters = vec!["AS_VQSR".to_string()];
        let summary = build(dir.path(), &config, &[skipped, failed]);
        assert_eq!(summary.skipped_by_filter, 1);

        let mut store = PopulationStore::open(dir.path(), &config).unwrap();
        assert!(!store.find("1", 10, "A", "G").unwrap().is_found());
        let status = store.find("1", 20, "A", "G").unwrap().found().unwrap();
        assert_eq!(status.frequency, FrequencyBucket::Filtered);
    }

    #[test]
    fn test_missing_chunk_is_missing_partition() {
        let dir = TempDir::new().unwrap();
        let config = config(1_000);
        build(dir.path(), &config, &[record("1", 10, "A", "G", "0.5")]);

        let mut store = PopulationStore::open(dir.path(), &config).unwrap();
        assert_eq!(
            store.find("1", 5_000, "A", "G").unwrap(),
            Lookup::Missing(Absence::MissingPartition)
        );
        assert_eq!(
            store.find("2", 10, "A", "G").unwrap(),
            Lookup::Missing(Absence::MissingPartition)
        );
        assert!(matches!(
            store.find("MT", 10, "A", "G"),
            Err(StoreError::UnknownChromosome(_))
        ));
    }

    #[test]
    fn test_indel_crossing_chunk_boundary() {
        let dir = TempDir::new().unwrap();
        let config = config(100);
        // anchor at 99 (chunk 0), normalized insertion at 100 (chunk 1)
        build(
            dir.path(),
            &config,
            &[
                record("1", 99, "A", "AT", "0.02"),
                record("1", 150, "A", "G", "0.02"),
            ],
        );
        let mut store = PopulationStore::open(dir.path(), &config).unwrap();
        assert!(store.find("1", 100, "-", "T").unwrap().is_found());
        assert!(!chunk_path(dir.path(), ChromIndex::parse("1").unwrap(), 0).exists());
    }

    #[test]
    fn test_unsorted_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(1_000);
        let mut writer = ChunkWriter::new(dir.path(), &config, BuildInfo::now("test"));
        writer.push(&record("1", 500, "A", "G", "0.1")).unwrap();
        let err = writer.push(&record("1", 400, "A", "G", "0.1")).unwrap_err();
        match err {
            StoreError::UnsortedInput { position, previous, chunk, .. } => {
                assert_eq!((position, previous, chunk), (400, 500, Some(0)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_chromosome_revisit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = config(1_000);
        let mut writer = ChunkWriter::new(dir.path(), &config, BuildInfo::now("test"));
        writer.push(&record("1", 5, "A", "G", "0.1")).unwrap();
        writer.push(&record("2", 5, "A", "G", "0.1")).unwrap();
        assert!(matches!(
            writer.push(&record("1", 6, "A", "G", "0.1")),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_zero_chunk_size_manifest_is_corrupt() {
        let dir = TempDir::new().unwrap();
        archive::save(
            &archive_path(dir.path(), MANIFEST_STEM),
            &PopulationManifest { chunk_size: 0 },
            &BuildInfo::now("test"),
            Compression::default(),
        )
        .unwrap();
        match PopulationStore::open(dir.path(), &config(1_000)) {
            Err(StoreError::Archive(e)) => assert!(e.is_corrupt()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_manifest_overrides_query_config() {
        let dir = TempDir::new().unwrap();
        build(dir.path(), &config(100), &[record("1", 250, "A", "G", "0.1")]);
        let mut store = PopulationStore::open(dir.path(), &config(1_000_000)).unwrap();
        assert_eq!(store.chunk_size(), 100);
        assert!(store.find("1", 250, "A", "G").unwrap().is_found());
        assert_eq!(list_chunks(dir.path()).values().sum::<usize>(), 1);
    }
}
