//! Database directory layout and the set of opened stores.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::archive::{self, archive_path, ArchiveHeader};
use crate::config::{DatabaseConfig, StoreConfig};
use crate::core::types::Lookup;
use crate::core::status::CoverageClass;
use crate::store::annotation::{self, AnnotationCache};
use crate::store::coverage::CoverageStore;
use crate::store::curated::{CuratedRecord, CuratedStore};
use crate::store::dvd::{DvdRecord, DvdStore};
use crate::store::frequency::FrequencyStore;
use crate::store::population::{self, PopulationStatus, PopulationStore};
use crate::store::{query_key, StoreError};

pub const CURATED_FILE: &str = "clinvar.arc";
pub const FREQUENCY_FILE: &str = "k_genome.arc";
pub const POPULATION_DIR: &str = "gnomad";
pub const ANNOTATION_DIR: &str = "vep_cache";
pub const DVD_FILE: &str = "dvd.arc";
pub const COVERAGE_FILE: &str = "coverage.arc";

/// Number of stores in a full database
pub const STORE_COUNT: usize = 6;

/// Paths of every store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseLayout {
    pub curated: PathBuf,
    pub frequency: PathBuf,
    pub population: PathBuf,
    pub annotation: PathBuf,
    pub dvd: PathBuf,
    pub coverage: PathBuf,
}

impl DatabaseLayout {
    /// Default file names under `base`
    #[must_use]
    pub fn under(base: &Path) -> Self {
        Self {
            curated: base.join(CURATED_FILE),
            frequency: base.join(FREQUENCY_FILE),
            population: base.join(POPULATION_DIR),
            annotation: base.join(ANNOTATION_DIR),
            dvd: base.join(DVD_FILE),
            coverage: base.join(COVERAGE_FILE),
        }
    }

    /// Layout from config overrides. `base` (typically a CLI argument) wins
    /// over `config.base_dir`; relative overrides resolve against the base.
    #[must_use]
    pub fn resolve(base: Option<&Path>, config: &DatabaseConfig) -> Self {
        let base = base
            .map(Path::to_path_buf)
            .or_else(|| config.base_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let pick = |over: &Option<PathBuf>, default: PathBuf| match over {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => default,
        };
        let defaults = Self::under(&base);
        Self {
            curated: pick(&config.curated, defaults.curated),
            frequency: pick(&config.frequency, defaults.frequency),
            population: pick(&config.population, defaults.population),
            annotation: pick(&config.annotation, defaults.annotation),
            dvd: pick(&config.dvd, defaults.dvd),
            coverage: pick(&config.coverage, defaults.coverage),
        }
    }
}

/// Outcome of [`Database::lookup`]: one entry per store, `None` when the
/// store is not available
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantReport {
    pub chromosome: String,
    /// Normalized position
    pub position: u32,
    pub reference: String,
    pub alternate: String,
    pub curated: Option<Lookup<CuratedRecord>>,
    pub frequency: Option<Lookup<f32>>,
    pub population: Option<Lookup<PopulationStatus>>,
    pub annotation: Option<Lookup<String>>,
    pub dvd: Option<Lookup<DvdRecord>>,
    /// Coverage class at the normalized position
    pub coverage: Option<Lookup<CoverageClass>>,
}

/// All stores of one layout, opened together
#[derive(Debug, Default)]
pub struct Database {
    pub curated: Option<CuratedStore>,
    pub frequency: Option<FrequencyStore>,
    pub population: Option<PopulationStore>,
    pub annotation: Option<AnnotationCache>,
    pub dvd: Option<DvdStore>,
    pub coverage: Option<CoverageStore>,
}

impl Database {
    /// Open every store present in `layout`; absent ones are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns an error if a present store cannot be read.
    pub fn open(layout: &DatabaseLayout, config: &StoreConfig) -> Result<Self, StoreError> {
        let mut db = Self::default();
        if present(&layout.curated, "curated") {
            db.curated = Some(CuratedStore::load(&layout.curated)?.1);
        }
        if present(&layout.frequency, "frequency") {
            db.frequency = Some(FrequencyStore::load(&layout.frequency)?.1);
        }
        if present(&layout.population, "population") {
            db.population = Some(PopulationStore::open(&layout.population, config)?);
        }
        if present(&layout.annotation, "annotation") {
            db.annotation = Some(AnnotationCache::open(&layout.annotation)?);
        }
        if present(&layout.dvd, "dvd") {
            db.dvd = Some(DvdStore::load(&layout.dvd)?.1);
        }
        if present(&layout.coverage, "coverage") {
            db.coverage = Some(CoverageStore::load(&layout.coverage)?.1);
        }
        info!("Opened {} of {STORE_COUNT} stores", db.open_count());
        Ok(db)
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        [
            self.curated.is_some(),
            self.frequency.is_some(),
            self.population.is_some(),
            self.annotation.is_some(),
            self.dvd.is_some(),
            self.coverage.is_some(),
        ]
        .into_iter()
        .filter(|open| *open)
        .count()
    }

    /// Query every opened store for one allele.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome,
    /// or the first store error.
    pub fn lookup(
        &mut self,
        chrom: &str,
        position: u32,
        reference: &str,
        alternate: &str,
    ) -> Result<VariantReport, StoreError> {
        let key = query_key(chrom, position, reference, alternate)?;
        let population = match self.population.as_mut() {
            Some(store) => Some(store.find_key(&key)?),
            None => None,
        };
        let annotation = match self.annotation.as_mut() {
            Some(cache) => Some(cache.find_key(&key)?.map(str::to_string)),
            None => None,
        };
        Ok(VariantReport {
            chromosome: key.chrom.name().to_string(),
            position: key.position,
            curated: self.curated.as_ref().map(|s| s.find_key(&key).map(Clone::clone)),
            frequency: self.frequency.as_ref().map(|s| s.find_key(&key)),
            population,
            annotation,
            dvd: self.dvd.as_ref().map(|s| s.find_key(&key).map(Clone::clone)),
            coverage: self.coverage.as_ref().map(|s| s.find_at(key.chrom, key.position)),
            reference: key.reference,
            alternate: key.alternate,
        })
    }
}

fn present(path: &Path, store: &str) -> bool {
    let exists = path.exists();
    if !exists {
        warn!("No {store} store at {}", path.display());
    }
    exists
}

/// One line of [`inspect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectEntry {
    pub store: &'static str,
    pub path: PathBuf,
    pub present: bool,
    pub kind: Option<String>,
    pub source_version: Option<String>,
    pub built_at: Option<String>,
    /// Partition files, for partitioned stores
    pub partitions: Option<usize>,
}

impl InspectEntry {
    fn new(store: &'static str, path: &Path, header: Option<ArchiveHeader>) -> Self {
        Self {
            store,
            path: path.to_path_buf(),
            present: path.exists(),
            kind: header.as_ref().map(|h| h.kind.clone()),
            source_version: header.as_ref().map(|h| h.info.source_version.clone()),
            built_at: header.map(|h| h.info.built_at),
            partitions: None,
        }
    }
}

/// Describe every store of `layout` from archive headers only.
///
/// # Errors
///
/// Returns an archive error if a present archive header cannot be decoded.
pub fn inspect(layout: &DatabaseLayout) -> Result<Vec<InspectEntry>, StoreError> {
    let header = |path: &Path| -> Result<Option<ArchiveHeader>, StoreError> {
        if path.is_file() {
            Ok(Some(archive::read_header(path)?))
        } else {
            Ok(None)
        }
    };

    let population_meta = archive_path(&layout.population, population::MANIFEST_STEM);
    let mut population = InspectEntry::new("population", &layout.population, header(&population_meta)?);
    if population.present {
        population.partitions = Some(population::list_chunks(&layout.population).values().sum());
    }

    let annotation_meta = archive_path(&layout.annotation, annotation::META_STEM);
    let mut annotation = InspectEntry::new("annotation", &layout.annotation, header(&annotation_meta)?);
    if annotation.present {
        annotation.partitions = Some(annotation::list_tables(&layout.annotation).len());
    }

    Ok(vec![
        InspectEntry::new("curated", &layout.curated, header(&layout.curated)?),
        InspectEntry::new("frequency", &layout.frequency, header(&layout.frequency)?),
        population,
        annotation,
        InspectEntry::new("dvd", &layout.dvd, header(&layout.dvd)?),
        InspectEntry::new("coverage", &layout.coverage, header(&layout.coverage)?),
    ])
}
