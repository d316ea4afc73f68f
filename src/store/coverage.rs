//! Population coverage store.
//!
//! Coverage summaries hold one row per reference base, and neighboring bases
//! nearly always share a [`CoverageClass`]. Each chromosome therefore keeps
//! only the positions where the class changes:
//!
//! ```text
//! rows   1:Full 2:Full 3:Deep 4:Deep ... 70:Full
//! runs   0:Low  1:Full 3:Deep 70:Full
//! ```
//!
//! A lookup returns the class of the last change at or before the position.
//! Every chromosome with data opens with a `Low` run at position 0, so bases
//! before the first summary row read as `Low`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveHeader, Archived, Compression};
use crate::config::StoreConfig;
use crate::core::chrom::ChromIndex;
use crate::core::status::{CoverageClass, CoverageThresholds};
use crate::core::types::{Absence, BuildInfo, Lookup};
use crate::index::order::SourceOrder;
use crate::index::position::SortedPositionIndex;
use crate::parsing::coverage::{coverage_release, CoverageReader, CoverageRow};
use crate::parsing::vcf::UNKNOWN_VERSION;
use crate::store::{StoreError, PROGRESS_INTERVAL};

/// Rows between build progress log lines; summaries are far longer than VCFs
const ROW_PROGRESS_INTERVAL: usize = PROGRESS_INTERVAL * 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageStore {
    runs: SortedPositionIndex<CoverageClass>,
}

impl Archived for CoverageStore {
    const KIND: &'static str = "coverage";
}

impl CoverageStore {
    /// Coverage class at one position.
    ///
    /// A chromosome absent from the source is `Missing(MissingPartition)`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownChromosome` for an unaccepted chromosome.
    pub fn find(&self, chrom: &str, position: u32) -> Result<Lookup<CoverageClass>, StoreError> {
        Ok(self.find_at(ChromIndex::parse(chrom)?, position))
    }

    #[must_use]
    pub fn find_at(&self, chrom: ChromIndex, position: u32) -> Lookup<CoverageClass> {
        match self.runs.floor(chrom, position) {
            Some((_, class)) => Lookup::Found(*class),
            None => Lookup::Missing(Absence::MissingPartition),
        }
    }

    /// Class changes stored for one chromosome, the opening run included
    #[must_use]
    pub fn run_count(&self, chrom: ChromIndex) -> usize {
        self.runs.len(chrom)
    }

    #[must_use]
    pub fn total_runs(&self) -> usize {
        self.runs.total_len()
    }

    /// Chromosomes with at least one summary row
    #[must_use]
    pub fn chromosomes(&self) -> Vec<ChromIndex> {
        ChromIndex::all().filter(|c| self.runs.len(*c) > 0).collect()
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
            "Loaded coverage store {} ({} runs on {} chromosomes, source {}, built {})",
            path.display(),
            store.total_runs(),
            store.chromosomes().len(),
            header.info.source_version,
            header.info.built_at
        );
        Ok((header, store))
    }
}

/// Counts reported after a coverage build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub rows: usize,
    pub runs: usize,
    pub chromosomes: usize,
    pub invalid: usize,
    pub unknown_chromosome: usize,
}

/// Run-length encodes summary rows into a [`CoverageStore`]
#[derive(Debug, Default)]
pub struct CoverageStoreBuilder {
    store: CoverageStore,
    thresholds: CoverageThresholds,
    order: SourceOrder,
    summary: CoverageSummary,
    warned: HashSet<String>,
}

impl CoverageStoreBuilder {
    #[must_use]
    pub fn new(thresholds: CoverageThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    /// Add one summary row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnsortedInput` if positions go backwards within
    /// a chromosome.
    pub fn push(&mut self, row: &CoverageRow) -> Result<(), StoreError> {
        let chrom = match ChromIndex::parse(&row.chromosome) {
            Ok(chrom) => chrom,
            Err(e) => {
                if self.warned.insert(row.chromosome.clone()) {
                    warn!("{e}; skipping its rows");
                }
                self.summary.unknown_chromosome += 1;
                return Ok(());
            }
        };
        if row.position == 0 || !row.mean.is_finite() || !row.over_20.is_finite() {
            debug!("Skipping coverage row {}:{}", row.chromosome, row.position);
            self.summary.invalid += 1;
            return Ok(());
        }
        self.order
            .observe(chrom, row.position)
            .map_err(|v| StoreError::unsorted(v, None))?;
        self.summary.rows += 1;

        let runs = &mut self.store.runs;
        if runs.len(chrom) == 0 {
            runs.insert(chrom, 0, CoverageClass::Low);
        }
        let class = self.thresholds.classify(row.mean, row.over_20);
        if runs.payloads(chrom).last() != Some(&class) {
            runs.insert(chrom, row.position, class);
        }
        Ok(())
    }

    #[must_use]
    pub fn finish(mut self) -> (CoverageStore, CoverageSummary) {
        for chrom in self.store.chromosomes() {
            debug_assert!(self.store.runs.verify_sorted(chrom));
            info!(
                "Chromosome {chrom}: {} coverage runs",
                self.store.run_count(chrom)
            );
        }
        self.summary.runs = self.store.total_runs();
        self.summary.chromosomes = self.store.chromosomes().len();
        info!(
            "Coverage store: {} rows in {} runs ({} invalid, {} on unaccepted chromosomes)",
            self.summary.rows, self.summary.runs, self.summary.invalid, self.summary.unknown_chromosome
        );
        (self.store, self.summary)
    }
}

/// Build and save a coverage store from a summary TSV.
///
/// The source version is the release named in the source path
/// (`.../release/<name>/...`), if any.
///
/// # Errors
///
/// Returns the first parse, ordering or write error.
pub fn build_coverage_store(
    source: &Path,
    output: &Path,
    config: &StoreConfig,
) -> Result<CoverageSummary, StoreError> {
    let reader = CoverageReader::open(source)?;
    let version = coverage_release(source).unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    let info = BuildInfo::now(version);

    let mut builder = CoverageStoreBuilder::new(config.coverage.clone());
    for (n, row) in reader.enumerate() {
        builder.push(&row?)?;
        if (n + 1) % ROW_PROGRESS_INTERVAL == 0 {
            info!("Coverage source: parsed {} rows", n + 1);
        }
    }
    let (store, summary) = builder.finish();
    store.save(output, &info, config.compression())?;
    Ok(summary)
}
