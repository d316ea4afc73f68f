//! Store configuration.
//!
//! One [`StoreConfig`] value is threaded through every builder and store;
//! nothing is read from process-wide state. Missing JSON keys fall back to the
//! defaults, so a config file only needs the values it changes:
//!
//! ```json
//! { "chunk_size": 1000000, "workers": 8, "thresholds": { "min_allele_number": 10000 },
//!   "coverage": { "deep_mean": 25.0 } }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::archive::{Backend, Compression};
use crate::core::status::{CoverageThresholds, FrequencyThresholds};

/// Default population chunk width in bases
pub const DEFAULT_CHUNK_SIZE: u32 = 10_000_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// INFO keys and FILTER names read from population sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationFields {
    pub allele_number: String,
    pub allele_count: String,
    pub allele_frequency: String,
    pub homozygotes: String,
    /// Records carrying one of these filters are not stored at all
    pub skip_filters: Vec<String>,
    /// Records carrying one of these filters are stored as filtered
    pub fail_filters: Vec<String>,
}

impl Default for PopulationFields {
    fn default() -> Self {
        Self {
            allele_number: "AN".to_string(),
            allele_count: "AC".to_string(),
            allele_frequency: "AF".to_string(),
            homozygotes: "nhomalt".to_string(),
            skip_filters: vec!["AC0".to_string()],
            fail_filters: vec!["AS_VQSR".to_string()],
        }
    }
}

/// Where the stores live; relative overrides resolve against `base_dir`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub base_dir: Option<PathBuf>,
    pub curated: Option<PathBuf>,
    pub frequency: Option<PathBuf>,
    pub population: Option<PathBuf>,
    pub annotation: Option<PathBuf>,
    pub dvd: Option<PathBuf>,
    pub coverage: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub thresholds: FrequencyThresholds,
    /// Ladder for the coverage store
    pub coverage: CoverageThresholds,
    pub chunk_size: u32,
    /// Build-time worker pool size
    pub workers: usize,
    pub backend: Backend,
    pub compression_level: Option<i32>,
    pub population: PopulationFields,
    pub database: DatabaseConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            thresholds: FrequencyThresholds::default(),
            coverage: CoverageThresholds::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 4,
            backend: Backend::default(),
            compression_level: None,
            population: PopulationFields::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if !self.thresholds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "frequency bounds must be finite and strictly ascending: {:?}",
                self.thresholds.bounds
            )));
        }
        if !self.coverage.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "coverage fractions must lie in 0..=1 with low_fraction <= full_fraction, and deep_mean must be non-negative: {:?}",
                self.coverage
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        Compression {
            backend: self.backend,
            level: self.compression_level,
        }
    }
}
