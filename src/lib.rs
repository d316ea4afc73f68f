//! # allele-store
//!
//! Compact, position-indexed variant stores for clinical variant interpretation.
//!
//! A variant interpreter asks the same few questions for every allele it sees:
//! how common is it in a population, has a curated database classified it, and
//! what functional annotation was computed for it before. `allele-store` builds
//! read-only stores that answer those questions with a binary search, keeping
//! only one chunk or chromosome of the large stores in memory at a time.
//!
//! ## Features
//!
//! - **One-byte allele status**: base, frequency class and homozygote class packed together
//! - **Chunked population store**: fixed-width position chunks, loaded on demand
//! - **Curated store**: lookup by allele, by variation id, or by transcript coordinate window
//! - **Annotation cache**: one table per chromosome, swapped on chromosome change
//! - **Hearing-loss and coverage stores**: a second curated source, and run-length coverage classes
//! - **Versioned archives**: bincode envelopes compressed with gzip or zstd
//!
//! ## Example
//!
//! ```rust,no_run
//! use allele_store::{Database, DatabaseLayout, Lookup, StoreConfig};
//! use std::path::Path;
//!
//! let config = StoreConfig::default();
//! let layout = DatabaseLayout::under(Path::new("db"));
//! let mut db = Database::open(&layout, &config).unwrap();
//!
//! let report = db.lookup("chr1", 16103, "T", "G").unwrap();
//! if let Some(Lookup::Found(af)) = report.frequency {
//!     println!("allele frequency {af}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Chromosomes, allele keys, the packed status codec
//! - [`index`]: Position, id and transcript-coordinate indices
//! - [`store`]: The six stores and the database layout
//! - [`archive`]: Archive envelope and compression backends
//! - [`parsing`]: VCF records, annotation payload layout and coverage summaries
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP lookup service

pub mod archive;
pub mod cli;
pub mod config;
pub mod core;
pub mod index;
pub mod parsing;
pub mod store;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use config::StoreConfig;
pub use core::allele::{AlleleKey, IngestRecord, VariantShape};
pub use core::chrom::ChromIndex;
pub use core::status::{CompactStatus, CoverageClass, FrequencyBucket, HomozygoteBucket};
pub use core::types::*;
pub use store::layout::{Database, DatabaseLayout, VariantReport};
pub use store::StoreError;
