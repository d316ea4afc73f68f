//! Core coordinate and codec types shared by every store.
//!
//! - [`chrom`]: the 24 accepted chromosomes and their dense indices
//! - [`allele`]: normalized allele keys and the indel placeholder convention
//! - [`status`]: the one-byte packed population status and the coverage ladder
//! - [`types`]: query outcomes and archive provenance
//!
//! ## Chromosome Naming
//!
//! | Input | Index |
//! |-------|-------|
//! | `1` or `chr1` | 0 |
//! | `22` or `chr22` | 21 |
//! | `X` or `chrX` | 22 |
//! | `Y` or `chrY` | 23 |
//!
//! Anything else (`MT`, alt contigs, lower-case `chrx`) is rejected.

pub mod allele;
pub mod chrom;
pub mod status;
pub mod types;
