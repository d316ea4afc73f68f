//! In-memory index structures shared by the stores.
//!
//! - [`position`]: per-chromosome `(position, payload)` columns with duplicate-aware lookup
//! - [`tables`]: separate SNP / insertion / deletion columns for population data
//! - [`order`]: streaming check that a source is position-ascending
//! - [`cross`]: id and transcript-coordinate indices over a built position index

pub mod cross;
pub mod order;
pub mod position;
pub mod tables;
