//! HTTP lookup service over an opened database.
//!
//! ## Starting the Server
//!
//! ```text
//! # Serve ./db on the default port 8080
//! allele-store serve --database db
//!
//! # Bind to all interfaces
//! allele-store serve --database db --address 0.0.0.0 --port 3000
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /api/lookup?chrom=1&pos=16103&ref=T&alt=G` - Look up one allele in every store
//! - `GET /api/info` - Source version and build time of each store

pub mod server;
