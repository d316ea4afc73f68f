//! Readers that turn source files into [`IngestRecord`](crate::core::allele::IngestRecord)s.
//!
//! - **VCF** (plain, gzip or bgzip): header metadata plus one record per
//!   alternate allele, see [`vcf`]
//! - **Annotation format strings**: the `|`-separated field layout declared
//!   in a `CSQ` INFO description, see [`csq`]
//! - **Coverage summaries**: per-base depth TSVs, see [`coverage`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use allele_store::parsing::vcf::VcfReader;
//! use std::path::Path;
//!
//! let reader = VcfReader::open(Path::new("clinvar.vcf.gz")).unwrap();
//! println!("source version: {}", reader.header().source_version());
//! for record in reader {
//!     let record = record.unwrap();
//!     println!("{}:{} {}>{}", record.chromosome, record.position, record.reference, record.alternate);
//! }
//! ```

use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

pub mod coverage;
pub mod csq;
pub mod vcf;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a plain, gzip or bgzip text file for line reading.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or read.
pub fn open_text(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let mut file = BufReader::new(File::open(path)?);
    if file.fill_buf()?.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Missing header: {0}")]
    MissingHeader(String),
}
