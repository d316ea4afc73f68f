//! Versioned, compressed on-disk archives.
//!
//! An archive file is one compressed stream holding a bincode-encoded
//! [`ArchiveHeader`] followed by the bincode-encoded store value:
//!
//! ```text
//! [gzip | zstd] ( header { format_version, kind, info } | value )
//! ```
//!
//! The backend is recognized from the stream's magic bytes, so readers never
//! need to be told which compressor wrote a file. Writes go to a temporary
//! file in the destination directory and are renamed into place when
//! complete, so a reader never observes a partially written archive.

pub mod codec;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::types::BuildInfo;

pub use codec::{compress, decompress, Backend, Compression};

/// Envelope version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// File extension used for every archive
pub const ARCHIVE_EXTENSION: &str = "arc";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode archive: {0}")]
    Encode(#[source] bincode::Error),

    #[error("Corrupt archive {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("Corrupt archive {0}: not a gzip or zstd stream")]
    UnrecognizedFormat(PathBuf),

    #[error("Archive {path} has format version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("Archive {path} holds a `{found}` store, expected `{expected}`")]
    KindMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    #[error("Corrupt archive {path}: {message}")]
    InvalidContent { path: PathBuf, message: String },

    #[error("Unknown compression backend: `{0}` (expected gzip or zstd)")]
    UnknownBackend(String),
}

impl ArchiveError {
    /// True for the errors that mean the file exists but cannot be trusted
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::UnrecognizedFormat(_)
                | Self::VersionMismatch { .. }
                | Self::KindMismatch { .. }
                | Self::InvalidContent { .. }
        )
    }
}

/// A value that can be persisted as an archive
pub trait Archived: Serialize + DeserializeOwned {
    /// Tag written into the header and checked on load
    const KIND: &'static str;
}

/// Leading record of every archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHeader {
    pub format_version: u32,
    pub kind: String,
    pub info: BuildInfo,
}

/// Serialize `value` and write it atomically to `path`.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns `ArchiveError::Io` if the file cannot be written or
/// `ArchiveError::Encode` if serialization fails.
pub fn save<T: Archived>(
    path: &Path,
    value: &T,
    info: &BuildInfo,
    compression: Compression,
) -> Result<(), ArchiveError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let header = ArchiveHeader {
        format_version: FORMAT_VERSION,
        kind: T::KIND.to_string(),
        info: info.clone(),
    };

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut encoder = codec::Compressor::new(BufWriter::new(temp.reopen()?), compression)?;
    bincode::serialize_into(&mut encoder, &header).map_err(ArchiveError::Encode)?;
    bincode::serialize_into(&mut encoder, value).map_err(ArchiveError::Encode)?;
    encoder.finish()?.flush()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(
        "Wrote {} archive {} ({})",
        T::KIND,
        path.display(),
        compression.backend
    );
    Ok(())
}

fn open(path: &Path) -> Result<Box<dyn Read>, ArchiveError> {
    let file = File::open(path)?;
    let (_, reader) = codec::decompressor(BufReader::new(file), path)?;
    Ok(reader)
}

fn decode_header(reader: &mut dyn Read, path: &Path) -> Result<ArchiveHeader, ArchiveError> {
    let header: ArchiveHeader =
        bincode::deserialize_from(reader).map_err(|source| ArchiveError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    if header.format_version != FORMAT_VERSION {
        return Err(ArchiveError::VersionMismatch {
            path: path.to_path_buf(),
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(header)
}

/// Read only the header of an archive.
///
/// # Errors
///
/// Returns an error if the file is missing, not compressed, or its header
/// cannot be decoded.
pub fn read_header(path: &Path) -> Result<ArchiveHeader, ArchiveError> {
    let mut reader = open(path)?;
    decode_header(&mut reader, path)
}

/// Load an archive written by [`save`].
///
/// # Errors
///
/// Returns `ArchiveError::Io` if the file cannot be opened, or one of the
/// corrupt-archive variants if its content does not decode as a `T`.
pub fn load<T: Archived>(path: &Path) -> Result<(ArchiveHeader, T), ArchiveError> {
    let mut reader = open(path)?;
    let header = decode_header(&mut reader, path)?;
    if header.kind != T::KIND {
        return Err(ArchiveError::KindMismatch {
            path: path.to_path_buf(),
            found: header.kind,
            expected: T::KIND,
        });
    }
    let value: T = bincode::deserialize_from(&mut reader).map_err(|source| ArchiveError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((header, value))
}

/// `{dir}/{stem}.arc`
#[must_use]
pub fn archive_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{ARCHIVE_EXTENSION}"))
}
