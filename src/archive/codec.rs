//! Compression backends and the raw compress/decompress pass-through.

use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::ArchiveError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Block compressor wrapped around every archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Gzip,
    #[default]
    Zstd,
}

impl Backend {
    /// Identify the backend from the first bytes of a stream
    #[must_use]
    pub fn detect(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(&ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else if magic.starts_with(&GZIP_MAGIC) {
            Some(Self::Gzip)
        } else {
            None
        }
    }

    #[must_use]
    pub fn default_level(self) -> i32 {
        match self {
            Self::Gzip => 6,
            Self::Zstd => 3,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gzip => write!(f, "gzip"),
            Self::Zstd => write!(f, "zstd"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(ArchiveError::UnknownBackend(s.to_string())),
        }
    }
}

/// Backend plus level used when writing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compression {
    pub backend: Backend,
    pub level: Option<i32>,
}

impl Compression {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            level: None,
        }
    }

    #[must_use]
    pub fn level(&self) -> i32 {
        self.level.unwrap_or_else(|| self.backend.default_level())
    }
}

/// Streaming compressor over either backend
pub enum Compressor<W: Write> {
    Gzip(GzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> Compressor<W> {
    /// # Errors
    ///
    /// Returns an I/O error if the zstd context cannot be created.
    pub fn new(inner: W, compression: Compression) -> io::Result<Self> {
        Ok(match compression.backend {
            Backend::Gzip => {
                #[allow(clippy::cast_sign_loss)]
                let level = compression.level().clamp(0, 9) as u32;
                Self::Gzip(GzEncoder::new(inner, flate2::Compression::new(level)))
            }
            Backend::Zstd => Self::Zstd(zstd::stream::write::Encoder::new(
                inner,
                compression.level(),
            )?),
        })
    }

    /// Write the trailer and hand back the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the trailer cannot be written.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Gzip(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.flush(),
            Self::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// Wrap `reader` in the decompressor its magic bytes name.
///
/// # Errors
///
/// Returns `ArchiveError::UnrecognizedFormat` if the stream starts with neither
/// magic, or an I/O error if it cannot be read.
pub fn decompressor<R: BufRead + 'static>(
    mut reader: R,
    origin: &Path,
) -> Result<(Backend, Box<dyn Read>), ArchiveError> {
    let magic = reader.fill_buf()?;
    match Backend::detect(magic) {
        Some(Backend::Gzip) => Ok((Backend::Gzip, Box::new(MultiGzDecoder::new(reader)))),
        Some(Backend::Zstd) => Ok((
            Backend::Zstd,
            Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        )),
        None => Err(ArchiveError::UnrecognizedFormat(origin.to_path_buf())),
    }
}

/// Compress a file byte-for-byte, independent of any archive envelope.
///
/// # Errors
///
/// Returns an I/O error if either file cannot be accessed.
pub fn compress(input: &Path, output: &Path, compression: Compression) -> Result<u64, ArchiveError> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut encoder = Compressor::new(BufWriter::new(File::create(output)?), compression)?;
    let copied = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(copied)
}

/// Decompress a gzip or zstd file, detecting the backend from its header.
///
/// # Errors
///
/// Returns `ArchiveError::UnrecognizedFormat` if the input is not compressed
/// with a known backend.
pub fn decompress(input: &Path, output: &Path) -> Result<(Backend, u64), ArchiveError> {
    let (backend, mut reader) = decompressor(BufReader::new(File::open(input)?), input)?;
    let mut writer = BufWriter::new(File::create(output)?);
    let copied = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok((backend, copied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_magic() {
        assert_eq!(Backend::detect(&[0x1f, 0x8b, 0x08]), Some(Backend::Gzip));
        assert_eq!(Backend::detect(&ZSTD_MAGIC), Some(Backend::Zstd));
        assert_eq!(Backend::detect(b"##fileformat"), None);
        assert_eq!(Backend::detect(&[]), None);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("GZIP".parse::<Backend>().unwrap(), Backend::Gzip);
        assert_eq!("zst".parse::<Backend>().unwrap(), Backend::Zstd);
        assert!(matches!(
            "lz4".parse::<Backend>(),
            Err(ArchiveError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_pass_through_both_backends() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        let payload = "chr1\t16103\tT\tG\n".repeat(500);
        std::fs::write(&plain, &payload).unwrap();

        for backend in [Backend::Gzip, Backend::Zstd] {
            let packed = dir.path().join(format!("packed.{backend}"));
            let unpacked = dir.path().join(format!("unpacked.{backend}"));
            compress(&plain, &packed, Compression::new(backend)).unwrap();
            let (detected, bytes) = decompress(&packed, &unpacked).unwrap();

            assert_eq!(detected, backend);
            assert_eq!(bytes as usize, payload.len());
            assert_eq!(std::fs::read_to_string(&unpacked).unwrap(), payload);
        }
    }

    #[test]
    fn test_decompress_rejects_plain_input() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, "not compressed").unwrap();
        let result = decompress(&plain, &dir.path().join("out"));
        assert!(matches!(result, Err(ArchiveError::UnrecognizedFormat(_))));
    }
}
