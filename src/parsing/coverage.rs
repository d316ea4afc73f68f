//! Per-base coverage summary reader.
//!
//! The input is a tab-separated table with a header line. Two layouts are
//! recognized by their header:
//!
//! - `locus` holding `chrom:pos`, as in current gnomAD releases
//! - separate `chrom` and `pos` columns, as in older releases
//!
//! Both need `mean` (mean depth) and `over_20` (fraction of samples above
//! 20x) columns. Other columns are ignored.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::parsing::{open_text, ParseError};

pub const MEAN_COLUMN: &str = "mean";
pub const OVER_20_COLUMN: &str = "over_20";

const RELEASE_MARKER: &str = "release/";

/// One row of a coverage summary
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub chromosome: String,
    pub position: u32,
    pub mean: f64,
    /// Fraction of samples covered above 20x
    pub over_20: f64,
}

#[derive(Debug, Clone, Copy)]
enum Locus {
    Joined(usize),
    Split { chrom: usize, pos: usize },
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    locus: Locus,
    mean: usize,
    over_20: usize,
}

impl Columns {
    fn from_header(line: &str) -> Result<Self, ParseError> {
        let index: HashMap<&str, usize> = line
            .split('\t')
            .enumerate()
            .map(|(i, name)| (name.trim_start_matches('#'), i))
            .collect();
        let column = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ParseError::MissingHeader(format!("no `{name}` column")))
        };
        let locus = match index.get("locus") {
            Some(&i) => Locus::Joined(i),
            None => Locus::Split {
                chrom: column("chrom")?,
                pos: column("pos")?,
            },
        };
        Ok(Self {
            locus,
            mean: column(MEAN_COLUMN)?,
            over_20: column(OVER_20_COLUMN)?,
        })
    }
}

/// Release name from a `.../release/<name>/...` source path
#[must_use]
pub fn coverage_release(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    let start = text.find(RELEASE_MARKER)? + RELEASE_MARKER.len();
    let rest = &text[start..];
    let name = rest.split('/').next().unwrap_or(rest);
    (!name.is_empty()).then(|| name.to_string())
}

/// Streaming coverage summary reader
pub struct CoverageReader<R> {
    reader: R,
    columns: Columns,
    line_number: usize,
    line: String,
}

impl CoverageReader<Box<dyn BufRead>> {
    /// Open a plain or gzip-compressed coverage summary.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read or
    /// `ParseError::MissingHeader` if a required column is absent.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        Self::new(open_text(path)?)
    }
}

impl<R: BufRead> CoverageReader<R> {
    /// Read the header line from `reader`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingHeader` for an empty stream or a header
    /// without the required columns.
    pub fn new(mut reader: R) -> Result<Self, ParseError> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(ParseError::MissingHeader("empty coverage file".to_string()));
        }
        let columns = Columns::from_header(line.trim_end_matches(['\n', '\r']))?;
        Ok(Self {
            reader,
            columns,
            line_number: 1,
            line: String::new(),
        })
    }

    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::InvalidFormat {
            line: self.line_number,
            message: message.into(),
        }
    }

    fn parse_line(&self) -> Result<CoverageRow, ParseError> {
        let cols: Vec<&str> = self.line.split('\t').collect();
        let col = |i: usize| {
            cols.get(i)
                .copied()
                .ok_or_else(|| self.invalid(format!("missing column {}", i + 1)))
        };
        let number = |i: usize| -> Result<f64, ParseError> {
            let text = col(i)?;
            text.parse()
                .map_err(|_| self.invalid(format!("invalid number `{text}`")))
        };

        let (chromosome, position) = match self.columns.locus {
            Locus::Joined(i) => {
                let locus = col(i)?;
                locus
                    .rsplit_once(':')
                    .ok_or_else(|| self.invalid(format!("invalid locus `{locus}`")))?
            }
            Locus::Split { chrom, pos } => (col(chrom)?, col(pos)?),
        };
        let position = position
            .parse()
            .map_err(|_| self.invalid(format!("invalid position `{position}`")))?;

        Ok(CoverageRow {
            chromosome: chromosome.to_string(),
            position,
            mean: number(self.columns.mean)?,
            over_20: number(self.columns.over_20)?,
        })
    }
}

impl<R: BufRead> Iterator for CoverageReader<R> {
    type Item = Result<CoverageRow, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = self.line.trim_end_matches(['\n', '\r']).len();
                    self.line.truncate(trimmed);
                    if !self.line.is_empty() {
                        return Some(self.parse_line());
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
