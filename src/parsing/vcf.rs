//! Line-oriented VCF reader.
//!
//! Reads the `##` meta lines and the `#CHROM` line up front, then yields one
//! [`IngestRecord`] per alternate allele. Multi-allelic rows are split, and
//! INFO values declared `Number=A` or `Number=R` are narrowed to the allele
//! being emitted. Spanning deletions (`*`) and missing alternates (`.`) are
//! dropped.

use std::collections::{HashMap, VecDeque};
use std::io::BufRead;
use std::path::Path;

use crate::core::allele::IngestRecord;
use crate::parsing::{open_text, ParseError};

/// Source version used when a header declares none
pub const UNKNOWN_VERSION: &str = "None";

/// Declaration of one INFO key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDefinition {
    pub number: String,
    pub description: String,
}

/// Everything before the first data line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcfHeader {
    /// Unstructured `##key=value` lines in file order
    pub meta: Vec<(String, String)>,
    pub info: HashMap<String, InfoDefinition>,
    pub samples: Vec<String>,
}

impl VcfHeader {
    #[must_use]
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn info_description(&self, id: &str) -> Option<&str> {
        self.info.get(id).map(|d| d.description.as_str())
    }

    /// Version of the data set: `##VEP` if present, else `##fileDate`
    #[must_use]
    pub fn source_version(&self) -> String {
        self.meta_value("VEP")
            .map(|v| v.split_whitespace().next().unwrap_or(v).trim_matches('"'))
            .or_else(|| self.meta_value("fileDate"))
            .unwrap_or(UNKNOWN_VERSION)
            .to_string()
    }

    fn push_meta_line(&mut self, line: &str) {
        let Some((key, value)) = line.trim_start_matches("##").split_once('=') else {
            return;
        };
        if key == "INFO" {
            if let Some((id, definition)) = parse_info_line(value) {
                self.info.insert(id, definition);
            }
        } else {
            self.meta.push((key.to_string(), value.to_string()));
        }
    }
}

fn parse_info_line(value: &str) -> Option<(String, InfoDefinition)> {
    let content = value.strip_prefix('<')?.strip_suffix('>')?;
    let mut id = None;
    let mut number = String::from(".");
    let mut description = String::new();
    for part in split_structured_fields(content) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "ID" => id = Some(value.to_string()),
                "Number" => number = value.to_string(),
                "Description" => description = value.to_string(),
                _ => {}
            }
        }
    }
    Some((id?, InfoDefinition { number, description }))
}

/// Split `key=value` pairs on commas that are not inside double quotes.
fn split_structured_fields(content: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in content.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&content[start..]);
    fields
}

/// Streaming VCF reader
pub struct VcfReader<R> {
    reader: R,
    header: VcfHeader,
    line_number: usize,
    line: String,
    pending: VecDeque<IngestRecord>,
}

impl VcfReader<Box<dyn BufRead>> {
    /// Open a plain or gzip-compressed VCF.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read or
    /// `ParseError::MissingHeader` if it has no `#CHROM` line.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        Self::new(open_text(path)?)
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Read the header from `reader`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingHeader` if the stream ends before `#CHROM`.
    pub fn new(reader: R) -> Result<Self, ParseError> {
        let mut this = Self {
            reader,
            header: VcfHeader::default(),
            line_number: 0,
            line: String::new(),
            pending: VecDeque::new(),
        };
        this.read_header()?;
        Ok(this)
    }

    #[must_use]
    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// One-based number of the last line read
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn next_line(&mut self) -> Result<bool, ParseError> {
        self.line.clear();
        let read = self.reader.read_line(&mut self.line)?;
        if read > 0 {
            self.line_number += 1;
            let trimmed = self.line.trim_end_matches(['\n', '\r']).len();
            self.line.truncate(trimmed);
        }
        Ok(read > 0)
    }

    fn read_header(&mut self) -> Result<(), ParseError> {
        while self.next_line()? {
            if self.line.starts_with("##") {
                let line = std::mem::take(&mut self.line);
                self.header.push_meta_line(&line);
            } else if let Some(columns) = self.line.strip_prefix("#CHROM") {
                self.header.samples = columns.split('\t').skip(9).map(str::to_string).collect();
                return Ok(());
            } else {
                break;
            }
        }
        Err(ParseError::MissingHeader(
            "no #CHROM line before the first record".to_string(),
        ))
    }

    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::InvalidFormat {
            line: self.line_number,
            message: message.into(),
        }
    }

    fn parse_line(&self) -> Result<Vec<IngestRecord>, ParseError> {
        let cols: Vec<&str> = self.line.split('\t').collect();
        if cols.len() < 8 {
            return Err(self.invalid(format!("expected at least 8 columns, found {}", cols.len())));
        }
        let position: u32 = cols[1]
            .parse()
            .map_err(|_| self.invalid(format!("invalid POS `{}`", cols[1])))?;
        let id = (cols[2] != ".").then(|| cols[2].to_string());
        let filters: Vec<String> = cols[6]
            .split(';')
            .filter(|f| !f.is_empty() && *f != "." && *f != "PASS")
            .map(str::to_string)
            .collect();

        let alternates: Vec<&str> = cols[4].split(',').collect();
        let info: Vec<(&str, &str)> = if cols[7] == "." {
            Vec::new()
        } else {
            cols[7]
                .split(';')
                .filter(|kv| !kv.is_empty())
                .map(|kv| kv.split_once('=').unwrap_or((kv, "")))
                .collect()
        };

        let records = alternates
            .iter()
            .enumerate()
            .filter(|(_, alt)| **alt != "." && **alt != "*")
            .map(|(allele, alt)| IngestRecord {
                chromosome: cols[0].to_string(),
                position,
                id: id.clone(),
                reference: cols[3].to_string(),
                alternate: (*alt).to_string(),
                filters: filters.clone(),
                info: info
                    .iter()
                    .map(|(k, v)| {
                        let value = self.allele_value(k, v, allele, alternates.len());
                        ((*k).to_string(), value.to_string())
                    })
                    .collect(),
            })
            .collect();
        Ok(records)
    }

    /// Narrow a per-allele INFO value to `allele`
    fn allele_value<'v>(&self, key: &str, value: &'v str, allele: usize, alt_count: usize) -> &'v str {
        if alt_count < 2 {
            return value;
        }
        let offset = match self.header.info.get(key).map(|d| d.number.as_str()) {
            Some("A") => allele,
            Some("R") => allele + 1,
            _ => return value,
        };
        value.split(',').nth(offset).unwrap_or(value)
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<IngestRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            match self.next_line() {
                Ok(false) => return None,
                Ok(true) if self.line.is_empty() => {}
                Ok(true) => match self.parse_line() {
                    Ok(records) => self.pending.extend(records),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const VCF: &str = "##fileformat=VCFv4.2
##fileDate=20240301
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Allele Number\">
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|Feature\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t16103\trs1\tT\tG\t.\tPASS\tAF=0.02;AN=20000
chr1\t91551\t.\tC\tCT,CTT\t.\tAC0;AS_VQSR\tAF=0.07,0.01;AN=30000;DB
2\t10\t.\tA\t*\t.\t.\t.
";

    fn reader(text: &str) -> VcfReader<Cursor<Vec<u8>>> {
        VcfReader::new(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_header_metadata() {
        let vcf = reader(VCF);
        let header = vcf.header();
        assert_eq!(header.source_version(), "20240301");
        assert_eq!(header.info["AF"].number, "A");
        assert!(header
            .info_description("CSQ")
            .unwrap()
            .ends_with("Format: Allele|Consequence|Feature"));
    }

    #[test]
    fn test_records_split_per_allele() {
        let records: Vec<_> = reader(VCF).map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].id.as_deref(), Some("rs1"));
        assert!(records[0].filters.is_empty());

        assert_eq!(records[1].alternate, "CT");
        assert_eq!(records[1].info("AF"), Some("0.07"));
        assert_eq!(records[2].alternate, "CTT");
        assert_eq!(records[2].info("AF"), Some("0.01"));
        assert_eq!(records[2].info("AN"), Some("30000"));
        assert_eq!(records[2].info("DB"), Some(""));
        assert_eq!(records[2].filters, vec!["AC0", "AS_VQSR"]);
    }

    #[test]
    fn test_vep_version_preferred() {
        let text = "##fileDate=20200101\n##VEP=\"v110\" time=\"2024\"\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        assert_eq!(reader(text).header().source_version(), "v110");
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        assert_eq!(reader(text).header().source_version(), UNKNOWN_VERSION);
    }

    #[test]
    fn test_missing_header() {
        let result = VcfReader::new(Cursor::new(b"1\t10\t.\tA\tG\t.\t.\t.\n".to_vec()));
        assert!(matches!(result, Err(ParseError::MissingHeader(_))));
    }

    #[test]
    fn test_invalid_position_reports_line() {
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\tabc\t.\tA\tG\t.\t.\t.\n";
        let err = reader(text).next().unwrap().unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat { line: 2, .. }));
    }

    #[test]
    fn test_gzip_input() {
        use flate2::write::GzEncoder;
        use std::fs::File;
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("in.vcf.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), flate2::Compression::default());
        encoder.write_all(VCF.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let records: Vec<_> = VcfReader::open(&path).unwrap().map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_split_structured_fields() {
        let fields = split_structured_fields(r#"ID=X,Description="a, b",Number=1"#);
        assert_eq!(fields, vec!["ID=X", r#"Description="a, b""#, "Number=1"]);
    }
}
