//! Functional-annotation payload layout.
//!
//! An annotation payload (the `CSQ` INFO value) is a comma-separated list of
//! per-transcript entries, each a `|`-separated row whose columns are named by
//! the `Format: ` suffix of the `CSQ` INFO description:
//!
//! ```text
//! ##INFO=<ID=CSQ,...,Description="Consequence annotations from Ensembl VEP. Format: Allele|Consequence|Feature">
//! CSQ=T|missense_variant|ENST0001,T|intron_variant|ENST0002
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::parsing::ParseError;

const FORMAT_MARKER: &str = "Format: ";

/// Ordered annotation field names with a name -> column map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsqLayout {
    fields: Vec<String>,
    columns: HashMap<String, usize>,
}

impl CsqLayout {
    #[must_use]
    pub fn from_fields(fields: Vec<String>) -> Self {
        let columns = fields
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { fields, columns }
    }

    /// Parse the layout from a `CSQ` INFO description.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingHeader` if the description has no `Format: ` list.
    pub fn from_description(description: &str) -> Result<Self, ParseError> {
        let (_, format) = description.split_once(FORMAT_MARKER).ok_or_else(|| {
            ParseError::MissingHeader(format!(
                "annotation description has no `{FORMAT_MARKER}` field list"
            ))
        })?;
        Ok(Self::from_fields(
            format.trim().split('|').map(str::to_string).collect(),
        ))
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Split a payload into per-transcript entries
    pub fn entries<'a>(&'a self, payload: &'a str) -> impl Iterator<Item = CsqEntry<'a>> + 'a {
        payload
            .split(',')
            .filter(|entry| !entry.is_empty())
            .map(move |entry| CsqEntry {
                layout: self,
                values: entry.split('|').collect(),
            })
    }
}

/// One transcript row of an annotation payload
#[derive(Debug, Clone)]
pub struct CsqEntry<'a> {
    layout: &'a CsqLayout,
    values: Vec<&'a str>,
}

impl<'a> CsqEntry<'a> {
    /// Column value by field name; empty columns are `None`
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'a str> {
        let idx = self.layout.column(name)?;
        self.values.get(idx).copied().filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn values(&self) -> &[&'a str] {
        &self.values
    }
}

/// Parse a coding or protein position column.
///
/// Accepts `12`, `12-13` (first wins) and `?-13` / `12-?` (the known side wins).
#[must_use]
pub fn parse_vep_position(value: &str) -> Option<u32> {
    let (first, second) = value.split_once('-').unwrap_or((value, ""));
    if first != "?" && !first.is_empty() {
        return first.parse().ok();
    }
    second.parse().ok()
}

/// Strip the version suffix from a transcript or gene id; `-` means none
#[must_use]
pub fn feature_normalize(feature: &str) -> &str {
    if feature == "-" {
        return "";
    }
    feature.split_once('.').map_or(feature, |(stem, _)| stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str =
        "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|Feature|CDS_position|Protein_position";

    #[test]
    fn test_layout_from_description() {
        let layout = CsqLayout::from_description(DESCRIPTION).unwrap();
        assert_eq!(layout.fields().len(), 5);
        assert_eq!(layout.column("Feature"), Some(2));
        assert_eq!(layout.column("SIFT"), None);
        assert!(CsqLayout::from_description("no layout here").is_err());
    }

    #[test]
    fn test_entries_and_fields() {
        let layout = CsqLayout::from_description(DESCRIPTION).unwrap();
        let payload = "T|missense_variant|NM_000546.6|818|273,T|intron_variant|ENST0001||";
        let entries: Vec<_> = layout.entries(payload).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field("Consequence"), Some("missense_variant"));
        assert_eq!(entries[0].field("CDS_position"), Some("818"));
        assert_eq!(entries[1].field("CDS_position"), None);
        assert_eq!(entries[1].field("Unknown"), None);
    }

    #[test]
    fn test_parse_vep_position_forms() {
        assert_eq!(parse_vep_position("12"), Some(12));
        assert_eq!(parse_vep_position("12-13"), Some(12));
        assert_eq!(parse_vep_position("?-13"), Some(13));
        assert_eq!(parse_vep_position("12-?"), Some(12));
        assert_eq!(parse_vep_position(""), None);
        assert_eq!(parse_vep_position("?-?"), None);
        assert_eq!(parse_vep_position("abc"), None);
    }

    #[test]
    fn test_feature_normalize() {
        assert_eq!(feature_normalize("NM_000546.6"), "NM_000546");
        assert_eq!(feature_normalize("ENST00000269305"), "ENST00000269305");
        assert_eq!(feature_normalize("-"), "");
    }
}
