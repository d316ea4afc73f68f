//! Centralized validation of allele strings, positions and query input.

use crate::core::allele::{IngestRecord, INDEL_PLACEHOLDER};

/// Longest allele accepted from query input (HTTP and CLI)
pub const MAX_QUERY_ALLELE_LENGTH: usize = 1_000;

/// Validation error types for query input
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Position must be 1-based (got {0})")]
    InvalidPosition(u64),
    #[error("Invalid allele `{0}`: expected A, C, G, T, N or `-`")]
    InvalidAllele(String),
    #[error("Allele too long: exceeds {MAX_QUERY_ALLELE_LENGTH} bases")]
    AlleleTooLong,
}

/// Check that an allele is `-` or a non-empty run of `ACGTN` (either case).
///
/// # Examples
///
/// ```
/// use allele_store::utils::validation::is_valid_allele;
///
/// assert!(is_valid_allele("AGAG"));
/// assert!(is_valid_allele("-"));
/// assert!(is_valid_allele("acgtn"));
/// assert!(!is_valid_allele(""));
/// assert!(!is_valid_allele("<DEL>"));
/// ```
#[must_use]
pub fn is_valid_allele(allele: &str) -> bool {
    allele == INDEL_PLACEHOLDER
        || (!allele.is_empty()
            && allele
                .bytes()
                .all(|b| matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N')))
}

#[must_use]
pub fn is_valid_position(position: u64) -> bool {
    position > 0 && u32::try_from(position).is_ok()
}

/// Reason a source record cannot be stored, or `None` if it can.
///
/// Build pipelines skip such records instead of aborting.
#[must_use]
pub fn invalid_record_reason(record: &IngestRecord) -> Option<String> {
    if !is_valid_position(u64::from(record.position)) {
        return Some(format!("position {} is not 1-based", record.position));
    }
    if !is_valid_allele(&record.reference) {
        return Some(format!("invalid REF `{}`", record.reference));
    }
    if !is_valid_allele(&record.alternate) {
        return Some(format!("invalid ALT `{}`", record.alternate));
    }
    if record.reference == INDEL_PLACEHOLDER && record.alternate == INDEL_PLACEHOLDER {
        return Some("REF and ALT are both `-`".to_string());
    }
    None
}

/// Validate one query, returning the position narrowed to `u32`.
///
/// Alleles are upper-cased so that lookups match stored sequences.
///
/// # Errors
///
/// Returns a `ValidationError` describing the first invalid field.
pub fn validate_query(
    position: u64,
    reference: &str,
    alternate: &str,
) -> Result<(u32, String, String), ValidationError> {
    let narrowed = u32::try_from(position)
        .ok()
        .filter(|p| *p > 0)
        .ok_or(ValidationError::InvalidPosition(position))?;
    for allele in [reference, alternate] {
        if allele.len() > MAX_QUERY_ALLELE_LENGTH {
            return Err(ValidationError::AlleleTooLong);
        }
        if !is_valid_allele(allele) {
            return Err(ValidationError::InvalidAllele(allele.to_string()));
        }
    }
    Ok((
        narrowed,
        reference.to_ascii_uppercase(),
        alternate.to_ascii_uppercase(),
    ))
}
