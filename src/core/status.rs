//! Bit-packed allele status used by the population stores.
//!
//! One status byte holds three fields:
//!
//! | Bits | Field | Values |
//! |------|-------|--------|
//! | 0-1  | substituted base | A=0, T=1, C=2, G=3 |
//! | 2-5  | frequency bucket | 0..=8, see [`FrequencyBucket`] |
//! | 6-7  | homozygote bucket | 0, 1, 2+ |
//!
//! Insertions and deletions keep their inserted/deleted sequence in a separate
//! column, so only the frequency and homozygote fields of their byte are used.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid base `{0}`: expected one of A, T, C, G")]
    InvalidBase(char),

    #[error("Unrecognized frequency bucket code {0} in status byte")]
    UnknownFrequencyCode(u8),

    #[error("Unrecognized homozygote bucket code {0} in status byte")]
    UnknownHomozygoteCode(u8),

    #[error("Unrecognized coverage class code {0}")]
    UnknownCoverageCode(u8),
}

/// Substituted base of a SNP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Base {
    A,
    T,
    C,
    G,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::T, Base::C, Base::G];

    /// Parse an upper-case nucleotide.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidBase` for anything outside A/T/C/G.
    pub fn from_ascii(byte: u8) -> Result<Self, CodecError> {
        match byte {
            b'A' => Ok(Self::A),
            b'T' => Ok(Self::T),
            b'C' => Ok(Self::C),
            b'G' => Ok(Self::G),
            other => Err(CodecError::InvalidBase(other as char)),
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::T => 'T',
            Self::C => 'C',
            Self::G => 'G',
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::A => 0b00,
            Self::T => 0b01,
            Self::C => 0b10,
            Self::G => 0b11,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::A,
            0b01 => Self::T,
            0b10 => Self::C,
            _ => Self::G,
        }
    }
}

impl std::fmt::Display for Base {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<u8> for Base {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_ascii(value)
    }
}

impl From<Base> for u8 {
    fn from(value: Base) -> Self {
        value.as_char() as u8
    }
}

/// Allele-frequency bucket.
///
/// Codes 3 through 8 are ordered by frequency: a lower code never means a
/// higher frequency than a higher code. Codes 0 through 2 carry no frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBucket {
    /// Not present in the source, or present only with a skip filter
    Absent = 0,
    /// Present but failed quality filtering
    Filtered = 1,
    /// Allele number below the coverage threshold
    LowCoverage = 2,
    /// Below the first frequency bound
    Rare = 3,
    Bucket4 = 4,
    Bucket5 = 5,
    Bucket6 = 6,
    Bucket7 = 7,
    /// At or above the last frequency bound
    Common = 8,
}

impl FrequencyBucket {
    pub const ALL: [FrequencyBucket; 9] = [
        Self::Absent,
        Self::Filtered,
        Self::LowCoverage,
        Self::Rare,
        Self::Bucket4,
        Self::Bucket5,
        Self::Bucket6,
        Self::Bucket7,
        Self::Common,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a 4-bit bucket code.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownFrequencyCode` for codes 9..=15.
    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(CodecError::UnknownFrequencyCode(code))
    }

    /// True for buckets that carry an observed frequency
    #[must_use]
    pub fn has_frequency(self) -> bool {
        self >= Self::Rare
    }
}

/// Number of homozygous individuals, saturating at two
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomozygoteBucket {
    None = 0,
    One = 1,
    TwoOrMore = 2,
}

impl HomozygoteBucket {
    #[must_use]
    pub fn from_count(count: u64) -> Self {
        match count {
            0 => Self::None,
            1 => Self::One,
            _ => Self::TwoOrMore,
        }
    }

    /// Decode a 2-bit bucket code.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownHomozygoteCode` for code 3.
    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::One),
            2 => Ok(Self::TwoOrMore),
            other => Err(CodecError::UnknownHomozygoteCode(other)),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

const FREQUENCY_SHIFT: u8 = 2;
const FREQUENCY_MASK: u8 = 0b0011_1100;
const HOMOZYGOTE_SHIFT: u8 = 6;

/// Decoded form of a status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactStatus {
    pub base: Base,
    pub frequency: FrequencyBucket,
    pub homozygotes: HomozygoteBucket,
}

impl CompactStatus {
    #[must_use]
    pub fn new(base: Base, frequency: FrequencyBucket, homozygotes: HomozygoteBucket) -> Self {
        Self {
            base,
            frequency,
            homozygotes,
        }
    }

    #[must_use]
    pub fn encode(&self) -> u8 {
        self.base.bits()
            | ((self.frequency.code() << FREQUENCY_SHIFT) & FREQUENCY_MASK)
            | (self.homozygotes.code() << HOMOZYGOTE_SHIFT)
    }

    /// Base field of a status byte; every 2-bit value is a valid base
    #[must_use]
    pub fn packed_base(byte: u8) -> Base {
        Base::from_bits(byte)
    }

    /// Decode a status byte.
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if the frequency or homozygote field holds an
    /// unassigned code. Never maps an unknown code to a default.
    pub fn decode(byte: u8) -> Result<Self, CodecError> {
        Ok(Self {
            base: Base::from_bits(byte),
            frequency: FrequencyBucket::from_code((byte & FREQUENCY_MASK) >> FREQUENCY_SHIFT)?,
            homozygotes: HomozygoteBucket::from_code(byte >> HOMOZYGOTE_SHIFT)?,
        })
    }
}

/// Pack a status byte from a base character and its buckets.
///
/// # Errors
///
/// Returns `CodecError::InvalidBase` if `base` is not one of A/T/C/G.
pub fn encode_status(
    base: u8,
    frequency: FrequencyBucket,
    homozygotes: HomozygoteBucket,
) -> Result<u8, CodecError> {
    Ok(CompactStatus::new(Base::from_ascii(base)?, frequency, homozygotes).encode())
}

/// Unpack a status byte into its base and buckets.
///
/// # Errors
///
/// Returns a `CodecError` for unassigned bucket codes.
pub fn decode_status(byte: u8) -> Result<(Base, FrequencyBucket, HomozygoteBucket), CodecError> {
    let status = CompactStatus::decode(byte)?;
    Ok((status.base, status.frequency, status.homozygotes))
}

/// Threshold ladder used to derive a [`FrequencyBucket`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyThresholds {
    /// Allele numbers below this are reported as `LowCoverage`
    pub min_allele_number: u64,
    /// Ascending upper bounds for buckets 3 through 7
    pub bounds: [f64; 5],
}

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self {
            min_allele_number: 15_000,
            bounds: [0.0005, 0.001, 0.003, 0.005, 0.01],
        }
    }
}

impl FrequencyThresholds {
    /// Check that bounds are finite and strictly ascending
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bounds.iter().all(|b| b.is_finite() && *b >= 0.0)
            && self.bounds.windows(2).all(|w| w[0] < w[1])
    }

    /// Bucket an allele from its raw counts.
    ///
    /// `allele_frequency` falls back to `allele_count / allele_number` when absent.
    #[must_use]
    pub fn bucket(
        &self,
        passed_filters: bool,
        allele_number: u64,
        allele_count: u64,
        allele_frequency: Option<f64>,
    ) -> FrequencyBucket {
        if !passed_filters {
            return FrequencyBucket::Filtered;
        }
        if allele_number < self.min_allele_number {
            return FrequencyBucket::LowCoverage;
        }
        #[allow(clippy::cast_precision_loss)]
        let frequency = allele_frequency.unwrap_or(allele_count as f64 / allele_number as f64);

        let rung = self
            .bounds
            .iter()
            .position(|bound| frequency < *bound)
            .unwrap_or(self.bounds.len());
        FrequencyBucket::ALL[FrequencyBucket::Rare.code() as usize + rung]
    }
}

/// Sequencing coverage of a reference position across the population.
///
/// Ordered from worst to best; stored as its one-byte code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CoverageClass {
    /// Few samples reach 20x, or no summary row at all
    Low = 0,
    /// Some samples reach 20x and the mean depth is shallow
    Partial = 1,
    /// Some samples reach 20x and the mean depth is high
    Deep = 2,
    /// Most samples reach 20x
    Full = 3,
}

impl CoverageClass {
    pub const ALL: [CoverageClass; 4] = [Self::Low, Self::Partial, Self::Deep, Self::Full];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CoverageClass {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(CodecError::UnknownCoverageCode(value))
    }
}

impl From<CoverageClass> for u8 {
    fn from(value: CoverageClass) -> Self {
        value.code()
    }
}

impl std::fmt::Display for CoverageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Partial => "partial",
            Self::Deep => "deep",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

/// Threshold ladder used to derive a [`CoverageClass`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageThresholds {
    /// `over_20` strictly above this is `Full`
    pub full_fraction: f64,
    /// `over_20` strictly below this is `Low`
    pub low_fraction: f64,
    /// Between the two fractions, a mean depth strictly above this is `Deep`
    pub deep_mean: f64,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            full_fraction: 0.8,
            low_fraction: 0.1,
            deep_mean: 30.0,
        }
    }
}

impl CoverageThresholds {
    /// Fractions within `0..=1` with `low_fraction <= full_fraction`, and a
    /// finite non-negative depth
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let fraction = |f: f64| (0.0..=1.0).contains(&f);
        fraction(self.low_fraction)
            && fraction(self.full_fraction)
            && self.low_fraction <= self.full_fraction
            && self.deep_mean.is_finite()
            && self.deep_mean >= 0.0
    }

    #[must_use]
    pub fn classify(&self, mean: f64, over_20: f64) -> CoverageClass {
        if over_20 > self.full_fraction {
            CoverageClass::Full
        } else if over_20 < self.low_fraction {
            CoverageClass::Low
        } else if mean > self.deep_mean {
            CoverageClass::Deep
        } else {
            CoverageClass::Partial
        }
    }
}
