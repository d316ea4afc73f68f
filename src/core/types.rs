use serde::{Deserialize, Serialize};

/// Why a lookup found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Absence {
    /// The partition was loaded but holds no matching allele
    NoRecord,
    /// No partition exists on disk for the requested region or chromosome
    MissingPartition,
}

/// Outcome of a store query.
///
/// Absence is an expected outcome, distinct from a corrupt or unreadable store
/// (an `Err`) and from a record that is present with an "absent" status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    Missing(Absence),
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing(_) => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Apply a caller-side default for absence
    pub fn unwrap_or(self, default: T) -> T {
        self.found().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::Missing(absence) => Lookup::Missing(absence),
        }
    }

    #[must_use]
    pub fn absence(&self) -> Option<Absence> {
        match self {
            Self::Found(_) => None,
            Self::Missing(absence) => Some(*absence),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing(Absence::NoRecord), Self::Found)
    }
}

/// Provenance stamped into every archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Version or date of the source data (`None` when the input has none)
    pub source_version: String,
    /// RFC 3339 build timestamp
    pub built_at: String,
    /// Version of this tool that wrote the archive
    pub tool_version: String,
}

impl BuildInfo {
    #[must_use]
    pub fn now(source_version: impl Into<String>) -> Self {
        Self {
            source_version: source_version.into(),
            built_at: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
