//! Secondary indices layered over a built position index.
//!
//! [`IdIndex`] maps a stable record id back to its `(chromosome, index)`
//! location in the primary index. [`TranscriptIndex`] maps transcript-local
//! coding/protein coordinates to stable ids for window queries.
//!
//! Both are built from the primary index *after* it has been sorted, since
//! they store positions into it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::chrom::ChromIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdEntry {
    pub id: u64,
    pub chrom: ChromIndex,
    pub index: u32,
}

/// Stable id -> primary index location, sorted by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdIndex {
    entries: Vec<IdEntry>,
}

impl IdIndex {
    /// Build from unsorted entries
    #[must_use]
    pub fn build(mut entries: Vec<IdEntry>) -> Self {
        entries.sort_unstable();
        Self { entries }
    }

    /// Locate the record for `id`; the first entry wins if an id repeats
    #[must_use]
    pub fn find(&self, id: u64) -> Option<(ChromIndex, usize)> {
        let start = self.entries.partition_point(|e| e.id < id);
        self.entries
            .get(start)
            .filter(|e| e.id == id)
            .map(|e| (e.chrom, e.index as usize))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which transcript-local coordinate a window applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Coding,
    Protein,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoordinateEntry {
    pub coding: u32,
    pub protein: u32,
    pub id: u64,
}

impl CoordinateEntry {
    fn project(&self, projection: Projection) -> u32 {
        match projection {
            Projection::Coding => self.coding,
            Projection::Protein => self.protein,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TranscriptCoordinates {
    entries: Vec<CoordinateEntry>,
    /// Protein coordinates ascend along with the sort order
    protein_monotone: bool,
}

/// Transcript -> sorted `(coding, protein, id)` triples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptIndex {
    transcripts: BTreeMap<String, TranscriptCoordinates>,
}

impl TranscriptIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transcript: &str, entry: CoordinateEntry) {
        self.transcripts
            .entry(transcript.to_string())
            .or_default()
            .entries
            .push(entry);
    }

    /// Sort every transcript by the full triple. Call once after bulk insertion.
    pub fn finish(&mut self) {
        for coords in self.transcripts.values_mut() {
            coords.entries.sort_unstable();
            coords.entries.dedup();
            coords.protein_monotone = coords.entries.windows(2).all(|w| w[0].protein <= w[1].protein);
        }
    }

    /// Distinct ids whose projected coordinate lies in `lo..=hi`
    #[must_use]
    pub fn find_in_range(
        &self,
        transcript: &str,
        lo: u32,
        hi: u32,
        projection: Projection,
    ) -> BTreeSet<u64> {
        let Some(coords) = self.transcripts.get(transcript) else {
            return BTreeSet::new();
        };
        if lo > hi {
            return BTreeSet::new();
        }

        let entries = &coords.entries;
        let searchable = projection == Projection::Coding || coords.protein_monotone;
        if searchable {
            let start = entries.partition_point(|e| e.project(projection) < lo);
            let end = entries.partition_point(|e| e.project(projection) <= hi);
            entries[start..end.max(start)].iter().map(|e| e.id).collect()
        } else {
            entries
                .iter()
                .filter(|e| (lo..=hi).contains(&e.project(projection)))
                .map(|e| e.id)
                .collect()
        }
    }

    #[must_use]
    pub fn transcript_count(&self) -> usize {
        self.transcripts.len()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.transcripts.values().map(|c| c.entries.len()).sum()
    }
}
