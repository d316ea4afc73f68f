//! Shape-partitioned allele tables.
//!
//! SNPs, insertions and deletions live in separate position-sorted columns.
//! Insertions and deletions keep their inserted or deleted bases beside the
//! payload, which is how ties at one position are told apart.

use serde::{Deserialize, Serialize};

use crate::core::allele::VariantShape;
use crate::index::position::{apply_permutation, equal_range, first_unsorted, sort_permutation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnpColumn<S> {
    positions: Vec<u32>,
    values: Vec<S>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndelColumn<I> {
    positions: Vec<u32>,
    sequences: Vec<String>,
    values: Vec<I>,
}

impl<S> Default for SnpColumn<S> {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<I> Default for IndelColumn<I> {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            sequences: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<S> SnpColumn<S> {
    fn sort_stable(&mut self) {
        if let Some(order) = sort_permutation(&self.positions) {
            apply_permutation(&mut self.positions, &order);
            apply_permutation(&mut self.values, &order);
        }
    }
}

impl<I> IndelColumn<I> {
    fn push(&mut self, position: u32, sequence: &str, value: I) {
        self.positions.push(position);
        self.sequences.push(sequence.to_string());
        self.values.push(value);
    }

    fn find(&self, position: u32, sequence: &str) -> Option<&I> {
        equal_range(&self.positions, position)
            .find(|idx| self.sequences[*idx] == sequence)
            .map(|idx| &self.values[idx])
    }

    fn sort_stable(&mut self) {
        if let Some(order) = sort_permutation(&self.positions) {
            apply_permutation(&mut self.positions, &order);
            apply_permutation(&mut self.sequences, &order);
            apply_permutation(&mut self.values, &order);
        }
    }
}

/// Per-shape entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeCounts {
    pub snps: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl ShapeCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.snps + self.insertions + self.deletions
    }
}

impl std::ops::AddAssign for ShapeCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.snps += rhs.snps;
        self.insertions += rhs.insertions;
        self.deletions += rhs.deletions;
    }
}

/// SNP values of type `S`, indel values of type `I`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantTables<S, I> {
    snps: SnpColumn<S>,
    insertions: IndelColumn<I>,
    deletions: IndelColumn<I>,
}

impl<S, I> Default for VariantTables<S, I> {
    fn default() -> Self {
        Self {
            snps: SnpColumn::default(),
            insertions: IndelColumn::default(),
            deletions: IndelColumn::default(),
        }
    }
}

impl<S, I> VariantTables<S, I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snp(&mut self, position: u32, value: S) {
        self.snps.positions.push(position);
        self.snps.values.push(value);
    }

    pub fn push_insertion(&mut self, position: u32, inserted: &str, value: I) {
        self.insertions.push(position, inserted, value);
    }

    pub fn push_deletion(&mut self, position: u32, deleted: &str, value: I) {
        self.deletions.push(position, deleted, value);
    }

    /// First SNP value at `position` accepted by `matches`
    pub fn find_snp(&self, position: u32, matches: impl Fn(&S) -> bool) -> Option<&S> {
        equal_range(&self.snps.positions, position)
            .map(|idx| &self.snps.values[idx])
            .find(|value| matches(value))
    }

    #[must_use]
    pub fn find_insertion(&self, position: u32, inserted: &str) -> Option<&I> {
        self.insertions.find(position, inserted)
    }

    #[must_use]
    pub fn find_deletion(&self, position: u32, deleted: &str) -> Option<&I> {
        self.deletions.find(position, deleted)
    }

    /// Stable re-sort of all three tables by position
    pub fn sort_stable(&mut self) {
        self.snps.sort_stable();
        self.insertions.sort_stable();
        self.deletions.sort_stable();
    }

    /// First out-of-order entry, by table
    #[must_use]
    pub fn first_unsorted(&self) -> Option<(VariantShape, usize, u32, u32)> {
        let check = |shape, positions: &[u32]| {
            first_unsorted(positions).map(|idx| (shape, idx, positions[idx], positions[idx - 1]))
        };
        check(VariantShape::Snp, &self.snps.positions)
            .or_else(|| check(VariantShape::Insertion, &self.insertions.positions))
            .or_else(|| check(VariantShape::Deletion, &self.deletions.positions))
    }

    #[must_use]
    pub fn counts(&self) -> ShapeCounts {
        ShapeCounts {
            snps: self.snps.positions.len(),
            insertions: self.insertions.positions.len(),
            deletions: self.deletions.positions.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_do_not_collide() {
        let mut tables: VariantTables<char, u8> = VariantTables::new();
        tables.push_snp(100, 'G');
        tables.push_insertion(100, "T", 1);
        tables.push_deletion(100, "T", 2);

        assert_eq!(tables.find_snp(100, |b| *b == 'G'), Some(&'G'));
        assert_eq!(tables.find_insertion(100, "T"), Some(&1));
        assert_eq!(tables.find_deletion(100, "T"), Some(&2));
        assert_eq!(tables.find_deletion(100, "TT"), None);
        assert_eq!(tables.counts().total(), 3);
    }

    #[test]
    fn test_indel_ties_match_by_sequence() {
        let mut tables: VariantTables<(), u8> = VariantTables::new();
        tables.push_insertion(7, "A", 1);
        tables.push_insertion(7, "AA", 2);
        tables.push_insertion(7, "AT", 3);
        assert_eq!(tables.find_insertion(7, "AA"), Some(&2));
        assert_eq!(tables.find_insertion(7, "TA"), None);
        assert_eq!(tables.find_insertion(8, "A"), None);
    }

    #[test]
    fn test_sort_then_verify() {
        let mut tables: VariantTables<u8, u8> = VariantTables::new();
        tables.push_deletion(20, "AG", 1);
        tables.push_deletion(19, "C", 2);
        assert_eq!(
            tables.first_unsorted(),
            Some((VariantShape::Deletion, 1, 19, 20))
        );
        tables.sort_stable();
        assert_eq!(tables.first_unsorted(), None);
        assert_eq!(tables.find_deletion(19, "C"), Some(&2));
    }
}
