//! Position-keyed struct-of-arrays index.
//!
//! Each chromosome holds two parallel columns, positions and payloads. The key
//! is the position alone, so several alleles can share one position; callers
//! disambiguate the run returned by [`SortedPositionIndex::find_range`].

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::core::chrom::{ChromIndex, PerChromosome};

/// Run of entries whose position equals `position` in an ascending slice
#[must_use]
pub fn equal_range(positions: &[u32], position: u32) -> Range<usize> {
    let start = positions.partition_point(|p| *p < position);
    let end = start + positions[start..].partition_point(|p| *p <= position);
    start..end
}

/// Index of the first entry smaller than its predecessor
#[must_use]
pub fn first_unsorted(positions: &[u32]) -> Option<usize> {
    positions
        .windows(2)
        .position(|w| w[1] < w[0])
        .map(|idx| idx + 1)
}

/// Stable sorting permutation for `positions`, or `None` if already sorted
#[must_use]
pub fn sort_permutation(positions: &[u32]) -> Option<Vec<usize>> {
    first_unsorted(positions)?;
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by_key(|idx| positions[*idx]);
    Some(order)
}

/// Reorder `values` so that `values[i]` becomes the old `values[order[i]]`.
///
/// `order` must be a permutation of `0..values.len()`.
pub fn apply_permutation<T>(values: &mut Vec<T>, order: &[usize]) {
    let mut slots: Vec<Option<T>> = values.drain(..).map(Some).collect();
    values.extend(order.iter().filter_map(|idx| slots[*idx].take()));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Column<P> {
    positions: Vec<u32>,
    payloads: Vec<P>,
}

impl<P> Default for Column<P> {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            payloads: Vec::new(),
        }
    }
}

/// Per-chromosome `(position, payload)` columns kept in ascending position order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedPositionIndex<P> {
    columns: PerChromosome<Column<P>>,
}

impl<P> Default for SortedPositionIndex<P> {
    fn default() -> Self {
        Self {
            columns: PerChromosome::default(),
        }
    }
}

impl<P> SortedPositionIndex<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; order is only checked by [`Self::verify_sorted`]
    pub fn insert(&mut self, chrom: ChromIndex, position: u32, payload: P) {
        let column = self.columns.get_mut(chrom);
        column.positions.push(position);
        column.payloads.push(payload);
    }

    /// Index range of entries at exactly `position`
    #[must_use]
    pub fn equal_range(&self, chrom: ChromIndex, position: u32) -> Range<usize> {
        equal_range(&self.columns.get(chrom).positions, position)
    }

    /// Payloads of all entries at exactly `position`
    #[must_use]
    pub fn find_range(&self, chrom: ChromIndex, position: u32) -> &[P] {
        let range = self.equal_range(chrom, position);
        &self.columns.get(chrom).payloads[range]
    }

    /// First payload at `position` accepted by `matches`
    pub fn find(&self, chrom: ChromIndex, position: u32, matches: impl Fn(&P) -> bool) -> Option<&P> {
        self.find_range(chrom, position).iter().find(|p| matches(p))
    }

    /// Last entry at or before `position`
    #[must_use]
    pub fn floor(&self, chrom: ChromIndex, position: u32) -> Option<(u32, &P)> {
        let column = self.columns.get(chrom);
        let end = column.positions.partition_point(|p| *p <= position);
        self.get(chrom, end.checked_sub(1)?)
    }

    /// Entry at `index` within one chromosome
    #[must_use]
    pub fn get(&self, chrom: ChromIndex, index: usize) -> Option<(u32, &P)> {
        let column = self.columns.get(chrom);
        Some((*column.positions.get(index)?, column.payloads.get(index)?))
    }

    #[must_use]
    pub fn positions(&self, chrom: ChromIndex) -> &[u32] {
        &self.columns.get(chrom).positions
    }

    #[must_use]
    pub fn payloads(&self, chrom: ChromIndex) -> &[P] {
        &self.columns.get(chrom).payloads
    }

    #[must_use]
    pub fn first_unsorted(&self, chrom: ChromIndex) -> Option<usize> {
        first_unsorted(&self.columns.get(chrom).positions)
    }

    /// True when the chromosome's positions are ascending (non-strict)
    #[must_use]
    pub fn verify_sorted(&self, chrom: ChromIndex) -> bool {
        self.first_unsorted(chrom).is_none()
    }

    /// Stable re-sort of one chromosome by position, keeping payloads aligned
    pub fn sort_stable(&mut self, chrom: ChromIndex) {
        let column = self.columns.get_mut(chrom);
        if let Some(order) = sort_permutation(&column.positions) {
            apply_permutation(&mut column.positions, &order);
            apply_permutation(&mut column.payloads, &order);
        }
    }

    /// Stable re-sort of every chromosome
    pub fn sort_all(&mut self) {
        for chrom in ChromIndex::all() {
            self.sort_stable(chrom);
        }
    }

    #[must_use]
    pub fn len(&self, chrom: ChromIndex) -> usize {
        self.columns.get(chrom).positions.len()
    }

    #[must_use]
    pub fn total_len(&self) -> usize {
        self.columns.iter().map(|(_, c)| c.positions.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chrom::normalize;

    fn chr(name: &str) -> ChromIndex {
        normalize(name).unwrap()
    }

    #[test]
    fn test_equal_range_with_duplicates() {
        let positions = [1, 5, 5, 5, 9];
        assert_eq!(equal_range(&positions, 5), 1..4);
        assert_eq!(equal_range(&positions, 1), 0..1);
        assert_eq!(equal_range(&positions, 9), 4..5);
        assert!(equal_range(&positions, 6).is_empty());
        assert!(equal_range(&positions, 0).is_empty());
        assert!(equal_range(&positions, 10).is_empty());
        assert!(equal_range(&[], 3).is_empty());
    }

    #[test]
    fn test_duplicate_position_disambiguation() {
        let mut index = SortedPositionIndex::new();
        let c = chr("1");
        index.insert(c, 100, ("A", "G"));
        index.insert(c, 100, ("A", "T"));
        index.insert(c, 100, ("A", "C"));
        assert!(index.verify_sorted(c));

        assert_eq!(index.find_range(c, 100).len(), 3);
        assert_eq!(index.find(c, 100, |p| *p == ("A", "T")), Some(&("A", "T")));
        assert_eq!(index.find(c, 100, |p| *p == ("G", "A")), None);
    }

    #[test]
    fn test_chromosomes_are_isolated() {
        let mut index = SortedPositionIndex::new();
        index.insert(chr("1"), 50, 1u32);
        index.insert(chr("2"), 50, 2u32);
        assert_eq!(index.find_range(chr("1"), 50), &[1]);
        assert_eq!(index.find_range(chr("2"), 50), &[2]);
        assert!(index.find_range(chr("3"), 50).is_empty());
        assert_eq!(index.total_len(), 2);
    }

    #[test]
    fn test_shuffled_input_detected() {
        let mut index = SortedPositionIndex::new();
        let c = chr("X");
        for (pos, payload) in [(10, 'a'), (30, 'b'), (20, 'c'), (40, 'd')] {
            index.insert(c, pos, payload);
        }
        assert!(!index.verify_sorted(c));
        assert_eq!(index.first_unsorted(c), Some(2));
    }

    #[test]
    fn test_sort_is_stable_and_keeps_columns_aligned() {
        let mut index = SortedPositionIndex::new();
        let c = chr("7");
        for (pos, payload) in [(20, 'a'), (10, 'b'), (20, 'c'), (10, 'd'), (5, 'e')] {
            index.insert(c, pos, payload);
        }
        index.sort_stable(c);
        assert!(index.verify_sorted(c));
        assert_eq!(index.positions(c), &[5, 10, 10, 20, 20]);
        assert_eq!(index.payloads(c), &['e', 'b', 'd', 'a', 'c']);
    }

    #[test]
    fn test_floor_lookup() {
        let mut index = SortedPositionIndex::new();
        let c = chr("1");
        for (pos, payload) in [(0, 'a'), (3, 'b'), (70, 'c'), (70, 'd')] {
            index.insert(c, pos, payload);
        }
        assert_eq!(index.floor(c, 0), Some((0, &'a')));
        assert_eq!(index.floor(c, 5), Some((3, &'b')));
        // the last of a run wins
        assert_eq!(index.floor(c, 70), Some((70, &'d')));
        assert_eq!(index.floor(c, 9000), Some((70, &'d')));
        assert_eq!(index.floor(chr("2"), 10), None);
    }

    #[test]
    fn test_apply_permutation() {
        let mut values = vec!["x", "y", "z"];
        apply_permutation(&mut values, &[2, 0, 1]);
        assert_eq!(values, vec!["z", "x", "y"]);
        assert_eq!(sort_permutation(&[1, 2, 3]), None);
    }
}
