//! Sparse sort-key ordering for sibling activities.
//!
//! Siblings within a (stage, parent) group are ordered by sparse integer
//! keys so that a reorder only rewrites the moved item. Keys start at the
//! spacing constant and grow by it; an interior insert takes the floor
//! midpoint of its neighbors. When neighbors crowd to adjacent integers the
//! midpoint collides and a corrective [`OrderedCollection::rebalance`] pass
//! respaces the whole group.
//!
//! This module is pure: no I/O, no knowledge of storage or the CLI.

/// Default gap between freshly assigned sort keys.
pub const DEFAULT_SPACING: i64 = 100;

/// Computes and maintains a total order of siblings using sparse keys.
#[derive(Debug, Clone, Copy)]
pub struct OrderedCollection {
    /// Gap used for appends, prepends, and rebalanced keys.
    pub spacing: i64,
}

impl OrderedCollection {
    /// Create a collection with the default key spacing.
    pub fn new() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
        }
    }

    /// Create a collection with custom key spacing.
    pub fn with_spacing(spacing: i64) -> Self {
        Self { spacing }
    }

    /// Compute a sort key that places an item at `target_index` within
    /// `siblings` (ordered by sort key).
    ///
    /// - Empty list: the spacing constant.
    /// - Index 0: `max(0, first - spacing)`.
    /// - Past the end: `last + spacing`.
    /// - Interior: floor midpoint of the two neighbors.
    ///
    /// The returned key preserves strict ordering against its neighbors
    /// unless the neighbors hold adjacent integers, in which case the
    /// midpoint collides with the left neighbor and the caller should
    /// rebalance.
    pub fn insertion_key(&self, siblings: &[(String, i64)], target_index: usize) -> i64 {
        if siblings.is_empty() {
            return self.spacing;
        }
        if target_index == 0 {
            return (siblings[0].1 - self.spacing).max(0);
        }
        if target_index >= siblings.len() {
            return siblings[siblings.len() - 1].1 + self.spacing;
        }
        let prev = siblings[target_index - 1].1;
        let next = siblings[target_index].1;
        midpoint_floor(prev, next)
    }

    /// True when `new_key` has crowded its neighborhood: the key bottomed
    /// out at or below 1, or the gap to the preceding sibling is <= 1.
    pub fn needs_rebalance(&self, new_key: i64, prev_key: Option<i64>) -> bool {
        if new_key <= 1 {
            return true;
        }
        match prev_key {
            Some(prev) => new_key - prev <= 1,
            None => false,
        }
    }

    /// Reassign every sibling an evenly spaced key, preserving current
    /// order. Idempotent: a rebalanced group maps to the same keys again.
    pub fn rebalance(&self, siblings: &[(String, i64)]) -> Vec<(String, i64)> {
        siblings
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), (i as i64 + 1) * self.spacing))
            .collect()
    }
}

impl Default for OrderedCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// Floor midpoint of two i64 values without overflow.
fn midpoint_floor(a: i64, b: i64) -> i64 {
    // (a + b) / 2 with floor semantics, avoiding overflow on large keys
    let half = (a >> 1) + (b >> 1);
    // Both odd: each >>1 lost a half, together one whole
    half + (a & b & 1)
}
