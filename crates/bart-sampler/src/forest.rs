// SPDX-License-Identifier: AGPL-3.0-only

//! Heap-indexed tree ensemble
//!
//! Every tree is a complete binary tree of depth `max_depth` stored in three
//! arrays indexed by heap position (root = 1, children of `i` are `2i` and
//! `2i + 1`, index 0 unused):
//!
//! ```text
//! var[t, i]    covariate split on at internal node i     (i < half)
//! split[t, i]  1-based split index, 0 marks "not split"  (i < half)
//! leaf[t, i]   leaf value when i is a leaf               (i < heap)
//! ```
//!
//! with `half = 2^(max_depth - 1)` and `heap = 2^max_depth`. A node exists if
//! it is the root or its parent is split. Nodes at index `>= half` can never
//! be split.

use ndarray::{Array2, ArrayView2};

/// Tree ensemble in heap layout
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    max_depth: usize,
    var: Array2<u16>,
    split: Array2<u16>,
    leaf: Array2<f32>,
}

/// Inclusive range of admissible split indices; empty when `lo > hi`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRange {
    /// Smallest admissible split
    pub lo: u16,
    /// Largest admissible split
    pub hi: u16,
}

impl SplitRange {
    /// Number of admissible splits
    pub fn len(self) -> usize {
        if self.lo > self.hi {
            0
        } else {
            usize::from(self.hi - self.lo) + 1
        }
    }

    /// True when no split is admissible
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Largest covariate count; split variables are stored as `u16`
pub const MAX_COVARIATES: usize = u16::MAX as usize;

/// Depth of heap node `i` (root = 0)
pub const fn depth_of(node: usize) -> usize {
    (usize::BITS - 1 - node.leading_zeros()) as usize
}

impl Forest {
    /// Ensemble of `ntree` single-leaf trees with zero leaves
    pub fn new(ntree: usize, max_depth: usize) -> Self {
        let half = 1usize << (max_depth - 1);
        let heap = 1usize << max_depth;
        Self {
            max_depth,
            var: Array2::zeros((ntree, half)),
            split: Array2::zeros((ntree, half)),
            leaf: Array2::zeros((ntree, heap)),
        }
    }

    /// Number of trees
    pub fn ntree(&self) -> usize {
        self.leaf.nrows()
    }

    /// Maximum depth
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Heap positions that may be internal nodes
    pub fn half(&self) -> usize {
        self.split.ncols()
    }

    /// Heap positions per tree
    pub fn heap_size(&self) -> usize {
        self.leaf.ncols()
    }

    /// Split covariates, shape (ntree, half)
    pub fn var(&self) -> ArrayView2<'_, u16> {
        self.var.view()
    }

    /// Split indices, shape (ntree, half)
    pub fn split(&self) -> ArrayView2<'_, u16> {
        self.split.view()
    }

    /// Leaf values, shape (ntree, heap)
    pub fn leaf(&self) -> ArrayView2<'_, f32> {
        self.leaf.view()
    }

    /// True if node `i` of tree `t` is split
    #[inline]
    pub fn is_internal(&self, t: usize, i: usize) -> bool {
        i < self.half() && self.split[[t, i]] != 0
    }

    /// True if node `i` of tree `t` exists and is a leaf
    pub fn is_leaf(&self, t: usize, i: usize) -> bool {
        i >= 1
            && i < self.heap_size()
            && !self.is_internal(t, i)
            && (i == 1 || self.is_internal(t, i / 2))
    }

    /// Leaf reached by observation `j`
    #[inline]
    pub fn leaf_of(&self, t: usize, x: &ArrayView2<'_, u16>, j: usize) -> usize {
        let mut i = 1;
        while self.is_internal(t, i) {
            let var = usize::from(self.var[[t, i]]);
            i = 2 * i + usize::from(x[[var, j]] >= self.split[[t, i]]);
        }
        i
    }

    /// Value of leaf `i` in tree `t`
    #[inline]
    pub fn leaf_value(&self, t: usize, i: usize) -> f32 {
        self.leaf[[t, i]]
    }

    /// Set leaf `i` of tree `t`
    #[inline]
    pub fn set_leaf_value(&mut self, t: usize, i: usize, value: f32) {
        self.leaf[[t, i]] = value;
    }

    /// Existing leaves of tree `t`, in heap order
    pub fn leaves(&self, t: usize) -> Vec<usize> {
        (1..self.heap_size()).filter(|&i| self.is_leaf(t, i)).collect()
    }

    /// Internal nodes of tree `t` whose children are both leaves
    pub fn prunable(&self, t: usize) -> Vec<usize> {
        (1..self.half())
            .filter(|&i| {
                self.is_internal(t, i) && !self.is_internal(t, 2 * i) && !self.is_internal(t, 2 * i + 1)
            })
            .collect()
    }

    /// Admissible splits on covariate `var` at node `i`, given ancestors
    pub fn split_range(&self, t: usize, node: usize, var: usize, max_split: u16) -> SplitRange {
        let mut range = SplitRange { lo: 1, hi: max_split };
        let mut child = node;
        while child > 1 {
            let parent = child / 2;
            if usize::from(self.var[[t, parent]]) == var {
                let s = self.split[[t, parent]];
                if child % 2 == 0 {
                    range.hi = range.hi.min(s.saturating_sub(1));
                } else {
                    range.lo = range.lo.max(s.saturating_add(1));
                }
            }
            child = parent;
        }
        range
    }

    /// Covariates with at least one admissible split at node `i`
    pub fn splittable_vars(&self, t: usize, node: usize, max_split: &[u16]) -> Vec<usize> {
        if node >= self.half() {
            return Vec::new();
        }
        max_split
            .iter()
            .enumerate()
            .filter(|&(var, &m)| !self.split_range(t, node, var, m).is_empty())
            .map(|(var, _)| var)
            .collect()
    }

    /// Leaves of tree `t` that can be grown
    pub fn growable(&self, t: usize, max_split: &[u16]) -> Vec<usize> {
        (1..self.half())
            .filter(|&i| self.is_leaf(t, i) && !self.splittable_vars(t, i, max_split).is_empty())
            .collect()
    }

    /// Turn leaf `i` into an internal node
    pub fn grow(&mut self, t: usize, node: usize, var: usize, split: u16) {
        debug_assert!(self.is_leaf(t, node) && node < self.half());
        #[allow(clippy::cast_possible_truncation)]
        {
            self.var[[t, node]] = var as u16;
        }
        self.split[[t, node]] = split;
    }

    /// Collapse internal node `i` into a leaf
    pub fn prune(&mut self, t: usize, node: usize) {
        debug_assert!(self.is_internal(t, node));
        self.split[[t, node]] = 0;
        self.var[[t, node]] = 0;
    }

    /// Internal node count of tree `t`
    pub fn internal_count(&self, t: usize) -> usize {
        (1..self.half()).filter(|&i| self.is_internal(t, i)).count()
    }

    /// Mean number of leaves per tree
    pub fn mean_leaves(&self) -> f32 {
        let total: usize = (0..self.ntree()).map(|t| self.internal_count(t) + 1).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total as f32 / self.ntree().max(1) as f32;
        mean
    }

    /// Heap bytes held by the arrays
    pub fn nbytes(&self) -> usize {
        (self.var.len() + self.split.len()) * std::mem::size_of::<u16>()
            + self.leaf.len() * std::mem::size_of::<f32>()
    }
}
