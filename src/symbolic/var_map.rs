//! Variable-equivalence bookkeeping for one symbolic expression.
//!
//! Two representations are kept side by side, as the design calls for:
//! `leaf → group` for O(1) lookup while building a value's expression, and
//! `group → [leaf]` for fast splitting while generalising an op site's
//! expression against that value. Flipping between them is O(n) and done
//! only when both views are needed at once.

use itertools::Itertools;
use std::collections::HashMap;

/// Position of a variable leaf within an expression, identified by its
/// index in the tree's pre-order leaf enumeration.
pub type LeafIndex = usize;

/// Equivalence classes over the variable leaves of one expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap {
    /// `leaf index -> group index`.
    leaf_to_group: Vec<usize>,
}

impl VarMap {
    /// A map with every leaf in its own singleton group.
    pub fn singletons(num_leaves: usize) -> Self {
        Self {
            leaf_to_group: (0..num_leaves).collect(),
        }
    }

    /// Build a var-map from raw f32 bit patterns: leaves with equal bits
    /// are "the same variable" for this one dynamic trace.
    pub fn from_trace_values(raw_bits: &[u32]) -> Self {
        let mut seen: HashMap<u32, usize> = HashMap::new();
        let mut leaf_to_group = Vec::with_capacity(raw_bits.len());
        for &bits in raw_bits {
            let next = seen.len();
            let group = *seen.entry(bits).or_insert(next);
            leaf_to_group.push(group);
        }
        Self { leaf_to_group }
    }

    /// Number of leaves this map covers.
    pub fn num_leaves(&self) -> usize {
        self.leaf_to_group.len()
    }

    /// Group index for a given leaf.
    pub fn group_of(&self, leaf: LeafIndex) -> usize {
        self.leaf_to_group[leaf]
    }

    /// `group -> [leaf]` view, built on demand.
    pub fn groups(&self) -> Vec<Vec<LeafIndex>> {
        let by_group = self
            .leaf_to_group
            .iter()
            .enumerate()
            .map(|(leaf, &group)| (group, leaf))
            .into_group_map();

        let num_groups = self.leaf_to_group.iter().copied().max().map_or(0, |m| m + 1);
        let mut groups = vec![Vec::new(); num_groups];
        for (group, mut leaves) in by_group {
            leaves.sort_unstable();
            groups[group] = leaves;
        }
        groups
    }

    /// Refine `self` so that no two leaves in the same group of `self` are
    /// ever in different groups of `trace`. This is the site-generalisation
    /// step of §4.8: the site's var-map must be the coarsest map that is
    /// still a refinement of every trace seen.
    ///
    /// `trace` must cover the same leaves as `self` (same length).
    pub fn refine_against(&mut self, trace: &VarMap) {
        debug_assert_eq!(self.leaf_to_group.len(), trace.leaf_to_group.len());

        // For each existing group, split it by the trace's group labels:
        // leaves that disagree on the trace's grouping can no longer share
        // a site group.
        let mut next_group = 0usize;
        let mut remapped = vec![usize::MAX; self.leaf_to_group.len()];

        for self_group in self.groups() {
            // sub-partition `self_group` by trace group label
            let mut sub: HashMap<usize, usize> = HashMap::new();
            for leaf in self_group {
                let trace_group = trace.group_of(leaf);
                let g = *sub.entry(trace_group).or_insert_with(|| {
                    let g = next_group;
                    next_group += 1;
                    g
                });
                remapped[leaf] = g;
            }
        }

        self.leaf_to_group = remapped;
    }

    /// Relabel groups so that group indices are contiguous starting at 0 in
    /// first-appearance order. Used after a sequence of `refine_against`
    /// calls to keep labels compact.
    pub fn canonicalize(&mut self) {
        let mut seen: HashMap<usize, usize> = HashMap::new();
        for g in &mut self.leaf_to_group {
            let next = seen.len();
            *g = *seen.entry(*g).or_insert(next);
        }
    }
}
