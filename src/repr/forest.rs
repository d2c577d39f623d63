//! Append-only ensemble of trees.

use super::tree::{Tree, TreeValidationError};

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestValidationError {
    BaseScoreLenMismatch { n_groups: u32, len: usize },
    TreeGroupsLenMismatch { n_trees: usize, len: usize },
    TreeGroupOutOfRange { tree_idx: usize, group: u32, n_groups: u32 },
    /// Trees must come in whole rounds, groups in order `0..n_groups`.
    RoundLayout { tree_idx: usize, group: u32, expected: u32 },
    InvalidTree { tree_idx: usize, error: TreeValidationError },
}

impl std::fmt::Display for ForestValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaseScoreLenMismatch { n_groups, len } => {
                write!(f, "base score has {len} entries for {n_groups} groups")
            }
            Self::TreeGroupsLenMismatch { n_trees, len } => {
                write!(f, "{len} group assignments for {n_trees} trees")
            }
            Self::TreeGroupOutOfRange {
                tree_idx,
                group,
                n_groups,
            } => write!(f, "tree {tree_idx} assigned to group {group} of {n_groups}"),
            Self::RoundLayout {
                tree_idx,
                group,
                expected,
            } => write!(f, "tree {tree_idx} has group {group}, expected {expected}"),
            Self::InvalidTree { tree_idx, error } => write!(f, "tree {tree_idx}: {error}"),
        }
    }
}

impl std::error::Error for ForestValidationError {}

/// Ordered sequence of trees with per-group base scores.
///
/// Each boosting round appends one tree per output group, in group order, so
/// round `r` occupies trees `r * n_groups .. (r + 1) * n_groups`. Trees are
/// never removed or reordered; [`slice_rounds`](Self::slice_rounds) copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_groups: Vec<u32>,
    n_groups: u32,
    base_score: Vec<f32>,
}

impl Forest {
    /// Create an empty forest with a base score per group.
    pub fn new(n_groups: u32, base_score: Vec<f32>) -> Self {
        debug_assert_eq!(base_score.len(), n_groups as usize);
        Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            n_groups,
            base_score,
        }
    }

    /// Reassemble a forest from stored parts, validating its layout.
    pub fn from_parts(
        n_groups: u32,
        base_score: Vec<f32>,
        trees: Vec<Tree>,
        tree_groups: Vec<u32>,
    ) -> Result<Self, ForestValidationError> {
        let forest = Self {
            trees,
            tree_groups,
            n_groups,
            base_score,
        };
        forest.validate()?;
        Ok(forest)
    }

    /// Append one round: exactly one tree per group, in group order.
    pub(crate) fn push_round(&mut self, trees: Vec<Tree>) {
        debug_assert_eq!(trees.len(), self.n_groups as usize);
        for (group, tree) in trees.into_iter().enumerate() {
            self.trees.push(tree);
            self.tree_groups.push(group as u32);
        }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_rounds(&self) -> usize {
        self.trees.len() / self.n_groups.max(1) as usize
    }

    #[inline]
    pub fn n_groups(&self) -> u32 {
        self.n_groups
    }

    #[inline]
    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    #[inline]
    pub fn tree_groups(&self) -> &[u32] {
        &self.tree_groups
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Iterate over trees with their group assignments, in insertion order.
    pub fn trees_with_groups(&self) -> impl Iterator<Item = (&Tree, u32)> {
        self.trees
            .iter()
            .zip(self.tree_groups.iter())
            .map(|(t, &g)| (t, g))
    }

    /// Copy the trees of the given rounds into a new forest.
    ///
    /// # Panics
    ///
    /// Panics if a round index is out of range.
    pub fn slice_rounds(&self, rounds: impl IntoIterator<Item = usize>) -> Forest {
        let k = self.n_groups as usize;
        let mut out = Forest::new(self.n_groups, self.base_score.clone());
        for r in rounds {
            out.push_round(self.trees[r * k..(r + 1) * k].to_vec());
        }
        out
    }

    /// Validate structural invariants (trees, group layout, base score).
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if self.base_score.len() != self.n_groups as usize {
            return Err(ForestValidationError::BaseScoreLenMismatch {
                n_groups: self.n_groups,
                len: self.base_score.len(),
            });
        }
        if self.tree_groups.len() != self.trees.len() {
            return Err(ForestValidationError::TreeGroupsLenMismatch {
                n_trees: self.trees.len(),
                len: self.tree_groups.len(),
            });
        }

        for (i, &g) in self.tree_groups.iter().enumerate() {
            if g >= self.n_groups {
                return Err(ForestValidationError::TreeGroupOutOfRange {
                    tree_idx: i,
                    group: g,
                    n_groups: self.n_groups,
                });
            }
            let expected = (i % self.n_groups as usize) as u32;
            if g != expected {
                return Err(ForestValidationError::RoundLayout {
                    tree_idx: i,
                    group: g,
                    expected,
                });
            }
        }
        if self.trees.len() % self.n_groups.max(1) as usize != 0 {
            return Err(ForestValidationError::RoundLayout {
                tree_idx: self.trees.len(),
                group: 0,
                expected: (self.trees.len() % self.n_groups as usize) as u32,
            });
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ForestValidationError::InvalidTree { tree_idx: i, error: e })?;
        }

        Ok(())
    }

    /// Check that no split references a feature at or above `n_features`.
    pub fn validate_features(&self, n_features: usize) -> Result<(), ForestValidationError> {
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate_features(n_features)
                .map_err(|e| ForestValidationError::InvalidTree { tree_idx: i, error: e })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_and_groups() {
        let mut forest = Forest::new(2, vec![0.0, 0.0]);
        forest.push_round(vec![Tree::leaf(1.0, 1.0), Tree::leaf(2.0, 1.0)]);
        forest.push_round(vec![Tree::leaf(3.0, 1.0), Tree::leaf(4.0, 1.0)]);

        assert_eq!(forest.n_trees(), 4);
        assert_eq!(forest.n_rounds(), 2);
        assert_eq!(forest.tree_groups(), &[0, 1, 0, 1]);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn slice_copies_whole_rounds() {
        let mut forest = Forest::new(1, vec![0.5]);
        for v in 0..5 {
            forest.push_round(vec![Tree::leaf(v as f32, 1.0)]);
        }
        let sliced = forest.slice_rounds((1..5).step_by(2));
        assert_eq!(sliced.n_rounds(), 2);
        assert_eq!(sliced.tree(0).leaf_value(0), 1.0);
        assert_eq!(sliced.tree(1).leaf_value(0), 3.0);
        assert_eq!(sliced.base_score(), &[0.5]);
    }

    #[test]
    fn from_parts_rejects_bad_layout() {
        let err = Forest::from_parts(
            2,
            vec![0.0, 0.0],
            vec![Tree::leaf(1.0, 1.0), Tree::leaf(1.0, 1.0)],
            vec![1, 0],
        )
        .unwrap_err();
        assert!(matches!(err, ForestValidationError::RoundLayout { tree_idx: 0, .. }));

        let err = Forest::from_parts(1, vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, ForestValidationError::BaseScoreLenMismatch { .. }));
    }
}
