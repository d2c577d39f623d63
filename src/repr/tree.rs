//! Immutable SoA tree storage and structural validation.
//!
//! This module provides:
//! - [`Tree`]: flat-array tree storage used for inference and persistence
//! - [`TreeValidationError`]: structural validation errors
//!
//! Trees are assembled with [`super::TreeBuilder`].

use super::NodeId;

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    EmptyTree,
    /// The per-node arrays do not all have the same length.
    LenMismatch {
        field: &'static str,
        len: usize,
        n_nodes: usize,
    },
    /// A child pointer references an out-of-bounds node.
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node references itself as a child.
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path.
    DuplicateVisit { node: NodeId },
    /// A cycle was detected during traversal.
    CycleDetected { node: NodeId },
    /// A node exists in storage but is unreachable from the root.
    UnreachableNode { node: NodeId },
    /// A split references a feature the model was not trained on.
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

impl std::fmt::Display for TreeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTree => write!(f, "tree has no nodes"),
            Self::LenMismatch { field, len, n_nodes } => {
                write!(f, "{field} has {len} entries for {n_nodes} nodes")
            }
            Self::ChildOutOfBounds {
                node,
                side,
                child,
                n_nodes,
            } => write!(
                f,
                "node {node} {side} child {child} is out of bounds ({n_nodes} nodes)"
            ),
            Self::SelfLoop { node } => write!(f, "node {node} references itself"),
            Self::DuplicateVisit { node } => write!(f, "node {node} reached twice"),
            Self::CycleDetected { node } => write!(f, "cycle detected at node {node}"),
            Self::UnreachableNode { node } => write!(f, "node {node} is unreachable"),
            Self::FeatureOutOfRange {
                node,
                feature,
                n_features,
            } => write!(
                f,
                "node {node} splits on feature {feature} but the model has {n_features} features"
            ),
        }
    }
}

impl std::error::Error for TreeValidationError {}

// ============================================================================
// Tree
// ============================================================================

/// Structure-of-Arrays tree storage.
///
/// Node `0` is the root. Child indices are local to the tree. Internal nodes
/// carry split feature, threshold, missing-value direction, gain and cover;
/// leaves carry an additive output value and cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    default_left: Box<[bool]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
    /// Split gain per node, 0 for leaves.
    gains: Box<[f32]>,
    /// Hessian sum of the samples reaching each node.
    covers: Box<[f32]>,
}

impl Tree {
    /// Create a tree from parallel arrays and validate its structure.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
        gains: Vec<f32>,
        covers: Vec<f32>,
    ) -> Result<Self, TreeValidationError> {
        let n_nodes = is_leaf.len();
        let lens = [
            ("split_indices", split_indices.len()),
            ("split_thresholds", split_thresholds.len()),
            ("left_children", left_children.len()),
            ("right_children", right_children.len()),
            ("default_left", default_left.len()),
            ("leaf_values", leaf_values.len()),
            ("gains", gains.len()),
            ("covers", covers.len()),
        ];
        if let Some(&(field, len)) = lens.iter().find(|(_, len)| *len != n_nodes) {
            return Err(TreeValidationError::LenMismatch { field, len, n_nodes });
        }

        let tree = Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            default_left: default_left.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
            gains: gains.into_boxed_slice(),
            covers: covers.into_boxed_slice(),
        };
        tree.validate()?;
        Ok(tree)
    }

    /// A single-leaf tree.
    pub fn leaf(value: f32, cover: f32) -> Self {
        Self {
            split_indices: Box::new([0]),
            split_thresholds: Box::new([0.0]),
            left_children: Box::new([0]),
            right_children: Box::new([0]),
            default_left: Box::new([false]),
            is_leaf: Box::new([true]),
            leaf_values: Box::new([value]),
            gains: Box::new([0.0]),
            covers: Box::new([cover]),
        }
    }

    // =========================================================================
    // Node Accessors
    // =========================================================================

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    pub fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    #[inline]
    pub fn gain(&self, node: NodeId) -> f32 {
        self.gains[node as usize]
    }

    #[inline]
    pub fn cover(&self, node: NodeId) -> f32 {
        self.covers[node as usize]
    }

    /// Number of leaf nodes.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    /// Iterate over internal (split) node ids.
    pub fn split_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.is_leaf
            .iter()
            .enumerate()
            .filter(|(_, leaf)| !**leaf)
            .map(|(i, _)| i as NodeId)
    }

    /// Largest feature index referenced by any split, if the tree has splits.
    pub fn max_split_index(&self) -> Option<u32> {
        self.split_nodes().map(|n| self.split_index(n)).max()
    }

    // Raw array access for persistence.
    pub(crate) fn split_indices(&self) -> &[u32] {
        &self.split_indices
    }
    pub(crate) fn split_thresholds(&self) -> &[f32] {
        &self.split_thresholds
    }
    pub(crate) fn left_children(&self) -> &[u32] {
        &self.left_children
    }
    pub(crate) fn right_children(&self) -> &[u32] {
        &self.right_children
    }
    pub(crate) fn default_left_flags(&self) -> &[bool] {
        &self.default_left
    }
    pub(crate) fn leaf_flags(&self) -> &[bool] {
        &self.is_leaf
    }
    pub(crate) fn leaf_values(&self) -> &[f32] {
        &self.leaf_values
    }
    pub(crate) fn gains(&self) -> &[f32] {
        &self.gains
    }
    pub(crate) fn covers(&self) -> &[f32] {
        &self.covers
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Walk from the root to the leaf reached by `features`.
    ///
    /// `NaN` (missing) follows the node's default direction; otherwise a value
    /// strictly below the threshold goes left.
    #[inline]
    pub fn traverse_to_leaf(&self, features: &[f32]) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let fvalue = features
                .get(self.split_index(node) as usize)
                .copied()
                .unwrap_or(f32::NAN);
            node = if fvalue.is_nan() {
                if self.default_left(node) {
                    self.left_child(node)
                } else {
                    self.right_child(node)
                }
            } else if fvalue < self.split_threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Leaf output for a single row.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        self.leaf_value(self.traverse_to_leaf(features))
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate basic structural invariants: every internal node has two
    /// in-bounds children and every node is reached exactly once from the root.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        // Iterative DFS with color marking.
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, u8)> = vec![(0, 0)];

        while let Some((node, phase)) = stack.pop() {
            let node_usize = node as usize;
            match phase {
                0 => {
                    match color[node_usize] {
                        0 => {}
                        1 => return Err(TreeValidationError::CycleDetected { node }),
                        _ => return Err(TreeValidationError::DuplicateVisit { node }),
                    }

                    color[node_usize] = 1;
                    stack.push((node, 1));

                    if !self.is_leaf(node) {
                        let left = self.left_child(node);
                        let right = self.right_child(node);

                        if left == node || right == node {
                            return Err(TreeValidationError::SelfLoop { node });
                        }
                        for (side, child) in [("left", left), ("right", right)] {
                            if child as usize >= n_nodes {
                                return Err(TreeValidationError::ChildOutOfBounds {
                                    node,
                                    side,
                                    child,
                                    n_nodes,
                                });
                            }
                        }

                        stack.push((right, 0));
                        stack.push((left, 0));
                    }
                }
                _ => color[node_usize] = 2,
            }
        }

        if let Some(i) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: i as NodeId });
        }

        Ok(())
    }

    /// Check that every split references a feature below `n_features`.
    pub fn validate_features(&self, n_features: usize) -> Result<(), TreeValidationError> {
        for node in self.split_nodes() {
            let feature = self.split_index(node);
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features,
                });
            }
        }
        Ok(())
    }

    /// Depth of every node (root = 0), indexed by node id.
    pub fn node_depths(&self) -> Vec<u32> {
        let mut depths = vec![0u32; self.n_nodes()];
        let mut stack = vec![0 as NodeId];
        while let Some(node) = stack.pop() {
            if !self.is_leaf(node) {
                let d = depths[node as usize] + 1;
                for child in [self.left_child(node), self.right_child(node)] {
                    depths[child as usize] = d;
                    stack.push(child);
                }
            }
        }
        depths
    }
}
