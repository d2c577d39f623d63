//! Incremental tree construction.

use super::tree::{Tree, TreeValidationError};
use super::NodeId;

/// Growable node storage that freezes into a [`Tree`].
///
/// The first allocated node becomes the root. Split nodes start with
/// placeholder children that must be wired with [`set_children`](Self::set_children)
/// before [`build`](Self::build).
///
/// ```
/// use treeboost::repr::TreeBuilder;
///
/// let mut b = TreeBuilder::new();
/// let root = b.split(0, 0.5, true, 1.5, 10.0);
/// let left = b.leaf(-0.2, 6.0);
/// let right = b.leaf(0.3, 4.0);
/// b.set_children(root, left, right);
/// let tree = b.build().unwrap();
///
/// assert_eq!(tree.predict_row(&[0.1]), -0.2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
    gains: Vec<f32>,
    covers: Vec<f32>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    fn push(&mut self, is_leaf: bool, cover: f32) -> NodeId {
        let id = self.n_nodes() as NodeId;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.default_left.push(false);
        self.is_leaf.push(is_leaf);
        self.leaf_values.push(0.0);
        self.gains.push(0.0);
        self.covers.push(cover);
        id
    }

    /// Allocate a leaf node.
    pub fn leaf(&mut self, value: f32, cover: f32) -> NodeId {
        let id = self.push(true, cover);
        self.leaf_values[id as usize] = value;
        id
    }

    /// Allocate a numeric split node (`x < threshold` goes left).
    pub fn split(
        &mut self,
        feature: u32,
        threshold: f32,
        default_left: bool,
        gain: f32,
        cover: f32,
    ) -> NodeId {
        let id = self.push(false, cover);
        let i = id as usize;
        self.split_indices[i] = feature;
        self.split_thresholds[i] = threshold;
        self.default_left[i] = default_left;
        self.gains[i] = gain;
        id
    }

    /// Wire the children of a split node.
    pub fn set_children(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.left_children[node as usize] = left;
        self.right_children[node as usize] = right;
    }

    /// Freeze into an immutable tree, validating its structure.
    pub fn build(self) -> Result<Tree, TreeValidationError> {
        Tree::new(
            self.split_indices,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
            self.gains,
            self.covers,
        )
    }
}
