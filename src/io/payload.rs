//! Payload structures for the native storage format.
//!
//! These mirror the runtime types but stay plain data so Postcard can
//! encode them compactly. Runtime invariants are re-checked on conversion.

use serde::{Deserialize, Serialize};

use crate::model::ParamValue;

/// Version-tagged payload enum for forward compatibility.
///
/// New format versions add variants instead of modifying existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    V1(PayloadV1),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadV1 {
    pub metadata: ModelMetadata,
    pub forest: ForestPayload,
}

/// Everything about the model except its trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Completed boosting rounds.
    pub version: u32,
    /// `None` until the first training call fixes it.
    pub num_features: Option<u32>,
    pub feature_names: Option<Vec<String>>,
    /// Configuration parameters in key order.
    pub config: Vec<(String, ParamValue)>,
    /// User attributes in key order.
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestPayload {
    pub num_groups: u32,
    /// Base margin per group.
    pub base_scores: Vec<f32>,
    pub tree_groups: Vec<u32>,
    pub trees: Vec<TreePayload>,
}

/// Single tree, one entry per node in every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreePayload {
    pub split_features: Vec<u32>,
    pub thresholds: Vec<f32>,
    pub left_children: Vec<u32>,
    pub right_children: Vec<u32>,
    pub default_left: Vec<bool>,
    pub is_leaf: Vec<bool>,
    pub leaf_values: Vec<f32>,
    pub gains: Vec<f32>,
    pub covers: Vec<f32>,
}
