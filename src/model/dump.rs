//! Human-readable tree dumps.

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::error::{BoostError, ConfigError, Result};
use crate::repr::{NodeId, Tree};

use super::Booster;

/// Output format of [`Booster::dump_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    /// Indented lines: `0:[f0<0.5] yes=1,no=2,missing=1`.
    #[default]
    Text,
    /// One JSON object per tree with nested `children`.
    Json,
}

impl FromStr for DumpFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(DumpFormat::Text),
            "json" => Ok(DumpFormat::Json),
            other => Err(ConfigError::InvalidParam {
                key: "dump_format".into(),
                value: other.into(),
                expected: "text or json",
            }),
        }
    }
}

impl Booster {
    /// Render every tree, in ensemble order.
    ///
    /// Feature names come from `names`, then the model's stored names, then
    /// positional `f{i}`. `with_stats` adds split gain and node cover.
    ///
    /// # Errors
    ///
    /// [`BoostError::Index`] if a split uses a feature with no name.
    pub fn dump_model(
        &self,
        names: Option<&[String]>,
        with_stats: bool,
        format: DumpFormat,
    ) -> Result<Vec<String>> {
        let names = names.or(self.feature_names());
        self.forest()
            .trees()
            .map(|tree| match format {
                DumpFormat::Text => dump_text(tree, names, with_stats),
                DumpFormat::Json => dump_json(tree, names, with_stats),
            })
            .collect()
    }
}

fn feature_name(feature: u32, names: Option<&[String]>) -> Result<String> {
    match names {
        Some(names) => names
            .get(feature as usize)
            .cloned()
            .ok_or(BoostError::Index {
                what: "feature names",
                index: feature as usize,
                len: names.len(),
            }),
        None => Ok(format!("f{feature}")),
    }
}

fn missing_child(tree: &Tree, node: NodeId) -> NodeId {
    if tree.default_left(node) {
        tree.left_child(node)
    } else {
        tree.right_child(node)
    }
}

fn dump_text(tree: &Tree, names: Option<&[String]>, with_stats: bool) -> Result<String> {
    let mut out = String::new();
    let mut stack: Vec<(NodeId, usize)> = vec![(0, 0)];

    while let Some((node, depth)) = stack.pop() {
        for _ in 0..depth {
            out.push('\t');
        }
        if tree.is_leaf(node) {
            let _ = write!(out, "{node}:leaf={}", tree.leaf_value(node));
            if with_stats {
                let _ = write!(out, ",cover={}", tree.cover(node));
            }
        } else {
            let (left, right) = (tree.left_child(node), tree.right_child(node));
            let _ = write!(
                out,
                "{node}:[{}<{}] yes={left},no={right},missing={}",
                feature_name(tree.split_index(node), names)?,
                tree.split_threshold(node),
                missing_child(tree, node),
            );
            if with_stats {
                let _ = write!(out, ",gain={},cover={}", tree.gain(node), tree.cover(node));
            }
            stack.push((right, depth + 1));
            stack.push((left, depth + 1));
        }
        out.push('\n');
    }
    Ok(out)
}

fn dump_json(tree: &Tree, names: Option<&[String]>, with_stats: bool) -> Result<String> {
    let value = json_node(tree, 0, 0, names, with_stats)?;
    serde_json::to_string_pretty(&value).map_err(|e| ConfigError::Invalid(e.to_string()).into())
}

fn json_node(
    tree: &Tree,
    node: NodeId,
    depth: u32,
    names: Option<&[String]>,
    with_stats: bool,
) -> Result<Value> {
    if tree.is_leaf(node) {
        let mut v = json!({ "nodeid": node, "leaf": tree.leaf_value(node) });
        if with_stats {
            v["cover"] = json!(tree.cover(node));
        }
        return Ok(v);
    }

    let (left, right) = (tree.left_child(node), tree.right_child(node));
    let mut v = json!({
        "nodeid": node,
        "depth": depth,
        "split": feature_name(tree.split_index(node), names)?,
        "split_condition": tree.split_threshold(node),
        "yes": left,
        "no": right,
        "missing": missing_child(tree, node),
        "children": [
            json_node(tree, left, depth + 1, names, with_stats)?,
            json_node(tree, right, depth + 1, names, with_stats)?,
        ],
    });
    if with_stats {
        v["gain"] = json!(tree.gain(node));
        v["cover"] = json!(tree.cover(node));
    }
    Ok(v)
}
