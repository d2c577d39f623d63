//! Split-statistics feature importance.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{BoostError, ConfigError, Result};
use crate::model::Booster;
use crate::repr::Forest;

/// Statistic aggregated per feature over all split nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportanceType {
    /// Number of splits using the feature.
    #[default]
    Weight,
    /// Mean gain of those splits.
    Gain,
    /// Summed gain.
    TotalGain,
    /// Mean cover (hessian sum) of those splits.
    Cover,
    /// Summed cover.
    TotalCover,
}

impl ImportanceType {
    pub const ALL: [ImportanceType; 5] = [
        ImportanceType::Weight,
        ImportanceType::Gain,
        ImportanceType::TotalGain,
        ImportanceType::Cover,
        ImportanceType::TotalCover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImportanceType::Weight => "weight",
            ImportanceType::Gain => "gain",
            ImportanceType::TotalGain => "total_gain",
            ImportanceType::Cover => "cover",
            ImportanceType::TotalCover => "total_cover",
        }
    }
}

impl fmt::Display for ImportanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportanceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "weight" | "frequency" => Ok(ImportanceType::Weight),
            "gain" => Ok(ImportanceType::Gain),
            "total_gain" => Ok(ImportanceType::TotalGain),
            "cover" => Ok(ImportanceType::Cover),
            "total_cover" => Ok(ImportanceType::TotalCover),
            other => Err(ConfigError::InvalidParam {
                key: "importance_type".into(),
                value: other.into(),
                expected: "one of weight, gain, total_gain, cover, total_cover",
            }),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SplitStats {
    count: u64,
    gain: f64,
    cover: f64,
}

/// Aggregate split statistics per feature.
///
/// Only features used by at least one split appear, ordered by feature
/// index. Keys are `names[i]` when names are given, `f{i}` otherwise.
///
/// # Errors
///
/// [`BoostError::Index`] if a used feature index has no entry in `names`.
pub fn feature_importance(
    forest: &Forest,
    kind: ImportanceType,
    names: Option<&[String]>,
) -> Result<IndexMap<String, f64>> {
    let mut stats: BTreeMap<u32, SplitStats> = BTreeMap::new();
    for tree in forest.trees() {
        for node in tree.split_nodes() {
            let s = stats.entry(tree.split_index(node)).or_default();
            s.count += 1;
            s.gain += f64::from(tree.gain(node));
            s.cover += f64::from(tree.cover(node));
        }
    }

    stats
        .into_iter()
        .map(|(feature, s)| {
            let key = match names {
                Some(names) => names
                    .get(feature as usize)
                    .cloned()
                    .ok_or(BoostError::Index {
                        what: "feature names",
                        index: feature as usize,
                        len: names.len(),
                    })?,
                None => format!("f{feature}"),
            };
            let n = s.count as f64;
            let value = match kind {
                ImportanceType::Weight => n,
                ImportanceType::Gain => s.gain / n,
                ImportanceType::TotalGain => s.gain,
                ImportanceType::Cover => s.cover / n,
                ImportanceType::TotalCover => s.cover,
            };
            Ok((key, value))
        })
        .collect()
}

impl Booster {
    /// Feature importance with explicit names.
    ///
    /// With `names == None` the model's stored feature names are used, and
    /// positional `f{i}` names when it has none.
    pub fn feature_importance(
        &self,
        kind: ImportanceType,
        names: Option<&[String]>,
    ) -> Result<IndexMap<String, f64>> {
        feature_importance(self.forest(), kind, names.or(self.feature_names()))
    }

    /// Importance keyed by the model's own feature names.
    pub fn get_score(&self, kind: ImportanceType) -> Result<IndexMap<String, f64>> {
        self.feature_importance(kind, None)
    }
}
