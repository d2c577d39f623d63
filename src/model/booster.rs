//! Model state: ensemble, configuration, attributes and round counter.
//!
//! [`Booster`] is the unit of training, prediction and serialization.
//! Access components via [`forest()`](Booster::forest),
//! [`config()`](Booster::config) and [`attributes()`](Booster::attributes).
//!
//! # Concurrency
//!
//! Prediction methods take `&self` and never mutate; the type is
//! `Send + Sync`, so a trained model can be shared across threads with `Arc`
//! or scoped threads. Training and every other mutation take `&mut self`,
//! which makes the single-writer rule a compile-time property.

use std::borrow::Cow;
use std::collections::BTreeMap;

use ndarray::Array2;

use crate::data::{Dataset, normalize_missing};
use crate::error::{BoostError, ConfigError, Result};
use crate::inference::Predictor;
use crate::repr::{Forest, Tree};
use crate::training::{Objective, PredictionKind};
use crate::utils::Parallelism;

use super::{AttributeStore, Config, ParamValue};

/// Boosted tree ensemble with its configuration and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Booster {
    forest: Forest,
    objective: Objective,
    config: Config,
    attributes: AttributeStore,
    feature_names: Option<Vec<String>>,
    /// Feature count fixed by the first training call (or a loaded model).
    n_features: Option<usize>,
    /// Completed boosting rounds applied to this state.
    version: u32,
}

impl Booster {
    /// Create an empty model for the given configuration.
    ///
    /// The objective and base score are resolved immediately, so invalid
    /// values fail here rather than at the first round.
    pub fn new(config: Config) -> Result<Self> {
        let objective = Objective::from_config(&config)?;
        let forest = empty_forest(&objective, &config)?;
        Ok(Self {
            forest,
            objective,
            config,
            attributes: AttributeStore::new(),
            feature_names: None,
            n_features: None,
            version: 0,
        })
    }

    /// Reassemble a model from persisted parts.
    pub(crate) fn from_parts(
        forest: Forest,
        config: Config,
        attributes: AttributeStore,
        feature_names: Option<Vec<String>>,
        n_features: Option<usize>,
        version: u32,
    ) -> Result<Self> {
        let objective = Objective::from_config(&config)?;
        if objective.n_groups() != forest.n_groups() {
            return Err(BoostError::dimension(
                "output groups",
                objective.n_groups() as usize,
                forest.n_groups() as usize,
            ));
        }
        Ok(Self {
            forest,
            objective,
            config,
            attributes,
            feature_names,
            n_features,
            version,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    #[inline]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Number of completed boosting rounds recorded on this state.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Override the round counter, e.g. to resume numbering after a reload.
    ///
    /// Trees are not touched.
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Number of rounds stored in the ensemble.
    #[inline]
    pub fn boosted_rounds(&self) -> usize {
        self.forest.n_rounds()
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.forest.n_groups() as usize
    }

    /// Trained feature count, `None` before the first round.
    #[inline]
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Attach human-readable feature names (persisted with the model).
    pub fn set_feature_names(&mut self, names: Vec<String>) -> Result<()> {
        if let Some(n) = self.n_features {
            if names.len() != n {
                return Err(BoostError::dimension("feature names", n, names.len()));
            }
        }
        self.feature_names = Some(names);
        Ok(())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Update one parameter.
    ///
    /// Changing the objective is rejected once trees exist if it would change
    /// the number of output groups. On an empty model the base score follows
    /// the new configuration.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Result<()> {
        let mut config = self.config.clone();
        config.set(key, value);
        self.apply_config(config)
    }

    /// Configuration as a JSON document.
    pub fn save_config(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.config.to_json())
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }

    /// Replace the configuration from a JSON document produced by
    /// [`save_config`](Self::save_config).
    pub fn load_config(&mut self, json: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConfigError::Invalid(format!("invalid configuration JSON: {e}")))?;
        self.apply_config(Config::from_json(&value)?)
    }

    fn apply_config(&mut self, config: Config) -> Result<()> {
        let objective = Objective::from_config(&config)?;
        if self.forest.n_trees() == 0 {
            self.forest = empty_forest(&objective, &config)?;
        } else if objective.n_groups() != self.forest.n_groups() {
            return Err(ConfigError::GroupChange {
                current: self.forest.n_groups(),
                requested: objective.n_groups(),
            }
            .into());
        }
        self.objective = objective;
        self.config = config;
        Ok(())
    }

    // =========================================================================
    // Training support
    // =========================================================================

    /// Fix the feature count on first use; reject a different count later.
    pub(crate) fn bind_features(&mut self, n_features: usize) -> Result<()> {
        match self.n_features {
            None => {
                if let Some(names) = &self.feature_names {
                    if names.len() != n_features {
                        return Err(BoostError::dimension(
                            "training features",
                            names.len(),
                            n_features,
                        ));
                    }
                }
                self.n_features = Some(n_features);
                Ok(())
            }
            Some(n) if n == n_features => Ok(()),
            Some(n) => Err(BoostError::dimension("training features", n, n_features)),
        }
    }

    /// Append one round of fully built trees and bump the version.
    pub(crate) fn commit_round(&mut self, trees: Vec<Tree>) {
        self.forest.push_round(trees);
        self.version += 1;
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.attributes
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Predict a dataset, returning `[n_rows, n_groups]`.
    ///
    /// `kind` selects raw margins or link-transformed output.
    pub fn predict(&self, data: &Dataset, kind: PredictionKind) -> Result<Array2<f32>> {
        self.predict_with(data, kind, Parallelism::from_threads(0))
    }

    /// [`predict`](Self::predict) with explicit parallelism.
    pub fn predict_with(
        &self,
        data: &Dataset,
        kind: PredictionKind,
        parallelism: Parallelism,
    ) -> Result<Array2<f32>> {
        self.check_features("predict", data.n_features())?;
        Ok(self.predict_buffer(data.as_slice(), data.n_rows(), data.n_features(), kind, parallelism))
    }

    /// Predict directly from a row-major buffer of `n_rows * n_features`
    /// values without building a [`Dataset`].
    ///
    /// Values equal to `missing` are treated as missing (`NaN` always is).
    pub fn inplace_predict(
        &self,
        data: &[f32],
        n_rows: usize,
        n_features: usize,
        missing: f32,
        kind: PredictionKind,
    ) -> Result<Array2<f32>> {
        self.check_features("inplace_predict", n_features)?;
        let expected =
            BoostError::buffer_len("inplace_predict buffer", n_rows, n_features, data.len())?;
        if data.len() != expected {
            return Err(BoostError::dimension("inplace_predict buffer", expected, data.len()));
        }

        let data: Cow<'_, [f32]> = if !missing.is_nan() && data.contains(&missing) {
            let mut owned = data.to_vec();
            normalize_missing(&mut owned, missing);
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(data)
        };

        // Single-row requests skip the block machinery entirely.
        let parallelism = if n_rows <= 1 {
            Parallelism::Sequential
        } else {
            Parallelism::from_threads(0)
        };
        Ok(self.predict_buffer(&data, n_rows, n_features, kind, parallelism))
    }

    fn predict_buffer(
        &self,
        data: &[f32],
        n_rows: usize,
        n_features: usize,
        kind: PredictionKind,
        parallelism: Parallelism,
    ) -> Array2<f32> {
        let mut out =
            Predictor::new(&self.forest).predict_margins(data, n_rows, n_features, parallelism);
        if kind == PredictionKind::Transformed {
            self.transform_margins(&mut out);
        }
        out
    }

    /// Apply the objective's link function to `[n_rows, n_groups]` margins.
    pub fn transform_margins(&self, margins: &mut Array2<f32>) {
        for mut row in margins.rows_mut() {
            if let Some(row) = row.as_slice_mut() {
                self.objective.transform_row(row);
            }
        }
    }

    fn check_features(&self, context: &'static str, n_features: usize) -> Result<()> {
        match self.n_features {
            Some(n) if n != n_features => Err(BoostError::dimension(context, n, n_features)),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Insert or replace one attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.set(key, value);
    }

    /// Merge several attributes in one step.
    pub fn set_attrs<K, V, I>(&mut self, entries: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.attributes.merge(entries);
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// Snapshot of all attributes.
    pub fn get_attrs(&self) -> BTreeMap<String, String> {
        self.attributes.snapshot()
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    pub fn attr_names(&self) -> Vec<String> {
        self.attributes.names()
    }

    // =========================================================================
    // Slicing
    // =========================================================================

    /// Copy rounds `begin..end` (every `step`-th) into a new model.
    ///
    /// All output groups of each selected round are kept. The new model's
    /// version equals the number of selected rounds.
    pub fn slice(&self, begin: usize, end: usize, step: usize) -> Result<Booster> {
        let n_rounds = self.boosted_rounds();
        if end > n_rounds {
            return Err(BoostError::Index {
                what: "boosting rounds",
                index: end,
                len: n_rounds,
            });
        }
        if step == 0 || begin > end {
            return Err(ConfigError::Invalid(format!(
                "invalid slice {begin}..{end} step {step}"
            ))
            .into());
        }

        let forest = self.forest.slice_rounds((begin..end).step_by(step));
        let version = forest.n_rounds() as u32;
        Ok(Booster {
            forest,
            objective: self.objective,
            config: self.config.clone(),
            attributes: self.attributes.clone(),
            feature_names: self.feature_names.clone(),
            n_features: self.n_features,
            version,
        })
    }
}

fn empty_forest(objective: &Objective, config: &Config) -> Result<Forest> {
    let margin = objective.base_margin(config.base_score()?)?;
    let n_groups = objective.n_groups();
    Ok(Forest::new(n_groups, vec![margin; n_groups as usize]))
}
