//! Objective functions: link transforms, base-score conversion and gradients.
//!
//! The objective is selected from the `objective` configuration key. The
//! runtime only needs it for three things: the number of output groups, the
//! output transform applied to margins, and the default evaluation metric.
//! Gradients are exposed for grow collaborators.

use ndarray::{ArrayView1, ArrayView2};

use crate::error::ConfigError;
use crate::model::Config;

/// First and second order gradient of the loss for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradPair {
    pub grad: f32,
    pub hess: f32,
}

/// Whether predictions are raw margins or passed through the link function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionKind {
    /// Base score plus summed leaf outputs.
    Margin,
    /// Margins passed through the objective's link function.
    #[default]
    Transformed,
}

/// Supported training objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `reg:squarederror` (alias `reg:linear`), identity link.
    SquaredError,
    /// `binary:logistic`, sigmoid link.
    Logistic,
    /// `binary:logitraw`, logistic loss with margin output.
    LogitRaw,
    /// `multi:softprob`, softmax over `n_classes` output groups.
    Softprob { n_classes: u32 },
}

impl Objective {
    /// Resolve the objective from configuration (default `reg:squarederror`).
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let name = config.get_str("objective").unwrap_or("reg:squarederror");
        match name {
            "reg:squarederror" | "reg:linear" => Ok(Self::SquaredError),
            "binary:logistic" => Ok(Self::Logistic),
            "binary:logitraw" => Ok(Self::LogitRaw),
            "multi:softprob" => {
                let n_classes = config.get_u32("num_class")?.ok_or_else(|| {
                    ConfigError::InvalidParam {
                        key: "num_class".into(),
                        value: "<unset>".into(),
                        expected: "an integer >= 2 for multi:softprob",
                    }
                })?;
                if n_classes < 2 {
                    return Err(ConfigError::InvalidParam {
                        key: "num_class".into(),
                        value: n_classes.to_string(),
                        expected: "an integer >= 2 for multi:softprob",
                    });
                }
                Ok(Self::Softprob { n_classes })
            }
            other => Err(ConfigError::UnknownObjective(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SquaredError => "reg:squarederror",
            Self::Logistic => "binary:logistic",
            Self::LogitRaw => "binary:logitraw",
            Self::Softprob { .. } => "multi:softprob",
        }
    }

    /// Number of output groups (trees per round).
    #[inline]
    pub fn n_groups(&self) -> u32 {
        match self {
            Self::Softprob { n_classes } => *n_classes,
            _ => 1,
        }
    }

    /// Name of the metric used when none is configured.
    pub fn default_metric(&self) -> &'static str {
        match self {
            Self::SquaredError => "rmse",
            Self::Logistic | Self::LogitRaw => "logloss",
            Self::Softprob { .. } => "mlogloss",
        }
    }

    /// Convert a base score given in output space into margin space.
    pub fn base_margin(&self, base_score: f32) -> Result<f32, ConfigError> {
        match self {
            Self::SquaredError | Self::Softprob { .. } => Ok(base_score),
            Self::Logistic | Self::LogitRaw => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    return Err(ConfigError::InvalidParam {
                        key: "base_score".into(),
                        value: base_score.to_string(),
                        expected: "a probability in (0, 1) for logistic objectives",
                    });
                }
                Ok((base_score / (1.0 - base_score)).ln())
            }
        }
    }

    /// Apply the link function to one row of margins in place.
    #[inline]
    pub fn transform_row(&self, row: &mut [f32]) {
        match self {
            Self::SquaredError | Self::LogitRaw => {}
            Self::Logistic => {
                for x in row.iter_mut() {
                    *x = sigmoid(*x);
                }
            }
            Self::Softprob { .. } => softmax_row_inplace(row),
        }
    }

    /// Gradients of the loss for output `group`, given current margins
    /// `[n_rows, n_groups]`.
    pub fn gradients(
        &self,
        margins: ArrayView2<'_, f32>,
        labels: ArrayView1<'_, f32>,
        weights: Option<ArrayView1<'_, f32>>,
        group: usize,
    ) -> Vec<GradPair> {
        let mut scratch = vec![0.0f32; margins.ncols()];
        margins
            .rows()
            .into_iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (row, &y))| {
                let w = weights.map_or(1.0, |w| w[i]);
                let (grad, hess) = match self {
                    Self::SquaredError => (row[group] - y, 1.0),
                    Self::Logistic | Self::LogitRaw => {
                        let p = sigmoid(row[group]);
                        (p - y, (p * (1.0 - p)).max(1e-16))
                    }
                    Self::Softprob { .. } => {
                        scratch.iter_mut().zip(row.iter()).for_each(|(s, &m)| *s = m);
                        softmax_row_inplace(&mut scratch);
                        let p = scratch[group];
                        let target = if y as usize == group { 1.0 } else { 0.0 };
                        (p - target, (2.0 * p * (1.0 - p)).max(1e-16))
                    }
                };
                GradPair {
                    grad: grad * w,
                    hess: hess * w,
                }
            })
            .collect()
    }
}

// =============================================================================
// Transform Functions
// =============================================================================

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Apply softmax in place to a single row of logits.
#[inline]
fn softmax_row_inplace(row: &mut [f32]) {
    if row.is_empty() {
        return;
    }

    let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.0f32;
    for x in row.iter_mut() {
        *x = (*x - max_val).exp();
        sum += *x;
    }

    if sum > 0.0 {
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
}
