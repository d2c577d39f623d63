//! Evaluation metrics for watch-list scoring.
//!
//! Metrics are separate from objectives: a model trained with one loss may be
//! monitored with several metrics. Predictions arrive as `[n_rows, n_groups]`
//! in the space given by [`EvalMetric::prediction_kind`]; labels and weights
//! come from the evaluated [`Dataset`].
//!
//! # Available Metrics
//!
//! ## Regression
//! - [`Rmse`] (`rmse`), [`Mae`] (`mae`)
//!
//! ## Classification
//! - [`LogLoss`] (`logloss`), [`ErrorRate`] (`error`), [`Auc`] (`auc`)
//! - [`MulticlassLogLoss`] (`mlogloss`), [`MulticlassError`] (`merror`)

mod classification;
mod regression;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::ArrayView2;

use crate::data::Dataset;
use crate::error::ConfigError;
use crate::model::Config;

use super::objectives::{Objective, PredictionKind};

pub use classification::{Auc, ErrorRate, LogLoss, MulticlassError, MulticlassLogLoss};
pub use regression::{Mae, Rmse};

// =============================================================================
// EvalMetric
// =============================================================================

/// A named scoring function over predictions and a labeled dataset.
pub trait EvalMetric: Send + Sync + fmt::Debug {
    /// Identifier used in evaluation logs (`test-<name>`).
    fn name(&self) -> &str;

    /// Score `predictions` (`[n_rows, n_groups]`) against `dataset`.
    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64;

    /// Whether higher values indicate a better model.
    fn higher_is_better(&self) -> bool {
        false
    }

    /// Prediction space this metric expects.
    fn prediction_kind(&self) -> PredictionKind {
        PredictionKind::Transformed
    }

    /// Whether evaluated datasets must carry labels.
    fn requires_labels(&self) -> bool {
        true
    }
}

/// Weighted mean of `f(row)` over labeled rows; `NaN` without labels.
pub(crate) fn weighted_mean(dataset: &Dataset, mut f: impl FnMut(usize, f32) -> f64) -> f64 {
    let Some(labels) = dataset.labels() else {
        return f64::NAN;
    };
    let weights = dataset.weights();
    let mut sum = 0.0f64;
    let mut total = 0.0f64;
    for (i, &y) in labels.iter().enumerate() {
        let w = weights.map_or(1.0, |w| w[i] as f64);
        sum += w * f(i, y);
        total += w;
    }
    if total > 0.0 { sum / total } else { f64::NAN }
}

// =============================================================================
// Custom Metric
// =============================================================================

/// Type alias for the custom metric compute function.
pub type CustomMetricFn = dyn Fn(ArrayView2<'_, f32>, &Dataset) -> f64 + Send + Sync + 'static;

/// A caller-supplied metric defined by a closure.
///
/// ```
/// use treeboost::training::{CustomMetric, EvalMetric};
///
/// let always_one = CustomMetric::new("one", |_preds, _ds| 1.0).with_higher_is_better(true);
/// assert_eq!(always_one.name(), "one");
/// assert!(always_one.higher_is_better());
/// ```
#[derive(Clone)]
pub struct CustomMetric {
    name: String,
    compute_fn: Arc<CustomMetricFn>,
    prediction_kind: PredictionKind,
    higher_is_better: bool,
    requires_labels: bool,
}

impl CustomMetric {
    /// Create a metric that expects transformed predictions, lower is better
    /// and needs no labels.
    pub fn new(
        name: impl Into<String>,
        compute_fn: impl Fn(ArrayView2<'_, f32>, &Dataset) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            compute_fn: Arc::new(compute_fn),
            prediction_kind: PredictionKind::Transformed,
            higher_is_better: false,
            requires_labels: false,
        }
    }

    pub fn with_higher_is_better(mut self, higher_is_better: bool) -> Self {
        self.higher_is_better = higher_is_better;
        self
    }

    pub fn with_prediction_kind(mut self, kind: PredictionKind) -> Self {
        self.prediction_kind = kind;
        self
    }

    pub fn with_requires_labels(mut self, requires_labels: bool) -> Self {
        self.requires_labels = requires_labels;
        self
    }
}

impl EvalMetric for CustomMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        (self.compute_fn)(predictions, dataset)
    }

    fn higher_is_better(&self) -> bool {
        self.higher_is_better
    }

    fn prediction_kind(&self) -> PredictionKind {
        self.prediction_kind
    }

    fn requires_labels(&self) -> bool {
        self.requires_labels
    }
}

impl fmt::Debug for CustomMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMetric")
            .field("name", &self.name)
            .field("prediction_kind", &self.prediction_kind)
            .field("higher_is_better", &self.higher_is_better)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Named metrics available to `eval_metric` configuration.
///
/// Starts with the built-in metrics; callers may register their own or
/// replace a built-in under the same name.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: IndexMap<String, Arc<dyn EvalMetric>>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl MetricRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            metrics: IndexMap::new(),
        }
    }

    /// A registry holding every built-in metric.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Rmse));
        registry.register(Arc::new(Mae));
        registry.register(Arc::new(LogLoss));
        registry.register(Arc::new(ErrorRate::default()));
        registry.register(Arc::new(Auc));
        registry.register(Arc::new(MulticlassLogLoss));
        registry.register(Arc::new(MulticlassError));
        registry
    }

    /// Register a metric under its own name, returning any metric it replaced.
    pub fn register(&mut self, metric: Arc<dyn EvalMetric>) -> Option<Arc<dyn EvalMetric>> {
        self.metrics.insert(metric.name().to_string(), metric)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn EvalMetric>, ConfigError> {
        self.metrics
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownMetric(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Metrics named by `eval_metric`, or the objective's default.
    pub fn resolve(
        &self,
        config: &Config,
        objective: &Objective,
    ) -> Result<Vec<Arc<dyn EvalMetric>>, ConfigError> {
        let names = config.eval_metrics();
        if names.is_empty() {
            return Ok(vec![self.get(objective.default_metric())?]);
        }
        names.iter().map(|n| self.get(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_to_objective_metric() {
        let registry = MetricRegistry::default();
        let metrics = registry
            .resolve(&Config::new(), &Objective::Logistic)
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name(), "logloss");
    }

    #[test]
    fn resolve_configured_metrics_in_order() {
        let registry = MetricRegistry::default();
        let config = Config::new().with("eval_metric", "auc,error");
        let names: Vec<_> = registry
            .resolve(&config, &Objective::Logistic)
            .unwrap()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["auc", "error"]);
    }

    #[test]
    fn unknown_metric() {
        let registry = MetricRegistry::default();
        let config = Config::new().with("eval_metric", "ndcg");
        assert_eq!(
            registry.resolve(&config, &Objective::SquaredError).unwrap_err(),
            ConfigError::UnknownMetric("ndcg".into())
        );
    }

    #[test]
    fn register_replaces_builtin() {
        let mut registry = MetricRegistry::default();
        let replaced = registry.register(Arc::new(CustomMetric::new("rmse", |_, _| 0.0)));
        assert!(replaced.is_some());
        let metric = registry.get("rmse").unwrap();
        let ds = Dataset::new(ndarray::array![[1.0f32]]);
        assert_eq!(metric.eval(ndarray::array![[5.0f32]].view(), &ds), 0.0);
    }
}
