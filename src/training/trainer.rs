//! Training loop controller.
//!
//! [`Trainer`] drives boosting rounds against a [`Booster`]:
//!
//! 1. call the [`TreeGrower`] with the current model and training data
//! 2. validate and append the returned trees (version + 1)
//! 3. score every watch-list dataset with the active metrics
//! 4. consult early stopping on the last dataset's last metric
//!
//! Growing trees (histograms, split finding) is the grower's business; the
//! controller only owns the round bookkeeping around it.

use std::sync::Arc;
use std::time::Instant;

use bon::Builder;
use ndarray::ArrayViewMut2;

use crate::data::Dataset;
use crate::error::{BoostError, ConfigError, Result};
use crate::model::{Booster, Config};
use crate::repr::Tree;
use crate::utils::{Parallelism, run_with_threads};

use super::callback::{EarlyStopAction, EarlyStopping};
use super::eval::{Evaluator, MetricHistory, MetricValue, WatchList, format_eval_line};
use super::logger::{TrainingLogger, Verbosity};
use super::metrics::{EvalMetric, MetricRegistry};

// =============================================================================
// Grow collaborator
// =============================================================================

/// Error type returned by growers.
pub type GrowError = Box<dyn std::error::Error + Send + Sync>;

/// Builds the trees of the next boosting round.
///
/// Must return exactly one tree per output group, in group order. The
/// controller treats growers as deterministic functions of their inputs.
pub trait TreeGrower: Send + Sync {
    fn grow(
        &self,
        model: &Booster,
        train: &Dataset,
        config: &Config,
    ) -> std::result::Result<Vec<Tree>, GrowError>;
}

impl<F> TreeGrower for F
where
    F: Fn(&Booster, &Dataset, &Config) -> std::result::Result<Vec<Tree>, GrowError> + Send + Sync,
{
    fn grow(
        &self,
        model: &Booster,
        train: &Dataset,
        config: &Config,
    ) -> std::result::Result<Vec<Tree>, GrowError> {
        self(model, train, config)
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Training loop parameters.
///
/// Model hyperparameters live in the model's [`Config`]; these only control
/// the loop itself.
///
/// ```
/// use treeboost::training::{TrainParams, Verbosity};
///
/// let params = TrainParams::builder()
///     .n_rounds(100)
///     .early_stopping_rounds(10)
///     .verbosity(Verbosity::Info)
///     .build()
///     .unwrap();
/// assert_eq!(params.early_stopping_rounds, Some(10));
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct TrainParams {
    /// Target total round count. Training runs rounds `version..n_rounds`,
    /// so a resumed model continues its numbering. Default: 10.
    #[builder(default = 10)]
    pub n_rounds: u32,

    /// Stop after this many rounds without improvement on the last
    /// watch-list dataset. `None` disables early stopping.
    pub early_stopping_rounds: Option<u32>,

    /// Caller-supplied metrics; when empty, `eval_metric` from the model
    /// configuration (or the objective's default) is used.
    #[builder(default)]
    pub metrics: Vec<Arc<dyn EvalMetric>>,

    /// Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,

    /// 0 = auto, 1 = sequential, n = dedicated pool of n threads.
    #[builder(default)]
    pub n_threads: usize,
}

impl<S: train_params_builder::IsComplete> TrainParamsBuilder<S> {
    /// Build and validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when two caller metrics share a name or a
    /// metric name is empty.
    pub fn build(self) -> std::result::Result<TrainParams, ConfigError> {
        let params = self.__build_internal();
        params.validate()?;
        Ok(params)
    }
}

impl TrainParams {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for metric in &self.metrics {
            let name = metric.name();
            if name.is_empty() {
                return Err(ConfigError::Invalid("metric names must not be empty".into()));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::Invalid(format!("duplicate metric '{name}'")));
            }
        }
        Ok(())
    }
}

impl Default for TrainParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("default training parameters are valid")
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Outcome of a [`Trainer::train`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainSummary {
    /// Rounds executed by this call.
    pub rounds_run: u32,
    /// Last metric of each watched dataset, per round.
    pub history: MetricHistory,
    /// Every metric of every watched dataset, per round.
    pub evaluations: Vec<(u32, Vec<MetricValue>)>,
    pub best_round: Option<u32>,
    pub best_score: Option<f64>,
    pub stopped_early: bool,
}

impl TrainSummary {
    /// Per-round evaluation lines (`[r]\ttest-rmse:0.123456`).
    pub fn eval_log(&self) -> Vec<String> {
        self.evaluations
            .iter()
            .map(|(round, values)| format_eval_line(*round, values))
            .collect()
    }
}

// =============================================================================
// Trainer
// =============================================================================

/// Round controller parameterized by a grow collaborator.
#[derive(Debug)]
pub struct Trainer<G> {
    grower: G,
    params: TrainParams,
    registry: MetricRegistry,
}

impl<G: TreeGrower> Trainer<G> {
    pub fn new(grower: G, params: TrainParams) -> Self {
        Self {
            grower,
            params,
            registry: MetricRegistry::default(),
        }
    }

    /// Use a custom registry for `eval_metric` lookups.
    pub fn with_registry(mut self, registry: MetricRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[inline]
    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    #[inline]
    pub fn grower(&self) -> &G {
        &self.grower
    }

    /// Train `booster` up to `params.n_rounds` total rounds.
    ///
    /// `metrics_out`, if given, must be `[watches.len(), >= n_rounds]`; the
    /// last metric of watch `j` at round `r` is written to `[j, r]` as soon
    /// as the round completes. Slots of rounds that never run are untouched.
    ///
    /// # Errors
    ///
    /// - [`ConfigError`] for early stopping without watches, unknown
    ///   metrics or unlabeled watched data
    /// - [`BoostError::Dimension`] when feature counts disagree with the
    ///   model or each other, or `metrics_out` has the wrong shape
    /// - [`BoostError::Grow`] when the grower fails; the failed round is
    ///   not committed
    pub fn train(
        &self,
        booster: &mut Booster,
        dtrain: &Dataset,
        watches: &WatchList<'_>,
        metrics_out: Option<ArrayViewMut2<'_, f32>>,
    ) -> Result<TrainSummary> {
        run_with_threads(self.params.n_threads, |parallelism| {
            self.train_inner(booster, dtrain, watches, metrics_out, parallelism)
        })?
    }

    fn train_inner(
        &self,
        booster: &mut Booster,
        dtrain: &Dataset,
        watches: &WatchList<'_>,
        mut metrics_out: Option<ArrayViewMut2<'_, f32>>,
        parallelism: Parallelism,
    ) -> Result<TrainSummary> {
        let n_rounds = self.params.n_rounds;
        let start = booster.version();
        let n_features = dtrain.n_features();

        // Validate everything before touching the model.
        if self.params.early_stopping_rounds.is_some() && watches.is_empty() {
            return Err(ConfigError::EarlyStoppingWithoutWatchList.into());
        }
        if let Some(expected) = booster.n_features() {
            if expected != n_features {
                return Err(BoostError::dimension("training features", expected, n_features));
            }
        }
        for (_, ds) in watches.iter() {
            if ds.n_features() != n_features {
                return Err(BoostError::dimension("watch-list features", n_features, ds.n_features()));
            }
        }

        let metrics = self.resolve_metrics(booster, watches)?;
        if let Some(buf) = &metrics_out {
            if buf.nrows() != watches.len() {
                return Err(BoostError::dimension("metric buffer rows", watches.len(), buf.nrows()));
            }
            if buf.ncols() < n_rounds as usize {
                return Err(BoostError::dimension(
                    "metric buffer rounds",
                    n_rounds as usize,
                    buf.ncols(),
                ));
            }
        }

        let maximize = match booster.config().maximize_metrics()? {
            Some(m) => m,
            None => metrics.last().is_some_and(|m| m.higher_is_better()),
        };
        let mut early_stopping = self
            .params
            .early_stopping_rounds
            .map(|patience| EarlyStopping::new(patience, maximize));

        booster.bind_features(n_features)?;

        let mut evaluator = (!watches.is_empty())
            .then(|| Evaluator::new(booster, watches, &metrics, parallelism));

        let mut logger = TrainingLogger::new(self.params.verbosity);
        logger.start_training(start, n_rounds, watches.names());
        if start >= n_rounds {
            logger.warn(&format!(
                "model already has {start} rounds; nothing to do for n_rounds = {n_rounds}"
            ));
        }

        let mut summary = TrainSummary::default();

        for round in start..n_rounds {
            let round_start = Instant::now();

            let trees = self
                .grower
                .grow(booster, dtrain, booster.config())
                .map_err(|source| BoostError::Grow { round, source })?;
            check_round(&trees, booster.n_groups(), n_features)
                .map_err(|source| BoostError::Grow { round, source })?;
            booster.commit_round(trees);
            summary.rounds_run += 1;

            if let Some(evaluator) = evaluator.as_mut() {
                evaluator.advance(booster, watches);
                let scores = evaluator.evaluate(booster, watches);

                for (j, ((name, _), &value)) in watches.iter().zip(&scores.primary).enumerate() {
                    summary.history.push(name, value);
                    if let Some(buf) = metrics_out.as_mut() {
                        buf[[j, round as usize]] = value as f32;
                    }
                }
                logger.log_round(&format_eval_line(round, &scores.values));
                summary.evaluations.push((round, scores.values));

                if let Some(es) = early_stopping.as_mut() {
                    // The last watch-list entry alone decides.
                    let value = scores.primary.last().copied().unwrap_or(f64::NAN);
                    if es.update(round, value) == EarlyStopAction::Stop {
                        logger.log_early_stopping(
                            round,
                            es.best_round(),
                            es.best_value().unwrap_or(f64::NAN),
                            metrics.last().map_or("", |m| m.name()),
                        );
                        summary.stopped_early = true;
                        logger.log_round_timing(round, round_start.elapsed());
                        break;
                    }
                }
            }

            logger.log_round_timing(round, round_start.elapsed());
        }

        if let Some(es) = &early_stopping {
            if let Some(best) = es.best_value() {
                summary.best_round = Some(es.best_round());
                summary.best_score = Some(best);
                let attrs = booster.attributes_mut();
                attrs.set("best_iteration", es.best_round().to_string());
                attrs.set("best_score", best.to_string());
            }
        }

        logger.finish_training(summary.rounds_run);
        Ok(summary)
    }

    fn resolve_metrics(
        &self,
        booster: &Booster,
        watches: &WatchList<'_>,
    ) -> Result<Vec<Arc<dyn EvalMetric>>> {
        if watches.is_empty() {
            return Ok(Vec::new());
        }
        let metrics = if self.params.metrics.is_empty() {
            self.registry.resolve(booster.config(), &booster.objective())?
        } else {
            self.params.metrics.clone()
        };

        for (name, ds) in watches.iter() {
            if let Some(metric) = metrics.iter().find(|m| m.requires_labels() && !ds.has_labels()) {
                return Err(ConfigError::MissingLabels {
                    dataset: name.to_string(),
                    metric: metric.name().to_string(),
                }
                .into());
            }
        }
        Ok(metrics)
    }
}

/// Grower output must be one valid tree per group splitting on known features.
fn check_round(trees: &[Tree], n_groups: usize, n_features: usize) -> std::result::Result<(), GrowError> {
    if trees.len() != n_groups {
        return Err(format!("grower returned {} trees for {n_groups} output groups", trees.len()).into());
    }
    for tree in trees {
        tree.validate()?;
        tree.validate_features(n_features)?;
    }
    Ok(())
}
