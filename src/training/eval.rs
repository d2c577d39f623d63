//! Watch-list evaluation during training.
//!
//! Provides [`WatchList`] (named evaluation datasets), [`MetricValue`],
//! [`MetricHistory`] and the [`Evaluator`] that keeps per-dataset margins up
//! to date as trees are appended.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::Array2;

use crate::data::Dataset;
use crate::inference::Predictor;
use crate::model::Booster;
use crate::utils::Parallelism;

use super::metrics::EvalMetric;
use super::objectives::PredictionKind;

// =============================================================================
// WatchList
// =============================================================================

/// Named datasets scored after every round, in insertion order.
///
/// Reusing a name replaces the earlier dataset and keeps its position.
/// Only the last entry drives early stopping.
#[derive(Debug, Clone, Default)]
pub struct WatchList<'a> {
    entries: IndexMap<String, &'a Dataset>,
}

impl<'a> WatchList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dataset (builder pattern).
    pub fn with(mut self, name: impl Into<String>, dataset: &'a Dataset) -> Self {
        self.insert(name, dataset);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, dataset: &'a Dataset) {
        self.entries.insert(name.into(), dataset);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a Dataset)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn get(&self, name: &str) -> Option<&'a Dataset> {
        self.entries.get(name).copied()
    }
}

// =============================================================================
// MetricValue
// =============================================================================

/// A computed metric value, named `<dataset>-<metric>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
}

impl MetricValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:.6}", self.name, self.value)
    }
}

/// Render one round as `[round]\tname:value\t...`.
pub fn format_eval_line(round: u32, values: &[MetricValue]) -> String {
    let mut line = format!("[{round}]");
    for v in values {
        line.push('\t');
        line.push_str(&v.to_string());
    }
    line
}

// =============================================================================
// MetricHistory
// =============================================================================

/// Per-dataset sequence of the early-stopping metric, one value per round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricHistory {
    values: IndexMap<String, Vec<f64>>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dataset: &str, value: f64) {
        match self.values.get_mut(dataset) {
            Some(v) => v.push(value),
            None => {
                self.values.insert(dataset.to_string(), vec![value]);
            }
        }
    }

    pub fn get(&self, dataset: &str) -> Option<&[f64]> {
        self.values.get(dataset).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of rounds recorded for the longest series.
    pub fn n_rounds(&self) -> usize {
        self.values.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Scores for one round, flattened watch-major (`train-rmse`, `train-mae`, `test-rmse`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct RoundScores {
    pub values: Vec<MetricValue>,
    /// Last metric of each watched dataset, in watch-list order.
    pub primary: Vec<f64>,
}

/// Computes watch-list metrics each round from incrementally updated margins.
///
/// Margins start as a full prediction of the model at construction; each
/// [`advance`](Self::advance) adds only the trees appended since. Per-row
/// accumulation order matches [`Predictor`], so the cached margins equal a
/// fresh prediction bit for bit.
#[derive(Debug)]
pub struct Evaluator<'a> {
    metrics: &'a [Arc<dyn EvalMetric>],
    margins: Vec<Array2<f32>>,
    trees_seen: usize,
    parallelism: Parallelism,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        booster: &Booster,
        watches: &WatchList<'_>,
        metrics: &'a [Arc<dyn EvalMetric>],
        parallelism: Parallelism,
    ) -> Self {
        let predictor = Predictor::new(booster.forest());
        let margins = watches
            .iter()
            .map(|(_, ds)| {
                predictor.predict_margins(ds.as_slice(), ds.n_rows(), ds.n_features(), parallelism)
            })
            .collect();
        Self {
            metrics,
            margins,
            trees_seen: booster.n_trees(),
            parallelism,
        }
    }

    /// Add the contribution of trees appended since the last call.
    pub fn advance(&mut self, booster: &Booster, watches: &WatchList<'_>) {
        let predictor = Predictor::new(booster.forest());
        for (margins, (_, ds)) in self.margins.iter_mut().zip(watches.iter()) {
            predictor.accumulate_margins(
                ds.as_slice(),
                ds.n_features(),
                self.trees_seen,
                margins,
                self.parallelism,
            );
        }
        self.trees_seen = booster.n_trees();
    }

    /// Score every metric on every watched dataset.
    pub fn evaluate(&self, booster: &Booster, watches: &WatchList<'_>) -> RoundScores {
        let mut values = Vec::with_capacity(watches.len() * self.metrics.len());
        let mut primary = Vec::with_capacity(watches.len());

        for ((name, ds), margins) in watches.iter().zip(self.margins.iter()) {
            let mut transformed: Option<Array2<f32>> = None;
            let mut last = f64::NAN;
            for metric in self.metrics {
                let preds: &Array2<f32> = match metric.prediction_kind() {
                    PredictionKind::Margin => margins,
                    PredictionKind::Transformed => transformed.get_or_insert_with(|| {
                        let mut t = margins.clone();
                        booster.transform_margins(&mut t);
                        t
                    }),
                };
                last = metric.eval(preds.view(), ds);
                values.push(MetricValue::new(format!("{name}-{}", metric.name()), last));
            }
            primary.push(last);
        }

        RoundScores { values, primary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Config;
    use crate::repr::TreeBuilder;
    use crate::training::metrics::Rmse;
    use ndarray::array;

    #[test]
    fn watch_list_preserves_order_and_replaces() {
        let a = Dataset::new(array![[1.0f32]]);
        let b = Dataset::new(array![[2.0f32]]);
        let watches = WatchList::new().with("train", &a).with("test", &b).with("train", &b);
        let names: Vec<_> = watches.names().collect();
        assert_eq!(names, vec!["train", "test"]);
        assert_eq!(watches.get("train").unwrap().row_buffer(0), &[2.0]);
    }

    #[test]
    fn eval_line_format() {
        let line = format_eval_line(
            3,
            &[MetricValue::new("train-rmse", 0.5), MetricValue::new("test-rmse", 0.25)],
        );
        assert_eq!(line, "[3]\ttrain-rmse:0.500000\ttest-rmse:0.250000");
    }

    #[test]
    fn history_appends_per_dataset() {
        let mut h = MetricHistory::new();
        h.push("train", 1.0);
        h.push("test", 2.0);
        h.push("train", 0.5);
        assert_eq!(h.get("train"), Some(&[1.0, 0.5][..]));
        assert_eq!(h.n_rounds(), 2);
        assert_eq!(h.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["train", "test"]);
    }

    #[test]
    fn incremental_margins_match_fresh_prediction() {
        let ds = Dataset::new(array![[0.0f32], [1.0], [f32::NAN]])
            .with_labels(vec![0.0, 1.0, 1.0])
            .unwrap();
        let watches = WatchList::new().with("test", &ds);
        let metrics: Vec<Arc<dyn EvalMetric>> = vec![Arc::new(Rmse)];

        let mut booster = Booster::new(Config::new()).unwrap();
        booster.bind_features(1).unwrap();
        let mut evaluator = Evaluator::new(&booster, &watches, &metrics, Parallelism::Sequential);

        for v in [0.1f32, 0.2, 0.3] {
            let mut b = TreeBuilder::new();
            let root = b.split(0, 0.5, false, 1.0, 3.0);
            let l = b.leaf(-v, 1.0);
            let r = b.leaf(v, 2.0);
            b.set_children(root, l, r);
            booster.commit_round(vec![b.build().unwrap()]);
            evaluator.advance(&booster, &watches);
        }

        let fresh = booster.predict(&ds, PredictionKind::Margin).unwrap();
        assert_eq!(evaluator.margins[0], fresh);

        let scores = evaluator.evaluate(&booster, &watches);
        assert_eq!(scores.values.len(), 1);
        assert_eq!(scores.values[0].name, "test-rmse");
        assert_eq!(scores.primary.len(), 1);
    }
}
