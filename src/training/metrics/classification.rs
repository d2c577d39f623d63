//! Classification metrics.

use ndarray::ArrayView2;

use crate::data::Dataset;

use super::{EvalMetric, weighted_mean};

const EPS: f64 = 1e-15;

/// Binary cross-entropy on probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLoss;

impl EvalMetric for LogLoss {
    fn name(&self) -> &str {
        "logloss"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        weighted_mean(dataset, |i, y| {
            let p = (predictions[[i, 0]] as f64).clamp(EPS, 1.0 - EPS);
            let y = y as f64;
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
    }
}

/// Fraction of rows whose thresholded probability disagrees with the label.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRate {
    pub threshold: f32,
}

impl Default for ErrorRate {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl EvalMetric for ErrorRate {
    fn name(&self) -> &str {
        "error"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        weighted_mean(dataset, |i, y| {
            let predicted = predictions[[i, 0]] > self.threshold;
            let actual = y > 0.5;
            if predicted != actual { 1.0 } else { 0.0 }
        })
    }
}

/// Area under the ROC curve (weighted, ties counted as half).
#[derive(Debug, Clone, Copy, Default)]
pub struct Auc;

impl EvalMetric for Auc {
    fn name(&self) -> &str {
        "auc"
    }

    fn higher_is_better(&self) -> bool {
        true
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        let Some(labels) = dataset.labels() else {
            return f64::NAN;
        };
        let weights = dataset.weights();

        // NaN scores cannot be ranked.
        let mut order: Vec<usize> = (0..labels.len())
            .filter(|&i| !predictions[[i, 0]].is_nan())
            .collect();
        order.sort_by(|&a, &b| predictions[[a, 0]].total_cmp(&predictions[[b, 0]]));

        let mut area = 0.0f64;
        let mut neg_below = 0.0f64;
        let mut pos_total = 0.0f64;
        let mut i = 0;
        while i < order.len() {
            let score = predictions[[order[i], 0]];
            let (mut pos, mut neg) = (0.0f64, 0.0f64);
            while i < order.len() && predictions[[order[i], 0]].total_cmp(&score).is_eq() {
                let row = order[i];
                let w = weights.map_or(1.0, |w| w[row] as f64);
                if labels[row] > 0.5 {
                    pos += w;
                } else {
                    neg += w;
                }
                i += 1;
            }
            area += pos * (neg_below + 0.5 * neg);
            neg_below += neg;
            pos_total += pos;
        }

        if pos_total == 0.0 || neg_below == 0.0 {
            return f64::NAN;
        }
        area / (pos_total * neg_below)
    }
}

/// Multi-class cross-entropy on class probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulticlassLogLoss;

impl EvalMetric for MulticlassLogLoss {
    fn name(&self) -> &str {
        "mlogloss"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        let n_classes = predictions.ncols();
        weighted_mean(dataset, |i, y| {
            let class = (y as usize).min(n_classes - 1);
            -(predictions[[i, class]] as f64).clamp(EPS, 1.0 - EPS).ln()
        })
    }
}

/// Fraction of rows whose most probable class differs from the label.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulticlassError;

impl EvalMetric for MulticlassError {
    fn name(&self) -> &str {
        "merror"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        weighted_mean(dataset, |i, y| {
            let row = predictions.row(i);
            let argmax = row
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (k, &p)| {
                    if p > best.1 { (k, p) } else { best }
                })
                .0;
            if argmax != y as usize { 1.0 } else { 0.0 }
        })
    }
}
