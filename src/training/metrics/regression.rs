//! Regression metrics.

use ndarray::ArrayView2;

use crate::data::Dataset;

use super::{EvalMetric, weighted_mean};

/// Root mean squared error of the first output column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rmse;

impl EvalMetric for Rmse {
    fn name(&self) -> &str {
        "rmse"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        weighted_mean(dataset, |i, y| {
            let d = predictions[[i, 0]] as f64 - y as f64;
            d * d
        })
        .sqrt()
    }
}

/// Mean absolute error of the first output column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mae;

impl EvalMetric for Mae {
    fn name(&self) -> &str {
        "mae"
    }

    fn eval(&self, predictions: ArrayView2<'_, f32>, dataset: &Dataset) -> f64 {
        weighted_mean(dataset, |i, y| (predictions[[i, 0]] as f64 - y as f64).abs())
    }
}
