//! Dataset container.
//!
//! This module provides [`Dataset`], the read-only input handed to training,
//! evaluation and batch prediction.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{BoostError, Result};

/// Row-major feature matrix with optional labels and sample weights.
///
/// # Storage Layout
///
/// Features are stored as `[n_rows, n_features]` in standard (C) order, so
/// each row is one contiguous slice. Missing values are stored as `NaN`;
/// a caller-chosen sentinel is converted to `NaN` at construction.
///
/// # Example
///
/// ```
/// use treeboost::data::Dataset;
/// use ndarray::array;
///
/// let ds = Dataset::new(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]])
///     .with_labels(vec![0.0, 1.0, 0.0])
///     .unwrap();
///
/// assert_eq!(ds.n_rows(), 3);
/// assert_eq!(ds.n_features(), 2);
/// assert_eq!(ds.row_buffer(1), &[3.0, 4.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature data: `[n_rows, n_features]`.
    features: Array2<f32>,

    /// Labels, length = n_rows. Class index for multi-class objectives.
    labels: Option<Array1<f32>>,

    /// Sample weights, length = n_rows.
    weights: Option<Array1<f32>>,
}

impl Dataset {
    /// Create a dataset from an owned row-major matrix.
    ///
    /// Non-standard layouts are copied into standard order so that every row
    /// can be borrowed as a slice.
    pub fn new(features: Array2<f32>) -> Self {
        let features = if features.is_standard_layout() {
            features
        } else {
            features.as_standard_layout().into_owned()
        };
        Self {
            features,
            labels: None,
            weights: None,
        }
    }

    /// Create a dataset from a flat row-major buffer.
    ///
    /// Every value equal to `missing` is stored as `NaN`. Passing `f32::NAN`
    /// keeps the data unchanged.
    pub fn from_dense(data: Vec<f32>, n_rows: usize, n_features: usize, missing: f32) -> Result<Self> {
        let expected =
            BoostError::buffer_len("Dataset::from_dense", n_rows, n_features, data.len())?;
        if data.len() != expected {
            return Err(BoostError::dimension("Dataset::from_dense", expected, data.len()));
        }
        let mut data = data;
        normalize_missing(&mut data, missing);
        let features = Array2::from_shape_vec((n_rows, n_features), data)
            .map_err(|_| BoostError::dimension("Dataset::from_dense", expected, 0))?;
        Ok(Self::new(features))
    }

    /// Attach labels (builder pattern).
    pub fn with_labels(mut self, labels: impl Into<Array1<f32>>) -> Result<Self> {
        let labels = labels.into();
        if labels.len() != self.n_rows() {
            return Err(BoostError::dimension("labels", self.n_rows(), labels.len()));
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Attach sample weights (builder pattern).
    pub fn with_weights(mut self, weights: impl Into<Array1<f32>>) -> Result<Self> {
        let weights = weights.into();
        if weights.len() != self.n_rows() {
            return Err(BoostError::dimension("weights", self.n_rows(), weights.len()));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Feature matrix view `[n_rows, n_features]`.
    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    /// One row as a contiguous slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= n_rows`.
    #[inline]
    pub fn row_buffer(&self, row: usize) -> &[f32] {
        let n_features = self.n_features();
        let flat = self
            .features
            .as_slice()
            .unwrap_or_else(|| unreachable!("dataset features are kept in standard layout"));
        &flat[row * n_features..(row + 1) * n_features]
    }

    /// The full row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.features
            .as_slice()
            .unwrap_or_else(|| unreachable!("dataset features are kept in standard layout"))
    }

    #[inline]
    pub fn labels(&self) -> Option<ArrayView1<'_, f32>> {
        self.labels.as_ref().map(|l| l.view())
    }

    #[inline]
    pub fn weights(&self) -> Option<ArrayView1<'_, f32>> {
        self.weights.as_ref().map(|w| w.view())
    }

    #[inline]
    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    /// Copy a subset of rows (labels and weights follow) into a new dataset.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), rows),
            labels: self.labels.as_ref().map(|l| l.select(Axis(0), rows)),
            weights: self.weights.as_ref().map(|w| w.select(Axis(0), rows)),
        }
    }
}

/// Replace every occurrence of `missing` with `NaN` in place.
#[inline]
pub(crate) fn normalize_missing(data: &mut [f32], missing: f32) {
    if missing.is_nan() {
        return;
    }
    for v in data.iter_mut().filter(|v| **v == missing) {
        *v = f32::NAN;
    }
}
