//! Block predictor for tree ensemble inference.
//!
//! [`Predictor`] is the single evaluation routine behind batch prediction,
//! in-place prediction and incremental evaluation during training.
//!
//! # Determinism
//!
//! Every row is evaluated as `base_score[g]`, then `+= leaf` for trees
//! `0..n_trees` in insertion order. Rows are independent, so splitting rows
//! across threads never changes the floating-point result of any row.
//!
//! # Block Size
//!
//! Rows are processed in blocks of [`DEFAULT_BLOCK_SIZE`] (64, as XGBoost) so
//! that each rayon task amortizes its scheduling cost.

use ndarray::Array2;
use rayon::prelude::*;

use crate::repr::Forest;
use crate::utils::Parallelism;

/// Default block size for batch processing.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Read-only evaluator over a borrowed forest.
#[derive(Debug, Clone, Copy)]
pub struct Predictor<'f> {
    forest: &'f Forest,
    block_size: usize,
}

impl<'f> Predictor<'f> {
    #[inline]
    pub fn new(forest: &'f Forest) -> Self {
        Self {
            forest,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Override the number of rows per block.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.forest.n_groups() as usize
    }

    /// Margins for one row, written into `output` (length `n_groups`).
    #[inline]
    pub fn predict_row_into(&self, features: &[f32], output: &mut [f32]) {
        output.copy_from_slice(self.forest.base_score());
        self.accumulate_row(features, 0, output);
    }

    /// Add the outputs of trees `first_tree..` to existing margins.
    #[inline]
    pub fn accumulate_row(&self, features: &[f32], first_tree: usize, output: &mut [f32]) {
        for (tree, group) in self.forest.trees_with_groups().skip(first_tree) {
            output[group as usize] += tree.predict_row(features);
        }
    }

    /// Margins for a row-major buffer of `n_rows * n_features` values.
    ///
    /// Returns `[n_rows, n_groups]`.
    pub fn predict_margins(
        &self,
        features: &[f32],
        n_rows: usize,
        n_features: usize,
        parallelism: Parallelism,
    ) -> Array2<f32> {
        let mut output = Array2::from_shape_fn((n_rows, self.n_groups()), |(_, g)| {
            self.forest.base_score()[g]
        });
        self.accumulate_margins(features, n_features, 0, &mut output, parallelism);
        output
    }

    /// Add the outputs of trees `first_tree..` to a `[n_rows, n_groups]` buffer.
    pub fn accumulate_margins(
        &self,
        features: &[f32],
        n_features: usize,
        first_tree: usize,
        margins: &mut Array2<f32>,
        parallelism: Parallelism,
    ) {
        let n_groups = self.n_groups();
        let n_rows = margins.nrows();
        debug_assert_eq!(margins.ncols(), n_groups);
        debug_assert_eq!(features.len(), n_rows * n_features);

        if first_tree >= self.forest.n_trees() || n_rows == 0 {
            return;
        }
        let Some(out) = margins.as_slice_mut() else {
            unreachable!("prediction buffers are allocated in standard layout")
        };

        if n_features == 0 {
            for row_out in out.chunks_mut(n_groups) {
                self.accumulate_row(&[], first_tree, row_out);
            }
            return;
        }

        let block_rows = self.block_size;
        let run_block = |(block_out, block_in): (&mut [f32], &[f32])| {
            for (row_out, row_in) in block_out
                .chunks_mut(n_groups)
                .zip(block_in.chunks(n_features))
            {
                self.accumulate_row(row_in, first_tree, row_out);
            }
        };

        if parallelism.is_parallel() {
            out.par_chunks_mut(block_rows * n_groups)
                .zip(features.par_chunks(block_rows * n_features))
                .for_each(run_block);
        } else {
            out.chunks_mut(block_rows * n_groups)
                .zip(features.chunks(block_rows * n_features))
                .for_each(run_block);
        }
    }
}
