//! Seeded synthetic data.

use rand::prelude::*;

use crate::data::Dataset;

/// Generate random dense features in row-major order.
///
/// Values are uniform in `[min, max]`.
pub fn random_dense_f32(rows: usize, cols: usize, seed: u64, min: f32, max: f32) -> Vec<f32> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    (0..rows * cols)
        .map(|_| min + rng.r#gen::<f32>() * width)
        .collect()
}

/// Like [`random_dense_f32`], with each value replaced by `NaN` with
/// probability `missing_rate`.
pub fn random_dense_with_missing(
    rows: usize,
    cols: usize,
    seed: u64,
    missing_rate: f64,
) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    random_dense_f32(rows, cols, seed, 0.0, 1.0)
        .into_iter()
        .map(|x| if rng.gen_bool(missing_rate) { f32::NAN } else { x })
        .collect()
}

/// Regression targets from a random linear model of the features plus
/// uniform noise. `NaN` features contribute nothing.
pub fn regression_targets_linear(
    features_row_major: &[f32],
    rows: usize,
    cols: usize,
    seed: u64,
    noise_amplitude: f32,
) -> Vec<f32> {
    assert_eq!(features_row_major.len(), rows * cols);
    let mut rng = StdRng::seed_from_u64(seed);

    let weights: Vec<f32> = (0..cols).map(|_| rng.r#gen::<f32>() * 2.0 - 1.0).collect();
    let bias: f32 = rng.r#gen::<f32>() * 0.5 - 0.25;

    features_row_major
        .chunks_exact(cols.max(1))
        .take(rows)
        .map(|row| {
            let mut y = bias;
            for (x, w) in row.iter().zip(&weights) {
                if !x.is_nan() {
                    y += x * w;
                }
            }
            if noise_amplitude > 0.0 {
                y += (rng.r#gen::<f32>() * 2.0 - 1.0) * noise_amplitude;
            }
            y
        })
        .collect()
}

/// 0/1 labels: whether the first feature exceeds 0.5 (missing counts as 0).
pub fn binary_targets(features_row_major: &[f32], cols: usize) -> Vec<f32> {
    features_row_major
        .chunks_exact(cols)
        .map(|row| if row[0] > 0.5 { 1.0 } else { 0.0 })
        .collect()
}

/// Class labels `0..n_classes` from equal-width bins of the first feature,
/// assumed to lie in `[0, 1]`.
pub fn multiclass_targets(features_row_major: &[f32], cols: usize, n_classes: usize) -> Vec<f32> {
    features_row_major
        .chunks_exact(cols)
        .map(|row| {
            let x = if row[0].is_nan() { 0.0 } else { row[0].clamp(0.0, 1.0) };
            ((x * n_classes as f32) as usize).min(n_classes - 1) as f32
        })
        .collect()
}

/// Labeled regression dataset with features in `[0, 1]`.
pub fn regression_dataset(rows: usize, cols: usize, seed: u64) -> Dataset {
    let x = random_dense_f32(rows, cols, seed, 0.0, 1.0);
    let y = regression_targets_linear(&x, rows, cols, seed ^ 0x5eed, 0.05);
    labeled(x, y, rows, cols)
}

/// Labeled binary classification dataset with features in `[0, 1]`.
pub fn binary_dataset(rows: usize, cols: usize, seed: u64) -> Dataset {
    let x = random_dense_f32(rows, cols, seed, 0.0, 1.0);
    let y = binary_targets(&x, cols);
    labeled(x, y, rows, cols)
}

/// Labeled multiclass dataset with features in `[0, 1]`.
pub fn multiclass_dataset(rows: usize, cols: usize, n_classes: usize, seed: u64) -> Dataset {
    let x = random_dense_f32(rows, cols, seed, 0.0, 1.0);
    let y = multiclass_targets(&x, cols, n_classes);
    labeled(x, y, rows, cols)
}

fn labeled(x: Vec<f32>, y: Vec<f32>, rows: usize, cols: usize) -> Dataset {
    Dataset::from_dense(x, rows, cols, f32::NAN)
        .and_then(|d| d.with_labels(y))
        .unwrap_or_else(|e| panic!("generated data is consistent: {e}"))
}

/// Deterministic train/valid split indices.
///
/// Returns `(train_idx, valid_idx)`.
pub fn split_indices(rows: usize, valid_fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    assert!((0.0..1.0).contains(&valid_fraction));
    let mut idx: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let valid_len = (((rows as f32) * valid_fraction).round() as usize).min(rows);
    let (valid, train) = idx.split_at(valid_len);
    (train.to_vec(), valid.to_vec())
}
