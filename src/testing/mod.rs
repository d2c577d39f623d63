//! Test support: seeded data generators and a reference grow collaborator.
//!
//! Used by the crate's own tests, benchmarks and demos. Everything here is
//! deterministic for a given seed.

mod data;
mod grower;

pub use data::{
    binary_dataset, binary_targets, multiclass_dataset, multiclass_targets, random_dense_f32,
    random_dense_with_missing, regression_dataset, regression_targets_linear, split_indices,
};
pub use grower::StumpGrower;

/// Default tolerance for floating point comparisons.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;
