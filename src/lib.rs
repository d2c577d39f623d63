//! treeboost: a boosted tree ensemble runtime.
//!
//! Drives training rounds through a pluggable tree grower, watches
//! evaluation datasets with early stopping, serves thread-safe batch and
//! in-place prediction, and persists models in a versioned binary format.
//!
//! # Key Types
//!
//! - [`Booster`] - Model state: trees, configuration, attributes, version
//! - [`Trainer`] / [`TrainParams`] - Round controller and loop parameters
//! - [`TreeGrower`] - The collaborator that builds each round's trees
//! - [`Dataset`] - Row-major features with optional labels and weights
//! - [`BoostError`] - Error taxonomy for every fallible operation
//!
//! # Training
//!
//! ```
//! use treeboost::testing::{StumpGrower, regression_dataset};
//! use treeboost::{Booster, Config, TrainParams, Trainer, WatchList};
//!
//! let dtrain = regression_dataset(100, 4, 0);
//! let params = TrainParams::builder().n_rounds(10).build().unwrap();
//! let trainer = Trainer::new(StumpGrower, params);
//!
//! let mut booster = Booster::new(Config::new().with("eta", 0.3)).unwrap();
//! let watches = WatchList::new().with("train", &dtrain);
//! let summary = trainer.train(&mut booster, &dtrain, &watches, None).unwrap();
//!
//! assert_eq!(booster.version(), 10);
//! assert_eq!(summary.rounds_run, 10);
//! ```

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod data;
pub mod error;
pub mod explainability;
pub mod inference;
pub mod io;
pub mod model;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{BoostError, ConfigError, FormatError, Result};

pub use model::{AttributeStore, Booster, Config, DumpFormat, ParamValue};

pub use training::{
    EvalMetric, Objective, PredictionKind, TrainParams, TrainSummary, Trainer, TreeGrower,
    Verbosity, WatchList, cross_validate, should_early_stop,
};

pub use data::Dataset;

pub use explainability::ImportanceType;

pub use utils::{Parallelism, run_with_threads};
