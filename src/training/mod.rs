//! Training loop control.
//!
//! - [`Trainer`]: drives boosting rounds through a [`TreeGrower`]
//! - [`EarlyStopping`] / [`should_early_stop`]: patience-based halting
//! - [`EvalMetric`], [`MetricRegistry`]: watch-list scoring
//! - [`Objective`]: gradients and output transforms
//! - [`TrainingLogger`]: verbosity-gated `tracing` output
//! - [`cross_validate`]: k-fold evaluation

mod callback;
mod cv;
mod eval;
mod logger;
pub mod metrics;
mod objectives;
mod trainer;

pub use callback::{EarlyStopAction, EarlyStopping, should_early_stop};
pub use cv::cross_validate;
pub use eval::{Evaluator, MetricHistory, MetricValue, RoundScores, WatchList, format_eval_line};
pub use logger::{TrainingLogger, Verbosity};
pub use metrics::{
    Auc, CustomMetric, ErrorRate, EvalMetric, LogLoss, Mae, MetricRegistry, MulticlassError,
    MulticlassLogLoss, Rmse,
};
pub use objectives::{GradPair, Objective, PredictionKind};
pub use trainer::{GrowError, TrainParams, TrainSummary, Trainer, TreeGrower};

