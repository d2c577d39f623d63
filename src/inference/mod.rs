//! Ensemble inference.

mod predictor;

pub use predictor::{DEFAULT_BLOCK_SIZE, Predictor};
