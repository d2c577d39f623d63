//! Model explainability.
//!
//! Feature importance from split statistics:
//! - **weight**: number of splits using each feature
//! - **gain** / **total_gain**: mean / summed split gain
//! - **cover** / **total_cover**: mean / summed split cover
//!
//! ```ignore
//! use treeboost::explainability::ImportanceType;
//!
//! let scores = booster.get_score(ImportanceType::TotalGain)?;
//! ```

mod importance;

pub use importance::{ImportanceType, feature_importance};
