//! Input data containers.

mod dataset;

pub use dataset::Dataset;
pub(crate) use dataset::normalize_missing;
