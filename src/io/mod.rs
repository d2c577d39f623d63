//! Model persistence.
//!
//! The save/load API lives on [`Booster`](crate::model::Booster)
//! (`save`, `load`, `save_to_writer`, `load_from_reader`, `to_bytes`,
//! `from_bytes`). Saved state covers the trees, configuration, attributes,
//! feature names and the round counter, so a loaded model predicts and
//! resumes training exactly like the original.

mod convert;
pub mod native;
mod payload;

pub use native::{FormatFlags, FormatHeader, HEADER_SIZE, MAGIC};
