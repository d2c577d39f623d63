//! The boosted model and its configuration.

mod attributes;
mod booster;
mod config;
mod dump;

pub use attributes::AttributeStore;
pub use booster::Booster;
pub use config::{Config, ParamValue};
pub use dump::DumpFormat;
