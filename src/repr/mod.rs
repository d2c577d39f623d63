//! Tree and ensemble representation.

mod builder;
mod forest;
mod tree;

/// Node index local to a tree (0 = root).
pub type NodeId = u32;

pub use builder::TreeBuilder;
pub use forest::{Forest, ForestValidationError};
pub use tree::{Tree, TreeValidationError};
