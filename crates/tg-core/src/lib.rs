//! Shared model for the device compaction engine: rendered trees,
//! declared device nodes, configuration and errors.

pub mod config;
pub mod error;
pub mod node;
pub mod tree;

pub use config::CompactionConfig;
pub use error::{CompactError, Result};
pub use node::{ConfigNode, Device, Field, Node};
pub use tree::{Scalar, Tree, TreeKind};
