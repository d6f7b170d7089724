//! Device compactor — groups structurally interchangeable devices so each
//! group can be configured as one bulk object with a repeat multiplier.
//!
//! Stages:
//! 1. Comparator — same nested shape, leaf values ignored
//! 2. Merger — fold a member's leaf values into the group's value sequences
//! 3. Compactor — bucket devices first-match in creation order

pub mod comparator;
pub mod compactor;
pub mod group;
pub mod merger;

pub use comparator::Comparator;
pub use compactor::{CompactionStats, DeviceCompactor};
pub use group::{CompactedView, Group};
pub use merger::{CompactTree, Merger};

pub use tg_core::{CompactError, CompactionConfig, ConfigNode, Device, Field, Node, Result, Tree};
