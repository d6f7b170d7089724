use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Static knobs recognized by the comparator and merger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Structural keys that make a device ineligible for compaction.
    pub unsupported_nodes: BTreeSet<String>,
    /// Fields skipped by both comparison and merge.
    pub ignore_keys: BTreeSet<String>,
    /// Field identifying each member individually.
    pub name_key: String,
    /// Field collecting member names once a group holds two or more devices.
    pub name_list_key: String,
}

impl CompactionConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn with_unsupported_node(mut self, name: impl Into<String>) -> Self {
        self.unsupported_nodes.insert(name.into());
        self
    }

    pub fn with_ignore_key(mut self, name: impl Into<String>) -> Self {
        self.ignore_keys.insert(name.into());
        self
    }

    pub fn is_unsupported(&self, key: &str) -> bool {
        self.unsupported_nodes.contains(key)
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignore_keys.contains(key)
    }
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            unsupported_nodes: ["sr_te_policies"].iter().map(|s| s.to_string()).collect(),
            ignore_keys: ["container_name", "name_list"].iter().map(|s| s.to_string()).collect(),
            name_key: "name".into(),
            name_list_key: "name_list".into(),
        }
    }
}
