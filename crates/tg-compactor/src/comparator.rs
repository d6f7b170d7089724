//! Structural comparison of rendered device trees.

use std::collections::BTreeMap;
use tg_core::{CompactError, CompactionConfig, Result, Tree};
use tracing::trace;

/// Decides whether two rendered trees have the same nested shape.
///
/// Scalar leaves are never looked at; only which mapping/sequence keys are
/// present, and recursively their shapes. Sequences are compared pairwise by
/// index, so two devices with the same sub-blocks in a different order do not
/// match.
pub struct Comparator<'c> {
    config: &'c CompactionConfig,
}

impl<'c> Comparator<'c> {
    pub fn new(config: &'c CompactionConfig) -> Self {
        Self { config }
    }

    /// `Ok(false)` for a plain mismatch, `Err(Shape)` when the two sides are
    /// not even the same kind of tree.
    pub fn matches(&self, a: &Tree, b: &Tree) -> Result<bool> {
        self.matches_at(a, b, "$")
    }

    fn matches_at(&self, a: &Tree, b: &Tree, path: &str) -> Result<bool> {
        match (a, b) {
            (Tree::Mapping(ma), Tree::Mapping(mb)) => self.match_mappings(ma, mb, path),
            (Tree::Sequence(sa), Tree::Sequence(sb)) => {
                if sa.len() != sb.len() {
                    trace!(path, left = sa.len(), right = sb.len(), "sequence length differs");
                    return Ok(false);
                }
                for (i, (x, y)) in sa.iter().zip(sb).enumerate() {
                    if !self.matches_at(x, y, &format!("{path}[{i}]"))? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Tree::Scalar(_), Tree::Scalar(_)) => Ok(true),
            _ => Err(CompactError::shape(path, a.kind(), b.kind())),
        }
    }

    fn match_mappings(
        &self,
        a: &BTreeMap<String, Tree>,
        b: &BTreeMap<String, Tree>,
        path: &str,
    ) -> Result<bool> {
        let keys_a = self.structural_keys(a);
        let keys_b = self.structural_keys(b);
        if keys_a != keys_b {
            trace!(path, ?keys_a, ?keys_b, "structural keys differ");
            return Ok(false);
        }
        if let Some(key) = keys_a.iter().find(|k| self.config.is_unsupported(k)) {
            trace!(path, key = key.as_str(), "unsupported node");
            return Ok(false);
        }
        for key in keys_a {
            if !self.matches_at(&a[key], &b[key], &format!("{path}.{key}"))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // BTreeMap iteration is already sorted.
    fn structural_keys<'t>(&self, m: &'t BTreeMap<String, Tree>) -> Vec<&'t String> {
        m.iter()
            .filter(|(k, v)| v.is_structural() && !self.config.is_ignored(k))
            .map(|(k, _)| k)
            .collect()
    }
}
