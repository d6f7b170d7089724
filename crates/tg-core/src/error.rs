use crate::tree::TreeKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompactError {
    #[error("Shape mismatch at {path}: expected {expected}, found {found}")]
    Shape {
        path: String,
        expected: TreeKind,
        found: TreeKind,
    },
    #[error("Merge failed at {path}: {reason}")]
    Merge { path: String, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl CompactError {
    pub fn shape(path: impl Into<String>, expected: TreeKind, found: TreeKind) -> Self {
        Self::Shape { path: path.into(), expected, found }
    }

    pub fn merge(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Merge { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, CompactError>;
