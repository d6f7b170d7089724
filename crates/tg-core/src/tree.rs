//! Rendered device configuration trees.
//!
//! A [`Tree`] is the snapshot a device produces when rendered: nested
//! mappings, ordered sequences, and scalar leaves. Comparison and merging
//! work on this closed set of shapes only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Terminal value of a rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// The three shapes a tree node can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Mapping,
    Sequence,
    Scalar,
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
            Self::Scalar => "scalar",
        };
        f.write_str(s)
    }
}

/// Rendered configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Tree {
    Mapping(BTreeMap<String, Tree>),
    Sequence(Vec<Tree>),
    Scalar(Scalar),
}

impl Tree {
    pub fn null() -> Self {
        Tree::Scalar(Scalar::Null)
    }

    pub fn mapping() -> Self {
        Tree::Mapping(BTreeMap::new())
    }

    pub fn kind(&self) -> TreeKind {
        match self {
            Tree::Mapping(_) => TreeKind::Mapping,
            Tree::Sequence(_) => TreeKind::Sequence,
            Tree::Scalar(_) => TreeKind::Scalar,
        }
    }

    /// Mappings and sequences carry structure; scalars are leaves.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Tree::Scalar(_))
    }

    /// True for a null scalar, which stands for a field left unset.
    pub fn is_absent(&self) -> bool {
        matches!(self, Tree::Scalar(Scalar::Null))
    }

    /// Look up a key of a mapping. Returns `None` for other shapes.
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Tree::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut BTreeMap<String, Tree>> {
        match self {
            Tree::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Tree]> {
        match self {
            Tree::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Tree>> {
        match self {
            Tree::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::null()
    }
}

impl From<Value> for Tree {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Tree::Scalar(Scalar::Null),
            Value::Bool(b) => Tree::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Tree::Scalar(Scalar::Number(n)),
            Value::String(s) => Tree::Scalar(Scalar::String(s)),
            Value::Array(items) => Tree::Sequence(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => {
                Tree::Mapping(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<Tree> for Value {
    fn from(t: Tree) -> Self {
        match t {
            Tree::Scalar(Scalar::Null) => Value::Null,
            Tree::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Tree::Scalar(Scalar::Number(n)) => Value::Number(n),
            Tree::Scalar(Scalar::String(s)) => Value::String(s),
            Tree::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Tree::Mapping(map) => {
                let fields = map.into_iter().map(|(k, v)| (k, Value::from(v)));
                Value::Object(fields.collect::<Map<_, _>>())
            }
        }
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Tree {
    fn from(n: i64) -> Self {
        Tree::Scalar(Scalar::Number(n.into()))
    }
}

impl From<u64> for Tree {
    fn from(n: u64) -> Self {
        Tree::Scalar(Scalar::Number(n.into()))
    }
}

impl From<i32> for Tree {
    fn from(n: i32) -> Self {
        Tree::Scalar(Scalar::Number(n.into()))
    }
}

impl From<u32> for Tree {
    fn from(n: u32) -> Self {
        Tree::Scalar(Scalar::Number(n.into()))
    }
}

/// Non-finite floats have no JSON form and render as null.
impl From<f64> for Tree {
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(|n| Tree::Scalar(Scalar::Number(n)))
            .unwrap_or_else(Tree::null)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Sequence(items)
    }
}
