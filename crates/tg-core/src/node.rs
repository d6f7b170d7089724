//! Declared configuration nodes and the device contract.

use crate::tree::Tree;
use std::collections::BTreeMap;

/// Declared kind of a node's direct child field.
pub enum Field<'a> {
    /// Terminal value, read from the rendered tree.
    Leaf,
    /// Nested block with its own declared fields.
    Node(&'a dyn Node),
    /// Repeated nested block, e.g. several address ranges on one device.
    List(Vec<&'a dyn Node>),
}

/// A node of a declared configuration schema.
pub trait Node {
    /// Direct child fields in schema order. Must be stable across calls on
    /// nodes of the same schema.
    fn properties(&self) -> Vec<(String, Field<'_>)>;

    /// Schema default for a field the user left unset.
    fn default_of(&self, name: &str) -> Option<Tree>;
}

/// One emulated device's configuration.
pub trait Device: Node {
    /// Snapshot of the current configuration. Pure function of device state.
    fn render(&self) -> Tree;
}

#[derive(Debug, Clone)]
enum Entry {
    Leaf(Option<Tree>),
    Node(ConfigNode),
    List(Vec<ConfigNode>),
}

/// Generic declared node: an ordered list of fields plus schema defaults.
///
/// Unset leaves are omitted from [`Device::render`] and resolved through
/// [`Node::default_of`].
#[derive(Debug, Clone, Default)]
pub struct ConfigNode {
    entries: Vec<(String, Entry)>,
    defaults: BTreeMap<String, Tree>,
}

impl ConfigNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leaf(mut self, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.put(name.into(), Entry::Leaf(Some(value.into())));
        self
    }

    /// Declare a leaf without setting it.
    pub fn with_unset(mut self, name: impl Into<String>) -> Self {
        self.put(name.into(), Entry::Leaf(None));
        self
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn with_node(mut self, name: impl Into<String>, node: ConfigNode) -> Self {
        self.put(name.into(), Entry::Node(node));
        self
    }

    pub fn with_list(mut self, name: impl Into<String>, nodes: Vec<ConfigNode>) -> Self {
        self.put(name.into(), Entry::List(nodes));
        self
    }

    /// Set (or clear, with `None`) a leaf, declaring it if needed.
    pub fn set_leaf(&mut self, name: &str, value: Option<Tree>) {
        self.put(name.to_string(), Entry::Leaf(value));
    }

    /// The configured value of a leaf, `None` when unset or not a leaf.
    pub fn leaf(&self, name: &str) -> Option<&Tree> {
        self.entries.iter().find(|(n, _)| n == name).and_then(|(_, e)| match e {
            Entry::Leaf(v) => v.as_ref(),
            _ => None,
        })
    }

    fn put(&mut self, name: String, entry: Entry) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }
}

impl Node for ConfigNode {
    fn properties(&self) -> Vec<(String, Field<'_>)> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let field = match entry {
                    Entry::Leaf(_) => Field::Leaf,
                    Entry::Node(n) => Field::Node(n as &dyn Node),
                    Entry::List(items) => {
                        Field::List(items.iter().map(|n| n as &dyn Node).collect())
                    }
                };
                (name.clone(), field)
            })
            .collect()
    }

    fn default_of(&self, name: &str) -> Option<Tree> {
        self.defaults.get(name).cloned()
    }
}

impl Device for ConfigNode {
    fn render(&self) -> Tree {
        let mut map = BTreeMap::new();
        for (name, entry) in &self.entries {
            let rendered = match entry {
                Entry::Leaf(Some(v)) => v.clone(),
                Entry::Leaf(None) => continue,
                Entry::Node(n) => n.render(),
                Entry::List(items) => Tree::Sequence(items.iter().map(|n| n.render()).collect()),
            };
            map.insert(name.clone(), rendered);
        }
        Tree::Mapping(map)
    }
}
