//! Folding a group member's leaf values into the group's compact tree.

use std::collections::{BTreeMap, BTreeSet};
use tg_core::{CompactError, CompactionConfig, Field, Node, Result, Tree, TreeKind};

/// Member index of the first fold: the founder is member 1.
const FIRST_FOLD: usize = 2;

/// A group's merged tree plus the paths of the leaves already folded into
/// value sequences.
///
/// A folded leaf is itself a sequence, so its kind alone cannot tell it
/// apart from a repeated sub-block; the path set can.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactTree {
    tree: Tree,
    folded: BTreeSet<String>,
}

impl CompactTree {
    /// Start from the founder's rendered tree.
    pub fn new(founder: Tree) -> Self {
        Self { tree: founder, folded: BTreeSet::new() }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }
}

/// Stand-in for blocks the incoming member renders but does not declare.
struct Undeclared;

impl Node for Undeclared {
    fn properties(&self) -> Vec<(String, Field<'_>)> {
        Vec::new()
    }

    fn default_of(&self, _name: &str) -> Option<Tree> {
        None
    }
}

struct Fold<'f> {
    member_index: usize,
    folded: &'f mut BTreeSet<String>,
}

impl Fold<'_> {
    /// Open a value sequence: the founder's value, `filler` for every member
    /// in between that did not carry the field, then the incoming value.
    fn open(
        &mut self,
        target: &mut BTreeMap<String, Tree>,
        key: &str,
        path: &str,
        seed: Tree,
        filler: Tree,
        value: Tree,
    ) {
        let mut values = Vec::with_capacity(self.member_index);
        values.push(seed);
        values.extend(std::iter::repeat(filler).take(self.member_index - FIRST_FOLD));
        values.push(value);
        target.insert(key.to_string(), Tree::Sequence(values));
        self.folded.insert(path.to_string());
    }
}

/// Folds one more member into a compact tree, walking the member's declared
/// fields so that unset leaves resolve to their schema defaults.
///
/// Every leaf carried by either side ends up with one value per member:
/// leaves the incoming member lacks get its default (or null), and leaves
/// first seen on a later member are back-filled for the earlier ones.
pub struct Merger<'c> {
    config: &'c CompactionConfig,
}

impl<'c> Merger<'c> {
    pub fn new(config: &'c CompactionConfig) -> Self {
        Self { config }
    }

    /// Fold `incoming` (the rendered `node`) into `compact` as member number
    /// `member_index` (1-based, so the first call for a group passes 2).
    ///
    /// Must be called exactly once per member beyond the founder.
    pub fn merge<N: Node + ?Sized>(
        &self,
        compact: &mut CompactTree,
        incoming: &Tree,
        node: &N,
        member_index: usize,
    ) -> Result<()> {
        if member_index < FIRST_FOLD {
            let reason = format!("invalid member index {member_index}");
            return Err(CompactError::merge("$", reason));
        }
        let mut fold = Fold { member_index, folded: &mut compact.folded };
        self.merge_at(&mut fold, &mut compact.tree, incoming, node, "$")
    }

    fn merge_at<N: Node + ?Sized>(
        &self,
        fold: &mut Fold<'_>,
        compact: &mut Tree,
        incoming: &Tree,
        node: &N,
        path: &str,
    ) -> Result<()> {
        let compact_kind = compact.kind();
        let target = compact
            .as_mapping_mut()
            .ok_or_else(|| CompactError::shape(path, TreeKind::Mapping, compact_kind))?;
        let source = incoming
            .as_mapping()
            .ok_or_else(|| CompactError::shape(path, TreeKind::Mapping, incoming.kind()))?;

        let name_key = &self.config.name_key;
        let list_key = &self.config.name_list_key;
        let mut visited = BTreeSet::new();
        let mut declares_name = false;

        for (name, field) in node.properties() {
            if self.config.is_ignored(&name) {
                continue;
            }
            if name == *name_key {
                declares_name = true;
                continue;
            }
            let field_path = format!("{path}.{name}");
            visited.insert(name.clone());
            match field {
                Field::List(children) => {
                    let Some((dst, src)) = paired(target, source, &name, &field_path)? else {
                        continue;
                    };
                    let (dst_items, src_items) = sequences(dst, src, &field_path)?;
                    if src_items.len() != children.len() {
                        return Err(CompactError::merge(field_path, "sub-block count differs"));
                    }
                    let items = dst_items.iter_mut().zip(src_items).zip(children);
                    for (i, ((d, s), child)) in items.enumerate() {
                        let item_path = format!("{field_path}[{i}]");
                        self.merge_at(fold, d, s, child, &item_path)?;
                    }
                }
                Field::Node(child) => {
                    let Some((dst, src)) = paired(target, source, &name, &field_path)? else {
                        continue;
                    };
                    self.merge_at(fold, dst, src, child, &field_path)?;
                }
                Field::Leaf => self.fold_leaf(fold, target, source, node, &name, &field_path)?,
            }
        }

        let list_path = format!("{path}.{list_key}");
        let carries_name = declares_name
            || target.contains_key(name_key)
            || source.contains_key(name_key)
            || fold.folded.contains(&list_path);
        if carries_name && !self.config.is_ignored(name_key) {
            self.fold_name(fold, target, source, node, &list_path)?;
        }

        let rest: BTreeSet<String> = target
            .keys()
            .chain(source.keys())
            .filter(|k| {
                !visited.contains(*k)
                    && !self.config.is_ignored(k)
                    && *k != name_key
                    && *k != list_key
            })
            .cloned()
            .collect();
        for key in rest {
            let key_path = format!("{path}.{key}");
            self.merge_undeclared(fold, target, source, node, &key, &key_path)?;
        }
        Ok(())
    }

    /// A field present in either tree that the incoming node does not declare.
    fn merge_undeclared<N: Node + ?Sized>(
        &self,
        fold: &mut Fold<'_>,
        target: &mut BTreeMap<String, Tree>,
        source: &BTreeMap<String, Tree>,
        node: &N,
        key: &str,
        path: &str,
    ) -> Result<()> {
        let blocks = !fold.folded.contains(path)
            && match (target.get(key), source.get(key)) {
                (Some(Tree::Mapping(_)), Some(Tree::Mapping(_))) => true,
                (Some(d), Some(s)) => is_block_list(d) && is_block_list(s),
                _ => false,
            };
        if !blocks {
            return self.fold_leaf(fold, target, source, node, key, path);
        }
        let Some((dst, src)) = paired(target, source, key, path)? else {
            return Ok(());
        };
        if dst.as_mapping().is_some() {
            return self.merge_at(fold, dst, src, &Undeclared, path);
        }
        let (dst_items, src_items) = sequences(dst, src, path)?;
        for (i, (d, s)) in dst_items.iter_mut().zip(src_items).enumerate() {
            self.merge_at(fold, d, s, &Undeclared, &format!("{path}[{i}]"))?;
        }
        Ok(())
    }

    fn fold_leaf<N: Node + ?Sized>(
        &self,
        fold: &mut Fold<'_>,
        target: &mut BTreeMap<String, Tree>,
        source: &BTreeMap<String, Tree>,
        node: &N,
        key: &str,
        path: &str,
    ) -> Result<()> {
        let default = node.default_of(key).unwrap_or_default();
        let value = present(source.get(key)).unwrap_or_else(|| default.clone());
        if fold.folded.contains(path) {
            return push(target, key, value, path);
        }
        // The founder's unset leaf shares the incoming member's default.
        let seed = present(target.get(key)).unwrap_or_else(|| default.clone());
        fold.open(target, key, path, seed, default, value);
        Ok(())
    }

    /// The singular name stays in place; members are collected in the name list.
    fn fold_name<N: Node + ?Sized>(
        &self,
        fold: &mut Fold<'_>,
        target: &mut BTreeMap<String, Tree>,
        source: &BTreeMap<String, Tree>,
        node: &N,
        list_path: &str,
    ) -> Result<()> {
        let name_key = &self.config.name_key;
        let list_key = &self.config.name_list_key;
        let incoming = resolve(source.get(name_key), node, name_key);
        if fold.folded.contains(list_path) {
            return push(target, list_key, incoming, list_path);
        }
        let founder = resolve(target.get(name_key), node, name_key);
        let filler = node.default_of(name_key).unwrap_or_default();
        fold.open(target, list_key, list_path, founder, filler, incoming);
        Ok(())
    }
}

/// Both sides carry the sub-block, or neither does.
fn paired<'t, 's>(
    target: &'t mut BTreeMap<String, Tree>,
    source: &'s BTreeMap<String, Tree>,
    name: &str,
    path: &str,
) -> Result<Option<(&'t mut Tree, &'s Tree)>> {
    match (target.get_mut(name), source.get(name)) {
        (Some(dst), Some(src)) => Ok(Some((dst, src))),
        (None, None) => Ok(None),
        _ => Err(CompactError::merge(path, "sub-block present on one side only")),
    }
}

fn sequences<'t, 's>(
    dst: &'t mut Tree,
    src: &'s Tree,
    path: &str,
) -> Result<(&'t mut Vec<Tree>, &'s [Tree])> {
    let dst_kind = dst.kind();
    let dst_items = dst
        .as_sequence_mut()
        .ok_or_else(|| CompactError::shape(path, TreeKind::Sequence, dst_kind))?;
    let src_items = src
        .as_sequence()
        .ok_or_else(|| CompactError::shape(path, TreeKind::Sequence, src.kind()))?;
    if dst_items.len() != src_items.len() {
        return Err(CompactError::merge(path, "sub-block count differs"));
    }
    Ok((dst_items, src_items))
}

/// A sequence of mappings (or an empty one) is a repeated sub-block; any
/// other sequence is a leaf value.
fn is_block_list(tree: &Tree) -> bool {
    tree.as_sequence()
        .is_some_and(|items| items.iter().all(|i| i.as_mapping().is_some()))
}

fn present(value: Option<&Tree>) -> Option<Tree> {
    value.filter(|v| !v.is_absent()).cloned()
}

/// The rendered value, or the node's default when it is unset.
pub(crate) fn resolve<N: Node + ?Sized>(value: Option<&Tree>, node: &N, name: &str) -> Tree {
    present(value).unwrap_or_else(|| node.default_of(name).unwrap_or_default())
}

fn push(target: &mut BTreeMap<String, Tree>, key: &str, value: Tree, path: &str) -> Result<()> {
    match target.get_mut(key) {
        Some(Tree::Sequence(items)) => {
            items.push(value);
            Ok(())
        }
        Some(other) => Err(CompactError::shape(path, TreeKind::Sequence, other.kind())),
        None => Err(CompactError::merge(path, format!("missing value sequence for {key}"))),
    }
}
