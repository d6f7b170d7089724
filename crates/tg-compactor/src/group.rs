//! Compaction result container.

use tg_core::{CompactionConfig, Device, Result, Tree};

use crate::merger::{resolve, CompactTree, Merger};

/// What a group hands to the bulk-configuration layer.
#[derive(Debug)]
pub enum CompactedView<'g, 'd, D: ?Sized> {
    /// Sole member, untouched.
    Device(&'d D),
    /// Merged tree whose leaves hold one value per member.
    Tree(&'g Tree),
}

enum Slot<'d, D: ?Sized> {
    Uncompacted(&'d D),
    Compacted(CompactTree),
}

/// A set of structurally interchangeable devices.
pub struct Group<'d, D: ?Sized> {
    schema: Tree,
    members: Vec<&'d D>,
    names: Vec<Tree>,
    slot: Slot<'d, D>,
}

impl<'d, D: Device + ?Sized> Group<'d, D> {
    pub(crate) fn new(founder: &'d D, schema: Tree, config: &CompactionConfig) -> Self {
        let name = resolve(schema.get(&config.name_key), founder, &config.name_key);
        Self {
            schema,
            members: vec![founder],
            names: vec![name],
            slot: Slot::Uncompacted(founder),
        }
    }

    /// Add a member whose rendered tree already matched [`Group::schema`].
    pub(crate) fn join(
        &mut self,
        device: &'d D,
        rendered: &Tree,
        config: &CompactionConfig,
    ) -> Result<()> {
        if let Slot::Uncompacted(_) = self.slot {
            self.slot = Slot::Compacted(CompactTree::new(self.schema.clone()));
        }
        let member_index = self.members.len() + 1;
        if let Slot::Compacted(compact) = &mut self.slot {
            Merger::new(config).merge(compact, rendered, device, member_index)?;
        }
        self.members.push(device);
        self.names.push(resolve(rendered.get(&config.name_key), device, &config.name_key));
        Ok(())
    }

    /// Founder's rendered tree; fixed at creation.
    pub fn schema(&self) -> &Tree {
        &self.schema
    }

    pub fn founder(&self) -> &'d D {
        self.members[0]
    }

    /// Members in join order, founder first.
    pub fn members(&self) -> &[&'d D] {
        &self.members
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Repeat count for the bulk object.
    pub fn multiplier(&self) -> usize {
        self.count()
    }

    pub fn is_singleton(&self) -> bool {
        self.count() == 1
    }

    pub fn compacted_view(&self) -> CompactedView<'_, 'd, D> {
        match &self.slot {
            Slot::Uncompacted(device) => CompactedView::Device(*device),
            Slot::Compacted(compact) => CompactedView::Tree(compact.tree()),
        }
    }

    /// Member names in join order, unset names resolved to their defaults.
    pub fn member_names(&self) -> &[Tree] {
        &self.names
    }
}
