//! Device compactor — orchestrates comparison and merging.

use serde::Serialize;
use tg_core::{CompactionConfig, Device, Result};
use tracing::{debug, info};

use crate::comparator::Comparator;
use crate::group::Group;

/// Summary of one compaction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompactionStats {
    pub devices: usize,
    pub groups: usize,
    pub singletons: usize,
    pub largest_group: usize,
    /// Share of bulk objects saved versus one object per device.
    pub reduction_pct: f64,
}

impl CompactionStats {
    pub fn from_groups<D: Device + ?Sized>(groups: &[Group<'_, D>]) -> Self {
        let devices: usize = groups.iter().map(|g| g.count()).sum();
        let reduction = if devices > 0 {
            ((devices - groups.len()) as f64 / devices as f64) * 100.0
        } else {
            0.0
        };
        Self {
            devices,
            groups: groups.len(),
            singletons: groups.iter().filter(|g| g.is_singleton()).count(),
            largest_group: groups.iter().map(|g| g.count()).max().unwrap_or(0),
            reduction_pct: reduction,
        }
    }
}

/// Entry point: buckets devices into groups of identical shape.
#[derive(Debug, Clone, Default)]
pub struct DeviceCompactor {
    config: CompactionConfig,
}

impl DeviceCompactor {
    pub fn new(config: CompactionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Group `devices` in input order. Groups come back in creation order and
    /// each device joins the first group whose founder it matches.
    ///
    /// A shape error aborts the whole run.
    pub fn compact<'d, D, I>(&self, devices: I) -> Result<Vec<Group<'d, D>>>
    where
        D: Device + ?Sized + 'd,
        I: IntoIterator<Item = &'d D>,
    {
        let comparator = Comparator::new(&self.config);
        let mut groups: Vec<Group<'d, D>> = Vec::new();

        for device in devices {
            let rendered = device.render();

            let mut selected = None;
            for (idx, group) in groups.iter().enumerate() {
                if comparator.matches(group.schema(), &rendered)? {
                    selected = Some(idx);
                    break;
                }
            }

            match selected {
                Some(idx) => {
                    let group = &mut groups[idx];
                    group.join(device, &rendered, &self.config)?;
                    debug!(group = idx, count = group.count(), "device joined group");
                }
                None => {
                    debug!(group = groups.len(), "new group");
                    groups.push(Group::new(device, rendered, &self.config));
                }
            }
        }

        let stats = CompactionStats::from_groups(&groups);
        info!(
            devices = stats.devices,
            groups = stats.groups,
            singletons = stats.singletons,
            "compaction done"
        );
        Ok(groups)
    }
}
