use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::model::{Device, DeviceKind};

/// Outcome of [`DeviceRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Live set of devices, keyed by device id.
///
/// Cloning gives another handle on the same store. The discovery engine is
/// the only writer; readers get snapshots.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `device`, or replaces the entry carrying the same id.
    pub fn upsert(&self, device: Device) -> UpsertOutcome {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        let id = device.id.clone();
        match devices.insert(id.clone(), device) {
            Some(_) => {
                trace!(device = %id, "Device refreshed");
                UpsertOutcome::Updated
            }
            None => {
                debug!(device = %id, "Device added");
                UpsertOutcome::Inserted
            }
        }
    }

    /// Replaces the whole content with `devices`.
    pub fn replace_all(&self, devices: HashMap<String, Device>) {
        let mut current = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        let removed = current
            .keys()
            .filter(|id| !devices.contains_key(*id))
            .count();
        debug!(
            devices = devices.len(),
            removed = removed,
            "Device registry replaced"
        );
        *current = devices;
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        self.read().get(id).cloned()
    }

    /// Copy of every device, sorted by display name then id.
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.read().values().cloned().collect();
        devices.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        devices
    }

    pub fn list_by_kind(&self, kind: DeviceKind) -> Vec<Device> {
        self.snapshot()
            .into_iter()
            .filter(|d| d.kind == kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Device>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }
}
