//! Device-state lookup and change notifications.
//!
//! The core never caches device state. Every query goes through a
//! [`SnapshotProvider`], and two lookups of the same device inside one
//! notification turn may legitimately disagree if the external store changed
//! in between.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::device::{DeviceId, DeviceSnapshot};

/// Synchronous lookup of a device's latest snapshot.
pub trait SnapshotProvider {
    /// Returns the latest snapshot for `device`, or `None` if the device is
    /// currently unknown to the state source.
    fn lookup(&self, device: &DeviceId) -> Option<DeviceSnapshot>;
}

impl<F> SnapshotProvider for F
where
    F: Fn(&DeviceId) -> Option<DeviceSnapshot>,
{
    fn lookup(&self, device: &DeviceId) -> Option<DeviceSnapshot> {
        self(device)
    }
}

/// A device-state change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// Device whose state changed.
    pub device: DeviceId,
    /// Snapshot before the change (absent if the device was unknown).
    pub old: Option<DeviceSnapshot>,
    /// Snapshot after the change (absent if the device disappeared).
    pub new: Option<DeviceSnapshot>,
}

impl StateChange {
    /// Creates a change notification.
    pub fn new(
        device: impl Into<DeviceId>,
        old: Option<DeviceSnapshot>,
        new: Option<DeviceSnapshot>,
    ) -> Self {
        Self {
            device: device.into(),
            old,
            new,
        }
    }

    /// Returns `true` if the old and new snapshots differ.
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Thread-safe in-memory snapshot store.
///
/// Stands in for the external device-state store in offline evaluation and
/// in the loopback bus. Writes return the [`StateChange`] they produced so
/// the writer can publish it.
#[derive(Debug, Default)]
pub struct StateStore {
    devices: RwLock<HashMap<DeviceId, DeviceSnapshot>>,
}

impl StateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the snapshot for `device`.
    pub fn get(&self, device: &DeviceId) -> Option<DeviceSnapshot> {
        self.devices.read().get(device).cloned()
    }

    /// Replaces the snapshot for `device` (or removes it when `snapshot` is
    /// `None`) and returns the resulting change.
    pub fn set(&self, device: impl Into<DeviceId>, snapshot: Option<DeviceSnapshot>) -> StateChange {
        let device = device.into();
        let mut devices = self.devices.write();
        let old = match &snapshot {
            Some(s) => devices.insert(device.clone(), s.clone()),
            None => devices.remove(&device),
        };
        StateChange {
            device,
            old,
            new: snapshot,
        }
    }

    /// Applies `f` to the current snapshot of `device` (a default snapshot if
    /// absent) and stores the result.
    pub fn update(
        &self,
        device: impl Into<DeviceId>,
        f: impl FnOnce(&mut DeviceSnapshot),
    ) -> StateChange {
        let device = device.into();
        let mut devices = self.devices.write();
        let old = devices.get(&device).cloned();
        let mut next = old.clone().unwrap_or_default();
        f(&mut next);
        devices.insert(device.clone(), next.clone());
        StateChange {
            device,
            old,
            new: Some(next),
        }
    }

    /// Number of devices with a snapshot.
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns `true` if no device has a snapshot.
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// All snapshots, sorted by device id.
    pub fn entries(&self) -> Vec<(DeviceId, DeviceSnapshot)> {
        let mut entries: Vec<_> = self
            .devices
            .read()
            .iter()
            .map(|(id, snap)| (id.clone(), snap.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl SnapshotProvider for StateStore {
    fn lookup(&self, device: &DeviceId) -> Option<DeviceSnapshot> {
        self.get(device)
    }
}

impl FromIterator<(DeviceId, DeviceSnapshot)> for StateStore {
    fn from_iter<I: IntoIterator<Item = (DeviceId, DeviceSnapshot)>>(iter: I) -> Self {
        Self {
            devices: RwLock::new(iter.into_iter().collect()),
        }
    }
}
