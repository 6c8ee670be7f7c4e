//! Device state files for offline evaluation.
//!
//! A state file captures the snapshots a live deployment would read from
//! its device-state store, so resolution and cascade decisions can be
//! replayed without hardware.
//!
//! ```toml
//! [devices."media_player.tv"]
//! power = "on"
//! input = "HDMI1"
//! name = "Living Room TV"
//!
//! [devices."media_player.apple_tv"]
//! power = "playing"
//! name = "Apple TV"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use multiroom_core::{DeviceId, DeviceSnapshot, StateStore};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Snapshots keyed by device id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateFile {
    /// Device id → snapshot.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSnapshot>,
}

impl StateFile {
    /// Creates an empty state file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a device snapshot.
    pub fn with_device(mut self, device: impl Into<String>, snapshot: DeviceSnapshot) -> Self {
        self.devices.insert(device.into(), snapshot);
        self
    }

    /// Load a state file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a state file from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the state file to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the state file to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Snapshot of `device`, if recorded.
    pub fn get(&self, device: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(device)
    }

    /// Builds an in-memory store holding every recorded snapshot.
    pub fn to_store(&self) -> StateStore {
        self.devices
            .iter()
            .map(|(id, snap)| (DeviceId::new(id.clone()), snap.clone()))
            .collect()
    }

    /// Captures the current contents of a store.
    pub fn from_store(store: &StateStore) -> Self {
        Self {
            devices: store
                .entries()
                .into_iter()
                .map(|(id, snap)| (id.as_str().to_string(), snap))
                .collect(),
        }
    }
}
