//! Device identifiers and point-in-time device snapshots.
//!
//! A [`DeviceSnapshot`] is owned by whatever collaborator observes the real
//! hardware. The routing core never mutates one; it only reads the latest
//! snapshot on each query.

use core::borrow::Borrow;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable key identifying a physical or virtual device.
///
/// Used as the node key of the [`RoutingGraph`](crate::RoutingGraph).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&DeviceId> for DeviceId {
    fn from(id: &DeviceId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Observed power/playback state of a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Powered off.
    #[default]
    Off,
    /// Powered on, no playback information.
    On,
    /// Powered on and idle.
    Idle,
    /// Actively playing media.
    Playing,
    /// Playback paused.
    Paused,
    /// Low-power standby. Not treated as off.
    Standby,
    /// The device cannot currently be reached.
    Unavailable,
}

impl PowerState {
    /// Returns `true` for the powered-off state.
    #[inline]
    pub fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }

    /// Returns `true` if the device is powered and rendering (on, idle,
    /// playing, or paused).
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::On | Self::Idle | Self::Playing | Self::Paused)
    }

    /// Lowercase name as used in configuration and state files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Standby => "standby",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally owned, point-in-time view of a device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Power/playback state.
    #[serde(default)]
    pub power: PowerState,
    /// Raw selected-input value as reported by the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Human-readable device name.
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Whether the device is reachable.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl DeviceSnapshot {
    /// Creates an available snapshot in the given power state.
    pub fn new(power: PowerState) -> Self {
        Self {
            power,
            input: None,
            friendly_name: None,
            available: true,
        }
    }

    /// Sets the reported input value.
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Sets the friendly name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Marks the device unreachable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// The canonical current-input identifier.
    ///
    /// A device that is off or unreachable routes nothing, so it exposes no
    /// input even if the last reported attribute lingers.
    pub fn current_input(&self) -> Option<&str> {
        if !self.available || self.power.is_off() || self.power == PowerState::Unavailable {
            return None;
        }
        self.input.as_deref()
    }

    /// Returns `true` if the snapshot reports the powered-off state.
    #[inline]
    pub fn is_off(&self) -> bool {
        self.power.is_off()
    }
}
