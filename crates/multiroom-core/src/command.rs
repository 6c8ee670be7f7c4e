//! Commands issued to devices and the bus that carries them.

use core::fmt;

use thiserror::Error;

use crate::device::DeviceId;

/// The action a command asks a device to perform, with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Verb {
    /// Power the device on.
    TurnOn,
    /// Power the device off.
    TurnOff,
    /// Switch the device to the given input value.
    SelectSource(String),
    /// Set volume, `0.0..=1.0`.
    VolumeSet(f32),
    /// Mute or unmute.
    VolumeMute(bool),
    /// Resume playback.
    MediaPlay,
    /// Pause playback.
    MediaPause,
}

impl Verb {
    /// Wire name of the verb.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::SelectSource(_) => "select_source",
            Self::VolumeSet(_) => "volume_set",
            Self::VolumeMute(_) => "volume_mute",
            Self::MediaPlay => "media_play",
            Self::MediaPause => "media_pause",
        }
    }
}

/// A verb addressed to one device.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// Target device.
    pub device: DeviceId,
    /// Requested action.
    pub verb: Verb,
}

impl Command {
    /// Creates a command.
    pub fn new(device: impl Into<DeviceId>, verb: Verb) -> Self {
        Self {
            device: device.into(),
            verb,
        }
    }

    /// `turn_on` for `device`.
    pub fn turn_on(device: impl Into<DeviceId>) -> Self {
        Self::new(device, Verb::TurnOn)
    }

    /// `turn_off` for `device`.
    pub fn turn_off(device: impl Into<DeviceId>) -> Self {
        Self::new(device, Verb::TurnOff)
    }

    /// `select_source` for `device`.
    pub fn select_source(device: impl Into<DeviceId>, input: impl Into<String>) -> Self {
        Self::new(device, Verb::SelectSource(input.into()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verb {
            Verb::SelectSource(input) => write!(f, "select_source({}, {input})", self.device),
            Verb::VolumeSet(level) => write!(f, "volume_set({}, {level:.2})", self.device),
            Verb::VolumeMute(muted) => write!(f, "volume_mute({}, {muted})", self.device),
            verb => write!(f, "{}({})", verb.name(), self.device),
        }
    }
}

/// Whether the caller waits for acknowledgment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// Suspend until the device acknowledges the command.
    Blocking,
    /// Return as soon as the command is queued.
    FireAndForget,
}

/// A command the bus rejected or could not confirm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The device or bus refused the command.
    #[error("{command} rejected: {reason}")]
    Rejected {
        /// Rendered command.
        command: String,
        /// Reason reported by the bus.
        reason: String,
    },
    /// No acknowledgment arrived in time.
    #[error("{command} timed out")]
    Timeout {
        /// Rendered command.
        command: String,
    },
    /// The bus is gone.
    #[error("command bus disconnected")]
    Disconnected,
}

impl CommandError {
    /// Creates a rejection for `command`.
    pub fn rejected(command: &Command, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

/// Outbound command channel to the devices.
///
/// Timeouts are the bus's responsibility. A [`Dispatch::Blocking`] call
/// returns only after acknowledgment (or failure).
pub trait CommandBus {
    /// Issues `command` with the given dispatch mode.
    fn issue(&self, command: Command, dispatch: Dispatch) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_names() {
        assert_eq!(Verb::SelectSource("HDMI1".into()).name(), "select_source");
        assert_eq!(Verb::VolumeMute(true).name(), "volume_mute");
        assert_eq!(Verb::MediaPause.name(), "media_pause");
    }

    #[test]
    fn command_display() {
        assert_eq!(Command::turn_on("tv").to_string(), "turn_on(tv)");
        assert_eq!(
            Command::select_source("avr", "HDMI1").to_string(),
            "select_source(avr, HDMI1)"
        );
        assert_eq!(
            Command::new("avr", Verb::VolumeSet(0.5)).to_string(),
            "volume_set(avr, 0.50)"
        );
    }

    #[test]
    fn rejected_display() {
        let err = CommandError::rejected(&Command::turn_off("tv"), "unavailable");
        assert_eq!(err.to_string(), "turn_off(tv) rejected: unavailable");
    }
}
