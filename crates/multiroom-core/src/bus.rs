//! In-memory loopback command bus.
//!
//! [`LoopbackBus`] plays the part of the physical devices: every accepted
//! command is applied to a [`StateStore`] and, when that changes a snapshot,
//! the resulting [`StateChange`] is published on the notification channel.
//! Wiring that channel into [`CascadeController`](crate::CascadeController)
//! closes the loop for offline simulation.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::command::{Command, CommandBus, CommandError, Dispatch, Verb};
use crate::device::{DeviceId, PowerState};
use crate::state::{StateChange, StateStore};

/// One command as seen by the loopback bus.
#[derive(Clone, Debug, PartialEq)]
pub struct IssuedCommand {
    /// The command.
    pub command: Command,
    /// How it was dispatched.
    pub dispatch: Dispatch,
    /// Whether it was applied.
    pub accepted: bool,
}

/// Command bus that applies commands to an in-memory store.
pub struct LoopbackBus {
    store: Arc<StateStore>,
    log: Mutex<Vec<IssuedCommand>>,
    failing: Mutex<HashSet<DeviceId>>,
    notify: Option<Sender<StateChange>>,
}

impl LoopbackBus {
    /// Creates a bus over `store` that publishes no notifications.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            log: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            notify: None,
        }
    }

    /// Publishes every resulting state change on `tx`.
    pub fn with_notifications(mut self, tx: Sender<StateChange>) -> Self {
        self.notify = Some(tx);
        self
    }

    /// The store commands are applied to.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Makes every later command to `device` fail with
    /// [`CommandError::Rejected`].
    pub fn fail_device(&self, device: impl Into<DeviceId>) {
        self.failing.lock().insert(device.into());
    }

    /// Every command issued so far, in order.
    pub fn commands(&self) -> Vec<IssuedCommand> {
        self.log.lock().clone()
    }

    /// Accepted commands rendered as strings, in order.
    pub fn accepted(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.accepted)
            .map(|c| c.command.to_string())
            .collect()
    }

    /// Forgets the command log.
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn apply(&self, command: &Command) -> Option<StateChange> {
        let change = match &command.verb {
            Verb::TurnOn => self.store.update(&command.device, |s| {
                if !s.power.is_active() {
                    s.power = PowerState::On;
                }
                s.available = true;
            }),
            Verb::TurnOff => self.store.update(&command.device, |s| s.power = PowerState::Off),
            Verb::SelectSource(input) => self
                .store
                .update(&command.device, |s| s.input = Some(input.clone())),
            Verb::MediaPlay => self
                .store
                .update(&command.device, |s| s.power = PowerState::Playing),
            Verb::MediaPause => self
                .store
                .update(&command.device, |s| s.power = PowerState::Paused),
            Verb::VolumeSet(_) | Verb::VolumeMute(_) => return None,
        };
        change.is_change().then_some(change)
    }
}

impl CommandBus for LoopbackBus {
    fn issue(&self, command: Command, dispatch: Dispatch) -> Result<(), CommandError> {
        if self.failing.lock().contains(&command.device) {
            let err = CommandError::rejected(&command, "device failing");
            self.log.lock().push(IssuedCommand {
                command,
                dispatch,
                accepted: false,
            });
            return Err(err);
        }

        tracing::debug!(%command, ?dispatch, "loopback_issue");
        let change = self.apply(&command);
        self.log.lock().push(IssuedCommand {
            command,
            dispatch,
            accepted: true,
        });

        if let (Some(change), Some(tx)) = (change, &self.notify) {
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send(change);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSnapshot;

    #[test]
    fn commands_update_store() {
        let store = Arc::new(StateStore::new());
        let bus = LoopbackBus::new(Arc::clone(&store));
        let tv = DeviceId::new("tv");

        bus.issue(Command::turn_on("tv"), Dispatch::Blocking).unwrap();
        bus.issue(Command::select_source("tv", "HDMI1"), Dispatch::Blocking)
            .unwrap();
        let snap = store.get(&tv).unwrap();
        assert_eq!(snap.power, PowerState::On);
        assert_eq!(snap.current_input(), Some("HDMI1"));

        bus.issue(Command::new("tv", Verb::MediaPlay), Dispatch::FireAndForget)
            .unwrap();
        assert_eq!(store.get(&tv).unwrap().power, PowerState::Playing);

        bus.issue(Command::turn_off("tv"), Dispatch::FireAndForget).unwrap();
        assert!(store.get(&tv).unwrap().is_off());
        assert_eq!(bus.commands().len(), 4);
    }

    #[test]
    fn turn_on_keeps_playback_state() {
        let store = Arc::new(StateStore::new());
        store.set("tv", Some(DeviceSnapshot::new(PowerState::Playing)));
        let bus = LoopbackBus::new(Arc::clone(&store));
        bus.issue(Command::turn_on("tv"), Dispatch::Blocking).unwrap();
        assert_eq!(store.get(&DeviceId::new("tv")).unwrap().power, PowerState::Playing);
    }

    #[test]
    fn notifies_only_on_change() {
        let store = Arc::new(StateStore::new());
        let (tx, rx) = crossbeam_channel::unbounded();
        let bus = LoopbackBus::new(store).with_notifications(tx);

        bus.issue(Command::turn_on("tv"), Dispatch::Blocking).unwrap();
        bus.issue(Command::turn_on("tv"), Dispatch::Blocking).unwrap();
        bus.issue(Command::new("tv", Verb::VolumeSet(0.4)), Dispatch::FireAndForget)
            .unwrap();

        let changes: Vec<_> = rx.try_iter().collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, None);
        assert_eq!(changes[0].new.as_ref().map(|s| s.power), Some(PowerState::On));
    }

    #[test]
    fn failing_device_rejects() {
        let store = Arc::new(StateStore::new());
        let bus = LoopbackBus::new(Arc::clone(&store));
        bus.fail_device("avr");

        let err = bus.issue(Command::turn_on("avr"), Dispatch::Blocking).unwrap_err();
        assert!(matches!(err, CommandError::Rejected { .. }));
        assert!(store.is_empty());
        assert!(bus.accepted().is_empty());
        assert!(!bus.commands()[0].accepted);
    }
}
