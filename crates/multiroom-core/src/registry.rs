//! Virtual aggregate sinks and their registry.
//!
//! A [`VirtualSink`] is a logical room composed of physical players. The
//! [`SinkRegistry`] is owned by one orchestrator and handed to the cascade
//! controller by `Arc`; separate topologies never share a registry.
//!
//! The registry also holds the per-sink *pending desired source* marker.
//! While a `select_source` sequence is in flight the marker makes read-side
//! queries report the intended source instead of flickering to "off". The
//! marker belongs to the in-flight call for that sink; when two calls race,
//! the later write wins.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::device::DeviceId;
use crate::error::RoutingError;
use crate::graph::RoutingGraph;

/// A room presented as one addressable routing endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VirtualSink {
    /// Stable identifier, e.g. `virtual_living_room`.
    pub id: DeviceId,
    /// Display name, e.g. `Living Room`.
    pub name: String,
    /// Players that render audio.
    pub audio_players: Vec<DeviceId>,
    /// Players that render video.
    pub video_players: Vec<DeviceId>,
}

impl VirtualSink {
    /// Creates a sink with no players.
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            audio_players: Vec::new(),
            video_players: Vec::new(),
        }
    }

    /// Adds audio players.
    pub fn with_audio<I, D>(mut self, players: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceId>,
    {
        self.audio_players.extend(players.into_iter().map(Into::into));
        self
    }

    /// Adds video players.
    pub fn with_video<I, D>(mut self, players: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DeviceId>,
    {
        self.video_players.extend(players.into_iter().map(Into::into));
        self
    }

    /// Audio players followed by video players.
    pub fn players(&self) -> impl Iterator<Item = &DeviceId> {
        self.audio_players.iter().chain(self.video_players.iter())
    }

    /// Video players first, then audio players: the order in which the
    /// current source is looked up.
    pub fn resolution_order(&self) -> impl Iterator<Item = &DeviceId> {
        self.video_players.iter().chain(self.audio_players.iter())
    }

    /// Returns `true` if `device` backs this sink.
    pub fn has_player(&self, device: &DeviceId) -> bool {
        self.players().any(|p| p == device)
    }
}

/// Registry of virtual sinks plus their pending-source markers.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: RwLock<Vec<Arc<VirtualSink>>>,
    pending: Mutex<HashMap<DeviceId, DeviceId>>,
}

impl SinkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink.
    ///
    /// # Errors
    ///
    /// [`RoutingError::DuplicateSink`] if a sink with the same id exists.
    pub fn register(&self, sink: VirtualSink) -> Result<Arc<VirtualSink>, RoutingError> {
        let mut sinks = self.sinks.write();
        if sinks.iter().any(|s| s.id == sink.id) {
            return Err(RoutingError::DuplicateSink(sink.id));
        }
        tracing::debug!(sink = %sink.id, players = sink.players().count(), "register_sink");
        let sink = Arc::new(sink);
        sinks.push(Arc::clone(&sink));
        Ok(sink)
    }

    /// Looks up a sink by id.
    pub fn get(&self, id: &DeviceId) -> Option<Arc<VirtualSink>> {
        self.sinks.read().iter().find(|s| &s.id == id).cloned()
    }

    /// Looks up a sink by id or display name.
    pub fn find(&self, key: &str) -> Option<Arc<VirtualSink>> {
        self.sinks
            .read()
            .iter()
            .find(|s| s.id.as_str() == key || s.name == key)
            .cloned()
    }

    /// All registered sinks, in registration order.
    pub fn sinks(&self) -> Vec<Arc<VirtualSink>> {
        self.sinks.read().clone()
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    /// Devices whose notifications drive the cascade: every device of
    /// `graph` (roots and every configured sink, including switches no room
    /// plays through) plus every player of every registered sink.
    pub fn watched_devices(&self, graph: &RoutingGraph) -> BTreeSet<DeviceId> {
        let mut watched: BTreeSet<DeviceId> = graph.devices().cloned().collect();
        for sink in self.sinks.read().iter() {
            watched.extend(sink.players().cloned());
        }
        watched
    }

    // --- Pending desired source ---

    /// Marks `source` as the intended source of `sink`, replacing any prior
    /// marker.
    pub fn set_pending(&self, sink: &DeviceId, source: &DeviceId) {
        self.pending.lock().insert(sink.clone(), source.clone());
    }

    /// Clears the marker for `sink` if it still names `source`.
    ///
    /// A later selection on the same sink owns the marker once it has
    /// replaced it; an earlier call finishing afterwards leaves it alone.
    /// Returns `true` if the marker was removed.
    pub fn clear_pending(&self, sink: &DeviceId, source: &DeviceId) -> bool {
        let mut pending = self.pending.lock();
        if pending.get(sink) == Some(source) {
            pending.remove(sink);
            true
        } else {
            false
        }
    }

    /// The intended source of `sink`, if a selection is in flight.
    pub fn pending(&self, sink: &DeviceId) -> Option<DeviceId> {
        self.pending.lock().get(sink).cloned()
    }

    /// Returns `true` if `device` is the intended source of any sink.
    pub fn is_pending_source(&self, device: &DeviceId) -> bool {
        self.pending.lock().values().any(|s| s == device)
    }
}
