//! Read-side queries over virtual sinks.
//!
//! Everything here is recomputed from the current snapshots on each call;
//! nothing about a sink's "last known source" is cached between turns.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::device::{DeviceId, PowerState};
use crate::graph::RoutingGraph;
use crate::registry::{SinkRegistry, VirtualSink};
use crate::resolver::SourceResolver;
use crate::state::SnapshotProvider;

/// A selectable source as presented to users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    /// Friendly name (device id if the device reports none).
    pub name: String,
    /// Root device behind the name.
    pub device: DeviceId,
}

/// Borrowed view combining graph, registry, and live state.
pub struct SinkView<'a, P: ?Sized> {
    graph: &'a RoutingGraph,
    registry: &'a SinkRegistry,
    provider: &'a P,
}

impl<'a, P> SinkView<'a, P>
where
    P: SnapshotProvider + ?Sized,
{
    /// Creates a view.
    pub fn new(graph: &'a RoutingGraph, registry: &'a SinkRegistry, provider: &'a P) -> Self {
        Self {
            graph,
            registry,
            provider,
        }
    }

    /// The device currently feeding `sink`.
    ///
    /// A pending selection wins; otherwise the first video player, then audio
    /// player, with a resolvable source decides.
    pub fn source_device(&self, sink: &VirtualSink) -> Option<DeviceId> {
        if let Some(pending) = self.registry.pending(&sink.id) {
            return Some(pending);
        }
        let resolver = SourceResolver::new(self.graph);
        sink.resolution_order()
            .find_map(|player| resolver.resolve_source(player, self.provider))
    }

    /// Friendly name of the device currently feeding `sink`.
    pub fn source_name(&self, sink: &VirtualSink) -> Option<String> {
        self.source_device(sink).map(|device| self.display_name(&device))
    }

    /// Every root source any player of `sink` could receive, sorted by name.
    ///
    /// Devices with no snapshot are left out. When two devices share a
    /// friendly name the first by device id is kept.
    pub fn source_list(&self, sink: &VirtualSink) -> Vec<SourceEntry> {
        let roots: BTreeSet<DeviceId> = sink
            .players()
            .flat_map(|player| self.graph.root_ancestors_of(player))
            .collect();

        let mut entries: Vec<SourceEntry> = Vec::new();
        for device in roots {
            let Some(snapshot) = self.provider.lookup(&device) else {
                continue;
            };
            let name = snapshot
                .friendly_name
                .unwrap_or_else(|| device.as_str().to_string());
            if entries.iter().any(|e| e.name == name) {
                continue;
            }
            entries.push(SourceEntry { name, device });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Looks up a source of `sink` by friendly name.
    pub fn source_by_name(&self, sink: &VirtualSink, name: &str) -> Option<DeviceId> {
        self.source_list(sink)
            .into_iter()
            .find(|e| e.name == name)
            .map(|e| e.device)
    }

    /// Aggregate power state of `sink`.
    ///
    /// The source device's state if it has a snapshot; otherwise `Playing`
    /// if any player plays, `Idle` if any player is on or idle, else `Off`.
    pub fn power_state(&self, sink: &VirtualSink) -> PowerState {
        if let Some(snapshot) = self
            .source_device(sink)
            .and_then(|device| self.provider.lookup(&device))
        {
            return snapshot.power;
        }

        let states: Vec<PowerState> = sink
            .players()
            .filter_map(|p| self.provider.lookup(p))
            .map(|s| s.power)
            .collect();
        if states.contains(&PowerState::Playing) {
            PowerState::Playing
        } else if states
            .iter()
            .any(|s| matches!(s, PowerState::Idle | PowerState::On))
        {
            PowerState::Idle
        } else {
            PowerState::Off
        }
    }

    /// Ids of registered sinks whose current source is `source`.
    pub fn source_uses(&self, source: &DeviceId) -> Vec<DeviceId> {
        self.registry
            .sinks()
            .iter()
            .filter(|sink| self.source_device(sink).as_ref() == Some(source))
            .map(|sink| sink.id.clone())
            .collect()
    }

    fn display_name(&self, device: &DeviceId) -> String {
        self.provider
            .lookup(device)
            .and_then(|s| s.friendly_name)
            .unwrap_or_else(|| device.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSnapshot;
    use crate::state::StateStore;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s)
    }

    struct Fixture {
        graph: RoutingGraph,
        registry: SinkRegistry,
        store: StateStore,
    }

    /// apple_tv → avr (HDMI1) → tv (HDMI2); bluray → tv (HDMI3);
    /// turntable → avr (PHONO). Living room = avr + tv.
    fn fixture() -> Fixture {
        let mut graph = RoutingGraph::new();
        graph.add_edge("apple_tv", "avr", "HDMI1").unwrap();
        graph.add_edge("avr", "tv", "HDMI2").unwrap();
        graph.add_edge("bluray", "tv", "HDMI3").unwrap();
        graph.add_edge("turntable", "avr", "PHONO").unwrap();

        let registry = SinkRegistry::new();
        registry
            .register(
                VirtualSink::new("virtual_living_room", "Living Room")
                    .with_audio(["avr"])
                    .with_video(["tv"]),
            )
            .unwrap();
        registry
            .register(VirtualSink::new("virtual_audio_living_room", "Audio").with_audio(["avr"]))
            .unwrap();

        let store = StateStore::new();
        store.set(
            "apple_tv",
            Some(DeviceSnapshot::new(PowerState::Playing).with_name("Apple TV")),
        );
        store.set(
            "bluray",
            Some(DeviceSnapshot::new(PowerState::Off).with_name("Blu-ray")),
        );
        Fixture {
            graph,
            registry,
            store,
        }
    }

    #[test]
    fn source_follows_video_player_first() {
        let f = fixture();
        f.store.set("tv", Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI3")));
        f.store.set("avr", Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI1")));
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let room = f.registry.find("Living Room").unwrap();
        assert_eq!(view.source_device(&room), Some(id("bluray")));
        assert_eq!(view.source_name(&room).as_deref(), Some("Blu-ray"));

        let audio = f.registry.find("Audio").unwrap();
        assert_eq!(view.source_device(&audio), Some(id("apple_tv")));
    }

    #[test]
    fn source_falls_back_to_audio_player() {
        let f = fixture();
        f.store.set("tv", Some(DeviceSnapshot::new(PowerState::Off)));
        f.store.set("avr", Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI1")));
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let room = f.registry.find("Living Room").unwrap();
        assert_eq!(view.source_device(&room), Some(id("apple_tv")));
        assert_eq!(view.power_state(&room), PowerState::Playing);
    }

    #[test]
    fn pending_marker_overrides_resolution() {
        let f = fixture();
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let room = f.registry.find("Living Room").unwrap();
        assert_eq!(view.source_device(&room), None);
        f.registry.set_pending(&room.id, &id("bluray"));
        assert_eq!(view.source_device(&room), Some(id("bluray")));
    }

    #[test]
    fn source_list_skips_devices_without_state() {
        let f = fixture();
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let room = f.registry.find("Living Room").unwrap();
        let names: Vec<_> = view.source_list(&room).into_iter().map(|e| e.name).collect();
        // turntable has no snapshot.
        assert_eq!(names, ["Apple TV", "Blu-ray"]);
        assert_eq!(view.source_by_name(&room, "Apple TV"), Some(id("apple_tv")));
        assert_eq!(view.source_by_name(&room, "Roku"), None);
    }

    #[test]
    fn power_state_aggregates_players_without_source() {
        let f = fixture();
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let room = f.registry.find("Living Room").unwrap();
        assert_eq!(view.power_state(&room), PowerState::Off);

        f.store.set("tv", Some(DeviceSnapshot::new(PowerState::On).with_input("AV")));
        assert_eq!(view.power_state(&room), PowerState::Idle);
    }

    #[test]
    fn source_uses_lists_consuming_sinks() {
        let f = fixture();
        f.store.set("avr", Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI1")));
        let view = SinkView::new(&f.graph, &f.registry, &f.store);
        let uses = view.source_uses(&id("apple_tv"));
        assert_eq!(uses, vec![id("virtual_living_room"), id("virtual_audio_living_room")]);
        assert!(view.source_uses(&id("bluray")).is_empty());
    }
}
