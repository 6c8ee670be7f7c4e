//! Command sequencing for virtual sinks.
//!
//! [`RoutingOrchestrator`] is the write side: it turns a user intent
//! ("play the Apple TV in the living room") into an ordered series of
//! commands on the bus. Route selection is strictly serial: every step is
//! acknowledged before the next is issued, and devices are switched in
//! source-to-sink order. Hardware drops a selection issued before power-on
//! or before its upstream is producing signal.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::cascade::CascadeController;
use crate::command::{Command, CommandBus, Dispatch, Verb};
use crate::device::DeviceId;
use crate::error::RoutingError;
use crate::graph::RoutingGraph;
use crate::planner::{PathPlanner, PlannedStep};
use crate::registry::{SinkRegistry, VirtualSink};
use crate::state::SnapshotProvider;
use crate::view::SinkView;

/// Asks the state collaborator to re-read a sink's devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshRequest {
    /// Sink whose state should be refreshed.
    pub sink: DeviceId,
}

/// Drives route selection and power verbs for registered virtual sinks.
///
/// Owns the [`SinkRegistry`] of one topology. The graph, snapshot provider,
/// and bus are injected.
pub struct RoutingOrchestrator<P: ?Sized, B: ?Sized> {
    graph: Arc<RoutingGraph>,
    registry: Arc<SinkRegistry>,
    provider: Arc<P>,
    bus: Arc<B>,
    refresh: Option<Sender<RefreshRequest>>,
}

impl<P, B> RoutingOrchestrator<P, B>
where
    P: SnapshotProvider + ?Sized,
    B: CommandBus + ?Sized,
{
    /// Creates an orchestrator with an empty registry.
    pub fn new(graph: Arc<RoutingGraph>, provider: Arc<P>, bus: Arc<B>) -> Self {
        Self {
            graph,
            registry: Arc::new(SinkRegistry::new()),
            provider,
            bus,
            refresh: None,
        }
    }

    /// Sends a [`RefreshRequest`] on `tx` after every route selection.
    pub fn with_refresh(mut self, tx: Sender<RefreshRequest>) -> Self {
        self.refresh = Some(tx);
        self
    }

    /// The routing graph.
    pub fn graph(&self) -> &Arc<RoutingGraph> {
        &self.graph
    }

    /// The sink registry owned by this orchestrator.
    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }

    /// Registers a virtual sink.
    ///
    /// # Errors
    ///
    /// [`RoutingError::DuplicateSink`] if the id is taken.
    pub fn register(&self, sink: VirtualSink) -> Result<Arc<VirtualSink>, RoutingError> {
        self.registry.register(sink)
    }

    /// A cascade controller sharing this orchestrator's graph and registry.
    pub fn cascade_controller(&self) -> CascadeController {
        CascadeController::new(Arc::clone(&self.graph), Arc::clone(&self.registry))
    }

    /// Read-side view over current state.
    pub fn view(&self) -> SinkView<'_, P> {
        SinkView::new(&self.graph, &self.registry, &*self.provider)
    }

    fn sink(&self, id: &DeviceId) -> Result<Arc<VirtualSink>, RoutingError> {
        self.registry
            .get(id)
            .ok_or_else(|| RoutingError::UnknownSink(id.clone()))
    }

    // --- Route selection ---

    /// Routes `source` to every player of `sink` that it can reach.
    ///
    /// Players the source has no path to are skipped and left untouched; the
    /// call still succeeds if at least one player is routed. A room whose
    /// players are all unreachable fails with `NoRoute` before any command
    /// is issued.
    ///
    /// While the sequence runs, the sink reports `source` as its source.
    /// The marker is cleared afterwards unless a later selection on the same
    /// sink has replaced it, and a refresh is requested whether or not the
    /// sequence succeeds. On failure the devices are left as the last
    /// acknowledged step put them.
    ///
    /// Returns the steps that were executed.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::UnknownSink`] if `sink` is not registered
    /// - [`RoutingError::Graph`] if no player at all is reachable, or a route
    ///   to any player is ambiguous
    /// - [`RoutingError::Command`] if a blocking command fails
    pub fn select_source(
        &self,
        sink: &DeviceId,
        source: &DeviceId,
    ) -> Result<Vec<PlannedStep>, RoutingError> {
        let target = self.sink(sink)?;
        tracing::info!(sink = %target.id, %source, "select_source");

        self.registry.set_pending(&target.id, source);
        let result = self.route(&target, source);
        self.registry.clear_pending(&target.id, source);

        if let Some(tx) = &self.refresh
            && let Err(e) = tx.send(RefreshRequest {
                sink: target.id.clone(),
            })
        {
            tracing::debug!(sink = %target.id, error = %e, "refresh receiver gone");
        }
        if let Err(e) = &result {
            tracing::warn!(sink = %target.id, %source, error = %e, "select_source failed");
        }
        result
    }

    /// Like [`select_source`](Self::select_source), naming the source by
    /// its friendly name.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSource`] if the name is not in the sink's
    /// source list, plus every error of `select_source`.
    pub fn select_source_by_name(
        &self,
        sink: &DeviceId,
        name: &str,
    ) -> Result<Vec<PlannedStep>, RoutingError> {
        let target = self.sink(sink)?;
        let source = self
            .view()
            .source_by_name(&target, name)
            .ok_or_else(|| RoutingError::UnknownSource {
                sink: target.id.clone(),
                name: name.to_string(),
            })?;
        self.select_source(&target.id, &source)
    }

    /// Plans every reachable player, then executes the combined steps.
    fn route(&self, sink: &VirtualSink, source: &DeviceId) -> Result<Vec<PlannedStep>, RoutingError> {
        let steps = PathPlanner::new(&self.graph).plan_sink(source, sink)?;

        self.bus.issue(Command::turn_on(source), Dispatch::Blocking)?;
        for step in &steps {
            self.bus
                .issue(Command::turn_on(&step.device), Dispatch::Blocking)?;
            self.bus.issue(
                Command::select_source(&step.device, step.required_input.clone()),
                Dispatch::Blocking,
            )?;
            tracing::debug!(%step, "route_step");
        }
        Ok(steps)
    }

    // --- Power ---

    /// Powers on every player of `sink`, fire-and-forget.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered.
    pub fn turn_on(&self, sink: &DeviceId) -> Result<(), RoutingError> {
        let target = self.sink(sink)?;
        for player in target.players() {
            self.fire(Command::turn_on(player));
        }
        Ok(())
    }

    /// Powers off every player of `sink`, then its previous source unless
    /// another registered sink still uses it.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered, or
    /// [`RoutingError::Command`] if a player does not acknowledge.
    pub fn turn_off(&self, sink: &DeviceId) -> Result<(), RoutingError> {
        let target = self.sink(sink)?;
        let previous = self.view().source_device(&target);

        for player in target.players() {
            self.bus.issue(Command::turn_off(player), Dispatch::Blocking)?;
        }

        let Some(source) = previous else {
            return Ok(());
        };
        if target.has_player(&source) {
            return Ok(());
        }
        let still_used: Vec<DeviceId> = self
            .view()
            .source_uses(&source)
            .into_iter()
            .filter(|id| id != &target.id)
            .collect();
        if still_used.is_empty() {
            self.fire(Command::turn_off(&source));
        } else {
            tracing::debug!(%source, users = still_used.len(), "source still in use");
        }
        Ok(())
    }

    // --- Volume & transport ---

    /// Sets the volume of every audio player, clamped to `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered.
    pub fn set_volume(&self, sink: &DeviceId, level: f32) -> Result<(), RoutingError> {
        let target = self.sink(sink)?;
        let level = level.clamp(0.0, 1.0);
        for player in &target.audio_players {
            self.fire(Command::new(player, Verb::VolumeSet(level)));
        }
        Ok(())
    }

    /// Mutes or unmutes every audio player.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered.
    pub fn mute(&self, sink: &DeviceId, muted: bool) -> Result<(), RoutingError> {
        let target = self.sink(sink)?;
        for player in &target.audio_players {
            self.fire(Command::new(player, Verb::VolumeMute(muted)));
        }
        Ok(())
    }

    /// Resumes playback on the current source. No-op without a source.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered.
    pub fn media_play(&self, sink: &DeviceId) -> Result<(), RoutingError> {
        self.forward_to_source(sink, Verb::MediaPlay)
    }

    /// Pauses playback on the current source. No-op without a source.
    ///
    /// # Errors
    ///
    /// [`RoutingError::UnknownSink`] if `sink` is not registered.
    pub fn media_pause(&self, sink: &DeviceId) -> Result<(), RoutingError> {
        self.forward_to_source(sink, Verb::MediaPause)
    }

    fn forward_to_source(&self, sink: &DeviceId, verb: Verb) -> Result<(), RoutingError> {
        let target = self.sink(sink)?;
        if let Some(source) = self.view().source_device(&target) {
            self.fire(Command::new(source, verb));
        }
        Ok(())
    }

    fn fire(&self, command: Command) {
        let rendered = command.to_string();
        if let Err(e) = self.bus.issue(command, Dispatch::FireAndForget) {
            tracing::warn!(command = %rendered, error = %e, "command failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LoopbackBus;
    use crate::command::CommandError;
    use crate::device::{DeviceSnapshot, PowerState};
    use crate::graph::GraphError;
    use crate::state::StateStore;
    use std::sync::OnceLock;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s)
    }

    /// apple_tv → avr (HDMI1) → tv (HDMI2); bluray → tv (HDMI3).
    fn setup() -> (
        RoutingOrchestrator<StateStore, LoopbackBus>,
        Arc<StateStore>,
        Arc<LoopbackBus>,
    ) {
        let mut graph = RoutingGraph::new();
        graph.add_edge("apple_tv", "avr", "HDMI1").unwrap();
        graph.add_edge("avr", "tv", "HDMI2").unwrap();
        graph.add_edge("bluray", "tv", "HDMI3").unwrap();

        let store = Arc::new(StateStore::new());
        store.set(
            "apple_tv",
            Some(DeviceSnapshot::new(PowerState::Off).with_name("Apple TV")),
        );
        store.set(
            "bluray",
            Some(DeviceSnapshot::new(PowerState::Off).with_name("Blu-ray")),
        );
        let bus = Arc::new(LoopbackBus::new(Arc::clone(&store)));
        let orch = RoutingOrchestrator::new(Arc::new(graph), Arc::clone(&store), Arc::clone(&bus));
        orch.register(
            VirtualSink::new("virtual_living_room", "Living Room")
                .with_audio(["avr"])
                .with_video(["tv"]),
        )
        .unwrap();
        (orch, store, bus)
    }

    #[test]
    fn select_source_issues_ordered_blocking_chain() {
        let (orch, _store, bus) = setup();
        let steps = orch
            .select_source(&id("virtual_living_room"), &id("apple_tv"))
            .unwrap();
        assert_eq!(
            steps,
            vec![PlannedStep::new("avr", "HDMI1"), PlannedStep::new("tv", "HDMI2")]
        );
        assert_eq!(
            bus.accepted(),
            [
                "turn_on(apple_tv)",
                "turn_on(avr)",
                "select_source(avr, HDMI1)",
                "turn_on(tv)",
                "select_source(tv, HDMI2)",
            ]
        );
        assert!(
            bus.commands()
                .iter()
                .all(|c| c.dispatch == Dispatch::Blocking)
        );

        let room = orch.registry().find("Living Room").unwrap();
        assert_eq!(orch.view().source_device(&room), Some(id("apple_tv")));
    }

    #[test]
    fn unreachable_players_are_skipped() {
        let (orch, _store, bus) = setup();
        let steps = orch
            .select_source(&id("virtual_living_room"), &id("bluray"))
            .unwrap();
        assert_eq!(steps, vec![PlannedStep::new("tv", "HDMI3")]);
        assert_eq!(
            bus.accepted(),
            ["turn_on(bluray)", "turn_on(tv)", "select_source(tv, HDMI3)"]
        );
    }

    #[test]
    fn no_reachable_player_is_no_route() {
        let (orch, _store, bus) = setup();
        let result = orch.select_source(&id("virtual_living_room"), &id("turntable"));
        assert!(matches!(
            result,
            Err(RoutingError::Graph(GraphError::NoRoute { .. }))
        ));
        assert!(bus.commands().is_empty());
    }

    #[test]
    fn failure_aborts_and_clears_marker() {
        let (orch, _store, bus) = setup();
        let (tx, rx) = crossbeam_channel::unbounded();
        let orch = orch.with_refresh(tx);
        bus.fail_device("tv");

        let sink = id("virtual_living_room");
        let result = orch.select_source(&sink, &id("apple_tv"));
        assert!(matches!(result, Err(RoutingError::Command(_))));
        assert_eq!(
            bus.accepted(),
            ["turn_on(apple_tv)", "turn_on(avr)", "select_source(avr, HDMI1)"]
        );
        assert_eq!(orch.registry().pending(&sink), None);
        assert_eq!(rx.try_recv().unwrap(), RefreshRequest { sink });
    }

    /// Loopback bus on which a second selection of `bluray` claims the
    /// living room while `apple_tv` is powering on.
    struct OverlappingBus {
        inner: LoopbackBus,
        registry: OnceLock<Arc<SinkRegistry>>,
    }

    impl CommandBus for OverlappingBus {
        fn issue(&self, command: Command, dispatch: Dispatch) -> Result<(), CommandError> {
            if command == Command::turn_on("apple_tv")
                && let Some(registry) = self.registry.get()
            {
                registry.set_pending(&id("virtual_living_room"), &id("bluray"));
            }
            self.inner.issue(command, dispatch)
        }
    }

    #[test]
    fn finishing_selection_keeps_later_marker() {
        let mut graph = RoutingGraph::new();
        graph.add_edge("apple_tv", "avr", "HDMI1").unwrap();
        graph.add_edge("avr", "tv", "HDMI2").unwrap();
        graph.add_edge("bluray", "tv", "HDMI3").unwrap();
        let store = Arc::new(StateStore::new());
        let bus = Arc::new(OverlappingBus {
            inner: LoopbackBus::new(Arc::clone(&store)),
            registry: OnceLock::new(),
        });
        let orch = RoutingOrchestrator::new(Arc::new(graph), Arc::clone(&store), Arc::clone(&bus));
        orch.register(VirtualSink::new("virtual_living_room", "Living Room").with_video(["tv"]))
            .unwrap();
        bus.registry.set(Arc::clone(orch.registry())).unwrap();

        let sink = id("virtual_living_room");
        orch.select_source(&sink, &id("apple_tv")).unwrap();

        assert_eq!(orch.registry().pending(&sink), Some(id("bluray")));
        assert!(orch.registry().is_pending_source(&id("bluray")));
        assert!(!orch.registry().is_pending_source(&id("apple_tv")));
    }

    #[test]
    fn dropped_refresh_receiver_does_not_fail_selection() {
        let (orch, _store, _bus) = setup();
        let (tx, rx) = crossbeam_channel::unbounded();
        let orch = orch.with_refresh(tx);
        drop(rx);

        let sink = id("virtual_living_room");
        let steps = orch.select_source(&sink, &id("apple_tv")).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(orch.registry().pending(&sink), None);
    }

    #[test]
    fn select_by_friendly_name() {
        let (orch, _store, bus) = setup();
        orch.select_source_by_name(&id("virtual_living_room"), "Blu-ray")
            .unwrap();
        assert_eq!(bus.accepted()[0], "turn_on(bluray)");

        let err = orch
            .select_source_by_name(&id("virtual_living_room"), "Roku")
            .unwrap_err();
        assert!(matches!(err, RoutingError::UnknownSource { .. }));
    }

    #[test]
    fn unknown_sink_is_reported() {
        let (orch, _store, _bus) = setup();
        let err = orch.turn_on(&id("virtual_garage")).unwrap_err();
        assert_eq!(err, RoutingError::UnknownSink(id("virtual_garage")));
    }

    #[test]
    fn turn_off_powers_down_unused_source() {
        let (orch, store, bus) = setup();
        let sink = id("virtual_living_room");
        orch.select_source(&sink, &id("apple_tv")).unwrap();
        bus.clear_log();

        orch.turn_off(&sink).unwrap();
        assert_eq!(
            bus.accepted(),
            ["turn_off(avr)", "turn_off(tv)", "turn_off(apple_tv)"]
        );
        let last = bus.commands().pop().unwrap();
        assert_eq!(last.dispatch, Dispatch::FireAndForget);
        assert!(store.get(&id("apple_tv")).unwrap().is_off());
    }

    #[test]
    fn turn_off_keeps_source_used_elsewhere() {
        let mut graph = RoutingGraph::new();
        graph.add_edge("apple_tv", "tv", "HDMI1").unwrap();
        graph.add_edge("apple_tv", "den_tv", "HDMI1").unwrap();
        let store = Arc::new(StateStore::new());
        store.set("apple_tv", Some(DeviceSnapshot::new(PowerState::Playing)));
        store.set("tv", Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI1")));
        store.set(
            "den_tv",
            Some(DeviceSnapshot::new(PowerState::On).with_input("HDMI1")),
        );
        let bus = Arc::new(LoopbackBus::new(Arc::clone(&store)));
        let orch = RoutingOrchestrator::new(Arc::new(graph), Arc::clone(&store), Arc::clone(&bus));
        orch.register(VirtualSink::new("virtual_living_room", "Living Room").with_video(["tv"]))
            .unwrap();
        orch.register(VirtualSink::new("virtual_den", "Den").with_video(["den_tv"]))
            .unwrap();

        orch.turn_off(&id("virtual_living_room")).unwrap();
        assert_eq!(bus.accepted(), ["turn_off(tv)"]);
    }

    #[test]
    fn volume_goes_to_audio_players() {
        let (orch, _store, bus) = setup();
        let sink = id("virtual_living_room");
        orch.set_volume(&sink, 1.5).unwrap();
        orch.mute(&sink, true).unwrap();
        assert_eq!(
            bus.accepted(),
            ["volume_set(avr, 1.00)", "volume_mute(avr, true)"]
        );
    }

    #[test]
    fn transport_follows_source() {
        let (orch, store, bus) = setup();
        let sink = id("virtual_living_room");
        orch.media_play(&sink).unwrap();
        assert!(bus.commands().is_empty());

        orch.select_source(&sink, &id("apple_tv")).unwrap();
        bus.clear_log();
        orch.media_pause(&sink).unwrap();
        assert_eq!(bus.accepted(), ["media_pause(apple_tv)"]);
        assert_eq!(
            store.get(&id("apple_tv")).unwrap().power,
            PowerState::Paused
        );
    }

    #[test]
    fn turn_on_reaches_every_player() {
        let (orch, _store, bus) = setup();
        orch.turn_on(&id("virtual_living_room")).unwrap();
        assert_eq!(bus.accepted(), ["turn_on(avr)", "turn_on(tv)"]);
    }
}
