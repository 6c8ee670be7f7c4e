//! Reactive power-down cascade.
//!
//! [`CascadeController`] consumes [`StateChange`] notifications one at a
//! time and decides which upstream devices have been left without an active
//! downstream consumer. Each turn is evaluated from scratch:
//!
//! 1. recompute active edge flags for the whole graph from current snapshots
//! 2. decide whether the trigger turned off or switched input
//! 3. if either, every powered ancestor of the trigger with zero active
//!    outgoing edges is powered off
//!
//! The cascade is not recursive within a turn. Powering off an ancestor
//! produces its own notification, which re-enters the controller and
//! continues the cascade one level further up.
//!
//! An ancestor is never powered off when it is the trigger's newly resolved
//! source (matched by id or by friendly name), or when an in-flight
//! selection names it as the desired source of any sink. The latter covers
//! the window in which a chain is powered on downstream-last: the source is
//! on but nothing selects it yet.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use serde::Serialize;

use crate::command::{Command, CommandBus, CommandError, Dispatch};
use crate::device::{DeviceId, DeviceSnapshot};
use crate::graph::RoutingGraph;
use crate::registry::SinkRegistry;
use crate::resolver::SourceResolver;
use crate::state::{SnapshotProvider, StateChange};

/// Outcome of evaluating one notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CascadeDecision {
    /// Device whose change triggered the turn.
    pub trigger: DeviceId,
    /// The trigger's new snapshot reports power-off.
    pub turned_off: bool,
    /// The trigger's current input differs between old and new snapshot.
    pub changed_source: bool,
    /// Source the trigger resolves to after the change.
    pub new_source: Option<DeviceId>,
    /// Ancestors to power off, in device-id order.
    pub power_off: Vec<DeviceId>,
}

impl CascadeDecision {
    /// Returns `true` if the turn considered a cascade at all.
    pub fn is_triggered(&self) -> bool {
        self.turned_off || self.changed_source
    }
}

/// Result of executing a decision against a bus.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeReport {
    /// The decision that was executed.
    pub decision: CascadeDecision,
    /// Targets whose `turn_off` was accepted by the bus.
    pub issued: Vec<DeviceId>,
    /// Targets whose `turn_off` failed, with the error.
    pub failed: Vec<(DeviceId, CommandError)>,
}

/// Decides and issues cascade power-offs.
///
/// Holds only the graph and the sink registry; all device state comes from
/// the provider passed to each call.
pub struct CascadeController {
    graph: Arc<RoutingGraph>,
    registry: Arc<SinkRegistry>,
}

impl CascadeController {
    /// Creates a controller over a graph and the registry of the
    /// orchestrator it serves.
    pub fn new(graph: Arc<RoutingGraph>, registry: Arc<SinkRegistry>) -> Self {
        Self { graph, registry }
    }

    /// The routing graph.
    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    /// Returns `true` if notifications for `device` are acted upon.
    pub fn is_watched(&self, device: &DeviceId) -> bool {
        self.registry.watched_devices(&self.graph).contains(device)
    }

    /// Evaluates one notification without issuing anything.
    ///
    /// Calling this twice with the same change and unchanged snapshots yields
    /// the same decision.
    pub fn evaluate<P>(&self, change: &StateChange, provider: &P) -> CascadeDecision
    where
        P: SnapshotProvider + ?Sized,
    {
        let resolver = SourceResolver::new(&self.graph);
        let active = resolver.active_edges(provider);

        let turned_off = change.new.as_ref().is_some_and(DeviceSnapshot::is_off);
        let changed_source = match (&change.old, &change.new) {
            (Some(old), Some(new)) => old.current_input() != new.current_input(),
            _ => false,
        };

        let mut decision = CascadeDecision {
            trigger: change.device.clone(),
            turned_off,
            changed_source,
            new_source: None,
            power_off: Vec::new(),
        };
        if !decision.is_triggered() {
            return decision;
        }

        let new_source = resolver.resolve_source(&change.device, provider);
        let new_source_name = new_source
            .as_ref()
            .and_then(|s| provider.lookup(s))
            .and_then(|s| s.friendly_name);

        for ancestor in self.graph.ancestors_of(&change.device) {
            let Some(snapshot) = provider.lookup(&ancestor) else {
                continue;
            };
            if snapshot.is_off() {
                continue;
            }
            if new_source.as_ref() == Some(&ancestor) {
                continue;
            }
            if new_source_name.is_some() && snapshot.friendly_name == new_source_name {
                continue;
            }
            if self.registry.is_pending_source(&ancestor) {
                tracing::debug!(device = %ancestor, "cascade_skip_pending");
                continue;
            }
            if active.active_out_degree(&self.graph, &ancestor) == 0 {
                decision.power_off.push(ancestor);
            }
        }

        decision.new_source = new_source;
        tracing::debug!(
            trigger = %decision.trigger,
            turned_off,
            changed_source,
            targets = decision.power_off.len(),
            "cascade_evaluate"
        );
        decision
    }

    /// Evaluates one notification and powers off every target.
    ///
    /// Commands are fire-and-forget. A failure on one target is logged and
    /// the remaining targets are still issued.
    pub fn handle<P, B>(&self, change: &StateChange, provider: &P, bus: &B) -> CascadeReport
    where
        P: SnapshotProvider + ?Sized,
        B: CommandBus + ?Sized,
    {
        let decision = self.evaluate(change, provider);
        let mut issued = Vec::new();
        let mut failed = Vec::new();

        for target in &decision.power_off {
            let command = Command::turn_off(target);
            tracing::info!(%command, trigger = %decision.trigger, "cascade_power_off");
            match bus.issue(command, Dispatch::FireAndForget) {
                Ok(()) => issued.push(target.clone()),
                Err(e) => {
                    tracing::warn!(device = %target, error = %e, "cascade power-off failed");
                    failed.push((target.clone(), e));
                }
            }
        }

        CascadeReport {
            decision,
            issued,
            failed,
        }
    }

    /// Handles notifications until every sender is dropped.
    ///
    /// Each change is handled to completion before the next is received.
    /// Changes for unwatched devices are skipped. Returns the number of
    /// notifications handled.
    pub fn run<P, B>(&self, rx: &Receiver<StateChange>, provider: &P, bus: &B) -> usize
    where
        P: SnapshotProvider + ?Sized,
        B: CommandBus + ?Sized,
    {
        let mut handled = 0;
        for change in rx.iter() {
            if self.is_watched(&change.device) {
                self.handle(&change, provider, bus);
                handled += 1;
            }
        }
        handled
    }

    /// Handles every notification already queued on `rx`, including those
    /// produced while draining, and returns their reports.
    pub fn drain<P, B>(&self, rx: &Receiver<StateChange>, provider: &P, bus: &B) -> Vec<CascadeReport>
    where
        P: SnapshotProvider + ?Sized,
        B: CommandBus + ?Sized,
    {
        let mut reports = Vec::new();
        while let Ok(change) = rx.try_recv() {
            if self.is_watched(&change.device) {
                reports.push(self.handle(&change, provider, bus));
            }
        }
        reports
    }
}
