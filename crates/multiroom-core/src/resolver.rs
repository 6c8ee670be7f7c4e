//! Source resolution over the routing graph.
//!
//! [`SourceResolver`] answers two questions from live device state:
//!
//! - which root source currently feeds a given sink
//!   ([`resolve_source`](SourceResolver::resolve_source)), and
//! - which edges are currently carrying signal
//!   ([`active_edges`](SourceResolver::active_edges)).
//!
//! Both are derived fresh from the snapshot provider on every call. An input
//! that matches no configured edge is a normal transient state (an unmapped
//! physical input is selected), so it yields "no source" rather than an error.

use std::collections::HashMap;

use crate::device::DeviceId;
use crate::graph::{EdgeId, RoutingGraph};
use crate::state::SnapshotProvider;

/// Stateless resolver borrowing a routing graph.
#[derive(Clone, Copy)]
pub struct SourceResolver<'g> {
    graph: &'g RoutingGraph,
}

impl<'g> SourceResolver<'g> {
    /// Creates a resolver over `graph`.
    pub fn new(graph: &'g RoutingGraph) -> Self {
        Self { graph }
    }

    /// Walks upstream from `sink` following each device's observed input.
    ///
    /// Returns the root device reached, `sink` itself if it has no incoming
    /// edges, or `None` if the walk hits a device with no snapshot or an input
    /// that matches none of its incoming selectors. Devices absent from the
    /// graph resolve to `None`. The walk is bounded by the graph depth.
    pub fn resolve_source<P>(&self, sink: &DeviceId, provider: &P) -> Option<DeviceId>
    where
        P: SnapshotProvider + ?Sized,
    {
        if !self.graph.contains(sink) {
            return None;
        }

        let mut current = sink.clone();
        loop {
            let incoming = self.graph.in_edges(&current);
            if incoming.is_empty() {
                return Some(current);
            }
            let snapshot = provider.lookup(&current)?;
            let input = snapshot.current_input()?;
            let upstream = incoming.iter().find(|e| e.selector == input)?;
            tracing::trace!(device = %current, input, upstream = %upstream.from, "resolve_step");
            current = upstream.from.clone();
        }
    }

    /// Recomputes active flags for every edge into a device that has a
    /// snapshot.
    ///
    /// For each such device the incoming edge whose selector equals its
    /// current input is marked active and its siblings inactive. Edges into
    /// devices with no snapshot stay unspecified. Callers recompute the whole
    /// table each notification turn rather than patching a previous one.
    pub fn active_edges<P>(&self, provider: &P) -> ActiveEdges
    where
        P: SnapshotProvider + ?Sized,
    {
        let mut flags = HashMap::new();
        for device in self.graph.devices() {
            let incoming = self.graph.in_edges(device);
            if incoming.is_empty() {
                continue;
            }
            let Some(snapshot) = provider.lookup(device) else {
                continue;
            };
            let input = snapshot.current_input();
            for edge in incoming {
                flags.insert(edge.id, input == Some(edge.selector));
            }
        }
        ActiveEdges { flags }
    }
}

/// Per-edge active flags derived from one pass over current snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveEdges {
    flags: HashMap<EdgeId, bool>,
}

impl ActiveEdges {
    /// Flag for `edge`: `Some(true)` active, `Some(false)` inactive, `None`
    /// if its sink had no snapshot.
    pub fn get(&self, edge: EdgeId) -> Option<bool> {
        self.flags.get(&edge).copied()
    }

    /// Returns `true` only if `edge` is known to be active.
    pub fn is_active(&self, edge: EdgeId) -> bool {
        self.get(edge).unwrap_or(false)
    }

    /// Number of active edges leaving `device`.
    pub fn active_out_degree(&self, graph: &RoutingGraph, device: &DeviceId) -> usize {
        graph
            .out_edges(device)
            .iter()
            .filter(|e| self.is_active(e.id))
            .count()
    }

    /// IDs of all active edges, sorted.
    pub fn active(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .flags
            .iter()
            .filter(|&(_, &active)| active)
            .map(|(&id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of edges with a known flag.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns `true` if no edge has a known flag.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
