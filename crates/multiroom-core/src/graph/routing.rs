//! Routing graph construction, cycle detection, and graph queries.
//!
//! [`RoutingGraph`] owns the device topology (nodes and labeled edges). It is
//! a pure data structure: no I/O, no device state. Source resolution and
//! route planning are layered on top by [`SourceResolver`](crate::SourceResolver)
//! and [`PathPlanner`](crate::PathPlanner).

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::device::DeviceId;

use super::edge::{Edge, EdgeId, EdgeRef};
use super::node::{NodeData, NodeId};

/// Errors raised by graph construction and route queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Adding this edge would let a device feed itself.
    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Upstream device of the rejected edge.
        from: DeviceId,
        /// Downstream device of the rejected edge.
        to: DeviceId,
    },
    /// An edge between these devices already exists.
    #[error("edge {from} -> {to} already exists")]
    DuplicateEdge {
        /// Upstream device.
        from: DeviceId,
        /// Downstream device.
        to: DeviceId,
    },
    /// The sink already has an incoming edge with this selector.
    #[error("{sink} already has an input labeled '{selector}'")]
    DuplicateSelector {
        /// Downstream device.
        sink: DeviceId,
        /// The repeated selector value.
        selector: String,
    },
    /// No path connects the two devices.
    #[error("no route from {origin} to {sink}")]
    NoRoute {
        /// Requested source device.
        origin: DeviceId,
        /// Requested sink device.
        sink: DeviceId,
    },
    /// More than one path connects the two devices.
    #[error("{paths} routes from {origin} to {sink}; exactly one is required")]
    AmbiguousRoute {
        /// Requested source device.
        origin: DeviceId,
        /// Requested sink device.
        sink: DeviceId,
        /// Number of simple paths found.
        paths: usize,
    },
}

/// Directed acyclic graph of devices and selector-labeled edges.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add edges with [`add_edge()`](Self::add_edge); nodes are created on
///    first mention
/// 3. Wrap in `Arc` and hand it to the resolver, planner, and controller
#[derive(Debug, Default)]
pub struct RoutingGraph {
    nodes: Vec<NodeData>,
    edges: Vec<Edge>,
    index: HashMap<DeviceId, NodeId>,
}

impl RoutingGraph {
    /// Creates an empty routing graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    /// Adds a directed edge `from → to`, labeled with the input value `to`
    /// must select to receive `from`.
    ///
    /// Returns the new edge's ID, or an error if:
    /// - The edge would create a cycle (including `from == to`)
    /// - An edge `from → to` already exists
    /// - `to` already has an incoming edge with the same selector
    ///
    /// On error the graph is left unchanged.
    pub fn add_edge(
        &mut self,
        from: impl Into<DeviceId>,
        to: impl Into<DeviceId>,
        selector: impl Into<String>,
    ) -> Result<EdgeId, GraphError> {
        let from = from.into();
        let to = to.into();
        let selector = selector.into();

        if from == to {
            return Err(GraphError::CycleDetected { from, to });
        }

        let from_node = self.index.get(&from).copied();
        let to_node = self.index.get(&to).copied();

        if let Some(t) = to_node
            && self.incoming_refs(t).any(|e| e.selector == selector)
        {
            return Err(GraphError::DuplicateSelector { sink: to, selector });
        }

        if let (Some(f), Some(t)) = (from_node, to_node) {
            if self.find_edge(f, t).is_some() {
                return Err(GraphError::DuplicateEdge { from, to });
            }
            // A cycle exists if `to` can already reach `from`.
            if self.can_reach(t, f) {
                return Err(GraphError::CycleDetected { from, to });
            }
        }

        tracing::debug!(%from, %to, %selector, "graph_connect");

        let f = self.intern(from);
        let t = self.intern(to);
        let edge_id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            from: f,
            to: t,
            selector,
        });
        self.nodes[f.0 as usize].outgoing.push(edge_id);
        self.nodes[t.0 as usize].incoming.push(edge_id);
        Ok(edge_id)
    }

    // --- Accessors ---

    /// Number of devices in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if `device` appears in any edge.
    pub fn contains(&self, device: &DeviceId) -> bool {
        self.index.contains_key(device)
    }

    /// All devices, in first-mention order.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.nodes.iter().map(|n| &n.device)
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        (0..self.edges.len()).map(|i| self.edge_ref(EdgeId(i as u32)))
    }

    /// Looks up an edge by ID.
    pub fn edge(&self, id: EdgeId) -> Option<EdgeRef<'_>> {
        ((id.0 as usize) < self.edges.len()).then(|| self.edge_ref(id))
    }

    /// Incoming edges of `device`, in insertion order. Empty if absent.
    pub fn in_edges(&self, device: &DeviceId) -> Vec<EdgeRef<'_>> {
        match self.index.get(device) {
            Some(&n) => self.incoming_refs(n).collect(),
            None => Vec::new(),
        }
    }

    /// Outgoing edges of `device`, in insertion order. Empty if absent.
    pub fn out_edges(&self, device: &DeviceId) -> Vec<EdgeRef<'_>> {
        match self.index.get(device) {
            Some(&n) => self.nodes[n.0 as usize]
                .outgoing
                .iter()
                .map(|&e| self.edge_ref(e))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Selector of the edge `from → to`, if it exists.
    pub fn selector(&self, from: &DeviceId, to: &DeviceId) -> Option<&str> {
        let f = *self.index.get(from)?;
        let t = *self.index.get(to)?;
        self.find_edge(f, t)
            .map(|e| self.edges[e.0 as usize].selector.as_str())
    }

    // --- Graph queries ---

    /// Devices with no incoming edges, in first-mention order.
    pub fn roots(&self) -> Vec<DeviceId> {
        self.nodes
            .iter()
            .filter(|n| n.incoming.is_empty())
            .map(|n| n.device.clone())
            .collect()
    }

    /// Returns `true` if `device` is in the graph and has no incoming edges.
    pub fn is_root(&self, device: &DeviceId) -> bool {
        self.index
            .get(device)
            .is_some_and(|&n| self.nodes[n.0 as usize].incoming.is_empty())
    }

    /// All devices with a directed path to `sink`.
    ///
    /// Returns an empty set if `sink` is absent from the graph.
    pub fn ancestors_of(&self, sink: &DeviceId) -> BTreeSet<DeviceId> {
        let Some(&node) = self.index.get(sink) else {
            return BTreeSet::new();
        };
        self.upstream_mask(node)
            .iter()
            .enumerate()
            .filter(|&(_, &upstream)| upstream)
            .map(|(idx, _)| self.nodes[idx].device.clone())
            .collect()
    }

    /// The root sources that could feed `sink`: `ancestors_of(sink) ∩ roots()`.
    pub fn root_ancestors_of(&self, sink: &DeviceId) -> BTreeSet<DeviceId> {
        self.ancestors_of(sink)
            .into_iter()
            .filter(|d| self.is_root(d))
            .collect()
    }

    /// Enumerates every simple directed path from `source` to `sink`.
    ///
    /// Each path lists devices in source-to-sink order. A device is connected
    /// to itself by the trivial one-element path. Returns an empty list if
    /// either device is absent.
    pub fn simple_paths(&self, source: &DeviceId, sink: &DeviceId) -> Vec<Vec<DeviceId>> {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(sink)) else {
            return Vec::new();
        };
        if s == t {
            return vec![vec![source.clone()]];
        }

        // Only descend into nodes that can still reach the sink.
        let mut relevant = self.upstream_mask(t);
        relevant[t.0 as usize] = true;
        if !relevant[s.0 as usize] {
            return Vec::new();
        }

        let mut paths = Vec::new();
        let mut path = vec![s];
        self.walk_paths(s, t, &relevant, &mut path, &mut paths);
        paths
    }

    /// The single simple path from `source` to `sink`.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoRoute`] if no path exists, [`GraphError::AmbiguousRoute`]
    /// if more than one does. Neither case picks a path silently.
    pub fn unique_path(&self, source: &DeviceId, sink: &DeviceId) -> Result<Vec<DeviceId>, GraphError> {
        let mut paths = self.simple_paths(source, sink);
        match paths.len() {
            0 => Err(GraphError::NoRoute {
                origin: source.clone(),
                sink: sink.clone(),
            }),
            1 => Ok(paths.pop().unwrap_or_default()),
            n => Err(GraphError::AmbiguousRoute {
                origin: source.clone(),
                sink: sink.clone(),
                paths: n,
            }),
        }
    }

    // --- Internal helpers ---

    fn intern(&mut self, device: DeviceId) -> NodeId {
        if let Some(&id) = self.index.get(&device) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.index.insert(device.clone(), id);
        self.nodes.push(NodeData::new(device));
        id
    }

    fn edge_ref(&self, id: EdgeId) -> EdgeRef<'_> {
        let edge = &self.edges[id.0 as usize];
        EdgeRef {
            id,
            from: &self.nodes[edge.from.0 as usize].device,
            to: &self.nodes[edge.to.0 as usize].device,
            selector: &edge.selector,
        }
    }

    fn incoming_refs(&self, node: NodeId) -> impl Iterator<Item = EdgeRef<'_>> {
        self.nodes[node.0 as usize]
            .incoming
            .iter()
            .map(|&e| self.edge_ref(e))
    }

    fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.nodes[from.0 as usize]
            .outgoing
            .iter()
            .copied()
            .find(|e| self.edges[e.0 as usize].to == to)
    }

    /// DFS reachability check: can `from` reach `to` via existing edges?
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.0 as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            for edge_id in &self.nodes[idx].outgoing {
                stack.push(self.edges[edge_id.0 as usize].to);
            }
        }
        false
    }

    /// Marks every node with a path to `node` (excluding `node` itself).
    fn upstream_mask(&self, node: NodeId) -> Vec<bool> {
        let mut upstream = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.incoming_parents(node).collect();

        while let Some(current) = stack.pop() {
            let idx = current.0 as usize;
            if upstream[idx] {
                continue;
            }
            upstream[idx] = true;
            stack.extend(self.incoming_parents(current));
        }
        upstream
    }

    fn incoming_parents(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[node.0 as usize]
            .incoming
            .iter()
            .map(|e| self.edges[e.0 as usize].from)
    }

    fn walk_paths(
        &self,
        current: NodeId,
        target: NodeId,
        relevant: &[bool],
        path: &mut Vec<NodeId>,
        out: &mut Vec<Vec<DeviceId>>,
    ) {
        if current == target {
            out.push(
                path.iter()
                    .map(|n| self.nodes[n.0 as usize].device.clone())
                    .collect(),
            );
            return;
        }
        for edge_id in &self.nodes[current.0 as usize].outgoing {
            let next = self.edges[edge_id.0 as usize].to;
            if !relevant[next.0 as usize] {
                continue;
            }
            path.push(next);
            self.walk_paths(next, target, relevant, path, out);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s)
    }

    /// apple_tv → avr → tv, bluray → tv
    fn living_room() -> RoutingGraph {
        let mut graph = RoutingGraph::new();
        graph.add_edge("apple_tv", "avr", "HDMI1").unwrap();
        graph.add_edge("avr", "tv", "HDMI2").unwrap();
        graph.add_edge("bluray", "tv", "HDMI3").unwrap();
        graph
    }

    #[test]
    fn test_add_edges() {
        let graph = living_room();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.selector(&id("avr"), &id("tv")), Some("HDMI2"));
        assert_eq!(graph.selector(&id("tv"), &id("avr")), None);
    }

    #[test]
    fn test_cycle_detection_self_loop() {
        let mut graph = RoutingGraph::new();
        let result = graph.add_edge("tv", "tv", "HDMI1");
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_cycle_detection_direct() {
        let mut graph = RoutingGraph::new();
        graph.add_edge("a", "b", "IN1").unwrap();
        let result = graph.add_edge("b", "a", "IN1");
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }

    #[test]
    fn test_cycle_detection_indirect_leaves_graph_unchanged() {
        let mut graph = living_room();
        let result = graph.add_edge("tv", "apple_tv", "ARC");
        assert_eq!(
            result,
            Err(GraphError::CycleDetected {
                from: id("tv"),
                to: id("apple_tv"),
            })
        );
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.out_edges(&id("tv")).is_empty());
        assert!(graph.is_root(&id("apple_tv")));
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph = living_room();
        let result = graph.add_edge("avr", "tv", "HDMI4");
        assert!(matches!(result, Err(GraphError::DuplicateEdge { .. })));
    }

    #[test]
    fn test_duplicate_selector_rejected() {
        let mut graph = living_room();
        let result = graph.add_edge("chromecast", "tv", "HDMI3");
        assert!(matches!(
            result,
            Err(GraphError::DuplicateSelector { ref selector, .. }) if selector == "HDMI3"
        ));
        // The new source was never interned.
        assert!(!graph.contains(&id("chromecast")));
    }

    #[test]
    fn test_roots() {
        let graph = living_room();
        assert_eq!(graph.roots(), vec![id("apple_tv"), id("bluray")]);
        assert!(!graph.is_root(&id("avr")));
        assert!(!graph.is_root(&id("missing")));
    }

    #[test]
    fn test_ancestors() {
        let graph = living_room();
        let ancestors = graph.ancestors_of(&id("tv"));
        assert_eq!(
            ancestors.into_iter().collect::<Vec<_>>(),
            vec![id("apple_tv"), id("avr"), id("bluray")]
        );
        assert!(graph.ancestors_of(&id("apple_tv")).is_empty());
    }

    #[test]
    fn test_ancestors_of_absent_device_is_empty() {
        let graph = living_room();
        assert!(graph.ancestors_of(&id("kitchen_speaker")).is_empty());
        assert!(graph.root_ancestors_of(&id("kitchen_speaker")).is_empty());
    }

    #[test]
    fn test_root_ancestors() {
        let graph = living_room();
        let roots = graph.root_ancestors_of(&id("tv"));
        assert_eq!(
            roots.into_iter().collect::<Vec<_>>(),
            vec![id("apple_tv"), id("bluray")]
        );
    }

    #[test]
    fn test_in_and_out_edges() {
        let graph = living_room();
        let incoming = graph.in_edges(&id("tv"));
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].from, &id("avr"));
        assert_eq!(incoming[0].selector, "HDMI2");
        assert_eq!(incoming[1].from, &id("bluray"));

        let outgoing = graph.out_edges(&id("apple_tv"));
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].to, &id("avr"));
        assert!(graph.in_edges(&id("missing")).is_empty());
    }

    #[test]
    fn test_simple_path_chain() {
        let graph = living_room();
        let paths = graph.simple_paths(&id("apple_tv"), &id("tv"));
        assert_eq!(paths, vec![vec![id("apple_tv"), id("avr"), id("tv")]]);
    }

    #[test]
    fn test_simple_path_to_self() {
        let graph = living_room();
        assert_eq!(
            graph.simple_paths(&id("avr"), &id("avr")),
            vec![vec![id("avr")]]
        );
    }

    #[test]
    fn test_unique_path_no_route() {
        let graph = living_room();
        let result = graph.unique_path(&id("bluray"), &id("avr"));
        assert!(matches!(result, Err(GraphError::NoRoute { .. })));
        let result = graph.unique_path(&id("missing"), &id("tv"));
        assert!(matches!(result, Err(GraphError::NoRoute { .. })));
    }

    #[test]
    fn test_unique_path_ambiguous_diamond() {
        // src → matrix_a → tv and src → matrix_b → tv
        let mut graph = RoutingGraph::new();
        graph.add_edge("src", "matrix_a", "IN1").unwrap();
        graph.add_edge("src", "matrix_b", "IN1").unwrap();
        graph.add_edge("matrix_a", "tv", "HDMI1").unwrap();
        graph.add_edge("matrix_b", "tv", "HDMI2").unwrap();

        assert_eq!(graph.simple_paths(&id("src"), &id("tv")).len(), 2);
        let result = graph.unique_path(&id("src"), &id("tv"));
        assert_eq!(
            result,
            Err(GraphError::AmbiguousRoute {
                origin: id("src"),
                sink: id("tv"),
                paths: 2,
            })
        );
    }

    #[test]
    fn test_edge_lookup() {
        let graph = living_room();
        let first = graph.edges().next().unwrap();
        assert_eq!(graph.edge(first.id), Some(first));
        assert!(graph.edge(EdgeId(99)).is_none());
    }

    #[test]
    fn test_error_display() {
        let err = GraphError::NoRoute {
            origin: id("bluray"),
            sink: id("avr"),
        };
        assert_eq!(err.to_string(), "no route from bluray to avr");
    }
}
