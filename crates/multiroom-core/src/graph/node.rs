//! Graph node types for the routing graph.
//!
//! Each device in the graph gets a [`NodeId`]. The `NodeData` struct bundles
//! the device identifier with its adjacency lists.

use crate::device::DeviceId;

use super::edge::EdgeId;

/// Unique identifier for a node in the routing graph.
///
/// Node IDs are assigned sequentially the first time a device appears in an
/// edge and remain stable for the lifetime of the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Internal bookkeeping for a node in the graph.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub device: DeviceId,
    /// Edges arriving at this node, in insertion order.
    pub incoming: Vec<EdgeId>,
    /// Edges leaving this node, in insertion order.
    pub outgoing: Vec<EdgeId>,
}

impl NodeData {
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }
}
