//! Graph edge types for the routing graph.
//!
//! An edge connects an upstream source device to a downstream sink device and
//! is labeled with the selector the sink must be set to. Whether an edge is
//! *active* is never stored here; it is derived per notification turn by the
//! [`SourceResolver`](crate::SourceResolver).

use crate::device::DeviceId;

use super::node::NodeId;

/// Unique identifier for an edge in the routing graph.
///
/// Edge IDs are assigned sequentially in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// A directed, labeled connection between two devices.
#[derive(Debug)]
pub(crate) struct Edge {
    /// Upstream (source) node.
    pub from: NodeId,
    /// Downstream (sink) node.
    pub to: NodeId,
    /// Input value the sink must select to receive `from`.
    pub selector: String,
}

/// Borrowed view of an edge with its endpoints resolved to device ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRef<'g> {
    /// Edge identifier.
    pub id: EdgeId,
    /// Upstream device.
    pub from: &'g DeviceId,
    /// Downstream device.
    pub to: &'g DeviceId,
    /// Input value the downstream device must select.
    pub selector: &'g str,
}
