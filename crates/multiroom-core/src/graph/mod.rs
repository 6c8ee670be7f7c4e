//! Directed routing graph for A/V distribution.
//!
//! The graph models which device can feed which: an edge runs from an
//! upstream source device to a downstream sink device and carries the
//! *selector*, the input value the sink must be switched to in order to
//! receive that source.
//!
//! # Invariants
//!
//! - The graph is a DAG. [`RoutingGraph::add_edge`] rejects any edge that
//!   would let a device feed itself, even transitively, and leaves the graph
//!   unchanged.
//! - Between two connected devices exactly one simple path is expected.
//!   Multi-path topologies are a configuration fault surfaced by
//!   [`RoutingGraph::unique_path`] as [`GraphError::AmbiguousRoute`].
//! - Two edges into the same sink never share a selector, so a sink's
//!   observed input selects at most one upstream edge.
//!
//! The graph is built once from configuration and is immutable afterwards.
//! Share it between components with `Arc<RoutingGraph>`.
//!
//! # Example
//!
//! ```rust
//! use multiroom_core::DeviceId;
//! use multiroom_core::graph::RoutingGraph;
//!
//! let mut graph = RoutingGraph::new();
//! graph.add_edge("media_player.apple_tv", "media_player.receiver", "HDMI1").unwrap();
//! graph.add_edge("media_player.receiver", "media_player.tv", "HDMI2").unwrap();
//!
//! assert_eq!(graph.roots(), vec![DeviceId::new("media_player.apple_tv")]);
//! assert!(graph.add_edge("media_player.tv", "media_player.apple_tv", "IN").is_err());
//! ```

pub mod edge;
pub mod node;
mod routing;

pub use edge::{EdgeId, EdgeRef};
pub use node::NodeId;
pub use routing::{GraphError, RoutingGraph};
