//! Multiroom Core - routing graph and power cascade for A/V distribution
//!
//! This crate models a building's audio/video wiring as a directed graph of
//! devices and keeps physical switching state consistent with what users
//! select. It never owns device state: every query reads the latest
//! snapshot through a [`SnapshotProvider`].
//!
//! # Core Abstractions
//!
//! ## Topology
//!
//! - [`RoutingGraph`] - DAG of devices and selector-labeled edges
//! - [`VirtualSink`] / [`SinkRegistry`] - rooms presented as one endpoint
//!
//! ## Algorithms
//!
//! - [`SourceResolver`] - which root source currently feeds a sink, and
//!   which edges are live
//! - [`PathPlanner`] - the input selections that route a source to a sink
//! - [`CascadeController`] - powers off upstream devices left without a
//!   consumer
//!
//! ## Driving devices
//!
//! - [`CommandBus`] - outbound command channel (blocking or fire-and-forget)
//! - [`RoutingOrchestrator`] - serial route selection and room power verbs
//! - [`LoopbackBus`] - in-memory bus applying commands to a [`StateStore`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use multiroom_core::{
//!     DeviceId, LoopbackBus, RoutingGraph, RoutingOrchestrator, StateStore, VirtualSink,
//! };
//!
//! let mut graph = RoutingGraph::new();
//! graph.add_edge("apple_tv", "receiver", "HDMI1").unwrap();
//! graph.add_edge("receiver", "tv", "HDMI2").unwrap();
//!
//! let store = Arc::new(StateStore::new());
//! let bus = Arc::new(LoopbackBus::new(Arc::clone(&store)));
//! let orchestrator = RoutingOrchestrator::new(Arc::new(graph), Arc::clone(&store), Arc::clone(&bus));
//! orchestrator
//!     .register(VirtualSink::new("virtual_den", "Den").with_video(["tv"]))
//!     .unwrap();
//!
//! orchestrator
//!     .select_source(&DeviceId::new("virtual_den"), &DeviceId::new("apple_tv"))
//!     .unwrap();
//! assert_eq!(bus.accepted().len(), 5);
//! ```
//!
//! # Design Principles
//!
//! - **Derived, not cached**: active edges and current sources are recomputed
//!   from snapshots on every turn
//! - **Explicit handles**: graph and registry are passed by `Arc`, never global
//! - **Typed topology faults**: missing or ambiguous routes are errors the
//!   caller decides about

pub mod bus;
pub mod cascade;
pub mod command;
pub mod device;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod view;

// Re-export main types at crate root
pub use bus::{IssuedCommand, LoopbackBus};
pub use cascade::{CascadeController, CascadeDecision, CascadeReport};
pub use command::{Command, CommandBus, CommandError, Dispatch, Verb};
pub use device::{DeviceId, DeviceSnapshot, PowerState};
pub use error::RoutingError;
pub use graph::{EdgeId, EdgeRef, GraphError, NodeId, RoutingGraph};
pub use orchestrator::{RefreshRequest, RoutingOrchestrator};
pub use planner::{PathPlanner, PlannedStep};
pub use registry::{SinkRegistry, VirtualSink};
pub use resolver::{ActiveEdges, SourceResolver};
pub use state::{SnapshotProvider, StateChange, StateStore};
pub use view::{SinkView, SourceEntry};
