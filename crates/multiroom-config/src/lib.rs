//! Configuration for multiroom routing.
//!
//! This crate reads the files a multiroom deployment is driven from and turns
//! them into `multiroom-core` values.
//!
//! # Features
//!
//! - **Topologies**: TOML wiring (explicit edges and switch groups) plus rooms
//! - **State files**: recorded device snapshots for offline evaluation
//! - **Validation**: report every wiring mistake at once
//! - **Paths**: platform-specific topology directory
//!
//! # Example
//!
//! ```rust
//! use multiroom_config::{RoomConfig, Topology};
//!
//! let topology = Topology::new("House")
//!     .with_edge("receiver", "HDMI1", "apple_tv")
//!     .with_edge("tv", "HDMI2", "receiver")
//!     .with_room(RoomConfig::new("Living Room").with_audio("receiver").with_video("tv"));
//!
//! let graph = topology.build_graph().unwrap();
//! assert_eq!(graph.edge_count(), 2);
//! assert_eq!(topology.virtual_sinks()[0].id.as_str(), "virtual_living_room");
//! ```

mod error;
mod states;
mod topology;

/// Platform-specific paths for topology files.
pub mod paths;

/// Topology validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{
    find_topology, list_user_topologies, topology_name_from_path, user_config_dir,
    user_topologies_dir,
};
pub use states::StateFile;
pub use topology::{EdgeConfig, RoomConfig, SwitchConfig, Topology, slugify};
pub use validation::{ValidationError, ValidationResult, topology_issues, validate_topology};
