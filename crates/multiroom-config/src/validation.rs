//! Topology validation.
//!
//! Checks a [`Topology`] for mistakes that would otherwise surface only at
//! runtime: blank identifiers, devices wired to themselves, rooms without
//! players, and wiring the routing graph cannot represent (cycles, repeated
//! selectors, or more than one path from a source to a room's player).
//!
//! # Example
//!
//! ```rust
//! use multiroom_config::{Topology, validate_topology};
//!
//! let topology = Topology::new("Den").with_edge("tv", "HDMI1", "console");
//! validate_topology(&topology).expect("single edge is valid");
//! ```

use std::collections::HashSet;

use multiroom_core::{DeviceId, GraphError, RoutingGraph};
use thiserror::Error;

use crate::topology::{Topology, slugify};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A device id is blank.
    #[error("empty device id in {context}")]
    EmptyIdentifier {
        /// Where the blank id appeared.
        context: String,
    },

    /// An edge has a blank selector.
    #[error("empty selector for input of '{sink}'")]
    EmptySelector {
        /// Device whose input is unlabeled.
        sink: String,
    },

    /// A device is listed as its own source.
    #[error("'{device}' is wired to itself")]
    SelfFeeding {
        /// The offending device.
        device: String,
    },

    /// A switch group lists no players or no sources.
    #[error("switch #{index} has no {missing}")]
    EmptySwitch {
        /// Position of the switch in the file.
        index: usize,
        /// `"players"` or `"sources"`.
        missing: &'static str,
    },

    /// A room has no audio and no video players.
    #[error("room '{area}' has no players")]
    EmptyRoom {
        /// Area name.
        area: String,
    },

    /// Two rooms map to the same virtual sink id.
    #[error("room '{area}' is defined more than once")]
    DuplicateRoom {
        /// Area name of the later definition.
        area: String,
    },

    /// The wiring cannot be represented as a routing graph.
    #[error("{0}")]
    Topology(GraphError),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Every problem found in `topology`, in file order.
///
/// Unlike [`Topology::build_graph`], graph construction continues past a
/// rejected link so that all of them are reported.
pub fn topology_issues(topology: &Topology) -> Vec<ValidationError> {
    let mut issues = Vec::new();

    for (index, switch) in topology.switches.iter().enumerate() {
        if switch.players.is_empty() {
            issues.push(ValidationError::EmptySwitch {
                index,
                missing: "players",
            });
        }
        if switch.sources.is_empty() {
            issues.push(ValidationError::EmptySwitch {
                index,
                missing: "sources",
            });
        }
    }

    let mut graph = RoutingGraph::new();
    for link in topology.links() {
        if link.sink.trim().is_empty() {
            issues.push(ValidationError::EmptyIdentifier {
                context: format!("sink of input '{}'", link.selector),
            });
            continue;
        }
        if link.source.trim().is_empty() {
            issues.push(ValidationError::EmptyIdentifier {
                context: format!("source for '{}'", link.sink),
            });
            continue;
        }
        if link.selector.trim().is_empty() {
            issues.push(ValidationError::EmptySelector { sink: link.sink });
            continue;
        }
        if link.sink == link.source {
            issues.push(ValidationError::SelfFeeding { device: link.sink });
            continue;
        }
        if let Err(e) = graph.add_edge(link.source, link.sink, link.selector) {
            issues.push(ValidationError::Topology(e));
        }
    }

    let mut seen = HashSet::new();
    for room in &topology.rooms {
        if room.area.trim().is_empty() {
            issues.push(ValidationError::EmptyIdentifier {
                context: "room area".to_string(),
            });
            continue;
        }
        if !seen.insert(slugify(&room.area)) {
            issues.push(ValidationError::DuplicateRoom {
                area: room.area.clone(),
            });
        }
        if room.audio.is_empty() && room.video.is_empty() {
            issues.push(ValidationError::EmptyRoom {
                area: room.area.clone(),
            });
        }
        for player in room.audio.iter().chain(&room.video) {
            if player.trim().is_empty() {
                issues.push(ValidationError::EmptyIdentifier {
                    context: format!("players of room '{}'", room.area),
                });
            }
        }
    }

    issues.extend(ambiguous_routes(&graph, topology));
    issues
}

/// Every (root, player) pair joined by more than one path.
fn ambiguous_routes(graph: &RoutingGraph, topology: &Topology) -> Vec<ValidationError> {
    let mut reported = HashSet::new();
    let mut issues = Vec::new();
    for room in &topology.rooms {
        for player in room.audio.iter().chain(&room.video) {
            let player = DeviceId::new(player.as_str());
            for root in graph.root_ancestors_of(&player) {
                if let Err(e @ GraphError::AmbiguousRoute { .. }) = graph.unique_path(&root, &player)
                    && reported.insert((root.clone(), player.clone()))
                {
                    issues.push(ValidationError::Topology(e));
                }
            }
        }
    }
    issues
}

/// Validates a topology.
///
/// # Errors
///
/// The single problem found, or [`ValidationError::Multiple`] when there
/// are several.
pub fn validate_topology(topology: &Topology) -> ValidationResult<()> {
    let mut issues = topology_issues(topology);
    match issues.len() {
        0 => Ok(()),
        1 => Err(issues.remove(0)),
        _ => Err(ValidationError::Multiple(issues)),
    }
}
