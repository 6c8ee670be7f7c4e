//! Error type for orchestrated routing operations.

use thiserror::Error;

use crate::command::CommandError;
use crate::device::DeviceId;
use crate::graph::GraphError;

/// Errors surfaced by [`RoutingOrchestrator`](crate::RoutingOrchestrator) and
/// [`SinkRegistry`](crate::SinkRegistry).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Route planning failed (no path, or more than one).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A command in a blocking sequence failed; later steps were not issued.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// No virtual sink with this id is registered.
    #[error("unknown sink: {0}")]
    UnknownSink(DeviceId),

    /// A virtual sink with this id is already registered.
    #[error("sink already registered: {0}")]
    DuplicateSink(DeviceId),

    /// The friendly name is not in the sink's source list.
    #[error("'{name}' is not a source of {sink}")]
    UnknownSource {
        /// Sink the lookup was made against.
        sink: DeviceId,
        /// Friendly name that was requested.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn graph_error_is_transparent() {
        let err: RoutingError = GraphError::NoRoute {
            origin: DeviceId::new("bluray"),
            sink: DeviceId::new("speaker"),
        }
        .into();
        assert_eq!(err.to_string(), "no route from bluray to speaker");
    }

    #[test]
    fn command_error_is_transparent() {
        let err: RoutingError = CommandError::rejected(&Command::turn_on("tv"), "offline").into();
        assert_eq!(err.to_string(), "turn_on(tv) rejected: offline");
    }

    #[test]
    fn unknown_source_display() {
        let err = RoutingError::UnknownSource {
            sink: DeviceId::new("virtual_den"),
            name: "Roku".to_string(),
        };
        assert_eq!(err.to_string(), "'Roku' is not a source of virtual_den");
    }
}
