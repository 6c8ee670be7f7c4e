//! Route planning: the input selections that carry a source to a sink.

use core::fmt;

use serde::Serialize;

use crate::device::DeviceId;
use crate::graph::{GraphError, RoutingGraph};
use crate::registry::VirtualSink;

/// One switching step: set `device` to `required_input`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PlannedStep {
    /// Device to switch.
    pub device: DeviceId,
    /// Input value the device must select.
    pub required_input: String,
}

impl PlannedStep {
    /// Creates a planned step.
    pub fn new(device: impl Into<DeviceId>, required_input: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            required_input: required_input.into(),
        }
    }
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.device, self.required_input)
    }
}

/// Stateless route planner borrowing a routing graph.
#[derive(Clone, Copy)]
pub struct PathPlanner<'g> {
    graph: &'g RoutingGraph,
}

impl<'g> PathPlanner<'g> {
    /// Creates a planner over `graph`.
    pub fn new(graph: &'g RoutingGraph) -> Self {
        Self { graph }
    }

    /// Plans the selections that route `source` to `sink`.
    ///
    /// Steps are returned in source-to-sink order: every device on the path
    /// after `source`, each paired with the selector of the edge feeding it.
    /// Execute them in this order so each device is switched only after its
    /// upstream is already producing the right signal. Routing a device to
    /// itself needs no steps.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoRoute`] or [`GraphError::AmbiguousRoute`] if the
    /// topology does not hold exactly one path.
    pub fn plan_route(&self, source: &DeviceId, sink: &DeviceId) -> Result<Vec<PlannedStep>, GraphError> {
        let path = self.graph.unique_path(source, sink)?;
        let steps: Vec<PlannedStep> = path
            .windows(2)
            .filter_map(|pair| {
                self.graph
                    .selector(&pair[0], &pair[1])
                    .map(|selector| PlannedStep::new(pair[1].clone(), selector))
            })
            .collect();
        tracing::debug!(%source, %sink, steps = steps.len(), "plan_route");
        Ok(steps)
    }

    /// Plans `source` onto every player of `sink` it can reach.
    ///
    /// Per-player plans are merged in player order; a device shared by two
    /// plans keeps its first step. Players with no route from `source` are
    /// skipped rather than failing the whole room.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoRoute`] if no player is reachable, or the first
    /// [`GraphError::AmbiguousRoute`] met.
    pub fn plan_sink(&self, source: &DeviceId, sink: &VirtualSink) -> Result<Vec<PlannedStep>, GraphError> {
        let mut steps: Vec<PlannedStep> = Vec::new();
        let mut routable = 0;

        for player in sink.players() {
            match self.plan_route(source, player) {
                Ok(plan) => {
                    routable += 1;
                    for step in plan {
                        if !steps.iter().any(|s| s.device == step.device) {
                            steps.push(step);
                        }
                    }
                }
                Err(GraphError::NoRoute { .. }) => {
                    tracing::debug!(%source, %player, "player not reachable from source");
                }
                Err(e) => return Err(e),
            }
        }
        if routable == 0 {
            return Err(GraphError::NoRoute {
                origin: source.clone(),
                sink: sink.id.clone(),
            });
        }
        Ok(steps)
    }
}
