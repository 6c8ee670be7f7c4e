//! Shared CLI helpers used across multiple commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use multiroom_config::{
    StateFile, Topology, find_topology, list_user_topologies, topology_name_from_path,
    user_topologies_dir,
};
use multiroom_core::{DeviceId, RoutingGraph, SinkRegistry, SnapshotProvider, VirtualSink};

/// Load a topology by name or path.
///
/// Searches the path itself, then `<name>.toml` in the working directory,
/// then the user topologies directory.
pub fn load_topology(name: &str) -> anyhow::Result<Topology> {
    let Some(path) = find_topology(name) else {
        let known: Vec<String> = list_user_topologies()
            .iter()
            .filter_map(|p| topology_name_from_path(p))
            .collect();
        let hint = if known.is_empty() {
            format!("no topologies in {}", user_topologies_dir().display())
        } else {
            format!("available: {}", known.join(", "))
        };
        anyhow::bail!("Topology '{}' not found ({})", name, hint);
    };
    tracing::debug!(path = %path.display(), "loading topology");
    Topology::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Load a recorded state file.
pub fn load_states(path: &Path) -> anyhow::Result<StateFile> {
    StateFile::load(path).with_context(|| format!("failed to load states {}", path.display()))
}

/// Build the routing graph for a topology.
pub fn build_graph(topology: &Topology) -> anyhow::Result<RoutingGraph> {
    topology
        .build_graph()
        .with_context(|| format!("topology '{}' is not routable", topology.name))
}

/// A registry holding every room sink of the topology.
pub fn build_registry(topology: &Topology) -> anyhow::Result<Arc<SinkRegistry>> {
    let registry = SinkRegistry::new();
    for sink in topology.virtual_sinks() {
        registry.register(sink)?;
    }
    Ok(Arc::new(registry))
}

/// Find a virtual sink by id, room name, or area slug.
pub fn find_sink(
    topology: &Topology,
    registry: &SinkRegistry,
    key: &str,
) -> Option<Arc<VirtualSink>> {
    registry
        .find(key)
        .or_else(|| topology.room(key).and_then(|room| registry.get(&DeviceId::new(room.sink_id()))))
}

/// Device id followed by its friendly name when one is recorded.
pub fn device_label<P>(device: &DeviceId, provider: &P) -> String
where
    P: SnapshotProvider + ?Sized,
{
    match provider.lookup(device).and_then(|s| s.friendly_name) {
        Some(name) => format!("{device} ({name})"),
        None => device.to_string(),
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
