//! List the root sources that can reach a device or room.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;
use multiroom_core::{DeviceId, SinkView, StateStore};

use super::common::{
    build_graph, build_registry, device_label, find_sink, load_states, load_topology, print_json,
};

/// List the root sources that can reach a device or room.
#[derive(Args)]
pub struct SourcesArgs {
    /// Topology name or path to a topology file
    pub topology: String,

    /// Device id, room name, or virtual sink id
    pub target: String,

    /// Recorded device states; when given, rooms list sources by friendly name
    #[arg(long)]
    pub states: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the sources command.
pub fn run(args: SourcesArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = build_graph(&topology)?;
    let registry = build_registry(&topology)?;
    let store = match &args.states {
        Some(path) => load_states(path)?.to_store(),
        None => StateStore::new(),
    };

    if let Some(sink) = find_sink(&topology, &registry, &args.target) {
        if args.states.is_some() {
            let entries = SinkView::new(&graph, &registry, &store).source_list(&sink);
            if args.json {
                return print_json(&entries);
            }
            println!("Sources for {} ({}):", sink.name, sink.id);
            for entry in &entries {
                println!("  {:<24} {}", entry.name, entry.device);
            }
            return Ok(());
        }

        let roots: BTreeSet<DeviceId> = sink
            .players()
            .flat_map(|player| graph.root_ancestors_of(player))
            .collect();
        return print_roots(&format!("{} ({})", sink.name, sink.id), &roots, &store, args.json);
    }

    let device = DeviceId::new(args.target.as_str());
    if !graph.contains(&device) {
        anyhow::bail!(
            "'{}' is neither a device in topology '{}' nor one of its rooms",
            args.target,
            topology.name
        );
    }
    print_roots(device.as_str(), &graph.root_ancestors_of(&device), &store, args.json)
}

fn print_roots(
    label: &str,
    roots: &BTreeSet<DeviceId>,
    store: &StateStore,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(roots);
    }
    if roots.is_empty() {
        println!("{label} has no upstream sources");
        return Ok(());
    }
    println!("Sources for {label}:");
    for root in roots {
        println!("  {}", device_label(root, store));
    }
    Ok(())
}
