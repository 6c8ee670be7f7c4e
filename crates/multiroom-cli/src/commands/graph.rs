//! Print a topology as source trees.

use clap::Args;
use multiroom_core::{DeviceId, RoutingGraph};

use super::common::{build_graph, load_topology};

/// Print every source and the devices it can reach.
#[derive(Args)]
pub struct GraphArgs {
    /// Topology name or path to a topology file
    pub topology: String,
}

/// Run the graph command.
pub fn run(args: GraphArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = build_graph(&topology)?;

    println!(
        "{}: {} devices, {} edges",
        topology.name,
        graph.node_count(),
        graph.edge_count()
    );
    if let Some(description) = &topology.description {
        println!("{description}");
    }
    println!();

    for root in graph.roots() {
        println!("{root}");
        print_downstream(&graph, &root, 1);
    }

    if !topology.rooms.is_empty() {
        println!();
        println!("Rooms:");
        for sink in topology.virtual_sinks() {
            let audio = join(&sink.audio_players);
            let video = join(&sink.video_players);
            println!("  {:<28} {}", sink.id.as_str(), sink.name);
            if !audio.is_empty() {
                println!("    audio: {audio}");
            }
            if !video.is_empty() {
                println!("    video: {video}");
            }
        }
    }

    Ok(())
}

fn print_downstream(graph: &RoutingGraph, device: &DeviceId, depth: usize) {
    for edge in graph.out_edges(device) {
        println!("{}-> {} [{}]", "  ".repeat(depth), edge.to, edge.selector);
        print_downstream(graph, edge.to, depth + 1);
    }
}

fn join(devices: &[DeviceId]) -> String {
    devices
        .iter()
        .map(DeviceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
