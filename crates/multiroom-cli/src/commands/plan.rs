//! Plan the input switches that route a source to a sink.

use clap::Args;
use multiroom_core::{DeviceId, PathPlanner};

use super::common::{build_graph, build_registry, find_sink, load_topology, print_json};

/// Plan the input switches that route a source to a sink.
#[derive(Args)]
pub struct PlanArgs {
    /// Topology name or path to a topology file
    pub topology: String,

    /// Source device id
    #[arg(long)]
    pub source: String,

    /// Sink device id, room name, or virtual sink id
    #[arg(long)]
    pub sink: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the plan command.
pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = build_graph(&topology)?;
    let registry = build_registry(&topology)?;
    let planner = PathPlanner::new(&graph);
    let source = DeviceId::new(args.source.as_str());

    let (target, steps) = match find_sink(&topology, &registry, &args.sink) {
        Some(sink) => (sink.name.clone(), planner.plan_sink(&source, &sink)?),
        None => {
            let sink = DeviceId::new(args.sink.as_str());
            let steps = planner.plan_route(&source, &sink)?;
            (sink.to_string(), steps)
        }
    };

    if args.json {
        return print_json(&steps);
    }

    println!("Route {} -> {}:", source, target);
    if steps.is_empty() {
        println!("  (no switching needed)");
    }
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    Ok(())
}
