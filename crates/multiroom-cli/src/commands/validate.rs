//! Check a topology file for wiring mistakes.

use clap::Args;
use multiroom_config::topology_issues;

use super::common::{build_graph, load_topology};

/// Check a topology file for wiring mistakes.
#[derive(Args)]
pub struct ValidateArgs {
    /// Topology name or path to a topology file
    pub topology: String,
}

/// Run the validate command.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let issues = topology_issues(&topology);

    if !issues.is_empty() {
        println!("{}: {} issue(s)", topology.name, issues.len());
        for issue in &issues {
            println!("  - {issue}");
        }
        anyhow::bail!("topology '{}' is invalid", topology.name);
    }

    let graph = build_graph(&topology)?;
    println!(
        "{}: OK ({} devices, {} edges, {} sinks)",
        topology.name,
        graph.node_count(),
        graph.edge_count(),
        topology.virtual_sinks().len()
    );
    Ok(())
}
