//! Show the cascade decision for one device change.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use multiroom_core::{CascadeController, DeviceId, StateChange};

use super::common::{
    build_graph, build_registry, device_label, load_states, load_topology, print_json,
};

/// Show the cascade decision for one device change.
#[derive(Args)]
pub struct CascadeArgs {
    /// Topology name or path to a topology file
    pub topology: String,

    /// Device states after the change (TOML)
    #[arg(long)]
    pub states: PathBuf,

    /// Device whose state changed
    #[arg(long)]
    pub device: String,

    /// Device states before the change (defaults to --states)
    #[arg(long)]
    pub old_state: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the cascade command.
pub fn run(args: CascadeArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = Arc::new(build_graph(&topology)?);
    let registry = build_registry(&topology)?;
    let states = load_states(&args.states)?;
    let old_states = match &args.old_state {
        Some(path) => load_states(path)?,
        None => states.clone(),
    };

    let device = DeviceId::new(args.device.as_str());
    if !graph.contains(&device) {
        anyhow::bail!("'{}' is not a device of '{}'", device, topology.name);
    }

    let store = states.to_store();
    let change = StateChange::new(
        device.clone(),
        old_states.get(device.as_str()).cloned(),
        states.get(device.as_str()).cloned(),
    );
    let controller = CascadeController::new(graph, registry);
    let decision = controller.evaluate(&change, &store);

    if args.json {
        return print_json(&decision);
    }

    println!("Trigger:        {}", device_label(&decision.trigger, &store));
    println!("Turned off:     {}", yes_no(decision.turned_off));
    println!("Source changed: {}", yes_no(decision.changed_source));
    match &decision.new_source {
        Some(source) => println!("New source:     {}", device_label(source, &store)),
        None => println!("New source:     -"),
    }

    if !decision.is_triggered() {
        println!();
        println!("No cascade: the device neither turned off nor changed input.");
    } else if decision.power_off.is_empty() {
        println!();
        println!("No devices to power off.");
    } else {
        println!();
        println!("Power off:");
        for target in &decision.power_off {
            println!("  {}", device_label(target, &store));
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
