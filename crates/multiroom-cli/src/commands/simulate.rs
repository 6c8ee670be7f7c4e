//! Drive a room against simulated devices and print the resulting commands.
//!
//! Devices are played by the loopback bus: every accepted command updates
//! the loaded states and publishes a change notification, which the cascade
//! controller then handles until the house settles.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use multiroom_config::StateFile;
use multiroom_core::{Dispatch, LoopbackBus, RoutingOrchestrator};

use super::common::{build_graph, device_label, find_sink, load_states, load_topology};

/// Select a source in a room against simulated devices.
#[derive(Args)]
pub struct SimulateArgs {
    /// Topology name or path to a topology file
    pub topology: String,

    /// Initial device states (TOML)
    #[arg(long)]
    pub states: PathBuf,

    /// Room name or virtual sink id
    #[arg(long)]
    pub room: String,

    /// Friendly name of the source to select
    #[arg(long, required_unless_present = "off", conflicts_with = "off")]
    pub source: Option<String>,

    /// Turn the room off instead of selecting a source
    #[arg(long)]
    pub off: bool,

    /// Devices that reject every command
    #[arg(long = "fail", value_name = "DEVICE")]
    pub failing: Vec<String>,

    /// Write the settled device states to this file
    #[arg(long, value_name = "FILE")]
    pub save_states: Option<PathBuf>,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = Arc::new(build_graph(&topology)?);
    let store = Arc::new(load_states(&args.states)?.to_store());

    let (tx, rx) = crossbeam_channel::unbounded();
    let bus = Arc::new(LoopbackBus::new(Arc::clone(&store)).with_notifications(tx));
    for device in &args.failing {
        bus.fail_device(device.as_str());
    }

    let orchestrator = RoutingOrchestrator::new(graph, Arc::clone(&store), Arc::clone(&bus));
    for sink in topology.virtual_sinks() {
        orchestrator.register(sink)?;
    }
    let Some(sink) = find_sink(&topology, orchestrator.registry(), &args.room) else {
        anyhow::bail!("Room '{}' not found in '{}'", args.room, topology.name);
    };

    let result = match &args.source {
        Some(name) => orchestrator
            .select_source_by_name(&sink.id, name)
            .map(|steps| steps.len())
            .with_context(|| format!("selecting '{}' in {}", name, sink.name)),
        None => orchestrator
            .turn_off(&sink.id)
            .map(|()| 0)
            .with_context(|| format!("turning off {}", sink.name)),
    };
    let selection = bus.commands().len();

    let controller = orchestrator.cascade_controller();
    let reports = controller.drain(&rx, &*store, &*bus);
    let cascaded: usize = reports.iter().map(|r| r.issued.len() + r.failed.len()).sum();

    println!("Commands:");
    for (i, issued) in bus.commands().iter().enumerate() {
        if i == selection && cascaded > 0 {
            println!("  -- cascade ({} notifications) --", reports.len());
        }
        let dispatch = match issued.dispatch {
            Dispatch::Blocking => "wait",
            Dispatch::FireAndForget => "send",
        };
        let status = if issued.accepted { "ok" } else { "REJECTED" };
        println!("  {:<4} {:<48} {}", dispatch, issued.command.to_string(), status);
    }

    let view = orchestrator.view();
    println!();
    println!(
        "{}: {} [{}]",
        sink.name,
        view.source_device(&sink)
            .map_or_else(|| "-".to_string(), |d| device_label(&d, &*store)),
        view.power_state(&sink)
    );

    if let Some(path) = &args.save_states {
        StateFile::from_store(&store)
            .save(path)
            .with_context(|| format!("failed to save states to {}", path.display()))?;
        println!("Saved states to {}", path.display());
    }

    result.map(|_| ())
}
