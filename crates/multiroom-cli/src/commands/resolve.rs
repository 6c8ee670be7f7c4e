//! Resolve what each room is receiving from recorded device states.

use std::path::PathBuf;

use clap::Args;
use multiroom_core::{DeviceId, PowerState, SinkView, SourceResolver};
use serde::Serialize;

use super::common::{
    build_graph, build_registry, device_label, find_sink, load_states, load_topology, print_json,
};

/// Resolve what each room is receiving from recorded device states.
#[derive(Args)]
pub struct ResolveArgs {
    /// Topology name or path to a topology file
    pub topology: String,

    /// Recorded device states (TOML)
    #[arg(long)]
    pub states: PathBuf,

    /// Only resolve this device, room name, or virtual sink id
    #[arg(long)]
    pub sink: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Resolution {
    sink: DeviceId,
    name: String,
    source: Option<DeviceId>,
    source_name: Option<String>,
    power: Option<PowerState>,
}

#[derive(Serialize)]
struct EdgeState {
    from: DeviceId,
    to: DeviceId,
    selector: String,
    active: Option<bool>,
}

#[derive(Serialize)]
struct Report {
    sinks: Vec<Resolution>,
    edges: Vec<EdgeState>,
}

/// Run the resolve command.
pub fn run(args: ResolveArgs) -> anyhow::Result<()> {
    let topology = load_topology(&args.topology)?;
    let graph = build_graph(&topology)?;
    let registry = build_registry(&topology)?;
    let store = load_states(&args.states)?.to_store();
    let view = SinkView::new(&graph, &registry, &store);
    let resolver = SourceResolver::new(&graph);

    let sinks: Vec<Resolution> = match &args.sink {
        None => registry
            .sinks()
            .iter()
            .map(|sink| Resolution {
                sink: sink.id.clone(),
                name: sink.name.clone(),
                source: view.source_device(sink),
                source_name: view.source_name(sink),
                power: Some(view.power_state(sink)),
            })
            .collect(),
        Some(key) => match find_sink(&topology, &registry, key) {
            Some(sink) => vec![Resolution {
                sink: sink.id.clone(),
                name: sink.name.clone(),
                source: view.source_device(&sink),
                source_name: view.source_name(&sink),
                power: Some(view.power_state(&sink)),
            }],
            None => {
                let device = DeviceId::new(key.as_str());
                if !graph.contains(&device) {
                    anyhow::bail!("'{}' is not a device or room of '{}'", key, topology.name);
                }
                let source = resolver.resolve_source(&device, &store);
                vec![Resolution {
                    name: device_label(&device, &store),
                    source_name: source
                        .as_ref()
                        .and_then(|s| store.get(s))
                        .and_then(|s| s.friendly_name),
                    power: store.get(&device).map(|s| s.power),
                    sink: device,
                    source,
                }]
            }
        },
    };

    let active = resolver.active_edges(&store);
    let edges: Vec<EdgeState> = graph
        .edges()
        .map(|edge| EdgeState {
            from: edge.from.clone(),
            to: edge.to.clone(),
            selector: edge.selector.to_string(),
            active: active.get(edge.id),
        })
        .collect();

    if args.json {
        return print_json(&Report { sinks, edges });
    }

    for r in &sinks {
        let power = r.power.map_or("unknown", PowerState::as_str);
        match (&r.source, &r.source_name) {
            (Some(source), Some(name)) => {
                println!("{:<24} {:<20} {} [{}]", r.name, name, source, power);
            }
            (Some(source), None) => println!("{:<24} {:<20} [{}]", r.name, source.as_str(), power),
            (None, _) => println!("{:<24} {:<20} [{}]", r.name, "-", power),
        }
    }

    println!();
    println!("Edges:");
    for edge in &edges {
        let state = match edge.active {
            Some(true) => "active",
            Some(false) => "inactive",
            None => "unknown",
        };
        println!(
            "  {:<8} {} -> {} [{}]",
            state, edge.from, edge.to, edge.selector
        );
    }
    Ok(())
}
