//! Multiroom CLI - inspect and exercise multiroom A/V routing topologies.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multiroom")]
#[command(author, version, about = "Multiroom A/V routing CLI", long_about = None)]
struct Cli {
    /// Log routing decisions at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every source and the devices it can reach
    Graph(commands::graph::GraphArgs),

    /// List the root sources that can reach a device or room
    Sources(commands::sources::SourcesArgs),

    /// Plan the input switches that route a source to a sink
    Plan(commands::plan::PlanArgs),

    /// Resolve what each room is watching from recorded states
    Resolve(commands::resolve::ResolveArgs),

    /// Show the cascade decision for one device change
    Cascade(commands::cascade::CascadeArgs),

    /// Select a source in a room against simulated devices
    Simulate(commands::simulate::SimulateArgs),

    /// Check a topology file for wiring mistakes
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Graph(args) => commands::graph::run(args),
        Commands::Sources(args) => commands::sources::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Resolve(args) => commands::resolve::run(args),
        Commands::Cascade(args) => commands::cascade::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}
