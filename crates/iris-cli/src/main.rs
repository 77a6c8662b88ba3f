mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iris", about = "3A control loop tools for raw-Bayer ISPs")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop against a synthetic scene
    Simulate(commands::simulate::SimulateArgs),
    /// Print or save the default tuning as TOML
    Config(commands::config::ConfigArgs),
    /// Decode an assembled parameter buffer
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    }
}
