//! ## brygga-cli
//! Operational entrypoint for the external-mode bridge: serve scope clients
//! over TCP, or load and start a model once and exit.

use clap::Parser;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    brygga_telemetry::logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve(args).await,
        Commands::LoadModel(args) => commands::load_model(args).await,
    }
}
