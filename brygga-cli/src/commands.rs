use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use brygga_config::BryggaConfig;
use brygga_engine::Bridge;
use brygga_sim::SimulatedBench;
use brygga_transport::TcpTransport;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the external-mode scope protocol over TCP
    Serve(ServeArgs),
    /// Connect, start the simulation once and tear down
    LoadModel(LoadModelArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Configuration file (defaults plus `BRYGGA_*` env otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the listening port
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Name of the simulated model to publish
    #[arg(short, long, default_value = "plant")]
    pub model: String,
    /// Override the waveform seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Keep the bridge alive across client disconnects
    #[arg(long)]
    pub keep_alive: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LoadModelArgs {
    /// Configuration file (defaults plus `BRYGGA_*` env otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Name of the simulated model to publish
    #[arg(short, long, default_value = "plant")]
    pub model: String,
    /// Override the waveform seed
    #[arg(long)]
    pub seed: Option<u64>,
}

fn load_config(path: &Option<PathBuf>) -> Result<BryggaConfig> {
    match path {
        Some(path) => BryggaConfig::load_from_path(path),
        None => BryggaConfig::load(),
    }
    .context("failed to load configuration")
}

pub async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(seed) = args.seed {
        config.backend.seed = seed;
    }
    if args.keep_alive {
        config.server.keep_alive = true;
    }

    let backend = Box::new(SimulatedBench::new(&args.model, config.backend.seed));
    let transport = Arc::new(TcpTransport::new(config.server.port));
    let port = config.server.port;
    let bridge = Bridge::new(config, backend, transport);

    if !bridge.run()? {
        shut_down(&bridge).await;
        bail!("backend connect failed");
    }
    if !bridge.start_simulation()? {
        shut_down(&bridge).await;
        bail!("simulation failed to start");
    }
    if !bridge.start_server() {
        shut_down(&bridge).await;
        bail!("transport failed to start on port {port}");
    }
    info!(port, model = %args.model, "serving external-mode scope clients");

    let running = Arc::clone(&bridge);
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = tokio::task::spawn_blocking(move || running.join()) => {
            info!("bridge shut down")
        }
    }
    shut_down(&bridge).await;
    Ok(())
}

pub async fn load_model(args: LoadModelArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.backend.seed = seed;
    }

    let backend = Box::new(SimulatedBench::new(&args.model, config.backend.seed));
    let transport = Arc::new(TcpTransport::new(config.server.port));
    let bridge = Bridge::new(config, backend, transport);

    let connected = bridge.run()?;
    let started = connected && bridge.start_simulation()?;
    shut_down(&bridge).await;

    if !started {
        bail!("failed to load model {}", args.model);
    }
    info!(model = %args.model, "model loaded, simulation running");
    Ok(())
}

async fn shut_down(bridge: &Arc<Bridge>) {
    let bridge = Arc::clone(bridge);
    let _ = tokio::task::spawn_blocking(move || {
        bridge.cancel();
        bridge.join();
    })
    .await;
}
