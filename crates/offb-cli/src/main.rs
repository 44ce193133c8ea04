use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use offb_core::control::{self, ControlLoop};
use offb_core::BridgeConfig;
use offb_mav::{MavConfig, MavFlightLink};
use offb_teleop::{TeleopConfig, TeleopListener};

/// Depth of the status and command queues the loop drains each tick.
const INBOUND_QUEUE: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "offb", version, about = "Velocity commands to PX4 offboard attitude/thrust setpoints")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the configuration and exit.
    Doctor,
    /// Run the bridge until Ctrl-C.
    Run,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    bridge: BridgeConfig,
    mavlink: MavConfig,
    teleop: TeleopConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(cfg).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    offb_core::doctor::check_bridge(&cfg.bridge)?;
    offb_mav::doctor::check_link(&cfg.mavlink)?;
    offb_teleop::doctor::check_listen(&cfg.teleop)?;
    info!("doctor: OK");
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    doctor(&cfg)?;

    let (inbound_tx, inbound_rx) = control::channel(INBOUND_QUEUE);

    let link = MavFlightLink::open(&cfg.mavlink, inbound_tx.status.clone()).context("FC open")?;

    let teleop = TeleopListener::bind(&cfg.teleop).await?;
    let cmd_tx = inbound_tx.commands.clone();
    let teleop_handle = tokio::spawn(async move {
        if let Err(e) = teleop.run(cmd_tx).await {
            error!("teleop listener error: {:#}", e);
        }
    });
    drop(inbound_tx);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let control = ControlLoop::new(cfg.bridge.clone(), link, inbound_rx);
    let control_handle = tokio::spawn(control.run(shutdown_rx));

    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, stopping bridge..."),
        Err(e) => error!("failed to listen for shutdown signal: {}", e),
    }
    let _ = shutdown_tx.send(());

    let link = control_handle.await.context("control loop join")?;
    info!("control loop stopped (last FC mode {:?})", link.status().mode);
    teleop_handle.abort();

    info!("bridge stopped");
    Ok(())
}
