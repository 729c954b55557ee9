//! Runs the Hermes interfaces of one machine from a TOML file.
//!
//! ```text
//! hermes-daemon --config oven.toml
//! RUST_LOG=hermes_net=debug hermes-daemon --json
//! ```

mod config;
mod machine;

use anyhow::Context;
use clap::Parser;
use config::DaemonConfig;
use machine::Machine;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hermes-daemon", about = "Run the Hermes interfaces of one machine")]
struct Args {
    /// Path to the machine configuration.
    #[arg(short, long, env = "HERMES_CONFIG", default_value = "hermes.toml")]
    config: PathBuf,

    /// Overrides `machine_id` from the file.
    #[arg(long, env = "HERMES_MACHINE_ID")]
    machine_id: Option<String>,

    /// Print every event as one JSON object per line on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hermes_daemon=info".parse()?)
                .add_directive("hermes_net=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = DaemonConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(machine_id) = args.machine_id {
        config.machine_id = machine_id;
        config.validate()?;
    }
    tracing::info!(machine_id = %config.machine_id, "starting");

    let machine = Machine::start(config, args.json)?;
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    machine.shutdown();
    // Lets the engines flush their shutdown notifications.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}
