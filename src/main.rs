//! Greedy TCP request dispatcher.
//!
//! Sits between clients and a fixed pool of VIDEO/MUSIC backends, forwarding
//! one request and one response per client connection.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 DISPATCHER                   │
//!                        │                                              │
//!     Client "V3"        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!     ───────────────────┼─▶│   net    │──▶│ dispatch │──▶│  greedy  │  │
//!                        │  │ listener │   │  engine  │   │ schedule │  │
//!                        │  └──────────┘   └────┬─────┘   └──────────┘  │
//!                        │                      │ spawn                 │
//!                        │                      ▼                       │
//!     Client response    │               ┌────────────┐  ┌──────────┐   │
//!     ◀──────────────────┼───────────────│ forwarding │─▶│ upstream │───┼──▶ Backend
//!                        │               │  session   │◀─│   conn   │◀──┼─── (VIDEO/MUSIC)
//!                        │               └────────────┘  └──────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use greedy_dispatcher::config::{load_config, DispatcherConfig};
use greedy_dispatcher::lifecycle::{signals, startup, Shutdown};
use greedy_dispatcher::observability::logging;

#[derive(Parser)]
#[command(name = "greedy-dispatcher")]
#[command(about = "Greedy weighted-cost TCP request dispatcher", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "dispatcher.toml")]
    config: PathBuf,

    /// Override the listener bind address from the config file.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: DispatcherConfig = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        buffer_size = config.session.buffer_size,
        "greedy-dispatcher starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    startup::run(&config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
