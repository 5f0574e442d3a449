//! Luca3Auth service.
//!
//! # Architecture Overview
//!
//! ```text
//!   campus card UID / form input
//!            │
//!            ▼
//!   ┌─────────────────┐     ┌───────────────────────────────────────────┐
//!   │  http (views)   │────▶│ orchestrator                              │
//!   │  forms, admin   │     │  actions / registration / sessions        │
//!   └─────────────────┘     └──────┬──────────┬──────────┬──────────┬───┘
//!                                  │          │          │          │
//!                                  ▼          ▼          ▼          ▼
//!                            blockchain     names     storage    pricing
//!                            (Ledger)     (resolver)   (IPFS)   (display)
//!                                  │
//!                                  ▼
//!                     Luca3Auth registry / Treasury / student TBAs
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use luca3auth::lifecycle::startup;
use luca3auth::observability::{logging, metrics};
use luca3auth::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "luca3auth")]
#[command(about = "Student identity and campus-card wallet service", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = startup::load(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "luca3auth starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        chain_id = config.chain.chain_id,
        registry = %config.contracts.luca3auth,
        oracle_wait_secs = config.registration.oracle_wait_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let orchestrator = startup::build_orchestrator(&config).await?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(Arc::new(config), orchestrator);
    let rx = shutdown.subscribe();
    let signal = shutdown.clone();
    tokio::spawn(async move { signal.trigger_on_ctrl_c().await });

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
