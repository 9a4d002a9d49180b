//! Edge image gateway (host process)
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                    EDGE IMAGE GATEWAY                     │
//!                 │                                                          │
//!  Trigger event  │  ┌──────────┐   ┌─────────────┐   ┌────────────────┐     │
//!  ───────────────┼─▶│   http   │──▶│ interpreter │──▶│    fetcher     │◀────┼──── Origin
//!                 │  │  server  │   │  (validate) │   │ (stream→disk)  │     │
//!                 │  └──────────┘   └─────────────┘   └───────┬────────┘     │
//!                 │                                           │              │
//!                 │                                           ▼              │
//!  Response obj   │  ┌──────────┐   ┌─────────────┐   ┌────────────────┐     │
//!  ◀──────────────┼──│ response │◀──│   headers   │◀──│   transform    │─────┼──▶ raster tool
//!                 │  │ assembly │   │ (sanitize)  │   │ (external exe) │     │
//!                 │  └──────────┘   └─────────────┘   └────────────────┘     │
//!                 │                                                          │
//!                 │  config (hot reload) · observability · lifecycle         │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_image_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use edge_image_gateway::lifecycle::{signals, Shutdown};
use edge_image_gateway::observability::{logging, metrics};
use edge_image_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "edge-image-gateway")]
#[command(about = "Resize origin images on the fly for a CDN edge", long_about = None)]
struct Args {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("edge-image-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_dimension = config.resize.max_dimension,
        sharpen = ?config.resize.sharpen,
        transformer = %config.transformer.program.display(),
        scratch_dir = %config.scratch.resolved_dir().display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for invocations");

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
