//! Gimkit edge proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                   EDGE PROXY                      │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!     ────────────────────┼─▶│  http   │───▶│ routing  │───▶│  upstream   │──┼──▶ Origin
//!                         │  │ server  │    │ classify │    │  forwarder  │  │
//!                         │  └─────────┘    └────┬─────┘    └──────┬──────┘  │
//!                         │                      │                 │         │
//!                         │        ┌─────────────┼─────────┐       ▼         │
//!                         │        ▼             ▼         ▼  ┌─────────────┐  │
//!                         │   ┌─────────┐  ┌─────────┐ ┌─────┐│  transform  │  │
//!     Client Response     │   │websocket│  │  login  │ │ 302 ││headers/html │  │
//!     ◀───────────────────┼───│  relay  │  │ bridge  │ │     ││  + bundle   │◀─┼──── Bundle host
//!                         │   └─────────┘  └─────────┘ └─────┘└─────────────┘  │
//!                         │                                                   │
//!                         │   config · observability · lifecycle              │
//!                         └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use gimkit_proxy::config::loader::load_config;
use gimkit_proxy::config::validation::validate_config;
use gimkit_proxy::lifecycle::{wait_for_signal, Shutdown};
use gimkit_proxy::observability::{logging, metrics};
use gimkit_proxy::{HttpServer, ProxyConfig};

#[derive(Parser)]
#[command(name = "gimkit-proxy")]
#[command(about = "Edge proxy for the Gimkit web game", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
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
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        if let Err(errors) = validate_config(&config) {
            for error in &errors {
                eprintln!("{}", error);
            }
            return Err("invalid configuration".into());
        }
    }

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!("gimkit-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        bundle = %config.bundle.source_url,
        bundle_ttl_secs = config.bundle.ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move { wait_for_signal(&signal_shutdown).await });

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
