use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use logline::config::{load_config, LoglineConfig};
use logline::lifecycle::{wait_for_signal, Shutdown};
use logline::observability::init_logging;
use logline::HttpServer;

#[derive(Parser)]
#[command(name = "logline")]
#[command(about = "Demo HTTP server that writes one access-log line per request", long_about = None)]
struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LoglineConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!("logline v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        sink = ?config.access_log.sink,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();
    serving.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
