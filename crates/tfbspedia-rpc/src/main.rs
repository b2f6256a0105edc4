//! TFBSpedia RPC Server - JSON-RPC backend for the search front end.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the tfbspedia-core
//! library, plus a CSV download endpoint for search and batch exports.

mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tfbspedia_core::TfbsApi;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tfbspedia-rpc")]
#[command(about = "JSON-RPC server for TFBSpedia searches")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Data directory holding the species databases and `documents/`
    /// (defaults to the platform data directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Per-call record store timeout in seconds
    #[arg(long, default_value = "30")]
    query_timeout_secs: u64,
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("tfbspedia"))
        .context("No platform data directory; pass --data-dir")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting TFBSpedia RPC Server");

    let data_dir = match args.data_dir {
        Some(path) => path,
        None => default_data_dir()?,
    };
    info!("Data directory: {}", data_dir.display());

    let api = TfbsApi::builder(&data_dir)
        .query_timeout(Duration::from_secs(args.query_timeout_secs))
        .build()
        .with_context(|| format!("Failed to initialize API at {}", data_dir.display()))?;

    let addr = server::start_server(api, &args.host, args.port).await?;

    // Machine-readable line for the process that launched us
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
