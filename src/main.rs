//! CGI server.
//!
//! Serves a document root over HTTP and runs handler executables for
//! dynamic content.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server (request ID, body limit, trace)
//!                          │
//!                          ▼
//!                      http::dispatch ──▶ routing (alias → map → resolve)
//!                          │
//!              ┌───────────┴────────────┐
//!              ▼                        ▼
//!      http::response             cgi::CgiProcess
//!      (file / listing / error)   (spawn handler, parse output)
//!              │                        │
//!     ◀────────┴────────────────────────┘
//!     Client Response
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cgi_server::cgi::CgiProcess;
use cgi_server::config::{find_config, load_config};
use cgi_server::lifecycle::{build_site, shutdown_signal, Shutdown};
use cgi_server::observability::logging;
use cgi_server::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "cgi-server", version, about = "Serve a document root with CGI handlers")]
struct Cli {
    /// Configuration file; searched in the standard locations if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and locate handlers, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = find_config(cli.config.as_deref())?;
    let config = load_config(&config_path)?;

    logging::init(&config.logging.level);
    tracing::info!(config = %config_path.display(), "cgi-server v{} starting", env!("CARGO_PKG_VERSION"));

    let site = build_site(&config)?;

    if cli.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let invoker = CgiProcess::new(config.limits.max_body_size);
    let server = HttpServer::new(&config, Arc::new(site), invoker);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
