//! wallfit - LED video wall placement and sizing
//!
//! Serves the planning API used by the browser front-end: the user drags the
//! four corners of a virtual LED wall over a photo, and wallfit answers with
//! the perspective matrix for the overlay and the cabinet grid, resolution,
//! weight and power of the wall.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use wallfit::render::{CredentialStore, MemoryCredentialStore};
use wallfit::{config, server, session};

/// wallfit - place an LED wall on a photo and size it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Web server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Web server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "wallfit.toml")]
    config: PathBuf,

    /// API key for the render service
    #[arg(long)]
    render_api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("wallfit v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration
    let config = config::Config::load_or_create(&args.config)?;

    // CLI args override config file values
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    info!(
        "Catalog: {} cabinets, {} standard pitches",
        config.catalog.cabinets.len(),
        config.catalog.pitches.len()
    );

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(MemoryCredentialStore::new(args.render_api_key));
    // The image-generation backend is provided by the embedding application
    warn!("No render backend linked, /api/render will answer 503");

    let state = Arc::new(server::AppState::new(
        session::Session::new(&config),
        credentials,
        None,
    ));

    let addr = format!("{}:{}", host, port);
    info!("Starting web server at http://{}", addr);

    server::run_server(&addr, state).await
}
