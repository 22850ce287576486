//! # Pollcast Server
//!
//! Live classroom poll server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! pollcast
//!
//! # Run with a custom config file
//! POLLCAST_CONFIG=/path/to/pollcast.toml pollcast
//!
//! # Run with environment variables
//! POLLCAST_PORT=8080 POLLCAST_HOST=0.0.0.0 pollcast
//! ```

use anyhow::Result;
use pollcast_server::{config::Config, handlers, metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pollcast=debug,pollcast_core=debug,pollcast_server=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Starting Pollcast server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
