//! Server configuration.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - TOML configuration file (`$POLLCAST_CONFIG` or the first of the search paths)
//! - Environment variables (`POLLCAST_*`, nested sections joined with `__`)

use anyhow::{Context, Result};
use pollcast_core::ClassroomConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "POLLCAST_CONFIG";

const CONFIG_PATHS: [&str; 3] = [
    "pollcast.toml",
    "/etc/pollcast/pollcast.toml",
    "~/.config/pollcast/pollcast.toml",
];

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Classroom behaviour.
    #[serde(default)]
    pub classroom: ClassroomSettings,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Classroom settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomSettings {
    /// Chat messages kept for late joiners.
    #[serde(default = "default_chat_capacity")]
    pub chat_capacity: usize,

    /// Countdown tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Largest accepted poll time limit in seconds.
    #[serde(default = "default_max_time_limit")]
    pub max_time_limit_secs: u32,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_max_connections() -> usize {
    1_000
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_chat_capacity() -> usize {
    100
}

fn default_tick_interval() -> u64 {
    1_000 // 1 second
}

fn default_max_time_limit() -> u32 {
    600 // 10 minutes
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            classroom: ClassroomSettings::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for ClassroomSettings {
    fn default() -> Self {
        Self {
            chat_capacity: default_chat_capacity(),
            tick_interval_ms: default_tick_interval(),
            max_time_limit_secs: default_max_time_limit(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is named but missing, or if any
    /// source cannot be parsed.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = Self::find_file() {
            tracing::info!("Loading config from {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("POLLCAST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// The explicitly named config file, else the first existing search path.
    fn find_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(shellexpand::tilde(&path).as_ref()));
        }

        CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .find(|path| Path::new(path).exists())
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid host:port {}:{}", self.host, self.port))
    }

    /// Classroom settings in the form the coordinator expects.
    #[must_use]
    pub fn classroom_config(&self) -> ClassroomConfig {
        ClassroomConfig {
            chat_capacity: self.classroom.chat_capacity,
            tick_period: Duration::from_millis(self.classroom.tick_interval_ms.max(1)),
            max_time_limit_secs: self.classroom.max_time_limit_secs,
        }
    }
}
