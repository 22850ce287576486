//! # pollcast-server
//!
//! WebSocket front end for the classroom coordinator: configuration,
//! connection handling, health reporting and Prometheus metrics.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{router, run_server, serve, AppState};
