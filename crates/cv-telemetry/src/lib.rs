//! # Cold-Vault Telemetry
//!
//! `tracing-subscriber` setup shared by the Cold-Vault binaries. Library
//! crates only emit `tracing` events; installing a subscriber is left to
//! the process.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cv_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("Failed to init logging");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CV_SERVICE_NAME` | `cold-vault` | Service name in log lines |
//! | `CV_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `CV_JSON_LOGS` | `false` | JSON instead of pretty output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
