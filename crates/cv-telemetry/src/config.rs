//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration for a Cold-Vault process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `cv_02_frame_transport=debug`
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to colour pretty output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cold-vault".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

fn flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1"
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CV_SERVICE_NAME`: Service name (default: cold-vault)
    /// - `CV_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `CV_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `NO_COLOR`: Disable ANSI colours when set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("CV_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("CV_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("CV_JSON_LOGS").map(|v| flag(&v)).unwrap_or(false),
            ansi: lookup("NO_COLOR").is_none(),
        }
    }

    /// Configuration for a named tool, still honouring the environment.
    pub fn for_tool(name: &str) -> Self {
        let mut config = Self::from_env();
        if env::var("CV_SERVICE_NAME").is_err() {
            config.service_name = name.to_string();
        }
        config
    }
}
