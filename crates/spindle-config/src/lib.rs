//! Shared configuration for the spindle worker.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional TOML file (`--config-path` or `SPINDLE_CONFIG_PATH`), then
//! `SPINDLE_*` environment variables, then command-line flags. The resolved
//! [`Config`] describes how the worker reaches its host process, whether the
//! relay intercepts process-level side effects, and how telemetry is
//! rendered.

mod defaults;
mod logging;
mod params;
mod relay;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_INTERCEPT_SIDE_EFFECTS, DEFAULT_LOG_FILTER, default_intercept_side_effects,
    default_log_filter, default_log_filter_string, default_log_format, default_relay_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use params::WorkerParams;
pub use relay::{RelayEndpoint, RelayEndpointParseError};

/// Resolved worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SPINDLE_")]
pub struct Config {
    /// Relay the worker exchanges frames over with its host process.
    #[serde(default = "default_relay_endpoint")]
    #[ortho_config(default = default_relay_endpoint())]
    pub relay: RelayEndpoint,
    /// Redirect stray stdout writes away from the frame stream.
    #[serde(default = "default_intercept_side_effects")]
    #[ortho_config(default = default_intercept_side_effects())]
    pub intercept_side_effects: bool,
    /// `tracing` filter expression applied to worker telemetry.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for worker telemetry.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Config {
    /// Relay endpoint shared with the host process.
    #[must_use]
    pub const fn relay(&self) -> &RelayEndpoint {
        &self.relay
    }

    /// Filter expression for telemetry.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Parameters forwarded to the relay when the worker is constructed.
    #[must_use]
    pub const fn worker_params(&self) -> WorkerParams {
        WorkerParams::new(self.intercept_side_effects)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: default_relay_endpoint(),
            intercept_side_effects: default_intercept_side_effects(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}
