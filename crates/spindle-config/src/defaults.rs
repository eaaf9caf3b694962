//! Default values shared by the configuration struct and its serde helpers.

use crate::logging::LogFormat;
use crate::relay::RelayEndpoint;

/// `tracing` filter directive applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Side effects are intercepted unless explicitly disabled.
pub const DEFAULT_INTERCEPT_SIDE_EFFECTS: bool = true;

/// Borrowed form of [`DEFAULT_LOG_FILTER`] for comparisons and tests.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the worker.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default relay: standard I/O pipes shared with the host process.
#[must_use]
pub const fn default_relay_endpoint() -> RelayEndpoint {
    RelayEndpoint::Pipes
}

/// Serde helper for the side-effect interception flag.
#[must_use]
pub const fn default_intercept_side_effects() -> bool {
    DEFAULT_INTERCEPT_SIDE_EFFECTS
}
