//! Telemetry output formats.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the worker renders its `tracing` records on stderr.
///
/// Parsing is case-insensitive, so `--log-format Compact` and
/// `SPINDLE_LOG_FORMAT=json` are both accepted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, with event fields flattened.
    #[default]
    Json,
    /// Terse single-line text for interactive use.
    Compact,
}

/// Error returned when a string names no known [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
