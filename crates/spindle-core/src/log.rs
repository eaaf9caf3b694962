//! Diagnostic logging for the dispatch loop.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::fault::Fault;

/// Tracing target for dispatch-loop diagnostics.
pub(crate) const WORKER_TARGET: &str = "spindle::worker";

/// Severity attached to every diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine lifecycle information.
    Info,
    /// A recoverable but noteworthy condition, such as a malformed request.
    Notice,
    /// A failure that cost a request its intended response, or the worker
    /// its life.
    Error,
}

impl Severity {
    /// Lowercase name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Sink for the loop's diagnostic entries.
///
/// Logging never fails from the loop's point of view. Implementations that
/// need the structured context call [`Fault::describe`] themselves, so a
/// discarded entry costs nothing.
pub trait WorkerLogger: Send + Sync {
    /// Records one entry, with the fault involved when there is one.
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>);
}

impl<T> WorkerLogger for Arc<T>
where
    T: WorkerLogger + ?Sized,
{
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        (**self).log(severity, message, fault);
    }
}

/// Logger that discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl WorkerLogger for NoopLogger {
    fn log(&self, _severity: Severity, _message: &str, _fault: Option<&Fault>) {}
}

/// Default logger that records entries using `tracing`.
///
/// `tracing` has no notice level, so notices are emitted as warnings; every
/// record carries a `severity` field with the original value. Faults are
/// attached as a JSON-encoded [`FaultDescription`](crate::FaultDescription).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// Builds a new logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl WorkerLogger for TracingLogger {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        let described = fault.map(encode_fault);
        let fault = described.as_deref();
        match severity {
            Severity::Info => tracing::info!(
                target: WORKER_TARGET,
                severity = severity.as_str(),
                fault,
                "{message}"
            ),
            Severity::Notice => tracing::warn!(
                target: WORKER_TARGET,
                severity = severity.as_str(),
                fault,
                "{message}"
            ),
            Severity::Error => tracing::error!(
                target: WORKER_TARGET,
                severity = severity.as_str(),
                fault,
                "{message}"
            ),
        }
    }
}

fn encode_fault(fault: &Fault) -> String {
    serde_json::to_string(&fault.describe())
        .unwrap_or_else(|error| format!("{{\"message\":\"unencodable fault: {error}\"}}"))
}
