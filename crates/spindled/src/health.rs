//! Lifecycle reporting for the worker process.

use std::sync::Arc;

use spindle_config::Config;
use spindle_core::ExitReason;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = "spindled::health";

/// Observer notified at each stage of the worker's life.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the relay is connected and the worker is assembled.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when the dispatch loop returns.
    fn worker_stopped(&self, reason: &ExitReason);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn worker_stopped(&self, reason: &ExitReason) {
        (**self).worker_stopped(reason);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting worker bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            relay = %config.relay(),
            intercept_side_effects = config.worker_params().intercept_side_effects(),
            log_format = %config.log_format(),
            "worker ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "worker bootstrap failed"
        );
    }

    fn worker_stopped(&self, reason: &ExitReason) {
        match reason {
            ExitReason::Terminated => tracing::info!(
                target: HEALTH_TARGET,
                event = "worker_terminated",
                "worker stopped at host request"
            ),
            ExitReason::Fatal(fault) => tracing::error!(
                target: HEALTH_TARGET,
                event = "worker_failed",
                stage = %fault.stage(),
                error = %fault,
                "worker stopped after an unrecoverable fault"
            ),
        }
    }
}
