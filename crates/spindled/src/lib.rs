//! Bootstrap logic for the Spindle worker process.
//!
//! A host process launches `spindled` and feeds it requests over a relay:
//! standard pipes by default, or a TCP or Unix socket the host listens on.
//! Bootstrap loads the layered configuration, installs structured telemetry
//! on stderr, opens the relay, and wires the dispatch loop with a
//! `tracing`-backed logger and event observer. Lifecycle milestones go to a
//! [`HealthReporter`] so failures before the loop starts are still visible.
//!
//! The binary serves [`EchoApplication`]. Embedders call [`bootstrap_with`]
//! with their own handler instead.

mod application;
mod bootstrap;
mod health;
mod telemetry;

pub use application::{EchoApplication, HEALTH_PATH};
pub use bootstrap::{
    BootstrapError, ConfigLoader, RelayConnector, StaticConfigLoader, SystemConfigLoader,
    SystemRelayConnector, Worker, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle, is_initialised as telemetry_initialised};

use spindle_core::ExitReason;

/// Process exit status for a finished worker: 0 when the host stopped it,
/// 1 after a fatal fault.
#[must_use]
pub const fn exit_status(reason: &ExitReason) -> u8 {
    match reason {
        ExitReason::Terminated => 0,
        ExitReason::Fatal(_) => 1,
    }
}

#[cfg(test)]
mod tests;
