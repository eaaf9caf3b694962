//! Entry point for the `spindled` worker.

use std::process::ExitCode;
use std::sync::Arc;

use spindled::{
    BootstrapError, EchoApplication, StructuredHealthReporter, SystemConfigLoader,
    SystemRelayConnector, bootstrap_with, exit_status, telemetry_initialised,
};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    match bootstrap_with(
        &SystemConfigLoader,
        reporter,
        &SystemRelayConnector,
        EchoApplication::new(),
    ) {
        Ok(mut worker) => ExitCode::from(exit_status(&worker.run())),
        Err(error) => {
            if !telemetry_initialised() {
                report_early_failure(&error);
            }
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "telemetry is not installed yet, so stderr is the only sink"
)]
fn report_early_failure(error: &BootstrapError) {
    eprintln!("spindled: {error}");
}
