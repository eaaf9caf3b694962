//! Test harness utilities for the worker bootstrap suites.

use std::ffi::OsString;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use serde_json::Value;

use spindle_config::{Config, RelayEndpoint, WorkerParams};
use spindle_core::ExitReason;
use spindle_relay::{Relay, RelayError};

use crate::bootstrap::{BootstrapError, ConfigLoader, RelayConnector, StaticConfigLoader};
use crate::health::HealthReporter;
use crate::{EchoApplication, Worker, bootstrap_with};

/// Relay type produced by [`MemoryConnector`].
pub type MemoryRelay = Relay<Cursor<Vec<u8>>, HostOutput>;

/// Configuration pointing at a TCP host, with interception switched off.
pub fn test_config() -> Config {
    Config {
        relay: RelayEndpoint::tcp("127.0.0.1", 7070),
        intercept_side_effects: false,
        ..Config::default()
    }
}

/// Where the worker's frames end up.
#[derive(Clone)]
pub enum HostOutput {
    /// Frames are captured for inspection.
    Captured(Arc<Mutex<Vec<u8>>>),
    /// Every write fails, as if the host hung up.
    HungUp,
}

impl Write for HostOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Captured(buffer) => {
                buffer.lock().expect("output lock").extend_from_slice(buf);
                Ok(buf.len())
            }
            Self::HungUp => Err(io::Error::new(io::ErrorKind::BrokenPipe, "host hung up")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connector serving a fixed input script from memory.
pub struct MemoryConnector {
    input: Mutex<String>,
    output: Arc<Mutex<Vec<u8>>>,
    hung_up: bool,
    refuse: bool,
    connections: Mutex<Vec<(RelayEndpoint, WorkerParams)>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(String::new()),
            output: Arc::new(Mutex::new(Vec::new())),
            hung_up: false,
            refuse: false,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Makes every response write fail.
    pub fn hung_up(mut self) -> Self {
        self.hung_up = true;
        self
    }

    /// Makes the connection attempt fail.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Appends one line to the host's input.
    pub fn push_line(&self, line: &str) {
        let mut input = self.input.lock().expect("input lock");
        input.push_str(line);
        input.push('\n');
    }

    /// Endpoints and parameters the bootstrap connected with.
    pub fn connections(&self) -> Vec<(RelayEndpoint, WorkerParams)> {
        self.connections.lock().expect("connections lock").clone()
    }

    /// Response frames written by the worker.
    pub fn responses(&self) -> Vec<Value> {
        let output = self.output.lock().expect("output lock");
        String::from_utf8_lossy(&output)
            .lines()
            .map(|line| serde_json::from_str(line).expect("worker writes JSON frames"))
            .collect()
    }
}

impl RelayConnector for MemoryConnector {
    type Transport = MemoryRelay;

    fn connect(
        &self,
        endpoint: &RelayEndpoint,
        params: WorkerParams,
    ) -> Result<Self::Transport, RelayError> {
        self.connections
            .lock()
            .expect("connections lock")
            .push((endpoint.clone(), params));
        if self.refuse {
            return Err(RelayError::Connect {
                endpoint: endpoint.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        let input = self.input.lock().expect("input lock").clone().into_bytes();
        let output = if self.hung_up {
            HostOutput::HungUp
        } else {
            HostOutput::Captured(Arc::clone(&self.output))
        };
        Ok(Relay::new(Cursor::new(input), output))
    }
}

/// Loader that fails by passing an unsupported relay on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("spindled"),
            OsString::from("--relay"),
            OsString::from("ftp://host.invalid"),
        ])
    }
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    WorkerTerminated,
    WorkerFailed,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().expect("reporter lock").clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events.lock().expect("reporter lock").push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn worker_stopped(&self, reason: &ExitReason) {
        self.record(match reason {
            ExitReason::Terminated => HealthEvent::WorkerTerminated,
            ExitReason::Fatal(_) => HealthEvent::WorkerFailed,
        });
    }
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub loader: Box<dyn ConfigLoader>,
    pub connector: MemoryConnector,
    pub reporter: Arc<RecordingHealthReporter>,
    worker: Option<Worker<MemoryRelay, EchoApplication>>,
    bootstrap_error: Option<BootstrapError>,
    exit: Option<ExitReason>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            loader: Box::new(StaticConfigLoader::new(test_config())),
            connector: MemoryConnector::new(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            worker: None,
            bootstrap_error: None,
            exit: None,
        }
    }

    /// Runs bootstrap once, keeping the worker or the error.
    pub fn bootstrap(&mut self) {
        if self.worker.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        match bootstrap_with(
            &*self.loader,
            self.reporter.clone(),
            &self.connector,
            EchoApplication::new(),
        ) {
            Ok(worker) => self.worker = Some(worker),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Runs the bootstrapped worker to completion.
    pub fn run(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            self.exit = Some(worker.run());
        }
    }

    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    pub fn exit(&self) -> Option<&ExitReason> {
        self.exit.as_ref()
    }
}

/// Builds a request frame line.
pub fn request_line(method: &str, uri: &str) -> String {
    serde_json::json!({"kind": "request", "method": method, "uri": uri}).to_string()
}
