//! Worker bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use spindle_config::{Config, RelayEndpoint, WorkerParams};
use spindle_core::{
    ExitReason, HttpWorker, ObserverSet, RequestHandler, TracingLogger, TracingObserver,
    Transport, WorkerBuilder,
};
use spindle_relay::{DynRelay, RelayError};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the worker configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Opens the transport the worker will serve.
pub trait RelayConnector {
    /// Transport produced by a successful connection.
    type Transport: Transport;

    /// Connects to the host at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host cannot be reached.
    fn connect(
        &self,
        endpoint: &RelayEndpoint,
        params: WorkerParams,
    ) -> Result<Self::Transport, RelayError>;
}

/// Connector that opens real pipes or sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRelayConnector;

impl RelayConnector for SystemRelayConnector {
    type Transport = DynRelay;

    fn connect(
        &self,
        endpoint: &RelayEndpoint,
        params: WorkerParams,
    ) -> Result<Self::Transport, RelayError> {
        spindle_relay::connect(endpoint, params)
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The relay to the host could not be opened.
    #[error("failed to open relay: {source}")]
    Relay {
        /// Underlying relay error.
        #[source]
        source: RelayError,
    },
}

/// A bootstrapped worker, ready to serve its host.
pub struct Worker<T, H> {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    inner: HttpWorker<T, H>,
}

impl<T, H> Worker<T, H> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Consumes the worker, returning the transport it served.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.inner.into_transport()
    }
}

impl<T, H> Worker<T, H>
where
    T: Transport,
    H: RequestHandler,
{
    /// Runs the dispatch loop to completion and reports how it ended.
    pub fn run(&mut self) -> ExitReason {
        let reason = self.inner.run();
        self.reporter.worker_stopped(&reason);
        reason
    }
}

/// Bootstraps a worker serving `handler` over the configured relay.
///
/// # Errors
///
/// Returns an error when configuration, telemetry or the relay cannot be set
/// up. The reporter is told about the failure before it is returned.
pub fn bootstrap_with<C, H>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    connector: &C,
    handler: H,
) -> Result<Worker<C::Transport, H>, BootstrapError>
where
    C: RelayConnector,
    H: RequestHandler,
{
    reporter.bootstrap_starting();

    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;
    let transport = connector
        .connect(config.relay(), config.worker_params())
        .map_err(|source| fail(BootstrapError::Relay { source }))?;

    let inner = WorkerBuilder::new(transport, handler)
        .logger(TracingLogger::new())
        .events(ObserverSet::new().with(TracingObserver::new()))
        .build();
    reporter.bootstrap_succeeded(&config);

    Ok(Worker {
        config,
        telemetry,
        reporter,
        inner,
    })
}
