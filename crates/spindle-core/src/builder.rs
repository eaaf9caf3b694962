//! Assembly of [`HttpWorker`] instances.

use std::sync::Arc;

use crate::event::{EventDispatcher, NoopDispatcher};
use crate::log::{NoopLogger, WorkerLogger};
use crate::transport::{PlainResponseFactory, RequestHandler, ResponseFactory, Transport};
use crate::worker::HttpWorker;

/// Builder for [`HttpWorker`].
///
/// Only the transport and handler are required. The logger and event
/// dispatcher default to null objects that discard everything, and fallback
/// responses default to [`PlainResponseFactory`].
///
/// ```ignore
/// let mut worker = WorkerBuilder::new(transport, handler)
///     .logger(TracingLogger::new())
///     .events(ObserverSet::new().with(TracingObserver::new()))
///     .build();
/// let exit = worker.run();
/// ```
pub struct WorkerBuilder<T, H> {
    transport: T,
    handler: H,
    responses: Option<Arc<dyn ResponseFactory>>,
    logger: Option<Arc<dyn WorkerLogger>>,
    events: Option<Arc<dyn EventDispatcher>>,
}

impl<T, H> WorkerBuilder<T, H>
where
    T: Transport,
    H: RequestHandler,
{
    /// Starts a builder around the required collaborators.
    #[must_use]
    pub fn new(transport: T, handler: H) -> Self {
        Self {
            transport,
            handler,
            responses: None,
            logger: None,
            events: None,
        }
    }

    /// Sets the logger receiving the loop's diagnostics.
    #[must_use]
    pub fn logger(mut self, logger: impl WorkerLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Sets a logger that is shared with other owners.
    #[must_use]
    pub fn shared_logger(mut self, logger: Arc<dyn WorkerLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the dispatcher receiving lifecycle events.
    #[must_use]
    pub fn events(mut self, events: impl EventDispatcher + 'static) -> Self {
        self.events = Some(Arc::new(events));
        self
    }

    /// Sets a dispatcher that is shared with other owners.
    #[must_use]
    pub fn shared_events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replaces the factory used for 400 and 500 responses.
    #[must_use]
    pub fn response_factory(mut self, responses: impl ResponseFactory + 'static) -> Self {
        self.responses = Some(Arc::new(responses));
        self
    }

    /// Finishes the worker, filling unset collaborators with defaults.
    #[must_use]
    pub fn build(self) -> HttpWorker<T, H> {
        HttpWorker::from_parts(
            self.transport,
            self.handler,
            self.responses
                .unwrap_or_else(|| Arc::new(PlainResponseFactory)),
            self.logger.unwrap_or_else(|| Arc::new(NoopLogger)),
            self.events.unwrap_or_else(|| Arc::new(NoopDispatcher)),
        )
    }
}
