//! Lifecycle events emitted by the dispatch loop.
//!
//! Events are delivered synchronously through an [`EventDispatcher`]. The loop
//! waits for each dispatch to finish before moving on, and a dispatcher that
//! returns a fault is treated like any other collaborator fault at that stage
//! of the loop.

use std::fmt;
use std::sync::Arc;

use crate::fault::Fault;
use crate::transport::{Request, Response};

/// Tracing target used by [`TracingObserver`].
const EVENTS_TARGET: &str = "spindle::events";

/// Notification emitted at a fixed point of the dispatch loop.
#[derive(Debug)]
pub enum LifecycleEvent<'a> {
    /// A well-formed request is about to reach the application handler.
    PreDispatch(&'a Request),
    /// The application handler produced this response; it has not been sent.
    PostDispatch(&'a Response),
    /// The transport could not produce a request; a 400 response follows.
    BadRequest(&'a Fault),
    /// The handler or a happy-path observer failed; a 500 response follows.
    UnhandledException(&'a Fault),
    /// The host signalled that no more requests will arrive.
    TerminateWorker,
}

impl LifecycleEvent<'_> {
    /// Payload-free discriminant of the event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PreDispatch(_) => EventKind::PreDispatch,
            Self::PostDispatch(_) => EventKind::PostDispatch,
            Self::BadRequest(_) => EventKind::BadRequest,
            Self::UnhandledException(_) => EventKind::UnhandledException,
            Self::TerminateWorker => EventKind::TerminateWorker,
        }
    }
}

/// Discriminant of a [`LifecycleEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`LifecycleEvent::PreDispatch`].
    PreDispatch,
    /// See [`LifecycleEvent::PostDispatch`].
    PostDispatch,
    /// See [`LifecycleEvent::BadRequest`].
    BadRequest,
    /// See [`LifecycleEvent::UnhandledException`].
    UnhandledException,
    /// See [`LifecycleEvent::TerminateWorker`].
    TerminateWorker,
}

impl EventKind {
    /// Snake-case name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreDispatch => "pre_dispatch",
            Self::PostDispatch => "post_dispatch",
            Self::BadRequest => "bad_request",
            Self::UnhandledException => "unhandled_exception",
            Self::TerminateWorker => "terminate_worker",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Delivers lifecycle events to whatever is listening.
pub trait EventDispatcher: Send + Sync {
    /// Delivers one event, returning once every observer has run or one of
    /// them has faulted.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised by an observer.
    fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault>;
}

impl<T> EventDispatcher for Arc<T>
where
    T: EventDispatcher + ?Sized,
{
    fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        (**self).dispatch(event)
    }
}

/// Dispatcher with no observers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {
    fn dispatch(&self, _event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        Ok(())
    }
}

/// A single listener registered with an [`ObserverSet`].
pub trait EventObserver: Send + Sync {
    /// Reacts to one event.
    ///
    /// # Errors
    ///
    /// Returns a fault when the observer cannot process the event.
    fn observe(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault>;
}

struct FnObserver<F>(F);

impl<F> EventObserver for FnObserver<F>
where
    F: Fn(&LifecycleEvent<'_>) -> Result<(), Fault> + Send + Sync,
{
    fn observe(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        (self.0)(event)
    }
}

/// Dispatcher that notifies registered observers in registration order.
///
/// Delivery stops at the first observer that faults; later observers do not
/// see that event.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn EventObserver>>,
}

impl ObserverSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn register(&mut self, observer: impl EventObserver + 'static) {
        self.observers.push(Arc::new(observer));
    }

    /// Registers an observer, builder style.
    #[must_use]
    pub fn with(mut self, observer: impl EventObserver + 'static) -> Self {
        self.register(observer);
        self
    }

    /// Registers a closure as an observer, builder style.
    #[must_use]
    pub fn with_fn<F>(self, observer: F) -> Self
    where
        F: Fn(&LifecycleEvent<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.with(FnObserver(observer))
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventDispatcher for ObserverSet {
    fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        for observer in &self.observers {
            observer.observe(event)?;
        }
        Ok(())
    }
}

/// Observer that records every event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    /// Builds a new observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventObserver for TracingObserver {
    fn observe(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        let kind = event.kind().as_str();
        match event {
            LifecycleEvent::PreDispatch(request) => tracing::debug!(
                target: EVENTS_TARGET,
                event = kind,
                method = %request.method(),
                uri = %request.uri(),
                "dispatching request"
            ),
            LifecycleEvent::PostDispatch(response) => tracing::debug!(
                target: EVENTS_TARGET,
                event = kind,
                status = response.status().as_u16(),
                "handler produced response"
            ),
            LifecycleEvent::BadRequest(fault) => tracing::debug!(
                target: EVENTS_TARGET,
                event = kind,
                error = %fault,
                "rejecting malformed request"
            ),
            LifecycleEvent::UnhandledException(fault) => tracing::debug!(
                target: EVENTS_TARGET,
                event = kind,
                error = %fault,
                "handler failed"
            ),
            LifecycleEvent::TerminateWorker => tracing::info!(
                target: EVENTS_TARGET,
                event = kind,
                "worker terminating"
            ),
        }
        Ok(())
    }
}
