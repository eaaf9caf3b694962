//! Request dispatch loop for long-lived HTTP workers.
//!
//! A host process hands requests to the worker one at a time through a
//! [`Transport`]. The worker passes each request to a [`RequestHandler`] and
//! returns the handler's response, announcing every step through an
//! [`EventDispatcher`]. Malformed requests are answered with 400 and handler
//! faults with 500, so a single bad request never takes the worker down.
//!
//! The loop only stops when the host has no more requests
//! ([`ExitReason::Terminated`]) or when the worker cannot even report a fault
//! ([`ExitReason::Fatal`]).

mod builder;
mod event;
mod fault;
mod log;
mod transport;
mod worker;

pub use builder::WorkerBuilder;
pub use event::{
    EventDispatcher, EventKind, EventObserver, LifecycleEvent, NoopDispatcher, ObserverSet,
    TracingObserver,
};
pub use fault::{Fault, FaultDescription, MAX_CAUSE_DEPTH};
pub use log::{NoopLogger, Severity, TracingLogger, WorkerLogger};
pub use transport::{
    PlainResponseFactory, Request, RequestHandler, Response, ResponseFactory, Transport,
};
pub use worker::{ExitReason, HttpWorker, RecoveryFault, RecoveryStage};

#[cfg(test)]
mod tests;
