//! The worker's dispatch loop.
//!
//! Each iteration walks an explicit state machine:
//!
//! ```text
//! AwaitingRequest ──▶ Terminating                     (host has no more requests)
//!                 ──▶ RecoveringBadRequest ─┬─▶ Responded ──▶ AwaitingRequest
//!                 ──▶ Dispatching ──────────┼─▶ Responded
//!                        │                  └─▶ FatalStop
//!                        └─▶ RecoveringHandlerFailure ─┬─▶ Responded
//!                                                      └─▶ FatalStop
//! ```
//!
//! Faults raised while acquiring or dispatching are absorbed: the host
//! receives a 400 or 500 response and the loop continues. A fault raised
//! while reporting one of those faults cannot be answered safely, so the
//! loop stops and hands the fault to its caller instead of leaving the
//! request unanswered.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

use crate::event::{EventDispatcher, LifecycleEvent};
use crate::fault::Fault;
use crate::log::{Severity, WorkerLogger};
use crate::transport::{Request, RequestHandler, ResponseFactory, Transport};

pub(crate) const TERMINATION_RECEIVED: &str = "Termination request received";
pub(crate) const TERMINATION_OBSERVER_FAILED: &str =
    "Termination observer failed, terminating worker anyway.";
pub(crate) const MALFORMED_REQUEST: &str = "Malformed request received!";
pub(crate) const BAD_REQUEST_UNDELIVERED: &str =
    "Failed to deliver bad request response, terminating worker.";
pub(crate) const UNHANDLED_EXCEPTION: &str = "Request handler threw unhandled exception!";
pub(crate) const SERVER_ERROR_UNDELIVERED: &str =
    "Failed to deliver internal server error response, terminating worker.";

/// Recovery path during which a fatal fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    /// Answering a malformed request with 400.
    BadRequest,
    /// Answering a failed handler invocation with 500.
    HandlerFailure,
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::BadRequest => "bad request",
            Self::HandlerFailure => "handler failure",
        })
    }
}

/// A fault raised while reporting or answering an earlier fault.
#[derive(Debug, Error)]
#[error("{stage} recovery failed: {fault}")]
pub struct RecoveryFault {
    stage: RecoveryStage,
    fault: Fault,
}

impl RecoveryFault {
    const fn new(stage: RecoveryStage, fault: Fault) -> Self {
        Self { stage, fault }
    }

    /// Recovery path that failed.
    #[must_use]
    pub const fn stage(&self) -> RecoveryStage {
        self.stage
    }

    /// The fault that ended the worker.
    #[must_use]
    pub const fn fault(&self) -> &Fault {
        &self.fault
    }
}

/// Why [`HttpWorker::run`] returned.
#[derive(Debug)]
pub enum ExitReason {
    /// The host signalled that no more requests will arrive.
    Terminated,
    /// A recovery path faulted; the worker must be restarted by its
    /// supervisor.
    Fatal(RecoveryFault),
}

impl ExitReason {
    /// Whether the worker stopped because the host asked it to.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

enum LoopState {
    AwaitingRequest,
    Dispatching(Request),
    RecoveringBadRequest(Fault),
    RecoveringHandlerFailure(Fault),
    Responded,
    Terminating,
    FatalStop(RecoveryFault),
}

/// Long-lived worker answering requests from a [`Transport`] with a
/// [`RequestHandler`].
///
/// Build one with [`WorkerBuilder`](crate::WorkerBuilder).
pub struct HttpWorker<T, H> {
    transport: T,
    handler: H,
    responses: Arc<dyn ResponseFactory>,
    logger: Arc<dyn WorkerLogger>,
    events: Arc<dyn EventDispatcher>,
}

impl<T, H> HttpWorker<T, H> {
    pub(crate) fn from_parts(
        transport: T,
        handler: H,
        responses: Arc<dyn ResponseFactory>,
        logger: Arc<dyn WorkerLogger>,
        events: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            transport,
            handler,
            responses,
            logger,
            events,
        }
    }

    /// Borrows the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Consumes the worker, returning its transport.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T, H> HttpWorker<T, H>
where
    T: Transport,
    H: RequestHandler,
{
    /// Serves requests until the host stops sending them or a recovery path
    /// faults.
    ///
    /// Malformed requests and handler faults never escape this method; they
    /// are answered with 400 and 500 responses respectively.
    pub fn run(&mut self) -> ExitReason {
        let mut state = LoopState::AwaitingRequest;
        loop {
            state = match state {
                LoopState::AwaitingRequest => self.acquire(),
                LoopState::Dispatching(request) => self.dispatch(request),
                LoopState::RecoveringBadRequest(fault) => self.recover_bad_request(&fault),
                LoopState::RecoveringHandlerFailure(fault) => {
                    self.recover_handler_failure(&fault)
                }
                LoopState::Responded => LoopState::AwaitingRequest,
                LoopState::Terminating => {
                    self.terminate();
                    return ExitReason::Terminated;
                }
                LoopState::FatalStop(fault) => return ExitReason::Fatal(fault),
            };
        }
    }

    fn acquire(&mut self) -> LoopState {
        match guarded(|| self.transport.acquire_next()) {
            Ok(Some(request)) => LoopState::Dispatching(request),
            Ok(None) => LoopState::Terminating,
            Err(fault) => LoopState::RecoveringBadRequest(fault),
        }
    }

    fn dispatch(&mut self, request: Request) -> LoopState {
        let outcome = guarded(|| {
            self.events.dispatch(&LifecycleEvent::PreDispatch(&request))?;
            let response = self.handler.handle(request)?;
            self.events
                .dispatch(&LifecycleEvent::PostDispatch(&response))?;
            self.transport.send(response)
        });
        match outcome {
            Ok(()) => LoopState::Responded,
            Err(fault) => LoopState::RecoveringHandlerFailure(fault),
        }
    }

    fn recover_bad_request(&mut self, fault: &Fault) -> LoopState {
        let delivered = guarded(|| {
            self.logger
                .log(Severity::Notice, MALFORMED_REQUEST, Some(fault));
            self.events.dispatch(&LifecycleEvent::BadRequest(fault))?;
            let response = self
                .responses
                .create_response(StatusCode::BAD_REQUEST, "Bad Request");
            self.transport.send(response)
        });
        match delivered {
            Ok(()) => LoopState::Responded,
            Err(secondary) => {
                self.log_quietly(Severity::Error, BAD_REQUEST_UNDELIVERED, Some(&secondary));
                LoopState::FatalStop(RecoveryFault::new(RecoveryStage::BadRequest, secondary))
            }
        }
    }

    fn recover_handler_failure(&mut self, fault: &Fault) -> LoopState {
        let delivered = guarded(|| {
            self.logger
                .log(Severity::Error, UNHANDLED_EXCEPTION, Some(fault));
            self.events
                .dispatch(&LifecycleEvent::UnhandledException(fault))?;
            let response = self
                .responses
                .create_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            self.transport.send(response)
        });
        match delivered {
            Ok(()) => LoopState::Responded,
            Err(secondary) => {
                self.log_quietly(Severity::Error, SERVER_ERROR_UNDELIVERED, Some(&secondary));
                LoopState::FatalStop(RecoveryFault::new(
                    RecoveryStage::HandlerFailure,
                    secondary,
                ))
            }
        }
    }

    fn terminate(&self) {
        if let Err(fault) = guarded(|| self.events.dispatch(&LifecycleEvent::TerminateWorker)) {
            self.log_quietly(Severity::Error, TERMINATION_OBSERVER_FAILED, Some(&fault));
        }
        self.log_quietly(Severity::Info, TERMINATION_RECEIVED, None);
    }

    // Used once the loop has already decided to stop; a panicking logger
    // must not unwind out of `run`.
    fn log_quietly(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        let _ignored = guarded(|| {
            self.logger.log(severity, message, fault);
            Ok(())
        });
    }
}

/// Runs a collaborator call, turning a panic into a fault.
fn guarded<R>(operation: impl FnOnce() -> Result<R, Fault>) -> Result<R, Fault> {
    panic::catch_unwind(AssertUnwindSafe(operation)).unwrap_or_else(|payload| {
        Err(Fault::from_panic(payload))
    })
}
