//! Fault values crossing the worker's collaborator seams.
//!
//! A [`Fault`] is what a transport, application handler or event observer
//! raises when it cannot complete. It wraps an [`anyhow::Error`], so any
//! `std::error::Error` converts into a fault with `?` and keeps its
//! `source()` chain. On top of that a fault records the location of each
//! layer raised through it and an application-defined code.
//! [`Fault::describe`] flattens the chain into a bounded, serialisable
//! [`FaultDescription`] for logging.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::iter;
use std::panic::Location;

use serde::Serialize;

/// Number of causal levels included below the outermost fault when a fault
/// is described.
pub const MAX_CAUSE_DEPTH: usize = 3;

/// An error condition raised by one of the worker's collaborators.
pub struct Fault {
    error: anyhow::Error,
    code: i64,
    location: &'static Location<'static>,
    // Layers wrapped by `context`, outermost first. Entry `n` describes link
    // `n + 1` of `error.chain()`; links past the end are plain errors reached
    // through `source()`.
    wrapped: Vec<Layer>,
}

#[derive(Clone, Copy)]
struct Layer {
    code: i64,
    location: &'static Location<'static>,
}

impl Fault {
    /// Creates a fault with the given message, recording the caller.
    #[must_use]
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_anyhow(anyhow::Error::msg(message.into()))
    }

    /// Wraps an error, keeping its `source()` chain as the fault's causes.
    #[must_use]
    #[track_caller]
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::new(error))
    }

    /// Adopts an `anyhow` error, recording the caller as its location.
    #[must_use]
    #[track_caller]
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        Self {
            error,
            code: 0,
            location: Location::caller(),
            wrapped: Vec::new(),
        }
    }

    /// Converts a panic payload caught by `catch_unwind` into a fault.
    #[must_use]
    #[track_caller]
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            String::from("non-string panic payload")
        };
        Self::new(format!("panicked: {detail}"))
    }

    /// Wraps this fault in a new outer layer carrying `message`.
    #[must_use]
    #[track_caller]
    pub fn context(self, message: impl Into<String>) -> Self {
        let mut wrapped = self.wrapped;
        wrapped.insert(
            0,
            Layer {
                code: self.code,
                location: self.location,
            },
        );
        Self {
            error: self.error.context(message.into()),
            code: 0,
            location: Location::caller(),
            wrapped,
        }
    }

    /// Attaches an application-defined numeric code to the outermost layer.
    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Human-readable message of the outermost layer.
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Numeric code; zero unless one was attached.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Source location where the outermost layer was raised.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Iterates over the fault and every cause below it, outermost first.
    #[must_use]
    pub fn chain(&self) -> anyhow::Chain<'_> {
        self.error.chain()
    }

    /// Innermost link of the causal chain.
    #[must_use]
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        self.error.root_cause()
    }

    /// Backtrace captured when the innermost layer was created.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        self.error.backtrace()
    }

    /// Underlying error, for callers that work in `anyhow` terms.
    #[must_use]
    pub fn into_anyhow(self) -> anyhow::Error {
        self.error
    }

    /// Returns a serialisable description of the fault and at most
    /// [`MAX_CAUSE_DEPTH`] levels of its causes.
    #[must_use]
    pub fn describe(&self) -> FaultDescription {
        let causes: Vec<FaultDescription> = self
            .chain()
            .skip(1)
            .zip(self.wrapped.iter().copied().map(Some).chain(iter::repeat(None)))
            .take(MAX_CAUSE_DEPTH)
            .map(|(link, layer)| describe_link(link, layer))
            .collect();
        let previous = causes
            .into_iter()
            .rev()
            .fold(None, |previous, mut description| {
                description.previous = previous;
                Some(Box::new(description))
            });

        FaultDescription {
            message: self.message(),
            code: Some(self.code),
            file: Some(self.location.file().to_owned()),
            line: Some(self.location.line()),
            trace: self.trace(),
            previous,
        }
    }

    fn trace(&self) -> Vec<String> {
        let backtrace = self.backtrace();
        if backtrace.status() != BacktraceStatus::Captured {
            return Vec::new();
        }
        backtrace
            .to_string()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

fn describe_link(link: &(dyn StdError + 'static), layer: Option<Layer>) -> FaultDescription {
    FaultDescription {
        message: link.to_string(),
        code: layer.map(|layer| layer.code),
        file: layer.map(|layer| layer.location.file().to_owned()),
        line: layer.map(|layer| layer.location.line()),
        trace: Vec::new(),
        previous: None,
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Self::from_error(error)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, formatter)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let causes: Vec<String> = self.chain().skip(1).map(ToString::to_string).collect();
        formatter
            .debug_struct("Fault")
            .field("message", &self.message())
            .field("code", &self.code())
            .field("location", &format_args!("{}", self.location()))
            .field("causes", &causes)
            .finish()
    }
}

/// Structured, depth-bounded description of a fault used as log context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultDescription {
    /// Message of this link.
    pub message: String,
    /// Numeric code, absent for plain errors.
    pub code: Option<i64>,
    /// Source file where the fault was raised, absent for plain errors.
    pub file: Option<String>,
    /// Source line where the fault was raised, absent for plain errors.
    pub line: Option<u32>,
    /// Captured stack frames; empty unless backtraces are enabled.
    pub trace: Vec<String>,
    /// Description of the next cause, when within the depth bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<FaultDescription>>,
}

impl FaultDescription {
    /// Number of levels in this description, including the outermost one.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.previous.as_deref();
        while let Some(description) = current {
            depth += 1;
            current = description.previous.as_deref();
        }
        depth
    }
}
