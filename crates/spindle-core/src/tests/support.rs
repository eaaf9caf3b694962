//! Scripted collaborators for the dispatch loop suites.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use bytes::Bytes;
use http::{Method, StatusCode};

use crate::{
    EventDispatcher, EventKind, Fault, LifecycleEvent, Request, Response, Severity, Transport,
    WorkerLogger,
};

/// One step of a scripted host conversation.
#[derive(Debug)]
pub enum Inbound {
    /// A well-formed request.
    Request(Request),
    /// A frame the transport cannot decode.
    Malformed(&'static str),
    /// The transport panics while reading.
    Panic,
}

impl Inbound {
    /// Builds a `GET` request for `uri`.
    pub fn get(uri: &str) -> Self {
        Self::Request(request(Method::GET, uri, Bytes::new()))
    }

    /// Builds a `POST` request carrying `body`.
    pub fn post(uri: &str, body: &'static str) -> Self {
        Self::Request(request(Method::POST, uri, Bytes::from_static(body.as_bytes())))
    }
}

fn request(method: Method, uri: &str, body: Bytes) -> Request {
    let mut request = Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri.parse().expect("test URIs are valid");
    request
}

/// Transport replaying a fixed script, then reporting that the host is done.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: VecDeque<Inbound>,
    acquisitions: usize,
    sent: Vec<Response>,
    failing_statuses: HashSet<StatusCode>,
}

impl ScriptedTransport {
    /// Creates a transport that replays `script` in order.
    pub fn new(script: impl IntoIterator<Item = Inbound>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Makes every send of a response with `status` fail.
    pub fn fail_sending(mut self, status: StatusCode) -> Self {
        self.failing_statuses.insert(status);
        self
    }

    /// Number of `acquire_next` calls made so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    /// Responses delivered successfully, in order.
    pub fn sent(&self) -> &[Response] {
        &self.sent
    }

    /// Status codes of the delivered responses.
    pub fn sent_statuses(&self) -> Vec<StatusCode> {
        self.sent.iter().map(Response::status).collect()
    }

    /// Entries still waiting in the script.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Transport for ScriptedTransport {
    fn acquire_next(&mut self) -> Result<Option<Request>, Fault> {
        self.acquisitions += 1;
        match self.script.pop_front() {
            None => Ok(None),
            Some(Inbound::Request(request)) => Ok(Some(request)),
            Some(Inbound::Malformed(reason)) => Err(Fault::new(reason)),
            Some(Inbound::Panic) => panic!("transport read panicked"),
        }
    }

    fn send(&mut self, response: Response) -> Result<(), Fault> {
        if self.failing_statuses.contains(&response.status()) {
            return Err(Fault::new(format!(
                "host closed the channel before {} was written",
                response.status().as_u16()
            )));
        }
        self.sent.push(response);
        Ok(())
    }
}

/// Log entry captured by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub fault: Option<String>,
}

/// Logger capturing every entry for later inspection.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    /// Snapshot of the captured entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("logger lock").clone()
    }

    /// Captured `(severity, message)` pairs.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.entries()
            .into_iter()
            .map(|entry| (entry.severity, entry.message))
            .collect()
    }
}

impl WorkerLogger for RecordingLogger {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        self.entries.lock().expect("logger lock").push(LogEntry {
            severity,
            message: message.to_owned(),
            fault: fault.map(Fault::message),
        });
    }
}

/// Logger that panics on one severity and records every other entry.
#[derive(Debug)]
pub struct PanickingLogger {
    panic_on: Severity,
    recorded: RecordingLogger,
}

impl PanickingLogger {
    /// Logger panicking whenever an entry of `panic_on` severity arrives.
    pub fn new(panic_on: Severity) -> Self {
        Self {
            panic_on,
            recorded: RecordingLogger::default(),
        }
    }

    /// Captured `(severity, message)` pairs that did not panic.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.recorded.messages()
    }
}

impl WorkerLogger for PanickingLogger {
    fn log(&self, severity: Severity, message: &str, fault: Option<&Fault>) {
        assert_ne!(severity, self.panic_on, "log sink rejected: {message}");
        self.recorded.log(severity, message, fault);
    }
}

/// Dispatcher recording event kinds and failing on demand.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<EventKind>>,
    failing: Mutex<HashSet<EventKind>>,
    panicking: Mutex<HashSet<EventKind>>,
}

impl RecordingDispatcher {
    /// Makes every dispatch of `kind` return a fault.
    pub fn fail_on(&self, kind: EventKind) {
        self.failing.lock().expect("dispatcher lock").insert(kind);
    }

    /// Makes every dispatch of `kind` panic.
    pub fn panic_on(&self, kind: EventKind) {
        self.panicking.lock().expect("dispatcher lock").insert(kind);
    }

    /// Event kinds dispatched so far, including failed dispatches.
    pub fn events(&self) -> Vec<EventKind> {
        self.events.lock().expect("dispatcher lock").clone()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<(), Fault> {
        let kind = event.kind();
        self.events.lock().expect("dispatcher lock").push(kind);
        if self.panicking.lock().expect("dispatcher lock").contains(&kind) {
            panic!("observer for {kind} panicked");
        }
        if self.failing.lock().expect("dispatcher lock").contains(&kind) {
            return Err(Fault::new(format!("observer for {kind} failed")));
        }
        Ok(())
    }
}

/// Handler answering 200 with the request body.
pub fn echo(request: Request) -> Result<Response, Fault> {
    let mut response = Response::new(request.into_body());
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

/// Handler that always faults.
pub fn failing(_request: Request) -> Result<Response, Fault> {
    Err(Fault::new("database unavailable").with_code(503))
}

/// Handler that always panics.
pub fn panicking(_request: Request) -> Result<Response, Fault> {
    panic!("handler exploded")
}
