//! Collaborator seams the dispatch loop depends on.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;

use crate::fault::Fault;

/// HTTP-shaped request received from the host.
pub type Request = http::Request<Bytes>;

/// HTTP-shaped response returned to the host.
pub type Response = http::Response<Bytes>;

/// Exchanges requests and responses with the host process.
///
/// The worker is the transport's only user and calls it strictly in turn:
/// every acquired request is answered with exactly one [`Transport::send`]
/// before the next acquisition, unless the worker stops.
pub trait Transport {
    /// Blocks until the host supplies the next request.
    ///
    /// Returns `Ok(None)` once the host signals that no more requests will
    /// arrive.
    ///
    /// # Errors
    ///
    /// Returns a fault when the incoming frame is malformed or cannot be
    /// read.
    fn acquire_next(&mut self) -> Result<Option<Request>, Fault>;

    /// Delivers a response for the most recently acquired request.
    ///
    /// # Errors
    ///
    /// Returns a fault when the response cannot be encoded or written.
    fn send(&mut self, response: Response) -> Result<(), Fault>;
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn acquire_next(&mut self) -> Result<Option<Request>, Fault> {
        (**self).acquire_next()
    }

    fn send(&mut self, response: Response) -> Result<(), Fault> {
        (**self).send(response)
    }
}

/// Application logic mapping one request to one response.
pub trait RequestHandler {
    /// Handles a request.
    ///
    /// # Errors
    ///
    /// Returns a fault when the application cannot produce a response.
    fn handle(&self, request: Request) -> Result<Response, Fault>;
}

impl<F> RequestHandler for F
where
    F: Fn(Request) -> Result<Response, Fault>,
{
    fn handle(&self, request: Request) -> Result<Response, Fault> {
        self(request)
    }
}

/// Builds the fallback responses the loop sends on its own behalf.
pub trait ResponseFactory: Send + Sync {
    /// Creates a response with the given status and reason phrase.
    ///
    /// Must not fail for the 400 and 500 statuses the loop uses.
    fn create_response(&self, status: StatusCode, reason: &str) -> Response;
}

/// Factory producing `text/plain` responses whose body is the reason phrase.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainResponseFactory;

impl ResponseFactory for PlainResponseFactory {
    fn create_response(&self, status: StatusCode, reason: &str) -> Response {
        let mut response = Response::new(Bytes::copy_from_slice(reason.as_bytes()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
