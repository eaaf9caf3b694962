//! Built-in application served by the `spindled` binary.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use serde::Serialize;

use spindle_core::{Fault, Request, RequestHandler, Response};

/// Path answered with a plain `ok` for liveness checks.
pub const HEALTH_PATH: &str = "/healthz";

/// Application that describes each request back to the host.
///
/// `GET /healthz` answers `ok`; every other request receives a JSON summary
/// of its method, URI, headers and body.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoApplication;

impl EchoApplication {
    /// Builds the application.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    method: &'a str,
    uri: String,
    headers: BTreeMap<&'a str, Vec<String>>,
    body: String,
}

impl RequestHandler for EchoApplication {
    fn handle(&self, request: Request) -> Result<Response, Fault> {
        if request.method() == Method::GET && request.uri().path() == HEALTH_PATH {
            return Ok(respond(
                Bytes::from_static(b"ok"),
                "text/plain; charset=utf-8",
            ));
        }

        let mut headers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, value) in request.headers() {
            headers
                .entry(name.as_str())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let summary = Summary {
            method: request.method().as_str(),
            uri: request.uri().to_string(),
            headers,
            body: String::from_utf8_lossy(request.body()).into_owned(),
        };
        let encoded = serde_json::to_vec(&summary)
            .map_err(|error| Fault::from_error(error).context("failed to encode echo summary"))?;
        Ok(respond(Bytes::from(encoded), "application/json"))
    }
}

fn respond(body: Bytes, content_type: &'static str) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
