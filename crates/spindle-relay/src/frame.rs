//! JSONL frame shapes exchanged with the host.
//!
//! Every frame is a single JSON object terminated by a newline. The `kind`
//! field selects the variant, mirroring the tagged message style used on the
//! response side.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Method, Uri};
use serde::{Deserialize, Serialize};
use spindle_core::{Request, Response};

use crate::error::RelayError;

/// Header map as carried on the wire: lowercase names to ordered values.
pub type WireHeaders = BTreeMap<String, Vec<String>>;

/// Frame sent by the host to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostFrame {
    /// A request the worker must answer.
    Request {
        /// HTTP method.
        method: String,
        /// Request target.
        uri: String,
        /// Request headers.
        #[serde(default)]
        headers: WireHeaders,
        /// Request body.
        #[serde(default)]
        body: String,
    },
    /// No more requests will follow.
    Stop,
}

impl HostFrame {
    /// Decodes a frame from one line of text.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] when the line is not a known frame.
    pub fn parse(line: &str) -> Result<Self, RelayError> {
        serde_json::from_str(line).map_err(|source| RelayError::Decode { source })
    }

    /// Converts the frame into a request, or `None` for [`HostFrame::Stop`].
    ///
    /// # Errors
    ///
    /// Returns an error when the method, URI or a header is invalid.
    pub fn into_request(self) -> Result<Option<Request>, RelayError> {
        let Self::Request {
            method,
            uri,
            headers,
            body,
        } = self
        else {
            return Ok(None);
        };

        let parsed_method = Method::from_bytes(method.as_bytes())
            .map_err(|source| RelayError::InvalidMethod { method, source })?;
        let parsed_uri = uri
            .parse::<Uri>()
            .map_err(|source| RelayError::InvalidUri { uri, source })?;

        let mut request = Request::new(Bytes::from(body));
        *request.method_mut() = parsed_method;
        *request.uri_mut() = parsed_uri;
        let target = request.headers_mut();
        for (name, values) in headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                RelayError::InvalidHeaderName {
                    name: name.clone(),
                    source,
                }
            })?;
            for value in values {
                let encoded = HeaderValue::from_str(&value).map_err(|source| {
                    RelayError::InvalidHeaderValue {
                        name: name.clone(),
                        source,
                    }
                })?;
                target.append(header.clone(), encoded);
            }
        }
        Ok(Some(request))
    }
}

/// Frame sent by the worker to the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerFrame {
    /// The answer to the most recent request.
    Response {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: WireHeaders,
        /// Response body.
        body: String,
    },
}

impl WorkerFrame {
    /// Encodes a response for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error when a header value or the body is not UTF-8.
    pub fn from_response(response: &Response) -> Result<Self, RelayError> {
        let mut headers = WireHeaders::new();
        for (name, value) in response.headers() {
            let text = value.to_str().map_err(|_| RelayError::HeaderNotUtf8 {
                name: name.as_str().to_owned(),
            })?;
            headers
                .entry(name.as_str().to_owned())
                .or_default()
                .push(text.to_owned());
        }
        let body = std::str::from_utf8(response.body())
            .map_err(|source| RelayError::BodyNotUtf8 { source })?;
        Ok(Self::Response {
            status: response.status().as_u16(),
            headers,
            body: body.to_owned(),
        })
    }
}
