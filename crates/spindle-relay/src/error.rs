//! Error types for the JSONL relay.

use std::io;

use thiserror::Error;

/// Errors raised while reading, decoding, encoding or writing relay frames.
///
/// Read and decode variants become 400 responses in the dispatch loop; write
/// and encode variants are delivery faults.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Reading from the host failed.
    #[error("failed to read frame from host: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The frame exceeded the size limit; the rest of its line was skipped.
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Observed frame size.
        size: usize,
        /// Permitted frame size.
        limit: usize,
    },
    /// The frame is not valid UTF-8.
    #[error("frame is not valid UTF-8: {source}")]
    NotUtf8 {
        /// Position of the invalid sequence.
        #[source]
        source: std::str::Utf8Error,
    },
    /// The frame is not a JSON object of a known kind.
    #[error("malformed frame: {source}")]
    Decode {
        /// JSON decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// The request method is not a valid HTTP token.
    #[error("invalid request method '{method}'")]
    InvalidMethod {
        /// Method as sent by the host.
        method: String,
        /// Parse error.
        #[source]
        source: http::method::InvalidMethod,
    },
    /// The request URI failed to parse.
    #[error("invalid request URI '{uri}': {source}")]
    InvalidUri {
        /// URI as sent by the host.
        uri: String,
        /// Parse error.
        #[source]
        source: http::uri::InvalidUri,
    },
    /// A header name is not a valid HTTP token.
    #[error("invalid header name '{name}'")]
    InvalidHeaderName {
        /// Name as sent by the host.
        name: String,
        /// Parse error.
        #[source]
        source: http::header::InvalidHeaderName,
    },
    /// A header value contains forbidden bytes.
    #[error("invalid value for header '{name}'")]
    InvalidHeaderValue {
        /// Header the value belongs to.
        name: String,
        /// Parse error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    /// A response header value cannot be carried in a JSON string.
    #[error("response header '{name}' is not valid UTF-8")]
    HeaderNotUtf8 {
        /// Offending header.
        name: String,
    },
    /// A response body cannot be carried in a JSON string.
    #[error("response body is not valid UTF-8: {source}")]
    BodyNotUtf8 {
        /// Position of the invalid sequence.
        #[source]
        source: std::str::Utf8Error,
    },
    /// Encoding a response frame failed.
    #[error("failed to encode response frame: {source}")]
    Encode {
        /// JSON encoding error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing to the host failed.
    #[error("failed to write frame to host: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Connecting to the host failed.
    #[error("failed to connect to host at {endpoint}: {source}")]
    Connect {
        /// Endpoint that was dialled.
        endpoint: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Diverting process stdout away from the frame stream failed.
    #[error("failed to divert stdout for side-effect interception: {source}")]
    Intercept {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Endpoint that was requested.
        endpoint: String,
    },
}
