//! Relay endpoints connecting the worker to its host process.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Literal accepted for the standard I/O relay.
const PIPES: &str = "pipes";

/// Declarative configuration for the relay the worker exchanges frames over.
///
/// Endpoints are written the same way in every configuration layer:
/// `pipes`, `tcp://host:port` or `unix:///path/to/socket`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelayEndpoint {
    /// Frames travel over the process's standard input and output.
    #[default]
    Pipes,
    /// The worker connects to the host over TCP.
    Tcp {
        /// Host name or address of the host process.
        host: String,
        /// Port the host process listens on.
        port: u16,
    },
    /// The worker connects to the host over a Unix domain socket.
    Unix {
        /// Filesystem path of the host's socket.
        path: Utf8PathBuf,
    },
}

impl RelayEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns true when frames travel over standard I/O.
    #[must_use]
    pub const fn is_pipes(&self) -> bool {
        matches!(self, Self::Pipes)
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Pipes | Self::Tcp { .. } => None,
        }
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipes => formatter.write_str(PIPES),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(formatter, "unix://{path}"),
        }
    }
}

impl FromStr for RelayEndpoint {
    type Err = RelayEndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case(PIPES) {
            return Ok(Self::Pipes);
        }

        let url = Url::parse(trimmed)?;
        match url.scheme() {
            "unix" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(RelayEndpointParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| RelayEndpointParseError::MissingHost(input.to_owned()))?;
                let port = url
                    .port()
                    .ok_or_else(|| RelayEndpointParseError::MissingPort(input.to_owned()))?;
                Ok(Self::tcp(host, port))
            }
            other => Err(RelayEndpointParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

// Endpoints arrive as plain strings from TOML, the environment and the CLI,
// so the serde form is the textual form.
impl Serialize for RelayEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelayEndpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors encountered while parsing a [`RelayEndpoint`] from text.
#[derive(Debug, Error)]
pub enum RelayEndpointParseError {
    /// Scheme was not recognised.
    #[error("unsupported relay scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn display_unix_relay() {
        let endpoint = RelayEndpoint::unix(Utf8PathBuf::from("/tmp/spindle.sock"));
        assert_eq!(endpoint.to_string(), "unix:///tmp/spindle.sock");
    }

    #[rstest]
    #[case("pipes", RelayEndpoint::Pipes)]
    #[case(" PIPES ", RelayEndpoint::Pipes)]
    #[case("tcp://127.0.0.1:6001", RelayEndpoint::tcp("127.0.0.1", 6001))]
    #[case("unix:///run/host.sock", RelayEndpoint::unix("/run/host.sock"))]
    fn parses_supported_endpoints(#[case] input: &str, #[case] expected: RelayEndpoint) {
        let parsed: RelayEndpoint = input.parse().expect("endpoint should parse");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    #[case("tcp://127.0.0.1")]
    #[case("http://localhost:80")]
    #[case("not a url")]
    fn rejects_unusable_endpoints(#[case] input: &str) {
        assert!(input.parse::<RelayEndpoint>().is_err());
    }
}
