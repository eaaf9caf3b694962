//! Opening relays for configured endpoints.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use spindle_config::{RelayEndpoint, WorkerParams};
use tracing::{debug, info};

use crate::RELAY_TARGET;
use crate::error::RelayError;
use crate::relay::Relay;

/// Relay over whichever stream the endpoint selected.
pub type DynRelay = Relay<Box<dyn BufRead + Send>, Box<dyn Write + Send>>;

/// Opens a relay to the host described by `endpoint`.
///
/// The pipes endpoint reads standard input and writes standard output. With
/// side-effect interception enabled it first diverts the process's stdout to
/// stderr and keeps a private handle for frames, so stray prints from the
/// application cannot corrupt the frame stream. Socket endpoints connect to
/// the host as a client and ignore the interception flag.
///
/// # Errors
///
/// Returns an error when the host cannot be reached or stdout cannot be
/// diverted.
pub fn connect(endpoint: &RelayEndpoint, params: WorkerParams) -> Result<DynRelay, RelayError> {
    match endpoint {
        RelayEndpoint::Pipes => connect_pipes(params),
        RelayEndpoint::Tcp { host, port } => {
            ignore_interception(endpoint, params);
            let stream = TcpStream::connect((host.as_str(), *port))
                .map_err(|source| connect_error(endpoint, source))?;
            let reader = stream
                .try_clone()
                .map_err(|source| connect_error(endpoint, source))?;
            info!(target: RELAY_TARGET, %endpoint, "connected to host");
            Ok(boxed(BufReader::new(reader), stream))
        }
        RelayEndpoint::Unix { path } => {
            ignore_interception(endpoint, params);
            connect_unix(endpoint, path.as_str())
        }
    }
}

fn connect_pipes(params: WorkerParams) -> Result<DynRelay, RelayError> {
    let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(io::stdin()));
    if params.intercept_side_effects() {
        let frames = divert_stdout()?;
        debug!(target: RELAY_TARGET, "stdout diverted to stderr; frames use a private handle");
        return Ok(Relay::new(reader, frames));
    }
    let frames: Box<dyn Write + Send> = Box::new(io::stdout());
    Ok(Relay::new(reader, frames))
}

fn boxed<R, W>(reader: R, writer: W) -> DynRelay
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let reader: Box<dyn BufRead + Send> = Box::new(reader);
    let writer: Box<dyn Write + Send> = Box::new(writer);
    Relay::new(reader, writer)
}

#[cfg(unix)]
fn divert_stdout() -> Result<Box<dyn Write + Send>, RelayError> {
    use std::fs::File;
    use std::os::fd::AsFd;

    let stdout = io::stdout();
    let divert = || -> io::Result<File> {
        stdout.lock().flush()?;
        let frames = stdout.as_fd().try_clone_to_owned()?;
        // SAFETY: both descriptors stay open for the life of the process and
        // dup2 does not touch memory owned by Rust.
        let result = unsafe { libc::dup2(libc::STDERR_FILENO, libc::STDOUT_FILENO) };
        if result == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(File::from(frames))
    };
    let frames = divert().map_err(|source| RelayError::Intercept { source })?;
    Ok(Box::new(frames))
}

#[cfg(not(unix))]
fn divert_stdout() -> Result<Box<dyn Write + Send>, RelayError> {
    debug!(target: RELAY_TARGET, "side-effect interception is unavailable on this platform");
    Ok(Box::new(io::stdout()))
}

#[cfg(unix)]
fn connect_unix(endpoint: &RelayEndpoint, path: &str) -> Result<DynRelay, RelayError> {
    use std::os::unix::net::UnixStream;

    let stream = UnixStream::connect(path).map_err(|source| connect_error(endpoint, source))?;
    let reader = stream
        .try_clone()
        .map_err(|source| connect_error(endpoint, source))?;
    info!(target: RELAY_TARGET, %endpoint, "connected to host");
    Ok(boxed(BufReader::new(reader), stream))
}

#[cfg(not(unix))]
fn connect_unix(endpoint: &RelayEndpoint, _path: &str) -> Result<DynRelay, RelayError> {
    Err(RelayError::UnsupportedUnix {
        endpoint: endpoint.to_string(),
    })
}

fn ignore_interception(endpoint: &RelayEndpoint, params: WorkerParams) {
    if params.intercept_side_effects() {
        debug!(
            target: RELAY_TARGET,
            %endpoint,
            "side-effect interception only applies to the pipes relay"
        );
    }
}

fn connect_error(endpoint: &RelayEndpoint, source: io::Error) -> RelayError {
    RelayError::Connect {
        endpoint: endpoint.to_string(),
        source,
    }
}
