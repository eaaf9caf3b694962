//! [`Transport`] implementation over a JSONL byte stream.

use std::io::{BufRead, Write};

use spindle_core::{Fault, Request, Response, Transport};
use tracing::{debug, warn};

use crate::RELAY_TARGET;
use crate::error::RelayError;
use crate::frame::{HostFrame, WorkerFrame};
use crate::reader::FrameReader;

/// Relay exchanging JSONL frames with the host over a reader/writer pair.
///
/// Any [`BufRead`] and [`Write`] pair works, which keeps the relay usable over
/// pipes, sockets and in-memory buffers alike.
#[derive(Debug)]
pub struct Relay<R, W> {
    frames: FrameReader<R>,
    writer: W,
    stopped: bool,
}

impl<R: BufRead, W: Write> Relay<R, W> {
    /// Creates a relay reading frames from `reader` and writing to `writer`.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            frames: FrameReader::new(reader),
            writer,
            stopped: false,
        }
    }

    /// Creates a relay with a custom frame size limit.
    pub const fn with_frame_limit(reader: R, writer: W, limit: usize) -> Self {
        Self {
            frames: FrameReader::with_limit(reader, limit),
            writer,
            stopped: false,
        }
    }

    /// Borrows the writer.
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Consumes the relay, returning the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.frames.into_inner(), self.writer)
    }

    /// Reads and decodes the next request.
    ///
    /// Returns `Ok(None)` after a stop frame or at end of stream; later calls
    /// keep returning `Ok(None)` without reading.
    ///
    /// # Errors
    ///
    /// Returns an error when the next frame cannot be read or decoded.
    pub fn read_request(&mut self) -> Result<Option<Request>, RelayError> {
        if self.stopped {
            return Ok(None);
        }
        let Some(bytes) = self.frames.read_frame()? else {
            debug!(target: RELAY_TARGET, "host closed the request stream");
            self.stopped = true;
            return Ok(None);
        };
        let line = std::str::from_utf8(&bytes).map_err(|source| RelayError::NotUtf8 { source })?;
        let request = HostFrame::parse(line)?.into_request()?;
        if request.is_none() {
            debug!(target: RELAY_TARGET, "host sent stop frame");
            self.stopped = true;
        }
        Ok(request)
    }

    /// Encodes and writes a response frame, flushing the writer.
    ///
    /// # Errors
    ///
    /// Returns an error when the response cannot be encoded or written.
    pub fn write_response(&mut self, response: &Response) -> Result<(), RelayError> {
        let frame = WorkerFrame::from_response(response)?;
        let mut line =
            serde_json::to_vec(&frame).map_err(|source| RelayError::Encode { source })?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .and_then(|()| self.writer.flush())
            .map_err(|source| RelayError::Write { source })
    }
}

impl<R: BufRead, W: Write> Transport for Relay<R, W> {
    fn acquire_next(&mut self) -> Result<Option<Request>, Fault> {
        self.read_request().map_err(|error| {
            warn!(target: RELAY_TARGET, %error, "rejected frame from host");
            Fault::from_error(error)
        })
    }

    fn send(&mut self, response: Response) -> Result<(), Fault> {
        Ok(self.write_response(&response)?)
    }
}
