//! Bounded line reader for incoming frames.

use std::io::{self, BufRead};

use crate::error::RelayError;

/// Largest frame accepted from the host, excluding the newline.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into newline-terminated frames of bounded size.
#[derive(Debug)]
pub(crate) struct FrameReader<R> {
    reader: R,
    limit: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub(crate) const fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_FRAME_BYTES)
    }

    pub(crate) const fn with_limit(reader: R, limit: usize) -> Self {
        Self { reader, limit }
    }

    /// Reads the next non-blank frame.
    ///
    /// Returns `Ok(None)` at end of stream. A final line without a newline is
    /// still returned as a frame. Oversized frames are consumed up to their
    /// newline before the error is returned, so the next call starts on a
    /// frame boundary.
    pub(crate) fn read_frame(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
        loop {
            let mut frame = Vec::new();
            let mut size = 0_usize;
            let terminated = loop {
                let available = match self.reader.fill_buf() {
                    Ok(available) => available,
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                    Err(source) => return Err(RelayError::Read { source }),
                };
                if available.is_empty() {
                    break false;
                }

                let newline = available.iter().position(|byte| *byte == b'\n');
                let line_bytes = newline.unwrap_or(available.len());
                let room = self.limit.saturating_sub(frame.len());
                frame.extend(available.iter().take(line_bytes.min(room)));
                size += line_bytes;

                let consumed = newline.map_or(line_bytes, |position| position + 1);
                self.reader.consume(consumed);
                if newline.is_some() {
                    break true;
                }
            };

            if size > self.limit {
                return Err(RelayError::FrameTooLarge {
                    size,
                    limit: self.limit,
                });
            }
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
            if frame.iter().all(u8::is_ascii_whitespace) {
                if terminated {
                    continue;
                }
                return Ok(None);
            }
            return Ok(Some(frame));
        }
    }

    pub(crate) fn into_inner(self) -> R {
        self.reader
    }
}
