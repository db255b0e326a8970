//! Newline-delimited JSON framing.
//!
//! JSON escapes control characters inside strings, so `\n` can only ever
//! appear as a frame terminator. A malformed frame is consumed up to its
//! terminator, which is what lets the reader resynchronize.

use super::protocol::Message;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

/// Upper bound for a single frame; anything longer cannot be resynchronized.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was truncated or not a valid message; the stream is still usable.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// The stream cannot be split into frames any more.
    #[error("unrecoverable stream: {0}")]
    Unrecoverable(String),
}

/// Serialize a message into one terminated frame.
pub fn encode(message: &Message) -> Vec<u8> {
    // Every `Value` variant maps onto plain JSON, so serialization cannot fail.
    let mut frame = serde_json::to_vec(message).unwrap_or_else(|_| b"{}".to_vec());
    frame.push(b'\n');
    frame
}

/// Decode exactly one frame (with or without its terminator).
pub fn decode(frame: &[u8]) -> Result<Message, FrameError> {
    let body = frame.strip_suffix(b"\n").unwrap_or(frame);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    serde_json::from_slice(body).map_err(|err| FrameError::Malformed(err.to_string()))
}

/// Write one frame and flush it so the peer sees it immediately.
pub fn write_frame<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    writer.write_all(&encode(message))?;
    writer.flush()
}

/// Splits a byte stream into frames.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    /// Read the next frame. `Ok(None)` means a clean end of stream.
    ///
    /// Blank lines are skipped. Bytes left over at EOF without a terminator are a
    /// truncated frame and come back as `Malformed`; the next call then reports EOF.
    pub fn read_frame(&mut self) -> Result<Option<Message>, FrameError> {
        loop {
            self.buf.clear();
            let limit = (MAX_FRAME_BYTES + 1) as u64;
            let read = (&mut self.inner)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .map_err(|err| FrameError::Unrecoverable(err.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            let terminated = self.buf.last() == Some(&b'\n');
            if !terminated && self.buf.len() > MAX_FRAME_BYTES {
                return Err(FrameError::Unrecoverable(format!(
                    "frame exceeds {MAX_FRAME_BYTES} bytes without a terminator"
                )));
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if !terminated {
                return Err(FrameError::Malformed(format!(
                    "truncated frame ({} bytes before end of stream)",
                    self.buf.len()
                )));
            }
            return decode(&self.buf).map(Some);
        }
    }
}
