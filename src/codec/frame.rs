//! Newline-delimited frames
//!
//! ```text
//! <payload>\n<payload>\n...<payload>\n
//! ```
//!
//! Every frame, including the last, ends with `\n`. A trailing run of bytes
//! without the delimiter is a truncated frame, not a short final record.

use std::io::{self, BufRead, Write};

use super::errors::{CodecError, CodecResult};

/// Frame delimiter
pub const DELIMITER: u8 = b'\n';

/// Default upper bound for a single frame payload (16 MiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Appends delimited frames to a writer.
pub struct FrameWriter<W: Write> {
    inner: W,
    frames_written: u64,
    bytes_written: u64,
}

impl<W: Write> FrameWriter<W> {
    /// Wraps a writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Writes one payload followed by the delimiter.
    ///
    /// The payload must not contain the delimiter.
    pub fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        if payload.contains(&DELIMITER) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame payload contains the delimiter",
            ));
        }
        self.inner.write_all(payload)?;
        self.inner.write_all(&[DELIMITER])?;
        self.frames_written += 1;
        self.bytes_written += payload.len() as u64 + 1;
        Ok(())
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Number of bytes written so far, delimiters included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns a mutable reference to the wrapped writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwraps the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Splits a byte stream into frames.
///
/// Yields `Ok(payload)` per frame and stops after the first error.
/// Memory use is bounded by `max_frame_len` plus the reader's buffer.
pub struct FrameReader<R: BufRead> {
    inner: R,
    max_frame_len: usize,
    frames_read: u64,
    done: bool,
}

impl<R: BufRead> FrameReader<R> {
    /// Wraps a buffered reader with the default frame limit
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_len(inner, DEFAULT_MAX_FRAME_LEN)
    }

    /// Wraps a buffered reader with an explicit frame limit
    pub fn with_max_frame_len(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            max_frame_len,
            frames_read: 0,
            done: false,
        }
    }

    /// Number of complete frames returned so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reads the next frame; `Ok(None)` at a clean end of input.
    pub fn read_frame(&mut self) -> CodecResult<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let mut payload = Vec::new();
        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Err(CodecError::Io(e));
                }
            };

            if available.is_empty() {
                self.done = true;
                if payload.is_empty() {
                    return Ok(None);
                }
                return Err(CodecError::Truncated(payload.len()));
            }

            let (chunk, found) = match available.iter().position(|b| *b == DELIMITER) {
                Some(pos) => (&available[..pos], true),
                None => (available, false),
            };

            if payload.len() + chunk.len() > self.max_frame_len {
                self.done = true;
                return Err(CodecError::TooLong {
                    max: self.max_frame_len,
                });
            }

            payload.extend_from_slice(chunk);
            let consumed = chunk.len() + usize::from(found);
            self.inner.consume(consumed);

            if found {
                if payload.is_empty() {
                    self.done = true;
                    return Err(CodecError::Empty);
                }
                self.frames_read += 1;
                return Ok(Some(payload));
            }
        }
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = CodecResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}
