//! Gzip archive writer
//!
//! Archive layout: gzip over newline-delimited frames, one encoded record
//! per frame. No header, footer or checksum beyond gzip's own.

use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::codec::FrameWriter;

/// Counts bytes passed through to the inner writer.
///
/// Once poisoned, every write and flush fails and nothing more reaches the
/// inner writer.
pub struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
    poisoned: bool,
}

impl<W: Write> CountingWriter<W> {
    /// Wraps `inner` with a zero count
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            count: 0,
            poisoned: false,
        }
    }

    /// Refuses all further output
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    fn check(&self) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::new(io::ErrorKind::Other, "archive aborted"));
        }
        Ok(())
    }

    /// Bytes written so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unwraps the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}

/// Writes encoded records into a gzip-compressed frame stream
pub struct ArchiveWriter<W: Write> {
    frames: FrameWriter<GzEncoder<CountingWriter<W>>>,
}

/// Byte counts of a finished archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Frames written
    pub frames: u64,
    /// Frame bytes before compression, delimiters included
    pub uncompressed_bytes: u64,
    /// Bytes handed to the sink
    pub compressed_bytes: u64,
}

impl<W: Write> ArchiveWriter<W> {
    /// Starts an archive on `sink` at gzip `level` (0-9)
    pub fn new(sink: W, level: u32) -> Self {
        let encoder = GzEncoder::new(CountingWriter::new(sink), Compression::new(level));
        Self {
            frames: FrameWriter::new(encoder),
        }
    }

    /// Appends one encoded record.
    pub fn write_record(&mut self, encoded: &[u8]) -> io::Result<()> {
        self.frames.write_frame(encoded)
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames.frames_written()
    }

    /// Abandons the archive without writing the gzip trailer.
    ///
    /// The sink keeps whatever compressed bytes already reached it, which
    /// is never a complete gzip member, so a reader of a failed backup
    /// fails instead of seeing a shorter archive.
    pub fn abort(mut self) {
        self.frames.get_mut().get_mut().poison();
    }

    /// Writes the gzip trailer and returns the sink without flushing it.
    pub fn finish(self) -> io::Result<(W, ArchiveStats)> {
        let frames = self.frames.frames_written();
        let uncompressed_bytes = self.frames.bytes_written();
        let counting = self.frames.into_inner().finish()?;

        let stats = ArchiveStats {
            frames,
            uncompressed_bytes,
            compressed_bytes: counting.count(),
        };
        Ok((counting.into_inner(), stats))
    }
}
