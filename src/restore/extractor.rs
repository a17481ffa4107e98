//! Archive reader: gunzip, split frames, decode entries
//!
//! Concatenated gzip members are read as one stream.
//!
//! Errors returned by the caller's reader are tagged on the way in, so a
//! failing source stays a `Source` error while a cut or garbled gzip
//! stream is reported as `Decode` for the frame being read.

use std::error::Error as StdError;
use std::fmt;
use std::io::{self, BufReader, Read};

use flate2::bufread::MultiGzDecoder;

use crate::codec::{self, CodecError, Entry, FrameReader};
use crate::error::{DbError, DbResult};
use crate::storage::Storable;

/// An I/O error raised by the archive source itself
#[derive(Debug)]
struct SourceFailure(io::Error);

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for SourceFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

/// Tags every error of the wrapped reader as a [`SourceFailure`]
struct TaggedSource<R> {
    inner: R,
}

impl<R: Read> Read for TaggedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner
            .read(buf)
            .map_err(|e| io::Error::new(e.kind(), SourceFailure(e)))
    }
}

/// Pulls decoded entries out of a gzip archive, one frame at a time
pub struct ArchiveReader<R: Read> {
    frames: FrameReader<BufReader<MultiGzDecoder<BufReader<TaggedSource<R>>>>>,
}

impl<R: Read> ArchiveReader<R> {
    /// Wraps a compressed source
    pub fn new(source: R, max_frame_len: usize) -> Self {
        let decoder = MultiGzDecoder::new(BufReader::new(TaggedSource { inner: source }));
        Self {
            frames: FrameReader::with_max_frame_len(BufReader::new(decoder), max_frame_len),
        }
    }

    /// Frames successfully read so far
    pub fn frames_read(&self) -> u64 {
        self.frames.frames_read()
    }

    /// Reads and decodes the next entry; `Ok(None)` at a clean end.
    ///
    /// Failures of the source reader are `Source` errors. Everything else,
    /// a truncated or corrupt gzip stream included, is a `Decode` error
    /// naming the 1-based frame number.
    pub fn next_entry<T: Storable>(&mut self) -> DbResult<Option<Entry<T>>> {
        let payload = match self.frames.read_frame() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(e) => return Err(classify(e, self.frames.frames_read() + 1)),
        };

        codec::decode(&payload)
            .map(Some)
            .map_err(|e| classify(e, self.frames.frames_read()))
    }
}

fn classify(err: CodecError, frame: u64) -> DbError {
    let source = match err {
        CodecError::Io(e) => match untag(e) {
            Ok(source_err) => return DbError::Source(source_err),
            Err(gzip_err) => CodecError::Malformed(format!("gzip stream: {}", gzip_err)),
        },
        other => other,
    };
    DbError::Decode {
        frame: Some(frame),
        source,
    }
}

/// Recovers the source's own error, or hands back a decompressor error.
fn untag(err: io::Error) -> Result<io::Error, io::Error> {
    let tagged = err
        .get_ref()
        .map_or(false, |inner| inner.is::<SourceFailure>());
    if !tagged {
        return Err(err);
    }

    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<SourceFailure>()) {
        Some(Ok(failure)) => Ok(failure.0),
        Some(Err(other)) => Ok(io::Error::new(kind, other)),
        None => Ok(io::Error::from(kind)),
    }
}
