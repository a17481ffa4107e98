//! Backup pipeline
//!
//! Streams a whole store into a gzip archive of newline-delimited encoded
//! records.
//!
//! # Algorithm
//!
//! 1. Pull one record from a lazy value scan
//! 2. Encode it; an unencodable record aborts the whole backup
//! 3. Append it as a frame to the gzip stream
//! 4. Repeat until the scan is exhausted
//! 5. Write the gzip trailer and flush the sink
//!
//! Archive order equals scan order. Writes block on the sink, so the scan
//! never runs ahead of what the sink accepted by more than one page.
//!
//! A failed backup never writes the gzip trailer. Bytes already handed to
//! the sink form an incomplete gzip stream that restore rejects.
//!
//! # Archive Format
//!
//! ```text
//! gzip(
//!   {"key":1,"value":{...}}\n
//!   {"key":2,"value":{...}}\n
//!   ...
//! )
//! ```

mod archive;
mod state;

pub use archive::{ArchiveStats, ArchiveWriter, CountingWriter};
pub use state::{BackupState, BackupStateMachine};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{DbError, DbResult};
use crate::observability::ObservationScope;
use crate::storage::{Db, Storable};

/// Backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOptions {
    /// gzip level 0-9 (default 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

fn default_compression_level() -> u32 {
    6
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

impl BackupOptions {
    /// Rejects levels gzip does not define.
    pub fn validate(&self) -> DbResult<()> {
        if self.compression_level > 9 {
            return Err(DbError::InvalidArgument(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// Outcome of a completed backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    /// Records written to the archive
    pub records_written: u64,
    /// Frame bytes before compression
    pub uncompressed_bytes: u64,
    /// Archive bytes written to the sink
    pub compressed_bytes: u64,
    /// When the scan started
    pub started_at: DateTime<Utc>,
    /// When the sink was flushed
    pub finished_at: DateTime<Utc>,
}

impl BackupSummary {
    /// Wall-clock duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Entry point for backups
pub struct BackupManager;

impl BackupManager {
    /// Writes an archive of every record in `db` to `sink`.
    ///
    /// Succeeds only after the gzip trailer is written and the sink is
    /// flushed.
    ///
    /// # Errors
    ///
    /// - `Engine` or `Decode` if the scan fails
    /// - `Encode` if any record cannot be encoded; nothing after it is written
    /// - `Sink` if writing or flushing the sink fails
    pub fn backup_to_writer<T, W>(db: &Db<T>, sink: W, options: &BackupOptions) -> DbResult<BackupSummary>
    where
        T: Storable,
        W: Write,
    {
        Self::observed(db, "writer", |db| Self::run(db, sink, options)).map(|(_, summary)| summary)
    }

    /// Writes an archive to a new file at `path` (conventionally `*.gz`).
    ///
    /// The file is fsynced on success. On failure the partial file is
    /// removed; an existing file at `path` is overwritten either way.
    pub fn backup_to_path<T: Storable>(
        db: &Db<T>,
        path: &Path,
        options: &BackupOptions,
    ) -> DbResult<BackupSummary> {
        let target = path.display().to_string();
        Self::observed(db, &target, |db| {
            options.validate()?;
            let file = File::create(path).map_err(DbError::Sink)?;

            let result = Self::run(db, BufWriter::new(file), options).and_then(|(writer, summary)| {
                let file = writer.into_inner().map_err(|e| DbError::Sink(e.into_error()))?;
                file.sync_all().map_err(DbError::Sink)?;
                Ok(((), summary))
            });

            if result.is_err() {
                let _ = fs::remove_file(path);
            }
            result
        })
        .map(|(_, summary)| summary)
    }

    fn observed<T, R, F>(db: &Db<T>, target: &str, f: F) -> DbResult<(R, BackupSummary)>
    where
        F: FnOnce(&Db<T>) -> DbResult<(R, BackupSummary)>,
    {
        let location = db.location().to_string();
        let scope = ObservationScope::new(
            "BACKUP",
            &[("store", location.as_str()), ("target", target)],
        );

        match f(db) {
            Ok((out, summary)) => {
                let records = summary.records_written.to_string();
                let bytes = summary.compressed_bytes.to_string();
                scope.complete(&[("records", records.as_str()), ("compressed_bytes", bytes.as_str())]);
                Ok((out, summary))
            }
            Err(e) => {
                scope.fail(e.code(), &e.to_string());
                Err(e)
            }
        }
    }

    fn run<T, W>(db: &Db<T>, sink: W, options: &BackupOptions) -> DbResult<(W, BackupSummary)>
    where
        T: Storable,
        W: Write,
    {
        options.validate()?;

        let mut machine = BackupStateMachine::new();
        let result = Self::pipeline(db, sink, options, &mut machine);
        if result.is_err() {
            machine.fail();
        }
        result
    }

    /// Streams every record into `archive` and ends in `Compressing`.
    fn write_records<T, W>(
        db: &Db<T>,
        archive: &mut ArchiveWriter<W>,
        machine: &mut BackupStateMachine,
    ) -> DbResult<()>
    where
        T: Storable,
        W: Write,
    {
        machine.transition(BackupState::Scanning)?;
        for record in db.scan_values() {
            let record = record?;

            machine.transition(BackupState::Encoding)?;
            let encoded = codec::encode(&record).map_err(|source| DbError::Encode {
                id: record.id(),
                source,
            })?;

            machine.transition(BackupState::Framing)?;
            archive.write_record(&encoded).map_err(DbError::Sink)?;

            machine.transition(BackupState::Scanning)?;
        }
        machine.transition(BackupState::Compressing)
    }

    fn pipeline<T, W>(
        db: &Db<T>,
        sink: W,
        options: &BackupOptions,
        machine: &mut BackupStateMachine,
    ) -> DbResult<(W, BackupSummary)>
    where
        T: Storable,
        W: Write,
    {
        let started_at = Utc::now();
        let mut archive = ArchiveWriter::new(sink, options.compression_level);

        if let Err(e) = Self::write_records(db, &mut archive, machine) {
            archive.abort();
            return Err(e);
        }

        let (mut sink, stats) = archive.finish().map_err(DbError::Sink)?;

        machine.transition(BackupState::Flushing)?;
        sink.flush().map_err(DbError::Sink)?;

        machine.transition(BackupState::Done)?;

        Ok((
            sink,
            BackupSummary {
                records_written: stats.frames,
                uncompressed_bytes: stats.uncompressed_bytes,
                compressed_bytes: stats.compressed_bytes,
                started_at,
                finished_at: Utc::now(),
            },
        ))
    }
}
