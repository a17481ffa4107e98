//! Append-only log writer
//!
//! - One record per batch
//! - No in-place updates; latest record wins for a key
//! - `fsync` after every append unless sync is disabled

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::LogRecord;

/// Appends log records to the engine's log file.
pub struct LogWriter {
    log_path: PathBuf,
    file: File,
    current_offset: u64,
    sync_writes: bool,
}

impl LogWriter {
    /// Opens or creates the log file. The parent directory must exist.
    pub fn open(log_path: &Path, sync_writes: bool) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to open log: {}", log_path.display()),
                    e,
                )
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::write_failed("Failed to read log metadata", e))?
            .len();

        Ok(Self {
            log_path: log_path.to_path_buf(),
            file,
            current_offset,
            sync_writes,
        })
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Returns the current end-of-log offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends one record.
    ///
    /// Returns the byte offset where the record starts. The write is not
    /// acknowledged until the record is fully written (and synced).
    pub fn append(&mut self, record: &LogRecord) -> StorageResult<u64> {
        let serialized = record.serialize();
        let offset = self.current_offset;

        self.file.write_all(&serialized).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to append {} ops at offset {}", record.ops.len(), offset),
                e,
            )
        })?;

        if self.sync_writes {
            self.sync()?;
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// fsync the log file.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all().map_err(|e| {
            StorageError::write_failed(
                format!("fsync failed for {}", self.log_path.display()),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::engine::BatchOp;
    use crate::storage::reader::LogReader;

    #[test]
    fn test_append_tracks_offsets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depot.log");
        let mut writer = LogWriter::open(&path, true).unwrap();

        let record = LogRecord::new(vec![BatchOp::Delete { key: b"x".to_vec() }]);
        let first = writer.append(&record).unwrap();
        let second = writer.append(&record).unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, record.serialize().len() as u64);
        assert_eq!(writer.current_offset(), 2 * second);
    }

    #[test]
    fn test_reopen_appends_at_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depot.log");
        let record = LogRecord::new(vec![BatchOp::Put {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        }]);

        LogWriter::open(&path, false).unwrap().append(&record).unwrap();
        let mut writer = LogWriter::open(&path, false).unwrap();
        assert_eq!(writer.current_offset(), record.serialize().len() as u64);
        writer.append(&record).unwrap();
        writer.sync().unwrap();

        let count = LogReader::open(&path).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("depot.log");
        assert!(LogWriter::open(&path, true).is_err());
    }
}
