//! Sequential log reader with strict corruption detection
//!
//! Used to rebuild the in-memory index when a log engine opens.
//! Every record's checksum is verified; a truncated or corrupt record is
//! fatal and the log is never silently repaired.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{LogRecord, MIN_RECORD_SIZE};

/// Reads log records from the start of the file.
pub struct LogReader {
    log_path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl LogReader {
    /// Opens the log file for reading.
    pub fn open(log_path: &Path) -> StorageResult<Self> {
        let file = File::open(log_path).map_err(|e| {
            StorageError::read_failed(format!("Failed to open log: {}", log_path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read log metadata", e))?
            .len();

        Ok(Self {
            log_path: log_path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Returns the current read offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` if a record was read
    /// - `Ok(None)` at end of file
    /// - `Err(DEPOT_DATA_CORRUPTION)` on a bad checksum or truncated record
    pub fn read_next(&mut self) -> StorageResult<Option<LogRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated log: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if record_length > remaining {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Record length {} exceeds remaining file size {}",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = LogRecord::deserialize(&record_buf)
            .map_err(|e| StorageError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(record))
    }
}

impl Iterator for LogReader {
    type Item = StorageResult<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
