//! On-disk engine: an append-only log plus an in-memory ordered index
//!
//! The index is rebuilt by replaying the log on open. Writers append under
//! a mutex and publish to the index while still holding it, so index order
//! always matches log order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use super::engine::{BatchOp, Engine, KeyRange, ScanItem};
use super::errors::{StorageError, StorageResult};
use super::memory::scan_map;
use super::reader::LogReader;
use super::record::LogRecord;
use super::writer::LogWriter;

/// File name of the log inside the store directory
pub const LOG_FILE_NAME: &str = "depot.log";

/// Durable engine storing every batch as one checksummed log record
pub struct LogEngine {
    dir: PathBuf,
    writer: Mutex<LogWriter>,
    index: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl LogEngine {
    /// Opens the store in `dir`, replaying any existing log.
    ///
    /// The directory must already exist. Corruption anywhere in the log
    /// fails the open with `DEPOT_DATA_CORRUPTION`.
    pub fn open(dir: &Path, sync_writes: bool) -> StorageResult<Self> {
        if !dir.is_dir() {
            return Err(StorageError::io_error(
                format!("Store directory does not exist: {}", dir.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing directory"),
            ));
        }

        let log_path = dir.join(LOG_FILE_NAME);
        let writer = LogWriter::open(&log_path, sync_writes)?;
        let index = Self::replay(&log_path)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            writer: Mutex::new(writer),
            index: RwLock::new(index),
        })
    }

    fn replay(log_path: &Path) -> StorageResult<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut index = BTreeMap::new();
        for record in LogReader::open(log_path)? {
            apply(&mut index, record?.ops);
        }
        Ok(index)
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn commit(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        let mut writer = self.writer.lock().map_err(|_| StorageError::poisoned("log writer"))?;
        let record = LogRecord::new(ops);
        writer.append(&record)?;

        let mut index = self.index.write().map_err(|_| StorageError::poisoned("log index"))?;
        apply(&mut index, record.ops);
        Ok(())
    }
}

fn apply(index: &mut BTreeMap<Vec<u8>, Vec<u8>>, ops: Vec<BatchOp>) {
    for op in ops {
        match op {
            BatchOp::Put { key, value } => {
                index.insert(key, value);
            }
            BatchOp::Delete { key } => {
                index.remove(&key);
            }
        }
    }
}

impl Engine for LogEngine {
    fn name(&self) -> &'static str {
        "log"
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let index = self.index.read().map_err(|_| StorageError::poisoned("log index"))?;
        Ok(index.get(key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.commit(vec![BatchOp::Put { key, value }])
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.commit(vec![BatchOp::Delete { key: key.to_vec() }])
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.commit(ops)
    }

    fn scan(
        &self,
        range: &KeyRange,
        after: Option<&[u8]>,
        limit: usize,
        with_values: bool,
    ) -> StorageResult<Vec<ScanItem>> {
        let index = self.index.read().map_err(|_| StorageError::poisoned("log index"))?;
        Ok(scan_map(&index, range, after, limit, with_values))
    }

    fn flush(&self) -> StorageResult<()> {
        self.writer
            .lock()
            .map_err(|_| StorageError::poisoned("log writer"))?
            .sync()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn all_keys(engine: &LogEngine) -> Vec<Vec<u8>> {
        engine
            .scan(&KeyRange::new(vec![0], vec![0xff]), None, usize::MAX, false)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let engine = LogEngine::open(dir.path(), true).unwrap();
            engine.put(vec![1], b"a".to_vec()).unwrap();
            engine.put(vec![2], b"b".to_vec()).unwrap();
            engine.put(vec![1], b"c".to_vec()).unwrap();
            engine.delete(&[2]).unwrap();
        }

        let engine = LogEngine::open(dir.path(), true).unwrap();
        assert_eq!(engine.get(&[1]).unwrap(), Some(b"c".to_vec()));
        assert_eq!(engine.get(&[2]).unwrap(), None);
        assert_eq!(all_keys(&engine), vec![vec![1]]);
    }

    #[test]
    fn test_batch_is_one_record() {
        let dir = TempDir::new().unwrap();
        let engine = LogEngine::open(dir.path(), false).unwrap();
        engine
            .write_batch(vec![
                BatchOp::Put {
                    key: vec![1],
                    value: vec![1],
                },
                BatchOp::Put {
                    key: vec![2],
                    value: vec![2],
                },
            ])
            .unwrap();
        engine.flush().unwrap();

        let records = LogReader::open(&dir.path().join(LOG_FILE_NAME))
            .unwrap()
            .count();
        assert_eq!(records, 1);
        assert_eq!(all_keys(&engine), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_corrupt_log_fails_open() {
        let dir = TempDir::new().unwrap();
        {
            let engine = LogEngine::open(dir.path(), true).unwrap();
            engine.put(vec![1], b"value".to_vec()).unwrap();
        }

        let path = dir.path().join(LOG_FILE_NAME);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        fs::write(&path, bytes).unwrap();

        let err = LogEngine::open(dir.path(), true).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_directory_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(LogEngine::open(&dir.path().join("nope"), true).is_err());
    }
}
