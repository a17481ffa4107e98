//! Restore pipeline
//!
//! Reloads a store from a gzip archive written by the backup pipeline.
//!
//! # Algorithm
//!
//! 1. Gunzip the source (concatenated members allowed)
//! 2. Split the stream into newline-delimited frames
//! 3. Decode each frame; the frame key must equal the record id
//! 4. Write the record and wait for the write to return
//! 5. Repeat until the archive ends
//!
//! # Important
//!
//! Restore does NOT clear the target store. Records are upserted, so
//! existing records with other ids survive and duplicate ids in the archive
//! resolve to the later frame.
//!
//! Restore is NOT atomic. On failure every record written before the
//! failing frame or write stays in the store.

mod extractor;
mod restorer;

pub use extractor::ArchiveReader;
pub use restorer::{ReplayStats, Restorer};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::error::{DbError, DbResult};
use crate::observability::ObservationScope;
use crate::storage::{Db, Storable};

/// Restore settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    /// Records per store write; 1 writes each record on its own (default 1)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Longest frame accepted (default 16 MiB)
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_batch_size() -> usize {
    1
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl RestoreOptions {
    /// Rejects zero sizes.
    pub fn validate(&self) -> DbResult<()> {
        if self.batch_size == 0 {
            return Err(DbError::InvalidArgument(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_frame_len == 0 {
            return Err(DbError::InvalidArgument(
                "max_frame_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Records written to the store
    pub records_applied: u64,
    /// Archive frames read
    pub frames_read: u64,
    /// Store writes issued
    pub writes: u64,
    /// When reading started
    pub started_at: DateTime<Utc>,
    /// When the last write returned
    pub finished_at: DateTime<Utc>,
}

/// Entry point for restores
pub struct RestoreManager;

impl RestoreManager {
    /// Replays the archive read from `source` into `db`.
    ///
    /// Returns only after the last write was acknowledged.
    ///
    /// # Errors
    ///
    /// - `Source` if reading the source fails
    /// - `Decode` for a malformed, truncated or oversized frame, or a cut or
    ///   corrupt gzip stream
    /// - `Engine` (or `BatchPartialFailure`) if a write fails
    pub fn restore_from_reader<T, R>(
        db: &Db<T>,
        source: R,
        options: &RestoreOptions,
    ) -> DbResult<RestoreSummary>
    where
        T: Storable,
        R: Read,
    {
        Self::observed(db, "reader", || Self::run(db, source, options))
    }

    /// Replays the archive stored at `path`.
    pub fn restore_from_path<T: Storable>(
        db: &Db<T>,
        path: &Path,
        options: &RestoreOptions,
    ) -> DbResult<RestoreSummary> {
        let target = path.display().to_string();
        Self::observed(db, &target, || {
            let file = File::open(path).map_err(DbError::Source)?;
            Self::run(db, file, options)
        })
    }

    fn observed<T, F>(db: &Db<T>, source: &str, f: F) -> DbResult<RestoreSummary>
    where
        F: FnOnce() -> DbResult<RestoreSummary>,
    {
        let location = db.location().to_string();
        let scope = ObservationScope::new(
            "RESTORE",
            &[("source", source), ("store", location.as_str())],
        );

        match f() {
            Ok(summary) => {
                let records = summary.records_applied.to_string();
                let frames = summary.frames_read.to_string();
                scope.complete(&[("frames", frames.as_str()), ("records", records.as_str())]);
                Ok(summary)
            }
            Err(e) => {
                scope.fail(e.code(), &e.to_string());
                Err(e)
            }
        }
    }

    fn run<T, R>(db: &Db<T>, source: R, options: &RestoreOptions) -> DbResult<RestoreSummary>
    where
        T: Storable,
        R: Read,
    {
        options.validate()?;
        let started_at = Utc::now();

        let mut archive = ArchiveReader::new(source, options.max_frame_len);
        let stats = Restorer::new(db, options.batch_size).replay(&mut archive)?;

        Ok(RestoreSummary {
            records_applied: stats.records_applied,
            frames_read: stats.frames_read,
            writes: stats.writes,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    use super::*;
    use crate::backup::{BackupManager, BackupOptions};
    use crate::storage::{DbOptions, Key, StoreLocation};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
    }

    impl Storable for Item {
        fn id(&self) -> Key {
            Key::Int(self.id)
        }
    }

    fn db_with(n: i64) -> Db<Item> {
        let db = Db::open(StoreLocation::Memory, DbOptions::default()).unwrap();
        for id in 1..=n {
            db.put(&Item {
                id,
                name: format!("item-{}", id),
            })
            .unwrap();
        }
        db
    }

    fn archive_of(db: &Db<Item>) -> Vec<u8> {
        let mut out = Vec::new();
        BackupManager::backup_to_writer(db, &mut out, &BackupOptions::default()).unwrap();
        out
    }

    #[test]
    fn test_restore_into_empty_store() {
        let bytes = archive_of(&db_with(4));
        let target = db_with(0);

        let summary =
            RestoreManager::restore_from_reader(&target, Cursor::new(bytes), &RestoreOptions::default())
                .unwrap();
        assert_eq!(summary.records_applied, 4);
        assert_eq!(summary.frames_read, 4);
        assert_eq!(target.count().unwrap(), 4);
        assert_eq!(target.get(3).unwrap().name, "item-3");
    }

    #[test]
    fn test_restore_keeps_unrelated_records() {
        let bytes = archive_of(&db_with(2));
        let target = db_with(0);
        target
            .put(&Item {
                id: 50,
                name: "local".into(),
            })
            .unwrap();

        RestoreManager::restore_from_reader(&target, Cursor::new(bytes), &RestoreOptions::default())
            .unwrap();
        assert_eq!(target.count().unwrap(), 3);
    }

    #[test]
    fn test_truncated_archive_is_decode_error() {
        let full = archive_of(&db_with(200));

        for cut in [full.len() / 2, full.len() - 12] {
            let target = db_with(0);
            let err = RestoreManager::restore_from_reader(
                &target,
                Cursor::new(full[..cut].to_vec()),
                &RestoreOptions::default(),
            )
            .unwrap_err();

            match err {
                DbError::Decode {
                    frame: Some(frame), ..
                } => assert_eq!(target.count().unwrap() as u64, frame - 1),
                other => panic!("cut at {}: unexpected error: {:?}", cut, other),
            }
        }
    }

    struct FailingSource;

    impl Read for FailingSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "source dropped"))
        }
    }

    #[test]
    fn test_source_failure() {
        let err = RestoreManager::restore_from_reader(
            &db_with(0),
            FailingSource,
            &RestoreOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "DEPOT_SOURCE_ERROR");
    }

    #[test]
    fn test_restore_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depot.gz");
        BackupManager::backup_to_path(&db_with(3), &path, &BackupOptions::default()).unwrap();

        let target = db_with(0);
        let opts = RestoreOptions {
            batch_size: 2,
            ..RestoreOptions::default()
        };
        let summary = RestoreManager::restore_from_path(&target, &path, &opts).unwrap();
        assert_eq!(summary.records_applied, 3);
        assert_eq!(summary.writes, 2);

        let missing = RestoreManager::restore_from_path(&target, &dir.path().join("nope.gz"), &opts);
        assert!(matches!(missing, Err(DbError::Source(_))));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let opts = RestoreOptions {
            batch_size: 0,
            ..RestoreOptions::default()
        };
        let err = RestoreManager::restore_from_reader(&db_with(0), Cursor::new(Vec::new()), &opts)
            .unwrap_err();
        assert_eq!(err.code(), "DEPOT_INVALID_ARGUMENT");
    }
}
