//! Sequential replay of archive entries into a store
//!
//! Records are written strictly in archive order. Each write returns before
//! the next frame is read, so a failure leaves exactly the records before it
//! in the store. Nothing is rolled back.

use std::io::Read;

use crate::error::DbResult;
use crate::storage::{Db, Storable};

use super::extractor::ArchiveReader;

/// Counters of one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records written to the store
    pub records_applied: u64,
    /// Archive frames read
    pub frames_read: u64,
    /// Store writes issued (puts or batches)
    pub writes: u64,
}

/// Replays an archive into one store
pub struct Restorer<'a, T> {
    db: &'a Db<T>,
    batch_size: usize,
    stats: ReplayStats,
}

impl<'a, T: Storable> Restorer<'a, T> {
    /// `batch_size` of 1 writes each record with `put`; larger sizes group
    /// records into `put_many` batches.
    pub fn new(db: &'a Db<T>, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
            stats: ReplayStats::default(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Replays every entry of `archive`.
    ///
    /// A decode error stops the replay before any further write; records
    /// still waiting in an unwritten batch are dropped.
    pub fn replay<R: Read>(&mut self, archive: &mut ArchiveReader<R>) -> DbResult<ReplayStats> {
        let mut pending: Vec<T> = Vec::with_capacity(self.batch_size);

        loop {
            let next = archive.next_entry::<T>();
            self.stats.frames_read = archive.frames_read();

            let entry = match next? {
                Some(entry) => entry,
                None => break,
            };

            if self.batch_size == 1 {
                self.db.put(&entry.value)?;
                self.stats.writes += 1;
                self.stats.records_applied += 1;
                continue;
            }

            pending.push(entry.value);
            if pending.len() == self.batch_size {
                self.flush(&mut pending)?;
            }
        }

        self.flush(&mut pending)?;
        Ok(self.stats)
    }

    fn flush(&mut self, pending: &mut Vec<T>) -> DbResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        self.db.put_many(pending)?;
        self.stats.writes += 1;
        self.stats.records_applied += pending.len() as u64;
        pending.clear();
        Ok(())
    }
}
