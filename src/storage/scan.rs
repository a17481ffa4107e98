//! Lazy scan cursors over a store namespace
//!
//! A cursor pulls one page of at most `scan_batch_size` entries per engine
//! read and holds no engine lock between pages. The next page starts
//! strictly after the last key handed out, so a cursor never yields a key
//! twice and always terminates, even while other threads write:
//!
//! - writes to keys after the cursor position are observed
//! - writes behind the cursor position are not
//!
//! Any error ends the cursor; `next` returns `None` afterwards.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::engine::{Engine, KeyRange, ScanItem};
use super::key::Key;
use super::storable::Storable;
use crate::codec::{self, CodecError};
use crate::error::{DbError, DbResult};

/// Byte-level cursor shared by the typed scans
pub(crate) struct RawCursor {
    engine: Arc<dyn Engine>,
    open: Arc<AtomicBool>,
    range: KeyRange,
    prefix_len: usize,
    with_values: bool,
    batch_size: usize,
    last_key: Option<Vec<u8>>,
    page: VecDeque<ScanItem>,
    exhausted: bool,
    done: bool,
    pages_read: u64,
    yielded: u64,
}

impl RawCursor {
    pub(crate) fn new(
        engine: Arc<dyn Engine>,
        open: Arc<AtomicBool>,
        range: KeyRange,
        prefix_len: usize,
        with_values: bool,
        batch_size: usize,
    ) -> Self {
        Self {
            engine,
            open,
            range,
            prefix_len,
            with_values,
            batch_size: batch_size.max(1),
            last_key: None,
            page: VecDeque::new(),
            exhausted: false,
            done: false,
            pages_read: 0,
            yielded: 0,
        }
    }

    fn fill(&mut self) -> DbResult<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(DbError::Closed);
        }

        let page = self.engine.scan(
            &self.range,
            self.last_key.as_deref(),
            self.batch_size,
            self.with_values,
        )?;
        self.pages_read += 1;

        if page.len() < self.batch_size {
            self.exhausted = true;
        }
        self.page = page.into();
        Ok(())
    }

    fn next_item(&mut self) -> Option<DbResult<ScanItem>> {
        if self.done {
            return None;
        }

        if self.page.is_empty() {
            if self.exhausted {
                self.done = true;
                return None;
            }
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }

        match self.page.pop_front() {
            Some(item) => {
                self.last_key = Some(item.0.clone());
                self.yielded += 1;
                Some(Ok(item))
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    fn decode_key(&self, encoded: &[u8]) -> DbResult<Key> {
        Key::decode(&encoded[self.prefix_len.min(encoded.len())..])
            .map_err(|e| DbError::stored_value(CodecError::Malformed(e)))
    }
}

fn decode_stored<T: Storable>(value: Option<Vec<u8>>) -> DbResult<T> {
    let bytes = value.ok_or_else(|| {
        DbError::stored_value(CodecError::Malformed("scan entry has no value".to_string()))
    })?;
    codec::decode_value(&bytes).map_err(DbError::stored_value)
}

macro_rules! cursor_stats {
    ($name:ident) => {
        impl<T> $name<T> {
            /// Engine page reads performed so far
            pub fn pages_read(&self) -> u64 {
                self.raw.pages_read
            }

            /// Entries handed out so far
            pub fn yielded(&self) -> u64 {
                self.raw.yielded
            }
        }
    };
}

/// Lazy cursor over the records of a store, in key order
pub struct ScanValues<T> {
    raw: RawCursor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ScanValues<T> {
    pub(crate) fn new(raw: RawCursor) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

cursor_stats!(ScanValues);

impl<T: Storable> Iterator for ScanValues<T> {
    type Item = DbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.raw.next_item()? {
            Ok((_, value)) => decode_stored(value),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.raw.done = true;
        }
        Some(result)
    }
}

/// Lazy cursor over `(key, record)` pairs, in key order
pub struct ScanEntries<T> {
    raw: RawCursor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ScanEntries<T> {
    pub(crate) fn new(raw: RawCursor) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

cursor_stats!(ScanEntries);

impl<T: Storable> Iterator for ScanEntries<T> {
    type Item = DbResult<(Key, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.raw.next_item()? {
            Ok((key, value)) => self
                .raw
                .decode_key(&key)
                .and_then(|k| decode_stored(value).map(|v| (k, v))),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.raw.done = true;
        }
        Some(result)
    }
}

/// Lazy key-only cursor, in key order
pub struct ScanKeys {
    raw: RawCursor,
}

impl ScanKeys {
    pub(crate) fn new(raw: RawCursor) -> Self {
        Self { raw }
    }

    /// Engine page reads performed so far
    pub fn pages_read(&self) -> u64 {
        self.raw.pages_read
    }
}

impl Iterator for ScanKeys {
    type Item = DbResult<Key>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self
            .raw
            .next_item()?
            .and_then(|(key, _)| self.raw.decode_key(&key));
        if result.is_err() {
            self.raw.done = true;
        }
        Some(result)
    }
}
