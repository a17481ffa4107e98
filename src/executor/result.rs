//! Result types for query execution

/// Records returned by a query plus scan statistics
#[derive(Debug, Clone, PartialEq)]
pub struct FindResult<T> {
    /// Matching records, sorted if the query had a comparator
    pub records: Vec<T>,
    /// Records pulled from the scan, matching or not
    pub scanned_count: usize,
    /// Engine page reads performed
    pub pages_read: u64,
    /// Whether the scan stopped early because the limit was reached
    pub limit_reached: bool,
}

impl<T> FindResult<T> {
    /// Creates an empty result
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            scanned_count: 0,
            pages_read: 0,
            limit_reached: false,
        }
    }

    /// Returns true if no records matched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of results
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns an iterator over the records
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    /// Consumes the result, returning the records
    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}
