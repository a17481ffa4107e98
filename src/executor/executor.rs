//! Query executor
//!
//! Execution flow (strict order):
//! 1. Pull records from a lazy value scan, in key order
//! 2. Apply the filter to each record
//! 3. Stop pulling once `limit` records matched
//! 4. Sort the collected records (stable)
//!
//! Any scan or decode error aborts the query; partial results are dropped.

use crate::error::DbResult;
use crate::storage::{Db, Storable};

use super::query::Query;
use super::result::FindResult;

/// Runs queries against one store
pub struct QueryExecutor<'a, T> {
    db: &'a Db<T>,
}

impl<'a, T: Storable> QueryExecutor<'a, T> {
    /// Creates an executor over `db`
    pub fn new(db: &'a Db<T>) -> Self {
        Self { db }
    }

    /// Executes a query and returns the matching records.
    pub fn find(&self, query: Query<'_, T>) -> DbResult<Vec<T>> {
        self.find_with_stats(query).map(FindResult::into_records)
    }

    /// Executes a query and returns records together with scan statistics.
    pub fn find_with_stats(&self, query: Query<'_, T>) -> DbResult<FindResult<T>> {
        let Query {
            filter,
            sort,
            limit,
        } = query;

        if limit == Some(0) {
            return Ok(FindResult {
                limit_reached: true,
                ..FindResult::empty()
            });
        }

        let mut records = Vec::new();
        let mut scanned_count = 0;
        let mut limit_reached = false;

        let mut scan = self.db.scan_values();
        for record in scan.by_ref() {
            let record = record?;
            scanned_count += 1;

            if let Some(filter) = &filter {
                if !filter(&record) {
                    continue;
                }
            }

            records.push(record);
            if Some(records.len()) == limit {
                limit_reached = true;
                break;
            }
        }

        if let Some(cmp) = &sort {
            records.sort_by(|a, b| cmp(a, b));
        }

        Ok(FindResult {
            records,
            scanned_count,
            pages_read: scan.pages_read(),
            limit_reached,
        })
    }
}
