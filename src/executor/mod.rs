//! Query engine
//!
//! In-memory filter, sort and limit over a lazy full-value scan.
//!
//! # Execution Flow (strict order)
//!
//! 1. Scan records in key order, one engine page at a time
//! 2. Filter each record as it is scanned
//! 3. Stop scanning once `limit` matches were collected
//! 4. Sort the collected records
//!
//! Because the limit applies before the sort, a limited sorted query is the
//! first k matches in key order, sorted, rather than a global top-k.

mod executor;
mod filters;
mod query;
mod result;
mod sorter;

pub use executor::QueryExecutor;
pub use filters::{FieldPredicate, FilterOp, PredicateFilter};
pub use query::Query;
pub use result::FindResult;
pub use sorter::{ResultSorter, SortDirection, SortSpec};
