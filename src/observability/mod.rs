//! Observability for depotdb
//!
//! Structured JSON logging of store lifecycle and pipeline runs.
//!
//! ```ignore
//! use depotdb::observability::{Logger, ObservationScope};
//!
//! Logger::info("STORE_OPEN", &[("location", ":mem:")]);
//!
//! let scope = ObservationScope::new("BACKUP", &[]);
//! // ... do work ...
//! scope.complete(&[("records", "42")]);
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};
