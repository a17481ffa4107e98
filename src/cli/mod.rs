//! CLI module for depotdb
//!
//! Provides command-line access to one store:
//! - count, get, put, del: record operations
//! - find: filtered, sorted, limited queries
//! - backup, restore: gzip archive pipelines

mod args;
mod commands;
mod document;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command, Config};
pub use document::{parse_id, Document};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
