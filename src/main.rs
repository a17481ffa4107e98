//! depotdb CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Failures are printed
//! to stdout as an error response and the process exits non-zero.

use depotdb::cli;

fn main() {
    if let Err(e) = cli::run() {
        if cli::write_error(e.code_str(), e.message()).is_err() {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }
}
