//! JSON I/O handling for CLI
//!
//! - Input: one JSON document per line on stdin
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one JSON value from the first line of `input`
pub fn read_request<R: BufRead>(input: &mut R) -> CliResult<Value> {
    let mut line = String::new();
    input.read_line(&mut line)?;

    if line.trim().is_empty() {
        return Err(CliError::invalid_input("Empty input"));
    }

    let value: Value = serde_json::from_str(&line)?;
    Ok(value)
}

/// Write a success response to `out`
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
