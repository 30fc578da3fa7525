//! File and stdout handling for the CLI
//!
//! - Input: document text, operations as JSON Lines
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::ot::Operation;

/// Read a UTF-8 document
pub fn read_document(path: &Path) -> CliResult<String> {
    fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))
}

/// Read operations from a JSON Lines file. Blank lines are skipped.
pub fn read_operations(path: &Path) -> CliResult<Vec<Operation>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_operations(&content)
}

/// Parse JSON Lines text into operations
pub fn parse_operations(content: &str) -> CliResult<Vec<Operation>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| CliError::invalid_input(format!("line {}: {}", i + 1, e)))
        })
        .collect()
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write one serializable value as a JSON line
pub fn write_line<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operations_skips_blank_lines() {
        let text = concat!(
            r#"{"id":"a","timestamp":"2024-01-01T00:00:00Z","position":{"offset":0},"type":"TEXT_DELETE","length":2}"#,
            "\n\n",
            r#"{"id":"b","timestamp":"2024-01-01T00:00:01Z","position":{"offset":1},"type":"CURSOR_MOVE","newPosition":{"offset":4}}"#,
            "\n"
        );
        let ops = parse_operations(text).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].id, "b");
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_operations("\n{not json}\n").unwrap_err();
        assert!(err.message().starts_with("line 2:"));
    }
}
