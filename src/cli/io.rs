//! JSON output for the CLI
//!
//! One JSON object per line on stdout; logs go to stderr.

use std::io::Write;

use serde::Serialize;

use super::errors::CliResult;

/// Write a serializable value as one line of JSON
pub fn write_json_to<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::{OperationResult, StoreError};

    #[test]
    fn test_writes_single_line() {
        let mut out = Vec::new();
        let envelope: OperationResult<()> =
            OperationResult::failure(StoreError::NotFound("a.pdf".into()));
        write_json_to(&mut out, &envelope).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["successful"], false);
        assert_eq!(parsed["error"]["kind"], "not_found");
    }
}
