use std::io::Write;

use crate::{results::ParseResults, types::SltagError};

/// Write results as pretty-printed JSON, one document per sequence
pub fn write_json_format<W: Write>(
    writer: &mut W,
    results: &ParseResults,
) -> Result<(), SltagError> {
    serde_json::to_writer_pretty(&mut *writer, results)
        .map_err(|e| SltagError::ParseError(format!("json: {e}")))?;
    writeln!(writer)?;
    Ok(())
}
