use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use super::{AlignmentBlocks, BlockPair};
use crate::types::SltagError;

// =============================================================================
// BLAST tabular (-outfmt 6) columns
// =============================================================================

const QSTART: usize = 6;
const QEND: usize = 7;
const SSTART: usize = 8;
const SEND: usize = 9;
const MIN_COLUMNS: usize = 10;

/// Loads a self-comparison in BLAST tabular format.
///
/// # Errors
///
/// Returns [`SltagError::IoError`] if the file cannot be read and
/// [`SltagError::ParseError`] for a malformed line.
pub fn read_self_alignment<P: AsRef<Path>>(path: P) -> Result<AlignmentBlocks, SltagError> {
    let file = File::open(path.as_ref())?;
    parse_self_alignment(BufReader::new(file))
}

/// Parses `-outfmt 6` lines into aligned block pairs.
///
/// Comment (`#`) and blank lines are skipped, as are the trivial self hit
/// and minus-strand hits (`sstart > send`). The two mirrored HSPs a
/// self-comparison reports for every repeat collapse to one block pair.
///
/// # Errors
///
/// Returns [`SltagError::ParseError`] naming the line for too few columns or
/// a non-numeric coordinate.
pub fn parse_self_alignment<R: BufRead>(reader: R) -> Result<AlignmentBlocks, SltagError> {
    let mut blocks = Vec::new();
    let mut skipped_minus = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_number = index + 1;

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(SltagError::ParseError(format!(
                "alignment line {line_number}: expected at least {MIN_COLUMNS} tab-separated columns, found {}",
                fields.len()
            )));
        }
        let coordinate = |column: usize| {
            fields[column].trim().parse::<usize>().map_err(|e| {
                SltagError::ParseError(format!(
                    "alignment line {line_number}, column {}: {e}",
                    column + 1
                ))
            })
        };
        let (qstart, qend) = (coordinate(QSTART)?, coordinate(QEND)?);
        let (sstart, send) = (coordinate(SSTART)?, coordinate(SEND)?);

        if qstart == sstart && qend == send {
            continue;
        }
        // TODO: pair inverted repeats once the grammar models reverse-complement termini
        if sstart > send {
            skipped_minus += 1;
            continue;
        }
        blocks.push(BlockPair::new((qstart, qend), (sstart, send)));
    }

    let blocks = AlignmentBlocks::new(blocks);
    debug!(
        block_pairs = blocks.len(),
        skipped_minus, "loaded self-alignment"
    );
    Ok(blocks)
}
