use std::fs::File;
use std::path::Path;

use bio::io::fasta;

use crate::types::SltagError;

/// One FASTA record: identifier, optional description, raw sequence bytes
pub type FastaRecord = (String, Option<String>, Vec<u8>);

/// Reads every record of a FASTA file with rust-bio.
///
/// Sequences are returned as written; validation happens when a record is
/// handed to the grammar.
///
/// # Errors
///
/// Returns [`SltagError::IoError`] if the file cannot be opened and
/// [`SltagError::ParseError`] for malformed records.
pub fn read_fasta_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, SltagError> {
    let file = File::open(path.as_ref())?;
    let reader = fasta::Reader::new(file);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| SltagError::ParseError(e.to_string()))?;
        let id = record.id().to_string();
        let description = record.desc().map(String::from);
        let seq = record.seq().to_vec();
        sequences.push((id, description, seq));
    }

    Ok(sequences)
}
