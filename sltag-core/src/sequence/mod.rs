use bio::alphabets::{Alphabet, dna};

use crate::types::SltagError;

pub mod io;

pub use io::*;

/// Converts a nucleotide character to its table index.
///
/// # Encoding
///
/// - A: 0
/// - C: 1
/// - G: 2
/// - T: 3
/// - Other: 4 (invalid marker)
///
/// # Examples
///
/// ```rust
/// use sltag_core::sequence::char_to_nuc;
///
/// assert_eq!(char_to_nuc(b'A'), 0);
/// assert_eq!(char_to_nuc(b'g'), 2);
/// assert_eq!(char_to_nuc(b'N'), 4);
/// ```
#[must_use]
pub const fn char_to_nuc(c: u8) -> u8 {
    match c.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 4,
    }
}

/// The strict four-letter alphabet the grammar parses.
#[must_use]
pub fn parse_alphabet() -> Alphabet {
    dna::alphabet()
}

/// Validates a sequence against {a,c,g,t} (any case) and returns it lowercased.
///
/// The whole sequence is checked; the first offending symbol is reported with
/// its 1-based position.
///
/// # Errors
///
/// Returns [`SltagError::InvalidSequence`] for an empty sequence or one
/// containing any other symbol (including `N` and IUPAC ambiguity codes).
///
/// # Examples
///
/// ```rust
/// use sltag_core::sequence::validate_sequence;
///
/// assert_eq!(validate_sequence(b"GtAg").unwrap(), b"gtag".to_vec());
/// assert!(validate_sequence(b"gtnag").is_err());
/// ```
pub fn validate_sequence(sequence: &[u8]) -> Result<Vec<u8>, SltagError> {
    if sequence.is_empty() {
        return Err(SltagError::InvalidSequence(
            "sequence is empty".to_string(),
        ));
    }

    let alphabet = parse_alphabet();
    if !alphabet.is_word(sequence) {
        let (position, symbol) = sequence
            .iter()
            .enumerate()
            .find(|(_, c)| !alphabet.is_word([**c]))
            .map(|(index, c)| (index + 1, *c as char))
            .unwrap_or((0, '?'));
        return Err(SltagError::InvalidSequence(format!(
            "illegal symbol {symbol:?} at position {position}; only a, c, g, t are accepted"
        )));
    }

    Ok(sequence.to_ascii_lowercase())
}

/// Text of `[start, end)`, empty when the range is empty.
#[must_use]
pub fn substring(sequence: &[u8], start: usize, end: usize) -> String {
    String::from_utf8_lossy(&sequence[start..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_nuc_mapping() {
        assert_eq!(char_to_nuc(b'a'), 0);
        assert_eq!(char_to_nuc(b'C'), 1);
        assert_eq!(char_to_nuc(b'g'), 2);
        assert_eq!(char_to_nuc(b'T'), 3);
        assert_eq!(char_to_nuc(b'U'), 4);
        assert_eq!(char_to_nuc(b'-'), 4);
    }

    #[test]
    fn test_validate_sequence_lowercases() {
        let result = validate_sequence(b"ACGTacgt").unwrap();
        assert_eq!(result, b"acgtacgt".to_vec());
    }

    #[test]
    fn test_validate_sequence_rejects_ambiguity_codes() {
        let result = validate_sequence(b"acgNt");
        match result {
            Err(SltagError::InvalidSequence(msg)) => {
                assert!(msg.contains("position 4"));
                assert!(msg.contains("'N'"));
            }
            _ => panic!("Expected InvalidSequence error"),
        }
    }

    #[test]
    fn test_validate_sequence_checks_every_symbol() {
        // Only the last symbol is bad
        assert!(validate_sequence(b"acgtacgtx").is_err());
    }

    #[test]
    fn test_validate_sequence_rejects_empty() {
        match validate_sequence(b"") {
            Err(SltagError::InvalidSequence(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected InvalidSequence error"),
        }
    }

    #[test]
    fn test_substring() {
        assert_eq!(substring(b"gtag", 1, 3), "ta");
        assert_eq!(substring(b"gtag", 2, 2), "");
    }
}
