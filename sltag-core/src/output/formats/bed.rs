use std::io::Write;

use bio::bio_types::strand::Strand;

use crate::{results::ParseResults, types::SltagError};

/// Write results in BED6: the left and right terminus of the repeat closed by
/// every derivation
pub fn write_bed_format<W: Write>(
    writer: &mut W,
    results: &ParseResults,
) -> Result<(), SltagError> {
    let header = &results.sequence_info.header;
    // Only direct repeats are parsed
    let strand = strand_char(Strand::Forward);

    for derivation in &results.derivations {
        let termini = derivation.termini;
        writeln!(
            writer,
            "{header}\t{}\t{}\tderivation_{}_left\t0\t{strand}",
            termini.i, termini.j, derivation.rank
        )?;
        if termini.k < termini.l {
            writeln!(
                writer,
                "{header}\t{}\t{}\tderivation_{}_right\t0\t{strand}",
                termini.k, termini.l, derivation.rank
            )?;
        }
    }
    Ok(())
}

const fn strand_char(strand: Strand) -> char {
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::Unknown => '.',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SltagAnalyzer;
    use crate::oracle::PairSet;
    use crate::output::test_support::{gtag_results, rejected_results};
    use std::io::Cursor;

    #[test]
    fn test_write_bed_format_accepted() {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        write_bed_format(&mut cursor, &gtag_results()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "test_seq\t0\t1\tderivation_1_left\t0\t+\n\
             test_seq\t3\t4\tderivation_1_right\t0\t+\n"
        );
    }

    #[test]
    fn test_write_bed_format_rejected_is_empty() {
        let mut buffer = Vec::new();
        write_bed_format(&mut buffer, &rejected_results()).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_write_bed_format_base_pair_termini() {
        let results = SltagAnalyzer::default()
            .analyze_sequence("aa", Some("pair".to_string()), &PairSet::new([(1, 2)]))
            .unwrap();
        let mut buffer = Vec::new();
        write_bed_format(&mut buffer, &results).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "pair\t0\t1\tderivation_1_left\t0\t+\n\
             pair\t1\t2\tderivation_1_right\t0\t+\n"
        );
    }

    #[test]
    fn test_strand_char() {
        assert_eq!(strand_char(Strand::Forward), '+');
        assert_eq!(strand_char(Strand::Reverse), '-');
    }
}
