use std::io::Write;

use crate::{results::ParseResults, types::SltagError};

/// Write results as a human-readable report with derivation trees
pub fn write_text_format<W: Write>(
    writer: &mut W,
    results: &ParseResults,
) -> Result<(), SltagError> {
    let info = &results.sequence_info;
    match &info.description {
        Some(desc) => writeln!(writer, "# {} {} (length {})", info.header, desc, info.length)?,
        None => writeln!(writer, "# {} (length {})", info.header, info.length)?,
    }

    let outcome = if results.is_accepted() {
        "accepted"
    } else {
        "rejected"
    };
    writeln!(
        writer,
        "# {outcome}: {} derivation(s), {} insertable(s), {} tuples over {} stages",
        results.derivations.len(),
        results.insertables.len(),
        results.stats.committed,
        results.stats.stages
    )?;

    for derivation in &results.derivations {
        writeln!(
            writer,
            "\n## derivation {} {} termini={} p={:.4e} log_p={:.4}",
            derivation.rank,
            derivation.span,
            derivation.termini,
            derivation.probability,
            derivation.log_prob
        )?;
        writeln!(writer, "left\t{}", derivation.left)?;
        writeln!(writer, "right\t{}", derivation.right)?;
        write!(writer, "{}", derivation.tree.render(&results.sequence))?;
    }

    if !results.insertables.is_empty() {
        writeln!(writer, "\n## insertables")?;
        for insertable in &results.insertables {
            writeln!(
                writer,
                "{}\t{}\tlog_p={:.4}",
                insertable.span, insertable.sequence, insertable.log_prob
            )?;
        }
    }
    Ok(())
}
