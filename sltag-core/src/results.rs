use serde::Serialize;

use crate::tuple::DerivationTree;
use crate::types::Span;

/// Whether any derivation spans the whole input as one closed repeat.
///
/// Rejection is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseOutcome {
    Accepted,
    Rejected,
}

/// One accepting derivation, ranked by probability.
#[derive(Debug, Clone, Serialize)]
pub struct Derivation {
    /// 1-based rank; rank 1 is the most probable derivation.
    pub rank: usize,

    /// Coordinates `(0, p, p, N)` of the accepting tuple.
    pub span: Span,

    /// Terminus pair that was closed to form the accepting tuple.
    ///
    /// Equal to `span` when the accepting tuple was not produced by a
    /// substitution (two adjacent paired bases, for instance).
    pub termini: Span,

    /// Text of `[i, j)`.
    pub left: String,

    /// Text of `[k, l)`.
    pub right: String,

    pub probability: f64,

    /// Natural-log probability; stays finite when `probability` underflows.
    pub log_prob: f64,

    pub tree: DerivationTree,
}

/// A committed insertable sub-parse.
#[derive(Debug, Clone, Serialize)]
pub struct InsertableSummary {
    pub span: Span,
    pub sequence: String,
    pub log_prob: f64,
}

/// Work done by one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Stages completed (equal to the sequence length on success).
    pub stages: usize,

    /// Candidates generated before filtering, over all stages.
    pub candidates: usize,

    /// Candidates removed by the filters, over all stages.
    pub filtered: usize,

    /// Tuples moved into the arena.
    pub committed: usize,

    pub adjoinable: usize,
    pub nonadjoinable: usize,
    pub insertables: usize,

    pub elapsed_ms: u64,
}

/// Information about a parsed sequence.
///
/// # Examples
///
/// ```rust
/// # use sltag_core::results::SequenceInfo;
/// let info = SequenceInfo {
///     header: "ltr_candidate".to_string(),
///     description: None,
///     length: 4,
/// };
/// assert_eq!(info.length, 4);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SequenceInfo {
    /// Sequence identifier, from the FASTA header when there is one.
    pub header: String,

    /// Rest of the FASTA header line.
    pub description: Option<String>,

    /// Length of the sequence in bases.
    pub length: usize,
}

/// Results of parsing one sequence.
///
/// # Examples
///
/// ```rust
/// use sltag_core::{SltagAnalyzer, config::SltagConfig, oracle::PairSet};
/// use sltag_core::results::ParseOutcome;
///
/// let analyzer = SltagAnalyzer::new(SltagConfig::default());
/// let results = analyzer.analyze_sequence("gtag", None, &PairSet::new([(1, 4)]))?;
///
/// assert_eq!(results.outcome, ParseOutcome::Accepted);
/// let best = results.best().unwrap();
/// println!("{} {} p={:.3e}", best.span, best.left, best.probability);
/// # Ok::<(), sltag_core::types::SltagError>(())
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ParseResults {
    pub sequence_info: SequenceInfo,

    pub outcome: ParseOutcome,

    /// Accepting derivations, most probable first.
    pub derivations: Vec<Derivation>,

    /// Committed insertables spanning the whole sequence, ordered by
    /// coordinates.
    pub insertables: Vec<InsertableSummary>,

    pub stats: ParseStats,

    /// The validated (lowercase) sequence, kept for report rendering.
    #[serde(skip)]
    pub sequence: Vec<u8>,
}

impl ParseResults {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.outcome == ParseOutcome::Accepted
    }

    /// The most probable derivation.
    #[must_use]
    pub fn best(&self) -> Option<&Derivation> {
        self.derivations.first()
    }
}
