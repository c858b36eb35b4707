use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::SltagConfig;
use crate::constants::DEFAULT_HEADER;
use crate::index::{InsertablesIndex, StagePool, StagedId};
use crate::oracle::SelfAlignmentOracle;
use crate::results::{
    Derivation, InsertableSummary, ParseOutcome, ParseResults, ParseStats, SequenceInfo,
};
use crate::sequence::{read_fasta_sequences, substring, validate_sequence};
use crate::trees::{StageContext, StagedTree, TreeB1};
use crate::tuple::{DerivationTree, Provenance, TupleArena, TupleId};
use crate::types::SltagError;

/// Marker trait for grammar validation state.
///
/// Used in the type-state pattern so that only a validated sequence and
/// configuration can be parsed.
pub trait GrammarState {}

/// Marker type for a grammar whose input has not been checked yet.
#[derive(Debug, Clone)]
pub struct Unvalidated;

/// Marker type for a grammar ready to parse.
#[derive(Debug, Clone)]
pub struct Validated;

impl GrammarState for Unvalidated {}
impl GrammarState for Validated {}

/// Staged chart parser over one sequence.
///
/// # Type Parameters
///
/// * `S` - Validation state, either [`Unvalidated`] or [`Validated`]
///
/// # Examples
///
/// ```rust
/// use sltag_core::engine::Grammar;
/// use sltag_core::config::SltagConfig;
/// use sltag_core::oracle::PairSet;
///
/// let oracle = PairSet::new([(1, 4)]);
/// let grammar = Grammar::new(b"GTAG", &oracle, SltagConfig::default()).validate()?;
/// let results = grammar.parse()?;
/// assert!(results.is_accepted());
/// # Ok::<(), sltag_core::types::SltagError>(())
/// ```
pub struct Grammar<'a, S: GrammarState> {
    sequence: Vec<u8>,
    header: String,
    description: Option<String>,
    oracle: &'a dyn SelfAlignmentOracle,
    config: SltagConfig,
    cancel: Option<Arc<AtomicBool>>,
    _state: PhantomData<S>,
}

pub type UnvalidatedGrammar<'a> = Grammar<'a, Unvalidated>;
pub type ValidatedGrammar<'a> = Grammar<'a, Validated>;

impl<'a> Grammar<'a, Unvalidated> {
    pub fn new(
        sequence: impl AsRef<[u8]>,
        oracle: &'a dyn SelfAlignmentOracle,
        config: SltagConfig,
    ) -> Self {
        Self {
            sequence: sequence.as_ref().to_vec(),
            header: DEFAULT_HEADER.to_string(),
            description: None,
            oracle,
            config,
            cancel: None,
            _state: PhantomData,
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>, description: Option<String>) -> Self {
        self.header = header.into();
        self.description = description;
        self
    }

    /// Raising `flag` stops the parse before the next stage.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Checks the sequence alphabet and the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SltagError::InvalidSequence`] for an empty sequence or a
    /// symbol outside {a,c,g,t}, and [`SltagError::InvalidConfig`] for an
    /// out-of-range tunable.
    pub fn validate(self) -> Result<Grammar<'a, Validated>, SltagError> {
        let sequence = validate_sequence(&self.sequence)?;
        self.config.validate()?;
        Ok(Grammar {
            sequence,
            header: self.header,
            description: self.description,
            oracle: self.oracle,
            config: self.config,
            cancel: self.cancel,
            _state: PhantomData,
        })
    }
}

impl Grammar<'_, Validated> {
    /// The validated, lowercase sequence.
    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[must_use]
    pub const fn config(&self) -> &SltagConfig {
        &self.config
    }

    /// Runs every stage and reports the accepting derivations.
    ///
    /// # Errors
    ///
    /// Returns [`SltagError::Cancelled`] or [`SltagError::DeadlineExceeded`]
    /// when stopped between stages, and [`SltagError::ThreadPool`] if a
    /// dedicated worker pool cannot be built.
    pub fn parse(&self) -> Result<ParseResults, SltagError> {
        match self.config.num_threads {
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| {
                        SltagError::ThreadPool(format!("Failed to configure thread pool: {e}"))
                    })?;
                pool.install(|| self.run())
            }
            None => self.run(),
        }
    }

    fn run(&self) -> Result<ParseResults, SltagError> {
        let started = Instant::now();
        let length = self.sequence.len();
        let mut chart = Chart::new(&self.config);
        let mut stats = ParseStats::default();

        for stage in 1..=length {
            self.checkpoint(stage, started)?;
            chart.run_stage(stage, &self.sequence, self.oracle, &mut stats);
        }

        let accepting = chart.accepting(length);
        let outcome = if accepting.is_empty() {
            ParseOutcome::Rejected
        } else {
            ParseOutcome::Accepted
        };
        let derivations = self.derivations(&chart.arena, accepting);
        let insertables = self.insertables(&chart);

        stats.committed = chart.arena.len();
        stats.adjoinable = chart.tree.adjoinable().len();
        stats.nonadjoinable = chart.tree.nonadjoinable().len();
        stats.insertables = chart.insertables.len();
        stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            header = %self.header,
            length,
            outcome = ?outcome,
            derivations = derivations.len(),
            committed = stats.committed,
            elapsed_ms = stats.elapsed_ms,
            "parse finished"
        );

        Ok(ParseResults {
            sequence_info: SequenceInfo {
                header: self.header.clone(),
                description: self.description.clone(),
                length,
            },
            outcome,
            derivations,
            insertables,
            stats,
            sequence: self.sequence.clone(),
        })
    }

    fn checkpoint(&self, stage: usize, started: Instant) -> Result<(), SltagError> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(SltagError::Cancelled { stage });
        }
        if let Some(limit) = self.config.time_limit {
            let elapsed = started.elapsed();
            if elapsed >= limit {
                return Err(SltagError::DeadlineExceeded { stage, elapsed });
            }
        }
        Ok(())
    }

    /// Ranks by descending probability; ties fall back to coordinates, then
    /// commit order.
    fn derivations(&self, arena: &TupleArena, mut accepting: Vec<TupleId>) -> Vec<Derivation> {
        accepting.sort_by(|a, b| {
            let (ta, tb) = (&arena[*a], &arena[*b]);
            tb.log_prob()
                .total_cmp(&ta.log_prob())
                .then_with(|| ta.span().cmp(&tb.span()))
                .then_with(|| a.cmp(b))
        });

        accepting
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let tuple = &arena[id];
                let span = tuple.span();
                let termini = match tuple.provenance() {
                    Provenance::Substitute { terminus, .. } => arena[*terminus].span(),
                    _ => span,
                };
                Derivation {
                    rank: index + 1,
                    span,
                    termini,
                    left: substring(&self.sequence, span.i, span.j),
                    right: substring(&self.sequence, span.k, span.l),
                    probability: tuple.probability(),
                    log_prob: tuple.log_prob(),
                    tree: DerivationTree::build(arena, id),
                }
            })
            .collect()
    }

    /// Committed insertables covering the whole sequence.
    fn insertables(&self, chart: &Chart) -> Vec<InsertableSummary> {
        let mut insertables: Vec<InsertableSummary> = chart
            .insertables
            .index()
            .with_yield(self.sequence.len())
            .iter()
            .map(|id| {
                let tuple = &chart.arena[*id];
                let span = tuple.span();
                InsertableSummary {
                    span,
                    sequence: substring(&self.sequence, span.i, span.l),
                    log_prob: tuple.log_prob(),
                }
            })
            .collect();
        insertables.sort_by(|a, b| a.span.cmp(&b.span));
        insertables
    }
}

/// Committed state of one parse.
struct Chart {
    arena: TupleArena,
    tree: TreeB1,
    insertables: InsertablesIndex,
}

impl Chart {
    fn new(config: &SltagConfig) -> Self {
        Self {
            arena: TupleArena::new(),
            tree: TreeB1::new(config),
            insertables: InsertablesIndex::new(),
        }
    }

    /// Open, evaluate, filter, commit.
    fn run_stage(
        &mut self,
        stage: usize,
        sequence: &[u8],
        oracle: &dyn SelfAlignmentOracle,
        stats: &mut ParseStats,
    ) {
        let stage_start = Instant::now();
        let mut pool = StagePool::new();
        self.tree.begin_stage(stage);
        self.insertables.begin_stage();

        let (counts, filtered) = {
            let mut ctx = StageContext {
                stage,
                sequence,
                oracle,
                arena: &self.arena,
                insertables: &mut self.insertables,
                pool: &mut pool,
            };
            let counts = self.tree.evaluate_stage(&mut ctx);
            let filtered = self.tree.filter_stage(&mut ctx);
            (counts, filtered)
        };

        let retained: Vec<StagedId> = self
            .tree
            .staged()
            .into_iter()
            .chain(self.insertables.staged().iter().copied())
            .collect();
        let commit = pool.commit(&mut self.arena, retained);
        self.tree.complete_stage(&commit, &self.arena);
        let insertables = self.insertables.complete_stage(&commit, &self.arena);

        let removed = filtered.insertables + filtered.matched + filtered.identical;
        stats.stages = stage;
        stats.candidates += counts.total();
        stats.filtered += removed;

        if counts.total() > 0 {
            debug!(
                stage,
                initialized = counts.initialized,
                adjoined = counts.adjoined,
                substituted = counts.substituted,
                inserted = counts.inserted,
                insertable_candidates = counts.insertable_candidates,
                filtered_insertables = filtered.insertables,
                filtered_match = filtered.matched,
                filtered_identical = filtered.identical,
                committed = commit.committed(),
                insertables,
                elapsed_us = u64::try_from(stage_start.elapsed().as_micros()).unwrap_or(u64::MAX),
                "stage"
            );
        }
    }

    fn accepting(&self, length: usize) -> Vec<TupleId> {
        self.tree.accepting(&self.arena, length)
    }
}

/// High-level entry point for parsing sequences.
///
/// # Examples
///
/// ```rust
/// use sltag_core::{SltagAnalyzer, config::SltagConfig, oracle::AllMatch};
///
/// let analyzer = SltagAnalyzer::new(SltagConfig::default());
/// let results = analyzer.analyze_sequence("acgt", Some("tiny".to_string()), &AllMatch)?;
/// println!("{}: {:?}", results.sequence_info.header, results.outcome);
/// # Ok::<(), sltag_core::types::SltagError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SltagAnalyzer {
    pub config: SltagConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl SltagAnalyzer {
    #[must_use]
    pub fn new(config: SltagConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Shares `flag` with every parse started by this analyzer.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// # Errors
    ///
    /// See [`Grammar::validate`] and [`Grammar::parse`].
    pub fn analyze_sequence(
        &self,
        sequence: &str,
        header: Option<String>,
        oracle: &dyn SelfAlignmentOracle,
    ) -> Result<ParseResults, SltagError> {
        self.analyze_sequence_bytes(sequence.as_bytes(), header, None, oracle)
    }

    /// # Errors
    ///
    /// See [`Grammar::validate`] and [`Grammar::parse`].
    pub fn analyze_sequence_bytes(
        &self,
        sequence: &[u8],
        header: Option<String>,
        description: Option<String>,
        oracle: &dyn SelfAlignmentOracle,
    ) -> Result<ParseResults, SltagError> {
        let mut grammar = Grammar::new(sequence, oracle, self.config.clone())
            .with_header(header.unwrap_or_else(|| DEFAULT_HEADER.to_string()), description);
        if let Some(flag) = &self.cancel {
            grammar = grammar.with_cancellation(Arc::clone(flag));
        }
        grammar.validate()?.parse()
    }

    /// Parses every record of a FASTA file with the same oracle.
    ///
    /// # Errors
    ///
    /// Returns the first read, validation or parse error.
    pub fn analyze_fasta_file<P: AsRef<Path>>(
        &self,
        path: P,
        oracle: &dyn SelfAlignmentOracle,
    ) -> Result<Vec<ParseResults>, SltagError> {
        read_fasta_sequences(path)?
            .into_iter()
            .map(|(id, description, sequence)| {
                self.analyze_sequence_bytes(&sequence, Some(id), description, oracle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AllMatch, PairSet};
    use crate::types::{Label, Span};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn analyze(sequence: &str, oracle: &dyn SelfAlignmentOracle) -> ParseResults {
        SltagAnalyzer::default()
            .analyze_sequence(sequence, None, oracle)
            .unwrap()
    }

    #[test]
    fn test_gtag_is_accepted_through_a_scanned_filler() {
        let results = analyze("gtag", &PairSet::new([(1, 4)]));

        assert_eq!(results.outcome, ParseOutcome::Accepted);
        assert_eq!(results.derivations.len(), 1);

        let best = results.best().unwrap();
        assert_eq!(best.span, Span::new(0, 3, 3, 4));
        assert_eq!(best.termini, Span::new(0, 1, 3, 4));
        assert_eq!(best.left, "gta");
        assert_eq!(best.right, "g");

        let expected = 0.225 * (0.25f64 * 0.99).powi(2) * 0.04;
        assert!((best.probability - expected).abs() < 1e-12);

        assert_eq!(best.tree.label, Label::Substitute);
        assert_eq!(best.tree.children[0].span, Span::new(0, 1, 3, 4));
        assert_eq!(best.tree.children[1].label, Label::Filler);
        assert_eq!(best.tree.children[1].span, Span::segment(1, 3));
    }

    #[test]
    fn test_unpaired_sequence_is_rejected_not_an_error() {
        let results = analyze("tag", &PairSet::default());
        assert_eq!(results.outcome, ParseOutcome::Rejected);
        assert!(results.derivations.is_empty());
        assert_eq!(results.stats.stages, 3);
    }

    #[test]
    fn test_adjacent_pair_is_accepted_without_filler() {
        let results = analyze("aa", &PairSet::new([(1, 2)]));

        assert!(results.is_accepted());
        let best = results.best().unwrap();
        assert_eq!(best.span, Span::new(0, 1, 1, 2));
        assert_eq!(best.tree.label, Label::Base);
        assert!((best.probability - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_derivations_are_ranked_by_probability() {
        let results = analyze("gatcgatc", &AllMatch);
        assert!(results.is_accepted());
        for (index, pair) in results.derivations.windows(2).enumerate() {
            assert!(pair[0].log_prob >= pair[1].log_prob);
            assert_eq!(pair[0].rank, index + 1);
        }
        for derivation in &results.derivations {
            assert_eq!(derivation.span.i, 0);
            assert_eq!(derivation.span.l, 8);
            assert!(derivation.span.is_gap_free());
        }
    }

    #[test]
    fn test_uppercase_input_is_parsed_lowercased() {
        let results = analyze("GTAG", &PairSet::new([(1, 4)]));
        assert_eq!(results.best().unwrap().left, "gta");
        assert_eq!(results.sequence, b"gtag".to_vec());
    }

    #[test]
    fn test_invalid_inputs_fail_validation() {
        let analyzer = SltagAnalyzer::default();
        assert!(matches!(
            analyzer.analyze_sequence("", None, &AllMatch),
            Err(SltagError::InvalidSequence(_))
        ));
        assert!(matches!(
            analyzer.analyze_sequence("gtnag", None, &AllMatch),
            Err(SltagError::InvalidSequence(_))
        ));

        let analyzer = SltagAnalyzer::new(SltagConfig {
            alpha_match: -0.1,
            ..Default::default()
        });
        assert!(matches!(
            analyzer.analyze_sequence("gtag", None, &AllMatch),
            Err(SltagError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cancellation_stops_before_first_stage() {
        let flag = Arc::new(AtomicBool::new(true));
        let analyzer = SltagAnalyzer::default().with_cancellation(flag);
        match analyzer.analyze_sequence("gtag", None, &AllMatch) {
            Err(SltagError::Cancelled { stage }) => assert_eq!(stage, 1),
            other => panic!("Expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn test_time_limit_is_checked_between_stages() {
        let analyzer = SltagAnalyzer::new(SltagConfig {
            time_limit: Some(Duration::from_nanos(1)),
            ..Default::default()
        });
        let sequence = "acgtacgtacgtacgtacgtacgtacgtac";
        match analyzer.analyze_sequence(sequence, None, &AllMatch) {
            Err(SltagError::DeadlineExceeded { stage, .. }) => assert!(stage <= 3),
            other => panic!("Expected DeadlineExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_dedicated_pool_gives_identical_results() {
        let serial = analyze("gatcgatcga", &AllMatch);
        let pooled = SltagAnalyzer::new(SltagConfig {
            num_threads: Some(2),
            ..Default::default()
        })
        .analyze_sequence("gatcgatcga", None, &AllMatch)
        .unwrap();

        let summary = |results: &ParseResults| -> Vec<(Span, f64)> {
            results
                .derivations
                .iter()
                .map(|d| (d.span, d.log_prob))
                .collect()
        };
        assert_eq!(summary(&serial), summary(&pooled));
        assert_eq!(serial.stats.committed, pooled.stats.committed);
    }

    #[test]
    fn test_only_full_length_insertables_are_reported() {
        let analyzer = SltagAnalyzer::new(SltagConfig {
            min_insertable_length: 3,
            alpha_insertables: 0.0,
            ..Default::default()
        });
        let results = analyzer
            .analyze_sequence("gatacg", None, &PairSet::new([(2, 4), (1, 6)]))
            .unwrap();

        // (1,3,3,4) "ata" is committed and spliced, but does not span the input
        assert!(results.stats.insertables > results.insertables.len());
        assert!(!results.insertables.is_empty());
        for insertable in &results.insertables {
            assert_eq!(insertable.span.i, 0);
            assert_eq!(insertable.span.l, 6);
            assert_eq!(insertable.sequence, "gatacg");
        }
    }

    #[test]
    fn test_insertable_length_is_capped_at_sequence_length() {
        // Default minimum is far above the sequence length
        let analyzer = SltagAnalyzer::new(SltagConfig {
            alpha_insertables: 0.0,
            ..Default::default()
        });
        let results = analyzer
            .analyze_sequence("aa", None, &PairSet::new([(1, 2)]))
            .unwrap();

        assert_eq!(results.stats.insertables, 1);
        assert_eq!(results.insertables.len(), 1);
        assert_eq!(results.insertables[0].span, Span::new(0, 1, 1, 2));
        assert_eq!(results.insertables[0].sequence, "aa");
    }

    #[test]
    fn test_analyze_fasta_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">first repeat\nGTAG\n>second\nTAG").unwrap();

        let results = SltagAnalyzer::default()
            .analyze_fasta_file(file.path(), &AllMatch)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sequence_info.header, "first");
        assert_eq!(
            results[0].sequence_info.description.as_deref(),
            Some("repeat")
        );
        assert_eq!(results[1].sequence_info.length, 3);
    }
}
