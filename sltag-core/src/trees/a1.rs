use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use super::{FilterCounts, StageContext, StageCounts, StagedTree};
use crate::index::{CommitMap, InsertablesIndex, StagedId};
use crate::probability::{ProbabilityModel, is_viable};
use crate::tuple::{FillerDerivation, FillerPiece, TupleArena, TupleId};

/// Filler synthesizer.
///
/// Explains a gap `[start, end)` either as plain scanned bases or as scanned
/// pieces alternating with spliced insertables. It stages nothing itself;
/// [`TreeB1`](super::TreeB1) asks for fillers while substituting.
#[derive(Debug)]
pub struct TreeA1 {
    model: ProbabilityModel,
    max_insertions: usize,
    stage: usize,
    fillers_built: AtomicUsize,
}

impl TreeA1 {
    #[must_use]
    pub fn new(model: ProbabilityModel, max_insertions: usize) -> Self {
        Self {
            model,
            max_insertions,
            stage: 0,
            fillers_built: AtomicUsize::new(0),
        }
    }

    /// All viable filler derivations of `[start, end)`.
    ///
    /// The first entry is always the scan-only filler (when viable), followed
    /// by one compound filler per non-overlapping subset of committed
    /// insertables inside the gap.
    #[must_use]
    pub fn filler_derivations(
        &self,
        arena: &TupleArena,
        insertables: &InsertablesIndex,
        start: usize,
        end: usize,
    ) -> Vec<Arc<FillerDerivation>> {
        let mut derivations = Vec::new();

        let scan = self.scan(start, end);
        if is_viable(scan.log_prob()) {
            derivations.push(Arc::new(FillerDerivation {
                start,
                end,
                log_prob: scan.log_prob(),
                pieces: vec![scan],
            }));
        }

        if self.max_insertions > 0 && !insertables.is_empty() {
            for subset in insertables.combinations(arena, start, end, self.max_insertions) {
                if let Some(filler) = self.compound(arena, start, end, &subset) {
                    derivations.push(Arc::new(filler));
                }
            }
        }

        self.fillers_built
            .fetch_add(derivations.len(), Ordering::Relaxed);
        derivations
    }

    fn scan(&self, start: usize, end: usize) -> FillerPiece {
        FillerPiece::Scan {
            start,
            end,
            log_prob: self.model.filler_log_probability(end - start),
        }
    }

    /// Scanned pieces around the subset members, each splice discounted by
    /// `INSERT`. `subset` is ordered by start and non-overlapping.
    fn compound(
        &self,
        arena: &TupleArena,
        start: usize,
        end: usize,
        subset: &[TupleId],
    ) -> Option<FillerDerivation> {
        let log_insert = self.model.log_insert();
        let mut pieces = Vec::with_capacity(2 * subset.len() + 1);
        let mut cursor = start;

        for &id in subset {
            let tuple = &arena[id];
            let span = tuple.span();
            if span.i > cursor {
                pieces.push(self.scan(cursor, span.i));
            }
            pieces.push(FillerPiece::Splice {
                insertable: id,
                span,
                log_prob: tuple.log_prob() + log_insert,
            });
            cursor = span.l;
        }
        if cursor < end {
            pieces.push(self.scan(cursor, end));
        }

        let log_prob = pieces.iter().map(FillerPiece::log_prob).sum::<f64>();
        is_viable(log_prob).then_some(FillerDerivation {
            start,
            end,
            log_prob,
            pieces,
        })
    }
}

impl StagedTree for TreeA1 {
    fn name(&self) -> &'static str {
        "A1"
    }

    fn begin_stage(&mut self, stage: usize) {
        self.stage = stage;
        self.fillers_built.store(0, Ordering::Relaxed);
    }

    fn evaluate_stage(&mut self, _ctx: &mut StageContext<'_>) -> StageCounts {
        StageCounts::default()
    }

    fn filter_stage(&mut self, _ctx: &mut StageContext<'_>) -> FilterCounts {
        FilterCounts::default()
    }

    fn staged(&self) -> Vec<StagedId> {
        Vec::new()
    }

    fn complete_stage(&mut self, _commit: &CommitMap, _arena: &TupleArena) {
        trace!(
            tree = self.name(),
            stage = self.stage,
            fillers = self.fillers_built.load(Ordering::Relaxed),
            "stage complete"
        );
    }
}
