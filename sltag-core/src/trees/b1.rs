//! The self-repeat automaton.
//!
//! TreeB1 grows terminus pairs `(i,j,k,l)` one aligned base pair at a time,
//! closes them over a filler, and splices finished insertables into either
//! flank. Extendable pairs live in `adjoinable`, closed ones in
//! `nonadjoinable`.
//!
//! Stage `s` builds exactly the tuples of yield `s`:
//!
//! | Stage | Operation  | Reads (committed)                         | Writes          |
//! |-------|------------|-------------------------------------------|-----------------|
//! | 2     | Initialize | oracle                                    | `adjoinable`    |
//! | > 2   | Adjoin     | adjoinable of yield `s - 2`, base pairs   | `adjoinable`    |
//! | > 2   | Substitute | adjoinable with `l - i == s`, fillers     | `nonadjoinable` |
//! | > 2   | Insert     | insertables, adjoinable of the remainder  | `adjoinable`    |

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use super::{FilterCounts, StageContext, StageCounts, StagedTree, TreeA1};
use crate::config::SltagConfig;
use crate::filters::{IdenticalCoordinatesFilter, InsertablesFilter, MatchFilter, TupleFilter};
use crate::index::{CommitMap, StagedId, TupleIndex};
use crate::probability::{ProbabilityModel, is_viable};
use crate::tuple::{Tuple, TupleArena, TupleId};
use crate::types::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Adjoinable,
    Nonadjoinable,
}

/// Self-repeat automaton holding the `adjoinable` and `nonadjoinable` indices.
#[derive(Debug)]
pub struct TreeB1 {
    model: ProbabilityModel,
    min_insertable_length: usize,
    alpha_match: f64,
    alpha_insertables: f64,
    alpha_identical_coords: f64,
    fillers: TreeA1,
    adjoinable: TupleIndex,
    nonadjoinable: TupleIndex,
    stage: usize,
}

impl TreeB1 {
    #[must_use]
    pub fn new(config: &SltagConfig) -> Self {
        Self {
            model: config.probabilities.clone(),
            min_insertable_length: config.min_insertable_length,
            alpha_match: config.alpha_match,
            alpha_insertables: config.alpha_insertables,
            alpha_identical_coords: config.alpha_identical_coords,
            fillers: TreeA1::new(
                config.probabilities.clone(),
                config.max_insertions_per_middle,
            ),
            adjoinable: TupleIndex::new("adjoinable"),
            nonadjoinable: TupleIndex::new("nonadjoinable"),
            stage: 0,
        }
    }

    #[must_use]
    pub const fn adjoinable(&self) -> &TupleIndex {
        &self.adjoinable
    }

    #[must_use]
    pub const fn nonadjoinable(&self) -> &TupleIndex {
        &self.nonadjoinable
    }

    #[must_use]
    pub const fn fillers(&self) -> &TreeA1 {
        &self.fillers
    }

    /// Gap-free and at least `min_insertable_length` long, the length
    /// capped at the sequence length so that a full-length closed repeat
    /// always qualifies.
    #[must_use]
    pub fn is_insertable(&self, span: Span, sequence_len: usize) -> bool {
        span.is_gap_free() && span.extent() >= self.min_insertable_length.min(sequence_len)
    }

    /// Committed tuples `(0,p,p,n)` covering the whole sequence, from both
    /// indices.
    #[must_use]
    pub fn accepting(&self, arena: &TupleArena, sequence_len: usize) -> Vec<TupleId> {
        [&self.nonadjoinable, &self.adjoinable]
            .into_iter()
            .flat_map(|index| index.with_extent(sequence_len))
            .copied()
            .filter(|id| {
                let span = arena[*id].span();
                span.i == 0 && span.is_gap_free() && span.l == sequence_len
            })
            .collect()
    }

    /// Base pairs `(p,p+1,q,q+1)` for every oracle-confirmed `p < q`.
    fn initialize(&self, ctx: &StageContext<'_>) -> Vec<Tuple> {
        let sequence = ctx.sequence;
        let oracle = ctx.oracle;
        let base_pairs = &self.model.base_pairs;

        (0..sequence.len())
            .into_par_iter()
            .flat_map_iter(|p| {
                (p + 1..sequence.len())
                    .filter(move |&q| oracle.aligned_pair(p + 1, q + 1))
                    .map(move |q| {
                        let log_prob = base_pairs.log_probability(sequence[p], sequence[q]);
                        Tuple::base(Span::base_pair(p, q), log_prob)
                    })
            })
            .collect()
    }

    /// `(i,j,k,l) + (j,j+1,l,l+1) => (i,j+1,k,l+1)` for open gaps.
    fn adjoin(&self, ctx: &StageContext<'_>) -> Vec<Tuple> {
        let arena = ctx.arena;
        let log_adjoin = self.model.log_b1_adjoin();

        self.adjoinable
            .with_yield(ctx.stage - 2)
            .par_iter()
            .flat_map_iter(|&extended_id| {
                let extended = &arena[extended_id];
                let span = extended.span();
                let partners: &[TupleId] = if span.j < span.k {
                    self.adjoinable.at(Span::base_pair(span.j, span.l))
                } else {
                    &[]
                };
                partners.iter().map(move |&base_id| {
                    Tuple::adjoined(extended_id, extended, base_id, &arena[base_id], log_adjoin)
                })
            })
            .collect()
    }

    /// Closes every open terminus whose closed yield `l - i` equals the
    /// stage. Fillers are built once per distinct gap.
    fn substitute(&self, ctx: &StageContext<'_>) -> Vec<Tuple> {
        let arena = ctx.arena;
        let insertables = &*ctx.insertables;
        let log_substitute = self.model.log_b1_substitute();

        let mut gaps: BTreeMap<(usize, usize), Vec<TupleId>> = BTreeMap::new();
        for &id in self.adjoinable.with_extent(ctx.stage) {
            let span = arena[id].span();
            if span.j < span.k {
                gaps.entry((span.j, span.k)).or_default().push(id);
            }
        }
        let gaps: Vec<_> = gaps.into_iter().collect();

        gaps.par_iter()
            .flat_map_iter(|((start, end), termini)| {
                let fillers = self
                    .fillers
                    .filler_derivations(arena, insertables, *start, *end);
                let mut closed = Vec::with_capacity(termini.len() * fillers.len());
                for &terminus in termini {
                    for filler in &fillers {
                        closed.push(Tuple::substituted(
                            terminus,
                            &arena[terminus],
                            filler.clone(),
                            log_substitute,
                        ));
                    }
                }
                closed
            })
            .collect()
    }

    /// Splices each gap-free insertable `(s,t,t,v)` after a left terminus
    /// ending at `s` (when `v` stays within the right terminus start) or after
    /// a right terminus ending at `s`.
    fn insert(&self, ctx: &StageContext<'_>) -> Vec<Tuple> {
        let arena = ctx.arena;
        let stage = ctx.stage;
        let log_insert = self.model.log_insert();

        ctx.insertables
            .all()
            .par_iter()
            .flat_map_iter(|&insertable_id| {
                let insertable = &arena[insertable_id];
                let span = insertable.span();
                assert!(span.is_gap_free(), "insertable {span} has an internal gap");

                let mut spliced = Vec::new();
                let Some(remaining) = stage.checked_sub(span.yield_len()) else {
                    return spliced;
                };
                for &flank_id in self.adjoinable.with_yield_and_j(remaining, span.i) {
                    let flank = &arena[flank_id];
                    if span.l > flank.span().k {
                        continue;
                    }
                    spliced.push(Tuple::inserted_left(
                        insertable_id,
                        insertable,
                        flank_id,
                        flank,
                        log_insert,
                    ));
                }
                for &flank_id in self.adjoinable.with_yield_and_l(remaining, span.i) {
                    spliced.push(Tuple::inserted_right(
                        insertable_id,
                        insertable,
                        flank_id,
                        &arena[flank_id],
                        log_insert,
                    ));
                }
                spliced
            })
            .collect()
    }

    /// Stages viable candidates into `target`, and into the insertables
    /// buffer when they qualify. Returns how many were staged.
    fn stage_candidates(
        &mut self,
        ctx: &mut StageContext<'_>,
        candidates: Vec<Tuple>,
        target: Target,
        counts: &mut StageCounts,
    ) -> usize {
        let mut staged = 0;
        for tuple in candidates {
            if !is_viable(tuple.log_prob()) {
                continue;
            }
            let insertable = self.is_insertable(tuple.span(), ctx.sequence.len());
            let id = ctx.pool.push(tuple);
            match target {
                Target::Adjoinable => self.adjoinable.stage(id),
                Target::Nonadjoinable => self.nonadjoinable.stage(id),
            }
            if insertable {
                ctx.insertables.stage(id);
                counts.insertable_candidates += 1;
            }
            staged += 1;
        }
        staged
    }
}

impl StagedTree for TreeB1 {
    fn name(&self) -> &'static str {
        "B1"
    }

    fn begin_stage(&mut self, stage: usize) {
        self.stage = stage;
        self.adjoinable.begin_stage();
        self.nonadjoinable.begin_stage();
        self.fillers.begin_stage(stage);
    }

    fn evaluate_stage(&mut self, ctx: &mut StageContext<'_>) -> StageCounts {
        let mut counts = self.fillers.evaluate_stage(ctx);
        match ctx.stage {
            0 | 1 => {}
            2 => {
                let candidates = self.initialize(ctx);
                let initialized =
                    self.stage_candidates(ctx, candidates, Target::Adjoinable, &mut counts);
                counts.initialized = initialized;
            }
            _ => {
                let adjoined = self.adjoin(ctx);
                let substituted = self.substitute(ctx);
                let inserted = self.insert(ctx);
                let adjoined =
                    self.stage_candidates(ctx, adjoined, Target::Adjoinable, &mut counts);
                let substituted =
                    self.stage_candidates(ctx, substituted, Target::Nonadjoinable, &mut counts);
                let inserted =
                    self.stage_candidates(ctx, inserted, Target::Adjoinable, &mut counts);
                counts.adjoined = adjoined;
                counts.substituted = substituted;
                counts.inserted = inserted;
            }
        }
        counts
    }

    /// Insertables filter, then match filter on `adjoinable`, then the
    /// identical-coordinates filter over all three buffers.
    fn filter_stage(&mut self, ctx: &mut StageContext<'_>) -> FilterCounts {
        let pool = &*ctx.pool;
        let mut counts = FilterCounts {
            insertables: InsertablesFilter::new(self.alpha_insertables, &self.model)
                .apply(pool, ctx.insertables.staged_mut()),
            matched: MatchFilter::new(self.alpha_match).apply(pool, self.adjoinable.staged_mut()),
            identical: 0,
        };

        let reference: Vec<StagedId> = self
            .adjoinable
            .staged()
            .iter()
            .chain(self.nonadjoinable.staged())
            .chain(ctx.insertables.staged())
            .copied()
            .collect();
        let identical =
            IdenticalCoordinatesFilter::from_reference(self.alpha_identical_coords, pool, reference);
        counts.identical = identical.apply(pool, self.adjoinable.staged_mut())
            + identical.apply(pool, self.nonadjoinable.staged_mut())
            + identical.apply(pool, ctx.insertables.staged_mut());

        counts
    }

    fn staged(&self) -> Vec<StagedId> {
        self.adjoinable
            .staged()
            .iter()
            .chain(self.nonadjoinable.staged())
            .copied()
            .collect()
    }

    fn complete_stage(&mut self, commit: &CommitMap, arena: &TupleArena) {
        let adjoinable = self.adjoinable.complete_stage(commit, arena);
        let nonadjoinable = self.nonadjoinable.complete_stage(commit, arena);
        self.fillers.complete_stage(commit, arena);
        debug!(
            tree = self.name(),
            stage = self.stage,
            adjoinable,
            nonadjoinable,
            "stage committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{InsertablesIndex, StagePool};
    use crate::oracle::{AllMatch, PairSet, SelfAlignmentOracle};
    use crate::tuple::Provenance;
    use crate::types::Label;

    /// Drives the stage lifecycle the way the grammar does.
    struct Harness {
        tree: TreeB1,
        arena: TupleArena,
        insertables: InsertablesIndex,
    }

    impl Harness {
        fn run(sequence: &[u8], oracle: &dyn SelfAlignmentOracle, config: &SltagConfig) -> Self {
            let mut harness = Self {
                tree: TreeB1::new(config),
                arena: TupleArena::new(),
                insertables: InsertablesIndex::new(),
            };
            for stage in 1..=sequence.len() {
                harness.stage(stage, sequence, oracle);
            }
            harness
        }

        fn stage(&mut self, stage: usize, sequence: &[u8], oracle: &dyn SelfAlignmentOracle) {
            let mut pool = StagePool::new();
            self.tree.begin_stage(stage);
            self.insertables.begin_stage();
            {
                let mut ctx = StageContext {
                    stage,
                    sequence,
                    oracle,
                    arena: &self.arena,
                    insertables: &mut self.insertables,
                    pool: &mut pool,
                };
                self.tree.evaluate_stage(&mut ctx);
                self.tree.filter_stage(&mut ctx);
            }
            let retained: Vec<StagedId> = self
                .tree
                .staged()
                .into_iter()
                .chain(self.insertables.staged().iter().copied())
                .collect();
            let commit = pool.commit(&mut self.arena, retained);
            self.tree.complete_stage(&commit, &self.arena);
            self.insertables.complete_stage(&commit, &self.arena);
        }

        fn spans(&self, ids: &[TupleId]) -> Vec<Span> {
            let mut spans: Vec<Span> = ids.iter().map(|id| self.arena[*id].span()).collect();
            spans.sort();
            spans
        }
    }

    fn permissive() -> SltagConfig {
        SltagConfig {
            alpha_match: 0.0,
            alpha_identical_coords: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_follows_oracle() {
        let harness = Harness::run(b"gtag", &PairSet::new([(1, 4), (2, 3)]), &permissive());
        assert_eq!(
            harness.spans(harness.tree.adjoinable().with_yield(2)),
            vec![Span::base_pair(0, 3), Span::base_pair(1, 2)]
        );
    }

    #[test]
    fn test_initialize_with_all_match_enumerates_every_pair() {
        let harness = Harness::run(b"acgt", &AllMatch, &permissive());
        assert_eq!(harness.tree.adjoinable().with_yield(2).len(), 6);
    }

    #[test]
    fn test_adjoin_extends_open_terminus() {
        // positions 1..2 align with 5..6
        let oracle = PairSet::new([(1, 5), (2, 6)]);
        let harness = Harness::run(b"gaccga", &oracle, &permissive());

        let yield_four = harness.tree.adjoinable().with_yield(4);
        assert_eq!(harness.spans(yield_four), vec![Span::new(0, 2, 4, 6)]);

        let parent = &harness.arena[yield_four[0]];
        let model = ProbabilityModel::default();
        let expected = model.base_pairs.log_probability(b'g', b'g')
            + model.base_pairs.log_probability(b'a', b'a')
            + model.log_b1_adjoin();
        assert!((parent.log_prob() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_substitute_closes_on_extent() {
        let harness = Harness::run(b"gtag", &PairSet::new([(1, 4)]), &permissive());
        let closed = harness.tree.nonadjoinable().all();
        assert_eq!(harness.spans(closed), vec![Span::new(0, 3, 3, 4)]);
        assert_eq!(harness.tree.accepting(&harness.arena, 4), closed.to_vec());
    }

    #[test]
    fn test_adjacent_base_pair_is_accepted_without_filler() {
        let harness = Harness::run(b"aa", &PairSet::new([(1, 2)]), &permissive());
        assert!(harness.tree.nonadjoinable().is_empty());
        let accepted = harness.tree.accepting(&harness.arena, 2);
        assert_eq!(harness.spans(&accepted), vec![Span::new(0, 1, 1, 2)]);
    }

    #[test]
    fn test_insertables_are_registered_and_spliced() {
        // "ata" closes to an insertable at (1,3,3,4); the outer pair g..g
        // at positions 1 and 6 can take it on either flank.
        let config = SltagConfig {
            min_insertable_length: 3,
            alpha_insertables: 0.0,
            ..permissive()
        };
        let oracle = PairSet::new([(2, 4), (1, 6), (1, 5)]);
        let harness = Harness::run(b"gatacg", &oracle, &config);

        let insertables = harness.spans(harness.insertables.all());
        assert!(insertables.contains(&Span::new(1, 3, 3, 4)));

        let spliced: Vec<Span> = harness
            .tree
            .adjoinable()
            .all()
            .iter()
            .map(|id| &harness.arena[*id])
            .filter(|t| t.label() == Label::InsertLeft)
            .map(Tuple::span)
            .collect();
        // (0,1,5,6) + (1,3,3,4) => (0,4,5,6)
        assert!(spliced.contains(&Span::new(0, 4, 5, 6)));

        let right: Vec<Span> = harness
            .tree
            .adjoinable()
            .all()
            .iter()
            .map(|id| &harness.arena[*id])
            .filter(|t| t.label() == Label::InsertRight)
            .map(Tuple::span)
            .collect();
        // right flank ending at 1: (0,?,?,1) cannot exist, so nothing here
        assert!(right.is_empty());
    }

    #[test]
    fn test_insert_left_rejects_crossing_right_terminus() {
        let config = SltagConfig {
            min_insertable_length: 3,
            alpha_insertables: 0.0,
            ..permissive()
        };
        // Outer pair (0,1,2,3) leaves no room for the insertable (1,3,3,4)
        let oracle = PairSet::new([(2, 4), (1, 3)]);
        let harness = Harness::run(b"gatag", &oracle, &config);
        assert!(
            harness
                .tree
                .adjoinable()
                .all()
                .iter()
                .all(|id| harness.arena[*id].label() != Label::InsertLeft)
        );
    }

    #[test]
    fn test_no_pairs_means_no_tuples() {
        let harness = Harness::run(b"tag", &PairSet::default(), &permissive());
        assert!(harness.tree.adjoinable().is_empty());
        assert!(harness.tree.nonadjoinable().is_empty());
        assert!(harness.tree.accepting(&harness.arena, 3).is_empty());
    }

    #[test]
    fn test_insertable_minimum_is_capped_at_sequence_length() {
        let tree = TreeB1::new(&SltagConfig::default());
        assert!(tree.is_insertable(Span::new(0, 3, 3, 4), 4));
        assert!(!tree.is_insertable(Span::new(1, 3, 3, 4), 4));
        assert!(!tree.is_insertable(Span::new(0, 1, 3, 4), 4));
        assert!(!tree.is_insertable(Span::new(0, 3, 3, 4), 200));
    }

    #[test]
    fn test_full_length_closed_repeat_becomes_insertable() {
        let config = SltagConfig {
            alpha_insertables: 0.0,
            ..permissive()
        };
        let harness = Harness::run(b"gtag", &PairSet::new([(1, 4)]), &config);
        assert_eq!(
            harness.spans(harness.insertables.all()),
            vec![Span::new(0, 3, 3, 4)]
        );
    }

    #[test]
    fn test_insert_right_appends_after_flank() {
        let config = SltagConfig {
            min_insertable_length: 3,
            alpha_insertables: 0.0,
            ..permissive()
        };
        // (0,1,1,2) "g|g" followed by the insertable "ata" at (2,4,4,5)
        let harness = Harness::run(b"ggata", &PairSet::new([(1, 2), (3, 5)]), &config);
        let right: Vec<Span> = harness
            .tree
            .adjoinable()
            .all()
            .iter()
            .map(|id| &harness.arena[*id])
            .filter(|t| t.label() == Label::InsertRight)
            .map(Tuple::span)
            .collect();
        assert_eq!(right, vec![Span::new(0, 1, 1, 5)]);
    }

    /// Checks ordering, yield additivity and probability products for every
    /// committed tuple; returns the labels seen.
    fn check_committed(harness: &Harness) -> Vec<Label> {
        let model = ProbabilityModel::default();
        let arena = &harness.arena;
        let mut seen = Vec::new();
        for id in harness
            .tree
            .adjoinable()
            .all()
            .iter()
            .chain(harness.tree.nonadjoinable().all())
        {
            let tuple = &arena[*id];
            let Span { i, j, k, l } = tuple.span();
            assert!(i <= j && j <= k && k <= l);

            let (expected, children_yield) = match tuple.provenance() {
                Provenance::Base => continue,
                Provenance::Adjoin { extended, base } => (
                    arena[*extended].log_prob() + arena[*base].log_prob() + model.log_b1_adjoin(),
                    arena[*extended].yield_len() + arena[*base].yield_len(),
                ),
                Provenance::Substitute { terminus, filler } => (
                    arena[*terminus].log_prob() + filler.log_prob + model.log_b1_substitute(),
                    arena[*terminus].yield_len() + (filler.end - filler.start),
                ),
                Provenance::InsertLeft { insertable, flank }
                | Provenance::InsertRight { insertable, flank } => (
                    arena[*insertable].log_prob() + arena[*flank].log_prob() + model.log_insert(),
                    arena[*insertable].yield_len() + arena[*flank].yield_len(),
                ),
            };
            assert!(
                (tuple.log_prob() - expected).abs() < 1e-9,
                "{} {} does not sum its children",
                tuple.label(),
                tuple.span()
            );
            assert_eq!(tuple.yield_len(), children_yield);
            if !seen.contains(&tuple.label()) {
                seen.push(tuple.label());
            }
        }
        seen
    }

    #[test]
    fn test_every_committed_tuple_is_ordered_and_sums_children() {
        let exhaustive = Harness::run(b"gatcgatc", &AllMatch, &permissive());
        let seen = check_committed(&exhaustive);
        assert!(seen.contains(&Label::Adjoin));
        assert!(seen.contains(&Label::Substitute));

        let config = SltagConfig {
            min_insertable_length: 3,
            alpha_insertables: 0.0,
            ..permissive()
        };
        let left = Harness::run(b"gatacg", &PairSet::new([(2, 4), (1, 6), (1, 5)]), &config);
        let seen = check_committed(&left);
        assert!(seen.contains(&Label::InsertLeft));
        assert!(seen.contains(&Label::Substitute));

        let right = Harness::run(b"ggata", &PairSet::new([(1, 2), (3, 5)]), &config);
        let seen = check_committed(&right);
        assert!(seen.contains(&Label::InsertRight));
    }
}
