//! Scored span tuples and the arena that owns them.
//!
//! A tuple never owns its children: one committed tuple can feed many
//! parents, so children are referenced by [`TupleId`] into a [`TupleArena`].
//! The arena is append-only and tuples are immutable once pushed.

use std::ops::Index;
use std::sync::Arc;

use serde::Serialize;

use crate::types::{Label, Span};

pub mod derivation;

pub use derivation::DerivationTree;

/// Handle of a committed tuple inside a [`TupleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TupleId(usize);

impl TupleId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One piece of a synthesized filler
#[derive(Debug, Clone, PartialEq)]
pub enum FillerPiece {
    /// Unannotated bases `[start, end)`
    Scan {
        start: usize,
        end: usize,
        log_prob: f64,
    },
    /// A committed insertable spliced in whole; `log_prob` includes the
    /// insert discount
    Splice {
        insertable: TupleId,
        span: Span,
        log_prob: f64,
    },
}

impl FillerPiece {
    #[must_use]
    pub const fn end(&self) -> usize {
        match self {
            Self::Scan { end, .. } => *end,
            Self::Splice { span, .. } => span.l,
        }
    }

    #[must_use]
    pub const fn log_prob(&self) -> f64 {
        match self {
            Self::Scan { log_prob, .. } | Self::Splice { log_prob, .. } => *log_prob,
        }
    }
}

/// One weighted explanation of the gap `[start, end)` between two termini.
#[derive(Debug, Clone, PartialEq)]
pub struct FillerDerivation {
    pub start: usize,
    pub end: usize,
    pub log_prob: f64,
    pub pieces: Vec<FillerPiece>,
}

impl FillerDerivation {
    #[must_use]
    pub fn span(&self) -> Span {
        Span::segment(self.start, self.end)
    }

    /// Number of spliced insertables.
    #[must_use]
    pub fn splice_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|piece| matches!(piece, FillerPiece::Splice { .. }))
            .count()
    }
}

/// How a tuple was derived
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    Base,
    Adjoin {
        extended: TupleId,
        base: TupleId,
    },
    Substitute {
        terminus: TupleId,
        filler: Arc<FillerDerivation>,
    },
    InsertLeft {
        insertable: TupleId,
        flank: TupleId,
    },
    InsertRight {
        insertable: TupleId,
        flank: TupleId,
    },
}

impl Provenance {
    #[must_use]
    pub const fn label(&self) -> Label {
        match self {
            Self::Base => Label::Base,
            Self::Adjoin { .. } => Label::Adjoin,
            Self::Substitute { .. } => Label::Substitute,
            Self::InsertLeft { .. } => Label::InsertLeft,
            Self::InsertRight { .. } => Label::InsertRight,
        }
    }
}

/// An immutable scored span with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    span: Span,
    log_prob: f64,
    provenance: Provenance,
}

impl Tuple {
    /// Seed tuple for one aligned base pair.
    #[must_use]
    pub fn base(span: Span, log_prob: f64) -> Self {
        assert_eq!(span.yield_len(), 2, "base tuple {span} must pair two bases");
        Self {
            span,
            log_prob,
            provenance: Provenance::Base,
        }
    }

    /// `(i,j,k,l) + (j,j+1,l,l+1) => (i,j+1,k,l+1)`.
    #[must_use]
    pub fn adjoined(
        extended_id: TupleId,
        extended: &Tuple,
        base_id: TupleId,
        base: &Tuple,
        log_factor: f64,
    ) -> Self {
        let Span { i, j, k, l } = extended.span;
        assert!(j < k, "adjoin on closed terminus {}", extended.span);
        assert_eq!(
            base.span,
            Span::base_pair(j, l),
            "adjoin partner does not continue {}",
            extended.span
        );
        let span = Span::new(i, j + 1, k, l + 1);
        debug_assert_eq!(
            span.yield_len(),
            extended.span.yield_len() + base.span.yield_len()
        );
        Self {
            span,
            log_prob: extended.log_prob + base.log_prob + log_factor,
            provenance: Provenance::Adjoin {
                extended: extended_id,
                base: base_id,
            },
        }
    }

    /// `(i,j,k,l)` closed over a filler of `[j, k)` => `(i,k,k,l)`.
    #[must_use]
    pub fn substituted(
        terminus_id: TupleId,
        terminus: &Tuple,
        filler: Arc<FillerDerivation>,
        log_factor: f64,
    ) -> Self {
        let Span { i, j, k, l } = terminus.span;
        assert!(
            filler.start == j && filler.end == k,
            "filler [{}, {}) does not fill the gap of {}",
            filler.start,
            filler.end,
            terminus.span
        );
        Self {
            span: Span::new(i, k, k, l),
            log_prob: terminus.log_prob + filler.log_prob + log_factor,
            provenance: Provenance::Substitute {
                terminus: terminus_id,
                filler,
            },
        }
    }

    /// Insertable `(s,t,t,v)` spliced after the left terminus `(i,s,k,l)`,
    /// giving `(i,v,k,l)`. The caller rejects `v > k` beforehand.
    #[must_use]
    pub fn inserted_left(
        insertable_id: TupleId,
        insertable: &Tuple,
        flank_id: TupleId,
        flank: &Tuple,
        log_factor: f64,
    ) -> Self {
        let Span { i, j, k, l } = flank.span;
        let inserted = insertable.span;
        assert!(
            inserted.is_gap_free(),
            "insertable {inserted} has an internal gap"
        );
        assert_eq!(j, inserted.i, "insertable {inserted} does not touch {}", flank.span);
        Self {
            span: Span::new(i, inserted.l, k, l),
            log_prob: insertable.log_prob + flank.log_prob + log_factor,
            provenance: Provenance::InsertLeft {
                insertable: insertable_id,
                flank: flank_id,
            },
        }
    }

    /// Insertable `(s,t,t,v)` spliced after the right terminus `(i,j,k,s)`,
    /// giving `(i,j,k,v)`.
    #[must_use]
    pub fn inserted_right(
        insertable_id: TupleId,
        insertable: &Tuple,
        flank_id: TupleId,
        flank: &Tuple,
        log_factor: f64,
    ) -> Self {
        let Span { i, j, k, l } = flank.span;
        let inserted = insertable.span;
        assert!(
            inserted.is_gap_free(),
            "insertable {inserted} has an internal gap"
        );
        assert_eq!(l, inserted.i, "insertable {inserted} does not touch {}", flank.span);
        Self {
            span: Span::new(i, j, k, inserted.l),
            log_prob: insertable.log_prob + flank.log_prob + log_factor,
            provenance: Provenance::InsertRight {
                insertable: insertable_id,
                flank: flank_id,
            },
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub const fn log_prob(&self) -> f64 {
        self.log_prob
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.log_prob.exp()
    }

    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    #[must_use]
    pub const fn label(&self) -> Label {
        self.provenance.label()
    }

    #[must_use]
    pub const fn yield_len(&self) -> usize {
        self.span.yield_len()
    }
}

/// Append-only owner of every committed tuple.
#[derive(Debug, Default)]
pub struct TupleArena {
    tuples: Vec<Tuple>,
}

impl TupleArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a tuple into the arena and returns its handle.
    pub fn push(&mut self, tuple: Tuple) -> TupleId {
        let id = TupleId(self.tuples.len());
        self.tuples.push(tuple);
        id
    }

    #[must_use]
    pub fn get(&self, id: TupleId) -> &Tuple {
        &self.tuples[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl Index<TupleId> for TupleArena {
    type Output = Tuple;

    fn index(&self, id: TupleId) -> &Self::Output {
        self.get(id)
    }
}

/// Tuple at arbitrary coordinates, for exercising filters and indices.
#[cfg(test)]
pub(crate) fn scored_tuple(span: Span, log_prob: f64) -> Tuple {
    Tuple {
        span,
        log_prob,
        provenance: Provenance::Base,
    }
}

/// Gap-free tuple over `[start, end)` whose terminus is pushed into `arena`.
#[cfg(test)]
pub(crate) fn gap_free_tuple(
    arena: &mut TupleArena,
    start: usize,
    end: usize,
    log_prob: f64,
) -> Tuple {
    let terminus = arena.push(Tuple::base(Span::base_pair(start, end - 1), log_prob));
    let filler = Arc::new(FillerDerivation {
        start: start + 1,
        end: end - 1,
        log_prob: 0.0,
        pieces: Vec::new(),
    });
    Tuple::substituted(terminus, &arena[terminus], filler, 0.0)
}
