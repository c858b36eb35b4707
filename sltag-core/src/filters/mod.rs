//! Stage-local pruning of staging buffers.
//!
//! Every filter keeps a candidate when `log_prob >= ln(alpha) + max`, the
//! log form of `P >= alpha * max`. With `alpha <= 1` the group maximum always
//! survives, so applying a filter twice removes nothing more.

use std::collections::HashMap;

use crate::index::{StagePool, StagedId};
use crate::probability::{ProbabilityModel, ln_probability};
use crate::types::Span;

/// Culls candidates from one staging buffer.
pub trait TupleFilter {
    fn name(&self) -> &'static str;

    /// Removes culled candidates from `buffer` and returns how many went.
    fn apply(&self, pool: &StagePool, buffer: &mut Vec<StagedId>) -> usize;
}

fn retain_counted(buffer: &mut Vec<StagedId>, keep: impl FnMut(&StagedId) -> bool) -> usize {
    let before = buffer.len();
    buffer.retain(keep);
    before - buffer.len()
}

fn raise_max<K: std::hash::Hash + Eq>(maxima: &mut HashMap<K, f64>, key: K, log_prob: f64) {
    maxima
        .entry(key)
        .and_modify(|best| *best = best.max(log_prob))
        .or_insert(log_prob);
}

/// Keeps the competitive alternatives among candidates sharing `(i, j)`.
#[derive(Debug, Clone)]
pub struct MatchFilter {
    log_alpha: f64,
}

impl MatchFilter {
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            log_alpha: ln_probability(alpha),
        }
    }
}

impl TupleFilter for MatchFilter {
    fn name(&self) -> &'static str {
        "match"
    }

    fn apply(&self, pool: &StagePool, buffer: &mut Vec<StagedId>) -> usize {
        let mut maxima = HashMap::new();
        for id in buffer.iter() {
            let tuple = pool.get(*id);
            let span = tuple.span();
            raise_max(&mut maxima, (span.i, span.j), tuple.log_prob());
        }
        retain_counted(buffer, |id| {
            let tuple = pool.get(*id);
            let span = tuple.span();
            tuple.log_prob() >= self.log_alpha + maxima[&(span.i, span.j)]
        })
    }
}

/// Grouping key for identical coordinates: gap-free spans compare by
/// `(i, l)` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CoordinateKey {
    Touching(usize, usize),
    Exact(Span),
}

impl From<Span> for CoordinateKey {
    fn from(span: Span) -> Self {
        if span.is_gap_free() {
            Self::Touching(span.i, span.l)
        } else {
            Self::Exact(span)
        }
    }
}

/// Keeps near-best candidates among those at the same coordinates.
///
/// Group maxima come from a reference set (the union of all staging buffers
/// of the stage), so the same thresholds apply to every buffer.
#[derive(Debug, Clone)]
pub struct IdenticalCoordinatesFilter {
    log_alpha: f64,
    maxima: HashMap<CoordinateKey, f64>,
}

impl IdenticalCoordinatesFilter {
    pub fn from_reference(
        alpha: f64,
        pool: &StagePool,
        reference: impl IntoIterator<Item = StagedId>,
    ) -> Self {
        let mut maxima = HashMap::new();
        for id in reference {
            let tuple = pool.get(id);
            raise_max(&mut maxima, CoordinateKey::from(tuple.span()), tuple.log_prob());
        }
        Self {
            log_alpha: ln_probability(alpha),
            maxima,
        }
    }
}

impl TupleFilter for IdenticalCoordinatesFilter {
    fn name(&self) -> &'static str {
        "identical-coordinates"
    }

    fn apply(&self, pool: &StagePool, buffer: &mut Vec<StagedId>) -> usize {
        retain_counted(buffer, |id| {
            let tuple = pool.get(*id);
            // A tuple outside the reference set is its own group
            let max = self
                .maxima
                .get(&CoordinateKey::from(tuple.span()))
                .copied()
                .unwrap_or(tuple.log_prob());
            tuple.log_prob() >= self.log_alpha + max
        })
    }
}

/// Keeps an insertable only when splicing it beats scanning the same bases as
/// filler: `P * INSERT >= alpha * fillerProbability(l - i)`.
#[derive(Debug, Clone)]
pub struct InsertablesFilter<'a> {
    log_alpha: f64,
    model: &'a ProbabilityModel,
}

impl<'a> InsertablesFilter<'a> {
    #[must_use]
    pub fn new(alpha: f64, model: &'a ProbabilityModel) -> Self {
        Self {
            log_alpha: ln_probability(alpha),
            model,
        }
    }

    #[must_use]
    pub fn accepts(&self, log_prob: f64, span: Span) -> bool {
        log_prob + self.model.log_insert()
            >= self.log_alpha + self.model.filler_log_probability(span.extent())
    }
}

impl TupleFilter for InsertablesFilter<'_> {
    fn name(&self) -> &'static str {
        "insertables"
    }

    fn apply(&self, pool: &StagePool, buffer: &mut Vec<StagedId>) -> usize {
        retain_counted(buffer, |id| {
            let tuple = pool.get(*id);
            self.accepts(tuple.log_prob(), tuple.span())
        })
    }
}
