//! Committed tuple indices and their per-stage staging buffers.
//!
//! A stage stages candidates into a [`StagePool`]; each index keeps only the
//! [`StagedId`]s it was offered. Filters cull those buffers, then
//! [`StagePool::commit`] moves every surviving candidate into the arena exactly
//! once and each index registers the resulting [`TupleId`]s.

use std::collections::HashMap;

use crate::tuple::{Tuple, TupleArena, TupleId};
use crate::types::Span;

pub mod insertables;

pub use insertables::InsertablesIndex;

/// Position of a candidate inside the current stage's [`StagePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StagedId(usize);

/// Owner of the candidates produced during one stage.
#[derive(Debug, Default)]
pub struct StagePool {
    tuples: Vec<Tuple>,
}

impl StagePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tuple: Tuple) -> StagedId {
        let id = StagedId(self.tuples.len());
        self.tuples.push(tuple);
        id
    }

    #[must_use]
    pub fn get(&self, id: StagedId) -> &Tuple {
        &self.tuples[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Moves every retained candidate into the arena, in staging order, and
    /// drops the rest.
    pub fn commit(
        self,
        arena: &mut TupleArena,
        retained: impl IntoIterator<Item = StagedId>,
    ) -> CommitMap {
        let mut keep = vec![false; self.tuples.len()];
        for id in retained {
            keep[id.0] = true;
        }

        let ids = self
            .tuples
            .into_iter()
            .zip(keep)
            .map(|(tuple, kept)| kept.then(|| arena.push(tuple)))
            .collect();
        CommitMap { ids }
    }
}

/// Staged position to committed handle, for one stage
#[derive(Debug)]
pub struct CommitMap {
    ids: Vec<Option<TupleId>>,
}

impl CommitMap {
    /// Handle of a committed candidate. Panics for a candidate that was not
    /// retained by any buffer.
    #[must_use]
    pub fn resolve(&self, id: StagedId) -> TupleId {
        self.ids[id.0].unwrap_or_else(|| panic!("staged tuple {} was never committed", id.0))
    }

    #[must_use]
    pub fn committed(&self) -> usize {
        self.ids.iter().flatten().count()
    }
}

/// A growable set of committed tuples with lookup mappings.
///
/// Every mapping is updated in the same call that registers a tuple, so the
/// mappings always describe exactly [`all`](Self::all).
#[derive(Debug)]
pub struct TupleIndex {
    name: &'static str,
    all: Vec<TupleId>,
    by_yield: HashMap<usize, Vec<TupleId>>,
    by_yield_and_j: HashMap<(usize, usize), Vec<TupleId>>,
    by_yield_and_l: HashMap<(usize, usize), Vec<TupleId>>,
    by_coords: HashMap<Span, Vec<TupleId>>,
    by_extent: HashMap<usize, Vec<TupleId>>,
    staged: Vec<StagedId>,
    staging_open: bool,
}

impl TupleIndex {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            all: Vec::new(),
            by_yield: HashMap::new(),
            by_yield_and_j: HashMap::new(),
            by_yield_and_l: HashMap::new(),
            by_coords: HashMap::new(),
            by_extent: HashMap::new(),
            staged: Vec::new(),
            staging_open: false,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Opens an empty staging buffer for the next stage.
    pub fn begin_stage(&mut self) {
        assert!(
            !self.staging_open,
            "{}: stage opened twice without commit",
            self.name
        );
        self.staged.clear();
        self.staging_open = true;
    }

    /// Offers a candidate to this index's staging buffer.
    pub fn stage(&mut self, id: StagedId) {
        assert!(self.staging_open, "{}: staging outside a stage", self.name);
        self.staged.push(id);
    }

    #[must_use]
    pub fn staged(&self) -> &[StagedId] {
        &self.staged
    }

    /// Staging buffer for filters; committed tuples are not reachable here.
    pub fn staged_mut(&mut self) -> &mut Vec<StagedId> {
        &mut self.staged
    }

    /// Registers the retained buffer and discards it. Returns the number of
    /// tuples committed to this index.
    pub fn complete_stage(&mut self, commit: &CommitMap, arena: &TupleArena) -> usize {
        assert!(self.staging_open, "{}: commit outside a stage", self.name);
        let staged = std::mem::take(&mut self.staged);
        for staged_id in &staged {
            self.register(commit.resolve(*staged_id), arena);
        }
        self.staging_open = false;
        staged.len()
    }

    fn register(&mut self, id: TupleId, arena: &TupleArena) {
        let span = arena[id].span();
        let yield_len = span.yield_len();
        self.all.push(id);
        self.by_yield.entry(yield_len).or_default().push(id);
        self.by_yield_and_j
            .entry((yield_len, span.j))
            .or_default()
            .push(id);
        self.by_yield_and_l
            .entry((yield_len, span.l))
            .or_default()
            .push(id);
        self.by_coords.entry(span).or_default().push(id);
        self.by_extent.entry(span.extent()).or_default().push(id);
    }

    #[must_use]
    pub fn all(&self) -> &[TupleId] {
        &self.all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    #[must_use]
    pub fn with_yield(&self, yield_len: usize) -> &[TupleId] {
        self.by_yield
            .get(&yield_len)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn with_yield_and_j(&self, yield_len: usize, j: usize) -> &[TupleId] {
        self.by_yield_and_j
            .get(&(yield_len, j))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn with_yield_and_l(&self, yield_len: usize, l: usize) -> &[TupleId] {
        self.by_yield_and_l
            .get(&(yield_len, l))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Tuples at exactly these coordinates.
    #[must_use]
    pub fn at(&self, span: Span) -> &[TupleId] {
        self.by_coords
            .get(&span)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Tuples whose `l - i` equals `extent`.
    #[must_use]
    pub fn with_extent(&self, extent: usize) -> &[TupleId] {
        self.by_extent
            .get(&extent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
