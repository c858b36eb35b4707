use std::collections::HashMap;

use super::{CommitMap, StagedId, TupleIndex};
use crate::tuple::{TupleArena, TupleId};

/// Self-contained sub-parses available for splicing.
///
/// On top of the [`TupleIndex`] mappings it keeps every insertable sorted by
/// `(start, end, id)` and keyed by `(yield, start)`.
#[derive(Debug)]
pub struct InsertablesIndex {
    index: TupleIndex,
    by_start: Vec<(usize, usize, TupleId)>,
    by_yield_and_start: HashMap<(usize, usize), Vec<TupleId>>,
}

impl Default for InsertablesIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertablesIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: TupleIndex::new("insertables"),
            by_start: Vec::new(),
            by_yield_and_start: HashMap::new(),
        }
    }

    /// The plain index view (yield, coordinate and extent lookups).
    #[must_use]
    pub const fn index(&self) -> &TupleIndex {
        &self.index
    }

    pub fn begin_stage(&mut self) {
        self.index.begin_stage();
    }

    pub fn stage(&mut self, id: StagedId) {
        self.index.stage(id);
    }

    #[must_use]
    pub fn staged(&self) -> &[StagedId] {
        self.index.staged()
    }

    pub fn staged_mut(&mut self) -> &mut Vec<StagedId> {
        self.index.staged_mut()
    }

    /// Commits the retained buffer and re-sorts the start ordering.
    pub fn complete_stage(&mut self, commit: &CommitMap, arena: &TupleArena) -> usize {
        let first_new = self.index.len();
        let committed = self.index.complete_stage(commit, arena);
        for &id in &self.index.all()[first_new..] {
            let span = arena[id].span();
            self.by_start.push((span.i, span.l, id));
            self.by_yield_and_start
                .entry((span.yield_len(), span.i))
                .or_default()
                .push(id);
        }
        if committed > 0 {
            self.by_start.sort_unstable();
        }
        committed
    }

    #[must_use]
    pub fn all(&self) -> &[TupleId] {
        self.index.all()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn with_yield_and_start(&self, yield_len: usize, start: usize) -> &[TupleId] {
        self.by_yield_and_start
            .get(&(yield_len, start))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Insertables whose `[i, l)` lies within `[start, end)`, ordered by start.
    #[must_use]
    pub fn in_segment(&self, start: usize, end: usize) -> Vec<TupleId> {
        let first = self.by_start.partition_point(|(i, _, _)| *i < start);
        self.by_start[first..]
            .iter()
            .take_while(|(i, _, _)| *i < end)
            .filter(|(_, l, _)| *l <= end)
            .map(|(_, _, id)| *id)
            .collect()
    }

    /// Every non-empty subset of pairwise non-overlapping insertables within
    /// `[start, end)` holding at most `max_size` members. Members of each
    /// subset are ordered by start.
    #[must_use]
    pub fn combinations(
        &self,
        arena: &TupleArena,
        start: usize,
        end: usize,
        max_size: usize,
    ) -> Vec<Vec<TupleId>> {
        let candidates = self.in_segment(start, end);
        let mut subsets = Vec::new();
        let mut current = Vec::with_capacity(max_size);
        extend_combinations(arena, &candidates, 0, max_size, &mut current, &mut subsets);
        subsets
    }
}

fn extend_combinations(
    arena: &TupleArena,
    candidates: &[TupleId],
    from: usize,
    max_size: usize,
    current: &mut Vec<TupleId>,
    subsets: &mut Vec<Vec<TupleId>>,
) {
    if current.len() >= max_size {
        return;
    }
    for (offset, &candidate) in candidates[from..].iter().enumerate() {
        let span = arena[candidate].span();
        if current
            .iter()
            .any(|member| arena[*member].span().overlaps(&span))
        {
            continue;
        }
        current.push(candidate);
        subsets.push(current.clone());
        extend_combinations(arena, candidates, from + offset + 1, max_size, current, subsets);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::StagePool;
    use crate::tuple::gap_free_tuple;
    use crate::types::Span;

    /// Commits one stage of insertables with the given `(start, end)` bounds.
    fn insertables(arena: &mut TupleArena, bounds: &[(usize, usize)]) -> InsertablesIndex {
        let mut index = InsertablesIndex::new();
        let mut pool = StagePool::new();
        index.begin_stage();
        for &(start, end) in bounds {
            let tuple = gap_free_tuple(arena, start, end, -1.0);
            index.stage(pool.push(tuple));
        }
        let commit = pool.commit(arena, index.staged().to_vec());
        index.complete_stage(&commit, arena);
        index
    }

    #[test]
    fn test_in_segment_requires_containment() {
        let mut arena = TupleArena::new();
        let index = insertables(
            &mut arena,
            &[(10, 12), (20, 22), (48, 50), (49, 51), (8, 10)],
        );

        let found: Vec<Span> = index
            .in_segment(10, 50)
            .iter()
            .map(|id| arena[*id].span())
            .collect();
        assert_eq!(
            found,
            vec![
                Span::new(10, 11, 11, 12),
                Span::new(20, 21, 21, 22),
                Span::new(48, 49, 49, 50)
            ]
        );
    }

    #[test]
    fn test_three_disjoint_insertables_give_seven_subsets() {
        let mut arena = TupleArena::new();
        let index = insertables(&mut arena, &[(30, 32), (10, 12), (20, 22)]);

        let subsets = index.combinations(&arena, 10, 50, 5);
        assert_eq!(subsets.len(), 7);
        assert!(subsets.iter().all(|subset| {
            subset
                .windows(2)
                .all(|pair| arena[pair[0]].span().i < arena[pair[1]].span().i)
        }));
    }

    #[test]
    fn test_combinations_respect_max_size() {
        let mut arena = TupleArena::new();
        let index = insertables(&mut arena, &[(10, 12), (20, 22), (30, 32)]);

        assert_eq!(index.combinations(&arena, 10, 50, 1).len(), 3);
        assert_eq!(index.combinations(&arena, 10, 50, 2).len(), 6);
        assert!(index.combinations(&arena, 10, 50, 0).is_empty());
    }

    #[test]
    fn test_combinations_skip_overlapping_pairs() {
        let mut arena = TupleArena::new();
        let index = insertables(&mut arena, &[(10, 14), (12, 16), (20, 22)]);

        let subsets = index.combinations(&arena, 0, 30, 3);
        // singles: 3; pairs: (10,14)+(20,22), (12,16)+(20,22)
        assert_eq!(subsets.len(), 5);
        for subset in &subsets {
            for (a, b) in subset.iter().zip(subset.iter().skip(1)) {
                assert!(!arena[*a].span().overlaps(&arena[*b].span()));
            }
        }
    }

    #[test]
    fn test_touching_insertables_do_not_overlap() {
        let mut arena = TupleArena::new();
        let index = insertables(&mut arena, &[(10, 20), (20, 30)]);
        assert_eq!(index.combinations(&arena, 10, 30, 5).len(), 3);
    }

    #[test]
    fn test_yield_and_start_lookup() {
        let mut arena = TupleArena::new();
        let index = insertables(&mut arena, &[(10, 14), (10, 12)]);
        assert_eq!(index.with_yield_and_start(4, 10).len(), 1);
        assert_eq!(index.with_yield_and_start(2, 10).len(), 1);
        assert!(index.with_yield_and_start(2, 11).is_empty());
    }
}
