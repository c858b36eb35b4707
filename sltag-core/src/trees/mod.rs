//! The two grammar automata and the stage lifecycle they share.
//!
//! [`TreeB1`] grows and closes terminus pairs; [`TreeA1`] explains the gap
//! between them. They share no implementation, only the [`StagedTree`]
//! lifecycle the grammar drives once per stage.

use crate::index::{CommitMap, InsertablesIndex, StagePool, StagedId};
use crate::oracle::SelfAlignmentOracle;
use crate::tuple::TupleArena;

pub mod a1;
pub mod b1;

pub use a1::TreeA1;
pub use b1::TreeB1;

/// Everything a stage may read, plus the buffers it may write.
///
/// The arena holds only tuples committed in earlier stages; new candidates go
/// to `pool` and are offered to staging buffers by [`StagedId`].
pub struct StageContext<'a> {
    pub stage: usize,
    pub sequence: &'a [u8],
    pub oracle: &'a dyn SelfAlignmentOracle,
    pub arena: &'a TupleArena,
    pub insertables: &'a mut InsertablesIndex,
    pub pool: &'a mut StagePool,
}

/// Candidates generated by one stage, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub initialized: usize,
    pub adjoined: usize,
    pub substituted: usize,
    pub inserted: usize,
    pub insertable_candidates: usize,
}

impl StageCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.initialized + self.adjoined + self.substituted + self.inserted
    }
}

/// Candidates removed by each filter in one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub insertables: usize,
    pub matched: usize,
    pub identical: usize,
}

/// Per-stage lifecycle shared by both automata.
pub trait StagedTree {
    fn name(&self) -> &'static str;

    /// Opens staging state for `stage`.
    fn begin_stage(&mut self, stage: usize);

    /// Generates this stage's candidates into the staging buffers.
    fn evaluate_stage(&mut self, ctx: &mut StageContext<'_>) -> StageCounts;

    /// Prunes staging buffers before commit.
    fn filter_stage(&mut self, ctx: &mut StageContext<'_>) -> FilterCounts;

    /// Candidates this tree still holds after filtering.
    fn staged(&self) -> Vec<StagedId>;

    /// Registers committed candidates and closes the stage.
    fn complete_stage(&mut self, commit: &CommitMap, arena: &TupleArena);
}
