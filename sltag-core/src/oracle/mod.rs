//! Self-alignment oracles.
//!
//! The grammar seeds base pairs only where an oracle says two positions take
//! part in a mutual self-similarity. Positions are 1-based, as in the
//! alignment tables the oracles are usually built from.

use std::collections::HashSet;

pub mod tabular;

pub use tabular::{parse_self_alignment, read_self_alignment};

/// Judge of whether two sequence positions are mutually aligned.
pub trait SelfAlignmentOracle: Send + Sync {
    /// True when 1-based positions `pos1` and `pos2` are aligned.
    fn aligned_pair(&self, pos1: usize, pos2: usize) -> bool;
}

/// Accepts every pair, which turns Initialize into exhaustive base-pair
/// enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMatch;

impl SelfAlignmentOracle for AllMatch {
    fn aligned_pair(&self, _pos1: usize, _pos2: usize) -> bool {
        true
    }
}

/// Explicit set of aligned position pairs, order-insensitive.
///
/// # Examples
///
/// ```rust
/// use sltag_core::oracle::{PairSet, SelfAlignmentOracle};
///
/// let oracle = PairSet::new([(1, 4)]);
/// assert!(oracle.aligned_pair(4, 1));
/// assert!(!oracle.aligned_pair(2, 3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PairSet {
    pairs: HashSet<(usize, usize)>,
}

impl PairSet {
    pub fn new(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut set = Self::default();
        for (pos1, pos2) in pairs {
            set.insert(pos1, pos2);
        }
        set
    }

    pub fn insert(&mut self, pos1: usize, pos2: usize) {
        self.pairs.insert((pos1.min(pos2), pos1.max(pos2)));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl SelfAlignmentOracle for PairSet {
    fn aligned_pair(&self, pos1: usize, pos2: usize) -> bool {
        self.pairs.contains(&(pos1.min(pos2), pos1.max(pos2)))
    }
}

/// Two aligned blocks, each 1-based inclusive `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPair {
    pub first: (usize, usize),
    pub second: (usize, usize),
}

impl BlockPair {
    /// Orders the two blocks by start so mirrored hits compare equal.
    #[must_use]
    pub fn new(a: (usize, usize), b: (usize, usize)) -> Self {
        let a = (a.0.min(a.1), a.0.max(a.1));
        let b = (b.0.min(b.1), b.0.max(b.1));
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    fn contains(block: (usize, usize), pos: usize) -> bool {
        block.0 <= pos && pos <= block.1
    }

    #[must_use]
    pub fn pairs(&self, pos1: usize, pos2: usize) -> bool {
        (Self::contains(self.first, pos1) && Self::contains(self.second, pos2))
            || (Self::contains(self.first, pos2) && Self::contains(self.second, pos1))
    }
}

/// Aligned block pairs from a self-comparison; a position pair is aligned
/// when one position falls in one block and the other in its partner.
#[derive(Debug, Clone, Default)]
pub struct AlignmentBlocks {
    blocks: Vec<BlockPair>,
}

impl AlignmentBlocks {
    pub fn new(blocks: impl IntoIterator<Item = BlockPair>) -> Self {
        let mut blocks: Vec<BlockPair> = blocks.into_iter().collect();
        blocks.sort_unstable();
        blocks.dedup();
        Self { blocks }
    }

    #[must_use]
    pub fn blocks(&self) -> &[BlockPair] {
        &self.blocks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl SelfAlignmentOracle for AlignmentBlocks {
    fn aligned_pair(&self, pos1: usize, pos2: usize) -> bool {
        self.blocks.iter().any(|block| block.pairs(pos1, pos2))
    }
}
