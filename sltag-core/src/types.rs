use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Four offsets `(i, j, k, l)` pairing the substrings `[i, j)` and `[k, l)`.
///
/// The ordering `i <= j <= k <= l` holds for every span; constructing one that
/// breaks it is a programming error and panics.
///
/// # Examples
///
/// ```rust
/// use sltag_core::types::Span;
///
/// let span = Span::new(0, 1, 3, 4);
/// assert_eq!(span.yield_len(), 2);
/// assert_eq!(span.extent(), 4);
/// assert!(!span.is_gap_free());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
}

impl Span {
    /// Creates a span, panicking if `i <= j <= k <= l` does not hold.
    #[must_use]
    pub fn new(i: usize, j: usize, k: usize, l: usize) -> Self {
        assert!(
            i <= j && j <= k && k <= l,
            "span ordering violated: ({i},{j},{k},{l})"
        );
        Self { i, j, k, l }
    }

    /// Span of a single base pair `(p, p+1, q, q+1)`.
    #[must_use]
    pub fn base_pair(p: usize, q: usize) -> Self {
        Self::new(p, p + 1, q, q + 1)
    }

    /// Span of a contiguous segment `[start, end)` with nothing on the right.
    #[must_use]
    pub fn segment(start: usize, end: usize) -> Self {
        Self::new(start, end, end, end)
    }

    /// Total bases covered by both substrings: `(j - i) + (l - k)`.
    #[must_use]
    pub const fn yield_len(&self) -> usize {
        (self.j - self.i) + (self.l - self.k)
    }

    /// Distance from the first to the last covered offset: `l - i`.
    #[must_use]
    pub const fn extent(&self) -> usize {
        self.l - self.i
    }

    /// True when the two substrings touch (`j == k`).
    #[must_use]
    pub const fn is_gap_free(&self) -> bool {
        self.j == self.k
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.i
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.l
    }

    /// Interval overlap of `[i, l)` against another span's `[i, l)`.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.i < other.l && other.i < self.l
    }

    /// True when `[i, l)` lies within `[start, end)`.
    #[must_use]
    pub const fn is_within(&self, start: usize, end: usize) -> bool {
        self.i >= start && self.l <= end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.i, self.j, self.k, self.l)
    }
}

/// Production label attached to tuples and derivation-tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    /// Single base-pair terminus seeded from the self-alignment oracle
    Base,
    /// Terminus pair extended by one base pair
    Adjoin,
    /// Terminus pair closed over a filler
    Substitute,
    /// Insertable spliced into the left terminus
    InsertLeft,
    /// Insertable spliced into the right terminus
    InsertRight,
    /// Filler scanned in one piece
    Filler,
    /// Scanned filler piece between splices
    FillerScan,
    /// Concatenation of two filler pieces
    FillerJoin,
    /// Insertable spliced into a filler
    FillerSplice,
}

impl Label {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "B",
            Self::Adjoin => "Ba",
            Self::Substitute => "Bs",
            Self::InsertLeft => "Bil",
            Self::InsertRight => "Bir",
            Self::Filler => "A",
            Self::FillerScan => "As",
            Self::FillerJoin => "Aj",
            Self::FillerSplice => "Ai",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types that can occur while configuring or running a parse
#[derive(Error, Debug)]
pub enum SltagError {
    /// Input sequence is empty or contains symbols outside {a,c,g,t}
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),
    /// A tunable is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// File I/O operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Malformed FASTA, alignment table or configuration file
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The caller raised the cancellation flag
    #[error("Parse cancelled before stage {stage}")]
    Cancelled { stage: usize },
    /// The configured time limit elapsed
    #[error("Time limit exceeded before stage {stage} ({elapsed:?} elapsed)")]
    DeadlineExceeded { stage: usize, elapsed: Duration },
    /// Worker pool could not be built
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_yield_and_extent() {
        let span = Span::new(2, 5, 9, 11);
        assert_eq!(span.yield_len(), 5);
        assert_eq!(span.extent(), 9);
        assert_eq!(span.start(), 2);
        assert_eq!(span.end(), 11);
    }

    #[test]
    fn test_span_constructors() {
        assert_eq!(Span::base_pair(3, 7), Span::new(3, 4, 7, 8));
        assert_eq!(Span::segment(4, 9), Span::new(4, 9, 9, 9));
        assert!(Span::segment(4, 9).is_gap_free());
        assert_eq!(Span::segment(4, 9).yield_len(), 5);
    }

    #[test]
    #[should_panic(expected = "span ordering violated")]
    fn test_span_rejects_bad_ordering() {
        let _ = Span::new(3, 2, 4, 5);
    }

    #[test]
    fn test_span_overlap_is_half_open() {
        let a = Span::segment(0, 5);
        let b = Span::segment(5, 8);
        let c = Span::segment(4, 6);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_span_is_within() {
        let span = Span::new(10, 20, 20, 30);
        assert!(span.is_within(10, 30));
        assert!(span.is_within(0, 40));
        assert!(!span.is_within(11, 30));
        assert!(!span.is_within(10, 29));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(0, 1, 3, 4).to_string(), "(0,1,3,4)");
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Base.to_string(), "B");
        assert_eq!(Label::InsertRight.to_string(), "Bir");
        assert_eq!(Label::FillerSplice.to_string(), "Ai");
    }

    #[test]
    fn test_error_messages() {
        let err = SltagError::InvalidSequence("bad symbol 'n' at 3".to_string());
        assert_eq!(err.to_string(), "Invalid sequence: bad symbol 'n' at 3");

        let err = SltagError::Cancelled { stage: 7 };
        assert!(err.to_string().contains("stage 7"));
    }
}
