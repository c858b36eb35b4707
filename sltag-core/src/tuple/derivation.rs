use std::fmt::Write;

use serde::Serialize;

use super::{FillerDerivation, FillerPiece, Provenance, TupleArena, TupleId};
use crate::sequence::substring;
use crate::types::{Label, Span};

/// Owned, labeled view of a tuple's ancestry for reporting.
///
/// Shared sub-derivations in the arena are expanded once per occurrence, so
/// this is a tree even though the arena is a DAG.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivationTree {
    pub label: Label,
    pub span: Span,
    pub log_prob: f64,
    pub children: Vec<DerivationTree>,
}

impl DerivationTree {
    /// Expands the derivation of a committed tuple.
    #[must_use]
    pub fn build(arena: &TupleArena, id: TupleId) -> Self {
        let tuple = &arena[id];
        let children = match tuple.provenance() {
            Provenance::Base => Vec::new(),
            Provenance::Adjoin { extended, base } => {
                vec![Self::build(arena, *extended), Self::build(arena, *base)]
            }
            Provenance::Substitute { terminus, filler } => {
                vec![Self::build(arena, *terminus), Self::filler(arena, filler)]
            }
            Provenance::InsertLeft { insertable, flank }
            | Provenance::InsertRight { insertable, flank } => {
                vec![Self::build(arena, *flank), Self::build(arena, *insertable)]
            }
        };
        Self {
            label: tuple.label(),
            span: tuple.span(),
            log_prob: tuple.log_prob(),
            children,
        }
    }

    /// A scan-only filler is one `A` leaf; a compound one is a left-leaning
    /// chain of `Aj` joins over `As` scans and `Ai` splices.
    fn filler(arena: &TupleArena, filler: &FillerDerivation) -> Self {
        let is_trivial = filler.splice_count() == 0;
        if is_trivial {
            return Self::leaf(Label::Filler, filler.span(), filler.log_prob);
        }

        let mut pieces = filler.pieces.iter();
        let Some(first) = pieces.next() else {
            return Self::leaf(Label::Filler, filler.span(), filler.log_prob);
        };
        let mut chain = Self::piece(arena, first);
        for piece in pieces {
            let next = Self::piece(arena, piece);
            chain = Self {
                label: Label::FillerJoin,
                span: Span::segment(filler.start, piece.end()),
                log_prob: chain.log_prob + next.log_prob,
                children: vec![chain, next],
            };
        }
        chain
    }

    fn piece(arena: &TupleArena, piece: &FillerPiece) -> Self {
        match piece {
            FillerPiece::Scan {
                start,
                end,
                log_prob,
            } => Self::leaf(Label::FillerScan, Span::segment(*start, *end), *log_prob),
            FillerPiece::Splice {
                insertable,
                span,
                log_prob,
            } => Self {
                label: Label::FillerSplice,
                span: *span,
                log_prob: *log_prob,
                children: vec![Self::build(arena, *insertable)],
            },
        }
    }

    const fn leaf(label: Label, span: Span, log_prob: f64) -> Self {
        Self {
            label,
            span,
            log_prob,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.log_prob.exp()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Indented, one node per line: label, coordinates, covered text
    /// (`left|right` when the span has a gap) and probability.
    #[must_use]
    pub fn render(&self, sequence: &[u8]) -> String {
        let mut out = String::new();
        self.render_into(sequence, 0, &mut out);
        out
    }

    fn render_into(&self, sequence: &[u8], depth: usize, out: &mut String) {
        let Span { i, j, k, l } = self.span;
        let mut text = substring(sequence, i, j);
        if k < l {
            text.push('|');
            text.push_str(&substring(sequence, k, l));
        }
        let _ = writeln!(
            out,
            "{:indent$}{:<3} {} {} p={:.4e}",
            "",
            self.label.as_str(),
            self.span,
            text,
            self.probability(),
            indent = depth * 2
        );
        for child in &self.children {
            child.render_into(sequence, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Tuple;
    use std::sync::Arc;

    /// `gtag`: base (0,1,3,4) closed over the scanned filler `ta`.
    fn gtag_arena() -> (TupleArena, TupleId) {
        let mut arena = TupleArena::new();
        let base = arena.push(Tuple::base(Span::base_pair(0, 3), 0.225f64.ln()));
        let filler = Arc::new(FillerDerivation {
            start: 1,
            end: 3,
            log_prob: 0.06f64.ln(),
            pieces: vec![FillerPiece::Scan {
                start: 1,
                end: 3,
                log_prob: 0.06f64.ln(),
            }],
        });
        let closed = Tuple::substituted(base, &arena[base], filler, 0.04f64.ln());
        let id = arena.push(closed);
        (arena, id)
    }

    #[test]
    fn test_build_substitution_tree() {
        let (arena, id) = gtag_arena();
        let tree = DerivationTree::build(&arena, id);

        assert_eq!(tree.label, Label::Substitute);
        assert_eq!(tree.span, Span::new(0, 3, 3, 4));
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, Label::Base);
        assert_eq!(tree.children[1].label, Label::Filler);
        assert_eq!(tree.children[1].span, Span::segment(1, 3));
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_parent_log_prob_is_children_plus_factor() {
        let (arena, id) = gtag_arena();
        let tree = DerivationTree::build(&arena, id);
        let children: f64 = tree.children.iter().map(|c| c.log_prob).sum();
        assert!((tree.log_prob - (children + 0.04f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_compound_filler_chain() {
        let mut arena = TupleArena::new();
        let inner = arena.push(Tuple::base(Span::base_pair(3, 4), 0.2f64.ln()));
        let empty = Arc::new(FillerDerivation {
            start: 4,
            end: 4,
            log_prob: 0.0,
            pieces: Vec::new(),
        });
        let insertable = Tuple::substituted(inner, &arena[inner], empty, 0.0);
        let insertable = arena.push(insertable);
        let outer = arena.push(Tuple::base(Span::base_pair(0, 9), 0.2f64.ln()));

        let filler = Arc::new(FillerDerivation {
            start: 1,
            end: 9,
            log_prob: -10.0,
            pieces: vec![
                FillerPiece::Scan {
                    start: 1,
                    end: 3,
                    log_prob: -2.0,
                },
                FillerPiece::Splice {
                    insertable,
                    span: Span::new(3, 4, 4, 5),
                    log_prob: -6.0,
                },
                FillerPiece::Scan {
                    start: 5,
                    end: 9,
                    log_prob: -2.0,
                },
            ],
        });
        let closed = Tuple::substituted(outer, &arena[outer], filler, 0.0);
        let closed = arena.push(closed);

        let tree = DerivationTree::build(&arena, closed);
        let filler_tree = &tree.children[1];
        assert_eq!(filler_tree.label, Label::FillerJoin);
        assert_eq!(filler_tree.span, Span::segment(1, 9));
        assert!((filler_tree.log_prob + 10.0).abs() < 1e-12);

        let left = &filler_tree.children[0];
        assert_eq!(left.label, Label::FillerJoin);
        assert_eq!(left.span, Span::segment(1, 5));
        assert_eq!(left.children[0].label, Label::FillerScan);
        assert_eq!(left.children[1].label, Label::FillerSplice);
        assert_eq!(left.children[1].children[0].label, Label::Substitute);
        assert_eq!(filler_tree.children[1].label, Label::FillerScan);
    }

    #[test]
    fn test_render_lists_every_node() {
        let (arena, id) = gtag_arena();
        let rendered = DerivationTree::build(&arena, id).render(b"gtag");
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Bs  (0,3,3,4) gta|g"));
        assert!(lines[1].starts_with("  B   (0,1,3,4) g|g"));
        assert!(lines[2].starts_with("  A   (1,3,3,3) ta"));
    }
}
