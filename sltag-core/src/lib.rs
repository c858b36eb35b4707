//! # SLTAG - Stochastic Tree-Adjoining Parser for DNA Repeats
//!
//! A chart parser that recognizes self-similar repeat structures (long
//! terminal repeats, terminal inverted repeat style termini) in a single DNA
//! sequence and reports their most probable derivations.
//!
//! ## Overview
//!
//! Two substrings `[i, j)` and `[k, l)` of the input are paired base by base,
//! seeded only where a self-alignment oracle reports similarity. Terminus
//! pairs grow by adjoining further base pairs, close over a filler segment,
//! and may have whole sub-repeats (insertables) spliced into them. The input
//! is accepted when some derivation covers it end to end as one closed pair.
//!
//! ## Features
//!
//! - **Staged chart**: tuples are built in order of yield, one stage at a time
//! - **Beam filters**: match, insertables and identical-coordinate pruning
//! - **Oracles**: explicit pairs, exhaustive matching or BLAST tabular output
//! - **Parallel evaluation**: candidate generation uses Rayon
//! - **Type Safety**: only validated input can be parsed
//!
//! ## Quick Start
//!
//! ```rust
//! use sltag_core::{SltagAnalyzer, config::SltagConfig, oracle::PairSet};
//!
//! let analyzer = SltagAnalyzer::new(SltagConfig::default());
//! let oracle = PairSet::new([(1, 4)]);
//! let results = analyzer.analyze_sequence("gtag", Some("ltr".to_string()), &oracle)?;
//!
//! let best = results.best().expect("gtag is a closed repeat");
//! assert_eq!((best.left.as_str(), best.right.as_str()), ("gta", "g"));
//! # Ok::<(), sltag_core::types::SltagError>(())
//! ```
//!
//! ## Architecture
//!
//! ```rust
//! use sltag_core::engine::Grammar;
//! use sltag_core::config::SltagConfig;
//! use sltag_core::oracle::AllMatch;
//!
//! // Unvalidated -> Validated; only the latter has `parse`
//! let grammar = Grammar::new(b"acgt", &AllMatch, SltagConfig::default())
//!     .with_header("tiny", None)
//!     .validate()?;
//! let results = grammar.parse()?;
//! println!("{:?} after {} stages", results.outcome, results.stats.stages);
//! # Ok::<(), sltag_core::types::SltagError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Tunables and TOML loading
//! - [`engine`]: Grammar stage loop and the [`SltagAnalyzer`] front end
//! - [`tuple`]: Scored tuples, the arena and derivation trees
//! - [`index`]: Staged tuple indices and the insertables index
//! - [`trees`]: The terminus tree (B1) and filler tree (A1)
//! - [`filters`]: Per-stage pruning
//! - [`oracle`]: Self-alignment oracles
//! - [`probability`]: Emission and operation probabilities
//! - [`output`]: Text, BED and JSON writers
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, SltagError>`](types::SltagError).
//! A sequence with no accepting derivation is a normal
//! [`Rejected`](results::ParseOutcome::Rejected) outcome, not an error.

pub mod config;
pub mod constants;
pub mod engine;
pub mod filters;
pub mod index;
pub mod oracle;
pub mod output;
pub mod probability;
pub mod results;
pub mod sequence;
pub mod trees;
pub mod tuple;
pub mod types;

pub use engine::SltagAnalyzer;
