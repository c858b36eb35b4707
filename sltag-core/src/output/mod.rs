//! Report writers for parse results.
//!
//! ## Supported Formats
//!
//! - **Text**: outcome, ranked derivations and their indented trees
//! - **BED**: the left and right terminus intervals of each derivation
//! - **JSON**: the full [`ParseResults`] structure
//!
//! ## Examples
//!
//! ```rust
//! use sltag_core::{SltagAnalyzer, config::{OutputFormat, SltagConfig}};
//! use sltag_core::oracle::PairSet;
//! use sltag_core::output::write_results;
//!
//! let analyzer = SltagAnalyzer::new(SltagConfig::default());
//! let results = analyzer.analyze_sequence("gtag", Some("ltr".into()), &PairSet::new([(1, 4)]))?;
//!
//! let mut buffer = Vec::new();
//! write_results(&mut buffer, &results, OutputFormat::Bed)?;
//! assert!(String::from_utf8(buffer).unwrap().starts_with("ltr\t0\t1"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{config::OutputFormat, results::ParseResults, types::SltagError};
use std::io::Write;

mod formats {
    pub mod bed;
    pub mod json;
    pub mod text;
}

use formats::{bed::write_bed_format, json::write_json_format, text::write_text_format};

/// Writes the results of one sequence in the requested format.
///
/// # Errors
///
/// Returns [`SltagError`] if writing or serialization fails.
pub fn write_results<W: Write>(
    writer: &mut W,
    results: &ParseResults,
    format: OutputFormat,
) -> Result<(), SltagError> {
    match format {
        OutputFormat::Text => write_text_format(writer, results),
        OutputFormat::Bed => write_bed_format(writer, results),
        OutputFormat::Json => write_json_format(writer, results),
    }
}
