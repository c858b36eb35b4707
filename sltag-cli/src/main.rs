//! # SLTAG CLI - Command-Line Repeat Recognizer
//!
//! A command-line interface for the SLTAG repeat-structure parser.
//!
//! ## Usage
//!
//! ```bash
//! # Parse every record against an exhaustive oracle
//! sltag -i candidates.fasta
//!
//! # Seed base pairs from a BLAST self-comparison, write BED
//! sltag -i ltr.fasta -a ltr.self.outfmt6 -f bed -o ltr.bed
//!
//! # Load tunables from TOML, override one on the command line
//! sltag -i ltr.fasta -c sltag.toml --alpha-match 1e-6
//! ```
//!
//! ## Options
//!
//! - `-i, --input <FILE>`: Input FASTA file
//! - `-a, --alignment <FILE>`: Self-alignment in BLAST tabular format (default: every pair aligns)
//! - `-o, --output <FILE>`: Output file (default: stdout)
//! - `-f, --format <FORMAT>`: Output format: text, bed, json (default: text)
//! - `-c, --config <FILE>`: TOML configuration file
//! - `-t, --threads <N>`: Worker threads (default: all cores)
//! - `--time-limit <SECONDS>`: Abort a sequence that runs longer than this
//! - `-q, --quiet`: Only log warnings and errors
//!
//! Log verbosity follows the `SLTAG_LOG` environment variable.

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use sltag_core::config::{OutputFormat, SltagConfig};
use sltag_core::constants::LOG_ENV_VAR;
use sltag_core::oracle::{AllMatch, SelfAlignmentOracle, read_self_alignment};
use sltag_core::output::write_results;
use sltag_core::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sltag")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stochastic tree-adjoining parser for self-similar DNA repeats")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required(true)
                .help("Input FASTA file"),
        )
        .arg(
            Arg::new("alignment")
                .short('a')
                .long("alignment")
                .value_name("FILE")
                .help("Self-alignment in BLAST tabular format (default: every pair aligns)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: text, bed, json")
                .value_parser(value_parser!(OutputFormat)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("min-insertable-length")
                .long("min-insertable-length")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Minimum extent of an insertable sub-repeat"),
        )
        .arg(
            Arg::new("max-insertions")
                .long("max-insertions")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Maximum insertables spliced into one filler"),
        )
        .arg(
            Arg::new("alpha-match")
                .long("alpha-match")
                .value_name("ALPHA")
                .value_parser(value_parser!(f64))
                .help("Match filter coefficient"),
        )
        .arg(
            Arg::new("alpha-insertables")
                .long("alpha-insertables")
                .value_name("ALPHA")
                .value_parser(value_parser!(f64))
                .help("Insertables filter coefficient"),
        )
        .arg(
            Arg::new("alpha-identical")
                .long("alpha-identical")
                .value_name("ALPHA")
                .value_parser(value_parser!(f64))
                .help("Identical-coordinates filter coefficient"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Worker threads (default: all cores)"),
        )
        .arg(
            Arg::new("time-limit")
                .long("time-limit")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("Abort a sequence after this many seconds"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log warnings and errors"),
        )
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// File values first, command-line flags on top.
fn build_config(matches: &ArgMatches) -> Result<SltagConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SltagConfig::from_toml_file(path)?,
        None => SltagConfig::default(),
    };

    if let Some(format) = matches.get_one::<OutputFormat>("format") {
        config.output_format = *format;
    }
    if let Some(length) = matches.get_one::<usize>("min-insertable-length") {
        config.min_insertable_length = *length;
    }
    if let Some(max) = matches.get_one::<usize>("max-insertions") {
        config.max_insertions_per_middle = *max;
    }
    if let Some(alpha) = matches.get_one::<f64>("alpha-match") {
        config.alpha_match = *alpha;
    }
    if let Some(alpha) = matches.get_one::<f64>("alpha-insertables") {
        config.alpha_insertables = *alpha;
    }
    if let Some(alpha) = matches.get_one::<f64>("alpha-identical") {
        config.alpha_identical_coords = *alpha;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.num_threads = Some(*threads);
    }
    if let Some(seconds) = matches.get_one::<f64>("time-limit") {
        let limit = Duration::try_from_secs_f64(*seconds)
            .map_err(|e| format!("Invalid time limit {seconds}: {e}"))?;
        config.time_limit = Some(limit);
    }

    config.validate()?;
    Ok(config)
}

/// Main entry point for the SLTAG CLI application.
///
/// Parses command-line arguments, loads the configuration and the oracle,
/// parses every input record and writes results in the requested format.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("quiet"));

    let config = build_config(&matches)?;
    let oracle: Box<dyn SelfAlignmentOracle> = match matches.get_one::<String>("alignment") {
        Some(path) => Box::new(read_self_alignment(path)?),
        None => Box::new(AllMatch),
    };

    let input = matches
        .get_one::<String>("input")
        .ok_or("An input FASTA file is required")?;
    let analyzer = SltagAnalyzer::new(config);
    let results = analyzer.analyze_fasta_file(input, oracle.as_ref())?;

    let mut writer: Box<dyn Write> = if let Some(output_file) = matches.get_one::<String>("output")
    {
        Box::new(BufWriter::new(File::create(output_file)?))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    for result in &results {
        write_results(&mut writer, result, analyzer.config.output_format)?;
    }
    writer.flush()?;

    info!(
        sequences = results.len(),
        accepted = results.iter().filter(|r| r.is_accepted()).count(),
        "analysis complete"
    );

    Ok(())
}
