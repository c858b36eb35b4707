// =============================================================================
// Grammar thresholds
// =============================================================================

/// Minimum `l - i` for a gap-free tuple to be promoted to an insertable
pub const MIN_INSERTABLE_LENGTH: usize = 100;

/// Maximum number of insertables spliced into one filler segment
pub const MAX_INSERTIONS_PER_MIDDLE: usize = 5;

/// Match filter coefficient: survivors are within this factor of the best
/// tuple sharing the same left substring `(i, j)`
pub const ALPHA_MATCH: f64 = 1e-9;

/// Insertables filter coefficient against chance filler of the same length
pub const ALPHA_INSERTABLES: f64 = 0.5;

/// Identical-coordinates filter coefficient (not 1.0, to tolerate rounding)
pub const ALPHA_IDENTICAL_COORDS: f64 = 0.999;

// =============================================================================
// Base-pair emission probabilities
// =============================================================================

/// Probability of a matching pair (a/a, c/c, g/g, t/t)
pub const MATCH_PROBABILITY: f64 = 0.90 / 4.0;

/// Probability of a transition pair (a/g, c/t)
pub const TRANSITION_PROBABILITY: f64 = 0.12 / 4.0;

/// Probability of a transversion pair (a/c, a/t, c/g, g/t)
pub const TRANSVERSION_PROBABILITY: f64 = 0.08 / 8.0;

/// Emission probability of one unannotated filler base
pub const FILLER_EMISSION_PROBABILITY: f64 = 0.25;

// =============================================================================
// Operation probabilities
// =============================================================================

/// Discount for splicing an insertable into a terminus or a filler
pub const INSERT_PROBABILITY: f64 = 1e-2;

/// Discount for extending a terminus pair by one base pair
pub const B1_ADJOIN_PROBABILITY: f64 = 0.95;

/// Discount for closing a terminus pair over a filler
pub const B1_SUBSTITUTE_PROBABILITY: f64 = 1.0 - B1_ADJOIN_PROBABILITY - INSERT_PROBABILITY;

/// Per-base discount for scanning filler
pub const A1_SUBSTITUTE_PROBABILITY: f64 = 1.0 - INSERT_PROBABILITY;

// =============================================================================
// Sequence
// =============================================================================

/// Number of distinct bases
pub const NUM_BASES: usize = 4;

/// Header used when a sequence is analyzed without one
pub const DEFAULT_HEADER: &str = "SLTAG_Seq_1";

/// Environment variable read by the CLI for its log filter
pub const LOG_ENV_VAR: &str = "SLTAG_LOG";
