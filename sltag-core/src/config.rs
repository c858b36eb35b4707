use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ALPHA_IDENTICAL_COORDS, ALPHA_INSERTABLES, ALPHA_MATCH, MAX_INSERTIONS_PER_MIDDLE,
    MIN_INSERTABLE_LENGTH,
};
use crate::probability::ProbabilityModel;
use crate::types::SltagError;

/// Output format options for parse reports.
///
/// # Formats
///
/// - **Text**: ranked derivations with indented derivation trees
/// - **BED**: left and right terminus intervals of each accepted derivation
/// - **JSON**: the complete result structure
///
/// # Examples
///
/// ```rust
/// use sltag_core::config::{OutputFormat, SltagConfig};
///
/// let config = SltagConfig {
///     output_format: OutputFormat::Bed,
///     ..Default::default()
/// };
/// assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report with nested derivation trees.
    #[default]
    Text,

    /// BED6 intervals, two lines per accepted derivation.
    ///
    /// Coordinates are 0-based half-open, straight from the span offsets.
    Bed,

    /// Full results serialized with `serde_json`.
    Json,
}

impl FromStr for OutputFormat {
    type Err = SltagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "bed" => Ok(Self::Bed),
            "json" => Ok(Self::Json),
            other => Err(SltagError::InvalidConfig(format!(
                "unknown output format {other:?} (expected text, bed or json)"
            ))),
        }
    }
}

/// Configuration settings for a repeat-structure parse.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
///
/// # Examples
///
/// ## Default configuration
///
/// ```rust
/// use sltag_core::config::SltagConfig;
///
/// let config = SltagConfig::default();
/// assert_eq!(config.min_insertable_length, 100);
/// ```
///
/// ## Short insertables, bounded run time
///
/// ```rust
/// use std::time::Duration;
/// use sltag_core::config::SltagConfig;
///
/// let config = SltagConfig {
///     min_insertable_length: 20,
///     max_insertions_per_middle: 2,
///     time_limit: Some(Duration::from_secs(60)),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SltagConfig {
    /// Minimum `l - i` for a gap-free tuple to be registered as insertable.
    ///
    /// Sequences shorter than this use their own length as the minimum.
    ///
    /// **Default**: `100`
    pub min_insertable_length: usize,

    /// Largest number of insertables spliced into one filler.
    ///
    /// Subset enumeration grows combinatorially with this bound; `0` turns
    /// compound fillers off.
    ///
    /// **Default**: `5`
    pub max_insertions_per_middle: usize,

    /// Relative threshold of the match filter, in `[0, 1]`.
    ///
    /// **Default**: `1e-9`
    pub alpha_match: f64,

    /// Relative threshold of the insertables filter, in `[0, 1]`.
    ///
    /// **Default**: `0.5`
    pub alpha_insertables: f64,

    /// Relative threshold of the identical-coordinates filter, in `[0, 1]`.
    ///
    /// **Default**: `0.999`
    pub alpha_identical_coords: f64,

    /// Base-pair table, operation discounts and filler emission.
    pub probabilities: ProbabilityModel,

    /// Number of worker threads for within-stage parallelism.
    ///
    /// **Default**: `None` (rayon's global pool)
    pub num_threads: Option<usize>,

    /// Wall-clock budget, checked between stages. Written in seconds in
    /// TOML (`time_limit = 2.5`).
    ///
    /// **Default**: `None` (unbounded)
    #[serde(with = "seconds")]
    pub time_limit: Option<Duration>,

    /// Report format.
    ///
    /// **Default**: [`OutputFormat::Text`]
    pub output_format: OutputFormat,
}

/// `Option<Duration>` as fractional seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| D::Error::custom(format!("time_limit = {secs}: {e}")))
            })
            .transpose()
    }
}

impl Default for SltagConfig {
    fn default() -> Self {
        Self {
            min_insertable_length: MIN_INSERTABLE_LENGTH,
            max_insertions_per_middle: MAX_INSERTIONS_PER_MIDDLE,
            alpha_match: ALPHA_MATCH,
            alpha_insertables: ALPHA_INSERTABLES,
            alpha_identical_coords: ALPHA_IDENTICAL_COORDS,
            probabilities: ProbabilityModel::default(),
            num_threads: None,
            time_limit: None,
            output_format: OutputFormat::Text,
        }
    }
}

impl SltagConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SltagError::ParseError`] for malformed TOML and
    /// [`SltagError::InvalidConfig`] for out-of-range values.
    pub fn from_toml(toml_str: &str) -> Result<Self, SltagError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| SltagError::ParseError(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// As [`from_toml`](Self::from_toml), plus [`SltagError::IoError`] when
    /// the file cannot be read.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, SltagError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str::<Self>(&content)
            .map_err(|e| SltagError::ParseError(format!("{}: {e}", path.display())))
            .and_then(|config| config.validate().map(|()| config))
    }

    /// # Errors
    ///
    /// Returns [`SltagError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SltagError> {
        for (field, alpha) in [
            ("alpha_match", self.alpha_match),
            ("alpha_insertables", self.alpha_insertables),
            ("alpha_identical_coords", self.alpha_identical_coords),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(SltagError::InvalidConfig(format!(
                    "{field} = {alpha} must be between 0.0 and 1.0"
                )));
            }
        }
        if self.num_threads == Some(0) {
            return Err(SltagError::InvalidConfig(
                "num_threads must be greater than 0".to_string(),
            ));
        }
        if self.time_limit.is_some_and(|limit| limit.is_zero()) {
            return Err(SltagError::InvalidConfig(
                "time_limit must be greater than 0".to_string(),
            ));
        }
        self.probabilities.validate()
    }
}
