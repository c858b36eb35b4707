//! Probability tables for the repeat grammar.
//!
//! Every score in the parser is a natural-log probability. A probability of
//! exactly zero (a disallowed base pair, say) becomes `-inf` and any candidate
//! carrying it is dropped before it reaches a staging buffer.

use serde::{Deserialize, Serialize};

use crate::constants::{
    A1_SUBSTITUTE_PROBABILITY, B1_ADJOIN_PROBABILITY, B1_SUBSTITUTE_PROBABILITY,
    FILLER_EMISSION_PROBABILITY, INSERT_PROBABILITY, MATCH_PROBABILITY, NUM_BASES,
    TRANSITION_PROBABILITY, TRANSVERSION_PROBABILITY,
};
use crate::sequence::char_to_nuc;
use crate::types::SltagError;

/// Natural log of a probability, mapping zero to negative infinity.
#[inline]
#[must_use]
pub fn ln_probability(probability: f64) -> f64 {
    if probability > 0.0 {
        probability.ln()
    } else {
        f64::NEG_INFINITY
    }
}

/// True when a log probability can still take part in a product.
#[inline]
#[must_use]
pub fn is_viable(log_probability: f64) -> bool {
    log_probability > f64::NEG_INFINITY
}

/// Pairing probabilities for ordered base pairs, indexed `[a, c, g, t]`.
///
/// # Examples
///
/// ```rust
/// use sltag_core::probability::BasePairTable;
///
/// let table = BasePairTable::default();
/// assert_eq!(table.probability(b'a', b'g'), table.probability(b'G', b'A'));
/// assert!(table.is_symmetric());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasePairTable {
    probabilities: [[f64; NUM_BASES]; NUM_BASES],
}

impl BasePairTable {
    /// Builds the table from match / transition / transversion classes.
    #[must_use]
    pub fn from_classes(matched: f64, transition: f64, transversion: f64) -> Self {
        let mut probabilities = [[transversion; NUM_BASES]; NUM_BASES];
        for (base, row) in probabilities.iter_mut().enumerate() {
            row[base] = matched;
        }
        // a<->g and c<->t
        for (x, y) in [(0, 2), (1, 3)] {
            probabilities[x][y] = transition;
            probabilities[y][x] = transition;
        }
        Self { probabilities }
    }

    /// Builds the table from an explicit matrix. The matrix must be symmetric.
    ///
    /// # Errors
    ///
    /// Returns [`SltagError::InvalidConfig`] for an asymmetric matrix or an
    /// entry outside `[0, 1]`.
    pub fn from_matrix(probabilities: [[f64; NUM_BASES]; NUM_BASES]) -> Result<Self, SltagError> {
        let table = Self { probabilities };
        table.validate()?;
        Ok(table)
    }

    /// Probability of pairing two bases (case-insensitive ASCII).
    ///
    /// # Panics
    ///
    /// Panics if either byte is not one of `acgt`; sequences are validated
    /// before any lookup.
    #[must_use]
    pub fn probability(&self, x: u8, y: u8) -> f64 {
        let (a, b) = (char_to_nuc(x) as usize, char_to_nuc(y) as usize);
        assert!(
            a < NUM_BASES && b < NUM_BASES,
            "base-pair lookup on non-DNA symbols {:?}/{:?}",
            x as char,
            y as char
        );
        self.probabilities[a][b]
    }

    #[must_use]
    pub fn log_probability(&self, x: u8, y: u8) -> f64 {
        ln_probability(self.probability(x, y))
    }

    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        (0..NUM_BASES).all(|a| (0..NUM_BASES).all(|b| self.probabilities[a][b] == self.probabilities[b][a]))
    }

    /// # Errors
    ///
    /// Returns [`SltagError::InvalidConfig`] when the table is asymmetric or
    /// holds a value outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SltagError> {
        if let Some(value) = self
            .probabilities
            .iter()
            .flatten()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(SltagError::InvalidConfig(format!(
                "base-pair probability {value} outside [0, 1]"
            )));
        }
        if !self.is_symmetric() {
            return Err(SltagError::InvalidConfig(
                "base-pair table must be symmetric".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BasePairTable {
    fn default() -> Self {
        Self::from_classes(
            MATCH_PROBABILITY,
            TRANSITION_PROBABILITY,
            TRANSVERSION_PROBABILITY,
        )
    }
}

/// Discount factors applied by each grammar operation.
///
/// These do not sum to one across productions; they are kept as tuned
/// upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationProbabilities {
    /// Splicing an insertable (`INSERT`)
    pub insert: f64,
    /// Extending a terminus pair (`B1_ADJOIN`)
    pub b1_adjoin: f64,
    /// Closing a terminus pair over a filler (`B1_SUBSTITUTE`)
    pub b1_substitute: f64,
    /// Scanning one filler base (`A1_SUBSTITUTE`)
    pub a1_substitute: f64,
}

impl Default for OperationProbabilities {
    fn default() -> Self {
        Self {
            insert: INSERT_PROBABILITY,
            b1_adjoin: B1_ADJOIN_PROBABILITY,
            b1_substitute: B1_SUBSTITUTE_PROBABILITY,
            a1_substitute: A1_SUBSTITUTE_PROBABILITY,
        }
    }
}

impl OperationProbabilities {
    fn validate(&self) -> Result<(), SltagError> {
        for (name, value) in [
            ("insert", self.insert),
            ("b1_adjoin", self.b1_adjoin),
            ("b1_substitute", self.b1_substitute),
            ("a1_substitute", self.a1_substitute),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(SltagError::InvalidConfig(format!(
                    "operation probability {name} = {value} outside (0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Static probability model shared by both trees and the filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityModel {
    /// Symmetric pairing table for terminus base pairs
    pub base_pairs: BasePairTable,
    /// Operation discounts
    pub operations: OperationProbabilities,
    /// Emission probability of one filler base
    pub filler_emission: f64,
}

impl Default for ProbabilityModel {
    fn default() -> Self {
        Self {
            base_pairs: BasePairTable::default(),
            operations: OperationProbabilities::default(),
            filler_emission: FILLER_EMISSION_PROBABILITY,
        }
    }
}

impl ProbabilityModel {
    /// Probability of an unannotated filler of `length` bases:
    /// `emission^length * a1_substitute^length`.
    #[must_use]
    pub fn filler_probability(&self, length: usize) -> f64 {
        let exponent = i32::try_from(length).unwrap_or(i32::MAX);
        self.filler_emission.powi(exponent) * self.operations.a1_substitute.powi(exponent)
    }

    /// Log-space [`filler_probability`](Self::filler_probability); stays finite
    /// for long fillers whose linear probability underflows.
    #[must_use]
    pub fn filler_log_probability(&self, length: usize) -> f64 {
        if length == 0 {
            return 0.0;
        }
        length as f64
            * (ln_probability(self.filler_emission) + ln_probability(self.operations.a1_substitute))
    }

    #[must_use]
    pub fn log_insert(&self) -> f64 {
        ln_probability(self.operations.insert)
    }

    #[must_use]
    pub fn log_b1_adjoin(&self) -> f64 {
        ln_probability(self.operations.b1_adjoin)
    }

    #[must_use]
    pub fn log_b1_substitute(&self) -> f64 {
        ln_probability(self.operations.b1_substitute)
    }

    /// # Errors
    ///
    /// Returns [`SltagError::InvalidConfig`] if any table or factor is out of
    /// range.
    pub fn validate(&self) -> Result<(), SltagError> {
        self.base_pairs.validate()?;
        self.operations.validate()?;
        if !(self.filler_emission > 0.0 && self.filler_emission <= 1.0) {
            return Err(SltagError::InvalidConfig(format!(
                "filler emission {} outside (0, 1]",
                self.filler_emission
            )));
        }
        Ok(())
    }
}
