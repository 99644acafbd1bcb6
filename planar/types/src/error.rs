//! Error types for solver configuration.
//!
//! The solver core itself never fails: degenerate constraints are absorbed
//! numerically (zeroed effective masses, downgraded block solves). Errors
//! only exist at the configuration boundary, before a step begins.

use thiserror::Error;

/// Errors reported when validating solver configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    /// Timestep is zero, negative, or not finite.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// An iteration count is zero.
    #[error("invalid iteration count: {which} iterations must be at least 1")]
    InvalidIterations {
        /// Which iteration budget was invalid ("velocity" or "position").
        which: &'static str,
    },

    /// A joint or contact parameter is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl SolverError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
