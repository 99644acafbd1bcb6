//! Per-tick step context.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SolverError;

/// Timestep data and solver feature flags for one physics tick.
///
/// The step driver builds one of these per tick and hands it unchanged to
/// every island. Keeping the flags here (rather than in process-wide state)
/// keeps the solvers reentrant when islands are dispatched to worker threads.
///
/// # Example
///
/// ```
/// use planar_types::StepContext;
///
/// let step = StepContext::new(1.0 / 60.0)
///     .with_iterations(8, 3)
///     .with_block_solve(true);
/// assert!(step.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepContext {
    /// Timestep length in seconds.
    pub dt: f64,

    /// Inverse timestep (zero when `dt` is zero).
    pub inv_dt: f64,

    /// Ratio of this timestep to the previous one.
    ///
    /// Warm-started impulses are scaled by this so that a variable timestep
    /// does not over- or under-apply last step's converged solution.
    pub dt_ratio: f64,

    /// Whether to seed solvers with last step's accumulated impulses.
    pub warm_starting: bool,

    /// Whether two-point contacts may use the coupled 2×2 block solver.
    ///
    /// Disabling this reproduces the legacy always-independent-points
    /// behavior exactly, which is useful for determinism comparisons.
    pub block_solve: bool,

    /// Number of velocity solver passes per step.
    pub velocity_iterations: usize,

    /// Number of position correction passes per step.
    pub position_iterations: usize,
}

impl StepContext {
    /// Create a step context for a fixed timestep with default iteration
    /// budgets (8 velocity, 3 position), warm starting and block solving on.
    #[must_use]
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: 1.0,
            warm_starting: true,
            block_solve: true,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }

    /// Create a context for a timestep following a step of `prev_dt`.
    ///
    /// Impulses scale with the timestep, so carried impulses are multiplied
    /// by `dt / prev_dt`.
    #[must_use]
    pub fn following(dt: f64, prev_dt: f64) -> Self {
        let mut step = Self::new(dt);
        step.dt_ratio = if prev_dt > 0.0 { dt / prev_dt } else { 0.0 };
        step
    }

    /// Set the velocity and position iteration budgets.
    #[must_use]
    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Enable or disable the two-point block solver.
    #[must_use]
    pub fn with_block_solve(mut self, enabled: bool) -> Self {
        self.block_solve = enabled;
        self
    }

    /// High-accuracy preset: more passes of both solvers.
    #[must_use]
    pub fn accurate(dt: f64) -> Self {
        Self::new(dt).with_iterations(16, 6)
    }

    /// Fast preset for scenes that tolerate softer stacking.
    #[must_use]
    pub fn fast(dt: f64) -> Self {
        Self::new(dt).with_iterations(4, 2)
    }

    /// Validate the context.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the timestep is not positive and finite or
    /// an iteration budget is zero.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SolverError::InvalidTimestep(self.dt));
        }
        if self.velocity_iterations == 0 {
            return Err(SolverError::InvalidIterations { which: "velocity" });
        }
        if self.position_iterations == 0 {
            return Err(SolverError::InvalidIterations { which: "position" });
        }
        Ok(())
    }
}
