//! Body solver state.
//!
//! The island builder flattens every awake body into contiguous position and
//! velocity arrays for the duration of one step. Contacts and joints address
//! bodies only through their slot index into those arrays.

use nalgebra::{Isometry2, Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::body_transform;

/// Position state of one body: center of mass and orientation angle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyPosition {
    /// World-space center of mass.
    pub center: Point2<f64>,
    /// Orientation in radians, counter-clockwise.
    pub angle: f64,
}

impl BodyPosition {
    /// Create a position state.
    #[must_use]
    pub fn new(center: Point2<f64>, angle: f64) -> Self {
        Self { center, angle }
    }

    /// Body origin transform, given the center of mass in body-local frame.
    #[must_use]
    pub fn transform(&self, local_center: &Vector2<f64>) -> Isometry2<f64> {
        body_transform(&self.center, self.angle, local_center)
    }
}

impl Default for BodyPosition {
    fn default() -> Self {
        Self::new(Point2::origin(), 0.0)
    }
}

/// Velocity state of one body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyVelocity {
    /// Linear velocity of the center of mass.
    pub linear: Vector2<f64>,
    /// Angular velocity in radians per second, counter-clockwise.
    pub angular: f64,
}

impl BodyVelocity {
    /// Create a velocity state.
    #[must_use]
    pub fn new(linear: Vector2<f64>, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// A body at rest.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }
}

/// A body's solver slot together with the mass properties the solvers need.
///
/// The island builder produces one of these per body per step. Static bodies
/// carry zero inverse mass and inverse inertia, which makes every constraint
/// touching them one-sided without any special casing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverBody {
    /// Index into the island's position/velocity arrays. Stable for one step.
    pub index: usize,
    /// Inverse mass (zero for static bodies).
    pub inv_mass: f64,
    /// Inverse rotational inertia about the center of mass (zero for static).
    pub inv_inertia: f64,
    /// Center of mass in body-local frame.
    pub local_center: Vector2<f64>,
}

impl SolverBody {
    /// A dynamic body slot.
    #[must_use]
    pub fn dynamic(index: usize, mass: f64, inertia: f64, local_center: Vector2<f64>) -> Self {
        Self {
            index,
            inv_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            inv_inertia: if inertia > 0.0 { 1.0 / inertia } else { 0.0 },
            local_center,
        }
    }

    /// A static (infinite mass) body slot.
    #[must_use]
    pub fn fixed(index: usize) -> Self {
        Self {
            index,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            local_center: Vector2::zeros(),
        }
    }

    /// Whether this body resists no impulse at all.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0 && self.inv_inertia == 0.0
    }
}
