//! Rope joint: a one-sided tether that caps the distance between two anchor
//! points but never pushes them apart.

use nalgebra::{UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use planar_types::math::{cross, cross_scalar};
use planar_types::{SolverBody, SolverError, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use crate::joint::{Joint, SolverData};

/// Construction parameters for a [`RopeJoint`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RopeJointDef {
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Vector2<f64>,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Vector2<f64>,
    /// Maximum anchor distance the rope allows.
    pub max_length: f64,
}

impl RopeJointDef {
    /// A rope of the given maximum length anchored at the body origins.
    #[must_use]
    pub fn new(max_length: f64) -> Self {
        Self {
            local_anchor_a: Vector2::zeros(),
            local_anchor_b: Vector2::zeros(),
            max_length,
        }
    }

    /// Set the local anchor points.
    #[must_use]
    pub fn with_anchors(mut self, local_anchor_a: Vector2<f64>, local_anchor_b: Vector2<f64>) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] when the maximum length is not
    /// positive and finite.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.max_length.is_finite() || self.max_length <= 0.0 {
            return Err(SolverError::invalid_config(
                "rope joint max length must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// An inequality distance constraint: `|anchor_b - anchor_a| <= max_length`.
///
/// The accumulated impulse is clamped to be non-positive, so the rope can
/// only ever pull the bodies together. Inside the maximum length the joint
/// is completely slack and applies nothing.
#[derive(Debug, Clone)]
pub struct RopeJoint {
    body_a: SolverBody,
    body_b: SolverBody,
    local_anchor_a: Vector2<f64>,
    local_anchor_b: Vector2<f64>,
    max_length: f64,

    impulse: f64,

    // Step-scoped solver cache.
    u: Vector2<f64>,
    r_a: Vector2<f64>,
    r_b: Vector2<f64>,
    length: f64,
    mass: f64,
}

impl RopeJoint {
    /// Create the joint between two body slots.
    #[must_use]
    pub fn new(body_a: SolverBody, body_b: SolverBody, def: RopeJointDef) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            impulse: 0.0,
            u: Vector2::zeros(),
            r_a: Vector2::zeros(),
            r_b: Vector2::zeros(),
            length: 0.0,
            mass: 0.0,
        }
    }

    /// Accumulated impulse along the rope, for inspection. Never positive.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }

    /// Whether the rope was at or beyond its maximum length when the step's
    /// constraints were initialized.
    #[must_use]
    pub fn is_taut(&self) -> bool {
        self.length >= self.max_length
    }
}

impl Joint for RopeJoint {
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let pos_a = data.positions[self.body_a.index];
        let pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        self.r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        self.r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
        self.u = (pos_b.center + self.r_b) - (pos_a.center + self.r_a);

        self.length = self.u.norm();
        if self.length > LINEAR_SLOP {
            self.u /= self.length;
        } else {
            tracing::debug!("rope anchors coincide, disabling constraint for this step");
            self.u = Vector2::zeros();
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = cross(&self.r_a, &self.u);
        let cr_b = cross(&self.r_b, &self.u);
        let inv_mass = self.body_a.inv_mass
            + self.body_a.inv_inertia * cr_a * cr_a
            + self.body_b.inv_mass
            + self.body_b.inv_inertia * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p = self.impulse * self.u;
            let vel_a = &mut data.velocities[self.body_a.index];
            vel_a.linear -= self.body_a.inv_mass * p;
            vel_a.angular -= self.body_a.inv_inertia * cross(&self.r_a, &p);
            let vel_b = &mut data.velocities[self.body_b.index];
            vel_b.linear += self.body_b.inv_mass * p;
            vel_b.angular += self.body_b.inv_inertia * cross(&self.r_b, &p);
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let vel_a = data.velocities[self.body_a.index];
        let vel_b = data.velocities[self.body_b.index];

        let vp_a = vel_a.linear + cross_scalar(vel_a.angular, &self.r_a);
        let vp_b = vel_b.linear + cross_scalar(vel_b.angular, &self.r_b);
        let c = self.length - self.max_length;
        let mut c_dot = self.u.dot(&(vp_b - vp_a));

        // Speculative: while still slack, only cancel the part of the
        // approach speed that would overshoot the limit this step.
        if c < 0.0 {
            c_dot += data.step.inv_dt * c;
        }

        let mut impulse = -self.mass * c_dot;
        let old_impulse = self.impulse;
        self.impulse = (self.impulse + impulse).min(0.0);
        impulse = self.impulse - old_impulse;

        let p = impulse * self.u;
        let vel_a = &mut data.velocities[self.body_a.index];
        vel_a.linear -= self.body_a.inv_mass * p;
        vel_a.angular -= self.body_a.inv_inertia * cross(&self.r_a, &p);
        let vel_b = &mut data.velocities[self.body_b.index];
        vel_b.linear += self.body_b.inv_mass * p;
        vel_b.angular += self.body_b.inv_inertia * cross(&self.r_b, &p);
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let mut pos_a = data.positions[self.body_a.index];
        let mut pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        let r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        let r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
        let mut u = (pos_b.center + r_b) - (pos_a.center + r_a);

        let length = u.norm();
        if length > LINEAR_SLOP {
            u /= length;
        } else {
            return true;
        }
        // One-sided: only overshoot beyond the maximum length is corrected.
        let c = (length - self.max_length).clamp(0.0, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = impulse * u;

        pos_a.center -= self.body_a.inv_mass * p;
        pos_a.angle -= self.body_a.inv_inertia * cross(&r_a, &p);
        pos_b.center += self.body_b.inv_mass * p;
        pos_b.angle += self.body_b.inv_inertia * cross(&r_b, &p);

        data.positions[self.body_a.index] = pos_a;
        data.positions[self.body_b.index] = pos_b;

        length - self.max_length < LINEAR_SLOP
    }
}
