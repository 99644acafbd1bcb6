//! Distance joint: holds two anchor points at a fixed distance, or links
//! them with a damped spring when a positive stiffness is configured.

use nalgebra::{UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use planar_types::math::{cross, cross_scalar};
use planar_types::{SolverBody, SolverError, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use crate::joint::{linear_stiffness, Joint, SolverData};

/// Construction parameters for a [`DistanceJoint`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceJointDef {
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Vector2<f64>,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Vector2<f64>,
    /// Rest length between the anchors.
    pub length: f64,
    /// Spring stiffness in N/m. Zero makes the joint rigid.
    pub stiffness: f64,
    /// Spring damping in N·s/m. Ignored when rigid.
    pub damping: f64,
}

impl DistanceJointDef {
    /// A rigid joint with the given rest length and anchors at the body
    /// origins.
    #[must_use]
    pub fn new(length: f64) -> Self {
        Self {
            local_anchor_a: Vector2::zeros(),
            local_anchor_b: Vector2::zeros(),
            length,
            stiffness: 0.0,
            damping: 0.0,
        }
    }

    /// Set the local anchor points.
    #[must_use]
    pub fn with_anchors(mut self, local_anchor_a: Vector2<f64>, local_anchor_b: Vector2<f64>) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    /// Set the spring coefficients directly.
    #[must_use]
    pub fn with_stiffness(mut self, stiffness: f64, damping: f64) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Tune the spring by frequency and damping ratio for the given body
    /// masses.
    #[must_use]
    pub fn with_spring(mut self, hertz: f64, damping_ratio: f64, mass_a: f64, mass_b: f64) -> Self {
        let (stiffness, damping) = linear_stiffness(hertz, damping_ratio, mass_a, mass_b);
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] for a non-positive or
    /// non-finite length, or negative spring coefficients.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(SolverError::invalid_config(
                "distance joint length must be positive and finite",
            ));
        }
        if self.stiffness < 0.0 || self.damping < 0.0 {
            return Err(SolverError::invalid_config(
                "distance joint spring coefficients must be non-negative",
            ));
        }
        Ok(())
    }
}

/// A distance constraint between two body anchor points.
///
/// With zero stiffness the anchor distance is held exactly (up to solver
/// tolerance) and residual error is removed by the position pass. With
/// positive stiffness the constraint becomes an implicit damped spring
/// solved entirely in the velocity pass; the position pass then reports
/// convergence without touching the bodies, so a soft joint never fights
/// the contact position correction.
#[derive(Debug, Clone)]
pub struct DistanceJoint {
    body_a: SolverBody,
    body_b: SolverBody,
    local_anchor_a: Vector2<f64>,
    local_anchor_b: Vector2<f64>,
    length: f64,
    stiffness: f64,
    damping: f64,

    impulse: f64,

    // Step-scoped solver cache.
    u: Vector2<f64>,
    r_a: Vector2<f64>,
    r_b: Vector2<f64>,
    mass: f64,
    gamma: f64,
    bias: f64,
}

impl DistanceJoint {
    /// Create the joint between two body slots.
    #[must_use]
    pub fn new(body_a: SolverBody, body_b: SolverBody, def: DistanceJointDef) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length.max(LINEAR_SLOP),
            stiffness: def.stiffness,
            damping: def.damping,
            impulse: 0.0,
            u: Vector2::zeros(),
            r_a: Vector2::zeros(),
            r_b: Vector2::zeros(),
            mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
    }

    /// Whether the joint is an implicit spring rather than a rigid rod.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        self.stiffness > 0.0
    }

    /// Accumulated impulse along the joint axis, for inspection.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }
}

impl Joint for DistanceJoint {
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let pos_a = data.positions[self.body_a.index];
        let pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        self.r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        self.r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
        self.u = (pos_b.center + self.r_b) - (pos_a.center + self.r_a);

        let current_length = self.u.norm();
        if current_length > LINEAR_SLOP {
            self.u /= current_length;
        } else {
            self.u = Vector2::zeros();
        }

        let cr_a = cross(&self.r_a, &self.u);
        let cr_b = cross(&self.r_b, &self.u);
        let mut inv_mass = self.body_a.inv_mass
            + self.body_a.inv_inertia * cr_a * cr_a
            + self.body_b.inv_mass
            + self.body_b.inv_inertia * cr_b * cr_b;

        if self.is_soft() {
            let c = current_length - self.length;
            let h = data.step.dt;

            // Implicit spring discretization: folding the spring force into
            // the constraint via gamma and bias keeps it stable at any
            // stiffness the timestep can express.
            self.gamma = h * (self.damping + h * self.stiffness);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * self.stiffness * self.gamma;

            inv_mass += self.gamma;
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }
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
        let c_dot = self.u.dot(&(vp_b - vp_a));

        let impulse = -self.mass * (c_dot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = impulse * self.u;
        let vel_a = &mut data.velocities[self.body_a.index];
        vel_a.linear -= self.body_a.inv_mass * p;
        vel_a.angular -= self.body_a.inv_inertia * cross(&self.r_a, &p);
        let vel_b = &mut data.velocities[self.body_b.index];
        vel_b.linear += self.body_b.inv_mass * p;
        vel_b.angular += self.body_b.inv_inertia * cross(&self.r_b, &p);
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        if self.is_soft() {
            // The spring absorbs position error in the velocity pass.
            return true;
        }

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
            u = Vector2::zeros();
        }
        let c = (length - self.length).clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = impulse * u;

        pos_a.center -= self.body_a.inv_mass * p;
        pos_a.angle -= self.body_a.inv_inertia * cross(&r_a, &p);
        pos_b.center += self.body_b.inv_mass * p;
        pos_b.angle += self.body_b.inv_inertia * cross(&r_b, &p);

        data.positions[self.body_a.index] = pos_a;
        data.positions[self.body_b.index] = pos_b;

        c.abs() < LINEAR_SLOP
    }
}
