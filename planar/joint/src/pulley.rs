//! Pulley joint: two bodies hang from an idealized rope routed over two
//! fixed ground anchors, optionally with a block-and-tackle ratio.

use nalgebra::{Point2, UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use planar_types::math::{cross, cross_scalar};
use planar_types::{SolverBody, SolverError, LINEAR_SLOP};

use crate::joint::{Joint, SolverData};

/// Below this anchor distance the rope segment has no usable direction.
const MIN_PULLEY_LENGTH: f64 = 10.0 * LINEAR_SLOP;

/// Construction parameters for a [`PulleyJoint`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulleyJointDef {
    /// Fixed world anchor the rope passes over on body A's side.
    pub ground_anchor_a: Point2<f64>,
    /// Fixed world anchor the rope passes over on body B's side.
    pub ground_anchor_b: Point2<f64>,
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Vector2<f64>,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Vector2<f64>,
    /// Rest length of the rope segment on A's side.
    pub length_a: f64,
    /// Rest length of the rope segment on B's side.
    pub length_b: f64,
    /// Block-and-tackle ratio: side A's segment counts `ratio` times.
    pub ratio: f64,
}

impl PulleyJointDef {
    /// A 1:1 pulley with the given ground anchors and segment lengths.
    #[must_use]
    pub fn new(
        ground_anchor_a: Point2<f64>,
        ground_anchor_b: Point2<f64>,
        length_a: f64,
        length_b: f64,
    ) -> Self {
        Self {
            ground_anchor_a,
            ground_anchor_b,
            local_anchor_a: Vector2::zeros(),
            local_anchor_b: Vector2::zeros(),
            length_a,
            length_b,
            ratio: 1.0,
        }
    }

    /// Set the local anchor points.
    #[must_use]
    pub fn with_anchors(mut self, local_anchor_a: Vector2<f64>, local_anchor_b: Vector2<f64>) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    /// Set the block-and-tackle ratio. Must be positive.
    #[must_use]
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] for a non-positive ratio or
    /// negative segment lengths.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(SolverError::invalid_config(
                "pulley ratio must be positive and finite",
            ));
        }
        if self.length_a < 0.0 || self.length_b < 0.0 {
            return Err(SolverError::invalid_config(
                "pulley segment lengths must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Holds `length_a + ratio * length_b` constant.
///
/// Lowering body A by one meter raises body B by `1 / ratio` meters, which
/// also divides the force on B's side by `ratio`, the usual block-and-tackle
/// trade. The constraint is an equality, so unlike a real rope it also
/// resists going slack; that matches the classic rigid-pulley formulation.
#[derive(Debug, Clone)]
pub struct PulleyJoint {
    body_a: SolverBody,
    body_b: SolverBody,
    ground_anchor_a: Point2<f64>,
    ground_anchor_b: Point2<f64>,
    local_anchor_a: Vector2<f64>,
    local_anchor_b: Vector2<f64>,
    constant: f64,
    ratio: f64,

    impulse: f64,

    // Step-scoped solver cache.
    u_a: Vector2<f64>,
    u_b: Vector2<f64>,
    r_a: Vector2<f64>,
    r_b: Vector2<f64>,
    mass: f64,
}

impl PulleyJoint {
    /// Create the joint between two body slots.
    #[must_use]
    pub fn new(body_a: SolverBody, body_b: SolverBody, def: PulleyJointDef) -> Self {
        Self {
            body_a,
            body_b,
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            constant: def.length_a + def.ratio * def.length_b,
            ratio: def.ratio,
            impulse: 0.0,
            u_a: Vector2::zeros(),
            u_b: Vector2::zeros(),
            r_a: Vector2::zeros(),
            r_b: Vector2::zeros(),
            mass: 0.0,
        }
    }

    /// The conserved quantity `length_a + ratio * length_b`.
    #[must_use]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Accumulated rope impulse, for inspection.
    #[must_use]
    pub fn impulse(&self) -> f64 {
        self.impulse
    }
}

/// Unit vector from `anchor` to `point`, zeroed when the segment is too
/// short to define a direction.
fn segment_axis(point: Point2<f64>, anchor: Point2<f64>) -> (Vector2<f64>, f64) {
    let u = point - anchor;
    let length = u.norm();
    if length > MIN_PULLEY_LENGTH {
        (u / length, length)
    } else {
        tracing::debug!("pulley segment collapsed onto its ground anchor");
        (Vector2::zeros(), length)
    }
}

impl Joint for PulleyJoint {
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let pos_a = data.positions[self.body_a.index];
        let pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        self.r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        self.r_b = q_b * (self.local_anchor_b - self.body_b.local_center);

        let (u_a, _) = segment_axis(pos_a.center + self.r_a, self.ground_anchor_a);
        let (u_b, _) = segment_axis(pos_b.center + self.r_b, self.ground_anchor_b);
        self.u_a = u_a;
        self.u_b = u_b;

        let ru_a = cross(&self.r_a, &self.u_a);
        let ru_b = cross(&self.r_b, &self.u_b);
        let mass_a = self.body_a.inv_mass + self.body_a.inv_inertia * ru_a * ru_a;
        let mass_b = self.body_b.inv_mass + self.body_b.inv_inertia * ru_b * ru_b;
        let inv_mass = mass_a + self.ratio * self.ratio * mass_b;
        self.mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p_a = -self.impulse * self.u_a;
            let p_b = -self.ratio * self.impulse * self.u_b;

            let vel_a = &mut data.velocities[self.body_a.index];
            vel_a.linear += self.body_a.inv_mass * p_a;
            vel_a.angular += self.body_a.inv_inertia * cross(&self.r_a, &p_a);
            let vel_b = &mut data.velocities[self.body_b.index];
            vel_b.linear += self.body_b.inv_mass * p_b;
            vel_b.angular += self.body_b.inv_inertia * cross(&self.r_b, &p_b);
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let vel_a = data.velocities[self.body_a.index];
        let vel_b = data.velocities[self.body_b.index];

        let vp_a = vel_a.linear + cross_scalar(vel_a.angular, &self.r_a);
        let vp_b = vel_b.linear + cross_scalar(vel_b.angular, &self.r_b);

        let c_dot = -self.u_a.dot(&vp_a) - self.ratio * self.u_b.dot(&vp_b);
        let impulse = -self.mass * c_dot;
        self.impulse += impulse;

        let p_a = -impulse * self.u_a;
        let p_b = -self.ratio * impulse * self.u_b;
        let vel_a = &mut data.velocities[self.body_a.index];
        vel_a.linear += self.body_a.inv_mass * p_a;
        vel_a.angular += self.body_a.inv_inertia * cross(&self.r_a, &p_a);
        let vel_b = &mut data.velocities[self.body_b.index];
        vel_b.linear += self.body_b.inv_mass * p_b;
        vel_b.angular += self.body_b.inv_inertia * cross(&self.r_b, &p_b);
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let mut pos_a = data.positions[self.body_a.index];
        let mut pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        let r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        let r_b = q_b * (self.local_anchor_b - self.body_b.local_center);

        let (u_a, length_a) = segment_axis(pos_a.center + r_a, self.ground_anchor_a);
        let (u_b, length_b) = segment_axis(pos_b.center + r_b, self.ground_anchor_b);

        let ru_a = cross(&r_a, &u_a);
        let ru_b = cross(&r_b, &u_b);
        let mass_a = self.body_a.inv_mass + self.body_a.inv_inertia * ru_a * ru_a;
        let mass_b = self.body_b.inv_mass + self.body_b.inv_inertia * ru_b * ru_b;
        let inv_mass = mass_a + self.ratio * self.ratio * mass_b;
        let mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        let c = self.constant - length_a - self.ratio * length_b;
        let linear_error = c.abs();

        let impulse = -mass * c;
        let p_a = -impulse * u_a;
        let p_b = -self.ratio * impulse * u_b;

        pos_a.center += self.body_a.inv_mass * p_a;
        pos_a.angle += self.body_a.inv_inertia * cross(&r_a, &p_a);
        pos_b.center += self.body_b.inv_mass * p_b;
        pos_b.angle += self.body_b.inv_inertia * cross(&r_b, &p_b);

        data.positions[self.body_a.index] = pos_a;
        data.positions[self.body_b.index] = pos_b;

        linear_error < LINEAR_SLOP
    }
}
