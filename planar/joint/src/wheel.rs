//! Wheel joint: constrains body B to a translation axis fixed on body A,
//! with a suspension spring along the axis, an optional rotational motor,
//! and optional translation limits.

use nalgebra::{UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use planar_types::math::{cross, cross_scalar, right_perp};
use planar_types::{SolverBody, SolverError, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use crate::joint::{linear_stiffness, Joint, SolverData};

/// Construction parameters for a [`WheelJoint`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelJointDef {
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Vector2<f64>,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Vector2<f64>,
    /// Translation axis in A's local frame. Should be unit length.
    pub local_axis_a: Vector2<f64>,
    /// Suspension stiffness in N/m. Zero disables the spring.
    pub stiffness: f64,
    /// Suspension damping in N·s/m.
    pub damping: f64,
    /// Whether the rotational motor is active.
    pub enable_motor: bool,
    /// Target angular velocity of B relative to A, rad/s.
    pub motor_speed: f64,
    /// Motor torque budget, N·m.
    pub max_motor_torque: f64,
    /// Whether the translation limits are active.
    pub enable_limit: bool,
    /// Lower translation limit along the axis.
    pub lower_translation: f64,
    /// Upper translation limit along the axis.
    pub upper_translation: f64,
}

impl WheelJointDef {
    /// A wheel joint along the given axis, everything optional disabled.
    #[must_use]
    pub fn new(local_axis_a: Vector2<f64>) -> Self {
        Self {
            local_anchor_a: Vector2::zeros(),
            local_anchor_b: Vector2::zeros(),
            local_axis_a,
            stiffness: 0.0,
            damping: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
        }
    }

    /// Set the local anchor points.
    #[must_use]
    pub fn with_anchors(mut self, local_anchor_a: Vector2<f64>, local_anchor_b: Vector2<f64>) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    /// Set the suspension coefficients directly.
    #[must_use]
    pub fn with_suspension(mut self, stiffness: f64, damping: f64) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Tune the suspension by frequency and damping ratio for the given
    /// body masses.
    #[must_use]
    pub fn with_suspension_spring(
        mut self,
        hertz: f64,
        damping_ratio: f64,
        mass_a: f64,
        mass_b: f64,
    ) -> Self {
        let (stiffness, damping) = linear_stiffness(hertz, damping_ratio, mass_a, mass_b);
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Enable the motor with a target speed and torque budget.
    #[must_use]
    pub fn with_motor(mut self, motor_speed: f64, max_motor_torque: f64) -> Self {
        self.enable_motor = true;
        self.motor_speed = motor_speed;
        self.max_motor_torque = max_motor_torque;
        self
    }

    /// Enable the translation limits.
    #[must_use]
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] for a zero-length axis,
    /// inverted limits, or negative spring/motor parameters.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.local_axis_a.norm_squared() < f64::EPSILON {
            return Err(SolverError::invalid_config(
                "wheel joint axis must be non-zero",
            ));
        }
        if self.enable_limit && self.lower_translation > self.upper_translation {
            return Err(SolverError::invalid_config(
                "wheel joint lower limit exceeds upper limit",
            ));
        }
        if self.stiffness < 0.0 || self.damping < 0.0 || self.max_motor_torque < 0.0 {
            return Err(SolverError::invalid_config(
                "wheel joint coefficients must be non-negative",
            ));
        }
        Ok(())
    }
}

/// A suspension joint: body B slides along an axis carried by body A.
///
/// Four constraints share the joint, solved in a fixed order each velocity
/// iteration: suspension spring (soft, along the axis), motor (angular),
/// lower and upper translation limits (one-sided, along the axis), and the
/// rigid point-to-line constraint perpendicular to the axis. The position
/// pass corrects limit overshoot and perpendicular drift; spring compression
/// is position error by design and is never corrected.
#[derive(Debug, Clone)]
pub struct WheelJoint {
    body_a: SolverBody,
    body_b: SolverBody,
    local_anchor_a: Vector2<f64>,
    local_anchor_b: Vector2<f64>,
    local_axis_a: Vector2<f64>,
    local_perp_a: Vector2<f64>,
    stiffness: f64,
    damping: f64,
    enable_motor: bool,
    motor_speed: f64,
    max_motor_torque: f64,
    enable_limit: bool,
    lower_translation: f64,
    upper_translation: f64,

    impulse: f64,
    spring_impulse: f64,
    motor_impulse: f64,
    lower_impulse: f64,
    upper_impulse: f64,

    // Step-scoped solver cache.
    ax: Vector2<f64>,
    ay: Vector2<f64>,
    s_ax: f64,
    s_bx: f64,
    s_ay: f64,
    s_by: f64,
    translation: f64,
    mass: f64,
    motor_mass: f64,
    axial_mass: f64,
    spring_mass: f64,
    bias: f64,
    gamma: f64,
}

impl WheelJoint {
    /// Create the joint between two body slots.
    #[must_use]
    pub fn new(body_a: SolverBody, body_b: SolverBody, def: WheelJointDef) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a: def.local_axis_a,
            local_perp_a: right_perp(&def.local_axis_a),
            stiffness: def.stiffness,
            damping: def.damping,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            impulse: 0.0,
            spring_impulse: 0.0,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            ax: Vector2::zeros(),
            ay: Vector2::zeros(),
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            translation: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            axial_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    /// Translation along the axis at the last constraint initialization.
    #[must_use]
    pub fn translation(&self) -> f64 {
        self.translation
    }

    /// Accumulated motor impulse, for inspection.
    #[must_use]
    pub fn motor_impulse(&self) -> f64 {
        self.motor_impulse
    }

    /// Accumulated suspension spring impulse, for inspection.
    #[must_use]
    pub fn spring_impulse(&self) -> f64 {
        self.spring_impulse
    }

    fn apply_axial(
        &self,
        data: &mut SolverData<'_>,
        impulse: f64,
        axis: &Vector2<f64>,
        s_a: f64,
        s_b: f64,
    ) {
        let p = impulse * axis;
        let vel_a = &mut data.velocities[self.body_a.index];
        vel_a.linear -= self.body_a.inv_mass * p;
        vel_a.angular -= self.body_a.inv_inertia * impulse * s_a;
        let vel_b = &mut data.velocities[self.body_b.index];
        vel_b.linear += self.body_b.inv_mass * p;
        vel_b.angular += self.body_b.inv_inertia * impulse * s_b;
    }
}

impl Joint for WheelJoint {
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let pos_a = data.positions[self.body_a.index];
        let pos_b = data.positions[self.body_b.index];

        let q_a = UnitComplex::new(pos_a.angle);
        let q_b = UnitComplex::new(pos_b.angle);
        let r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
        let r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
        let d = (pos_b.center + r_b) - (pos_a.center + r_a);

        let m_a = self.body_a.inv_mass;
        let m_b = self.body_b.inv_mass;
        let i_a = self.body_a.inv_inertia;
        let i_b = self.body_b.inv_inertia;

        // Point-to-line constraint, perpendicular to the axis.
        self.ay = q_a * self.local_perp_a;
        self.s_ay = cross(&(d + r_a), &self.ay);
        self.s_by = cross(&r_b, &self.ay);
        let k = m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;
        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        // Axial direction shared by the spring and the limits.
        self.ax = q_a * self.local_axis_a;
        self.s_ax = cross(&(d + r_a), &self.ax);
        self.s_bx = cross(&r_b, &self.ax);
        self.translation = d.dot(&self.ax);

        let inv_mass = m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;
        self.axial_mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;
        if self.stiffness > 0.0 && inv_mass > 0.0 {
            let c = self.translation;
            let h = data.step.dt;
            self.gamma = h * (self.damping + h * self.stiffness);
            self.gamma = if self.gamma > 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * self.stiffness * self.gamma;
            self.spring_mass = 1.0 / (inv_mass + self.gamma);
        } else {
            self.spring_impulse = 0.0;
        }

        if !self.enable_limit {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        if self.enable_motor {
            let k = i_a + i_b;
            self.motor_mass = if k > 0.0 { 1.0 / k } else { 0.0 };
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.spring_impulse *= ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial_impulse = self.spring_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse * self.ay + axial_impulse * self.ax;
            let l_a = self.impulse * self.s_ay + axial_impulse * self.s_ax + self.motor_impulse;
            let l_b = self.impulse * self.s_by + axial_impulse * self.s_bx + self.motor_impulse;

            let vel_a = &mut data.velocities[self.body_a.index];
            vel_a.linear -= m_a * p;
            vel_a.angular -= i_a * l_a;
            let vel_b = &mut data.velocities[self.body_b.index];
            vel_b.linear += m_b * p;
            vel_b.angular += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        let m_a = self.body_a.inv_mass;
        let m_b = self.body_b.inv_mass;
        let i_a = self.body_a.inv_inertia;
        let i_b = self.body_b.inv_inertia;

        // Suspension spring.
        if self.stiffness > 0.0 {
            let vel_a = data.velocities[self.body_a.index];
            let vel_b = data.velocities[self.body_b.index];
            let c_dot = self.ax.dot(&(vel_b.linear - vel_a.linear))
                + self.s_bx * vel_b.angular
                - self.s_ax * vel_a.angular;
            let impulse =
                -self.spring_mass * (c_dot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;
            self.apply_axial(data, impulse, &self.ax, self.s_ax, self.s_bx);
        }

        // Motor.
        if self.enable_motor {
            let vel_a = data.velocities[self.body_a.index];
            let vel_b = data.velocities[self.body_b.index];
            let c_dot = vel_b.angular - vel_a.angular - self.motor_speed;
            let mut impulse = -self.motor_mass * c_dot;

            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            impulse = self.motor_impulse - old_impulse;

            data.velocities[self.body_a.index].angular -= i_a * impulse;
            data.velocities[self.body_b.index].angular += i_b * impulse;
        }

        if self.enable_limit {
            // Lower limit. Both limits use speculative bias so the body
            // decelerates into the stop instead of bouncing off it.
            {
                let vel_a = data.velocities[self.body_a.index];
                let vel_b = data.velocities[self.body_b.index];
                let c = self.translation - self.lower_translation;
                let c_dot = self.ax.dot(&(vel_b.linear - vel_a.linear))
                    + self.s_bx * vel_b.angular
                    - self.s_ax * vel_a.angular;
                let mut impulse = -self.axial_mass * (c_dot + c.max(0.0) * data.step.inv_dt);
                let old_impulse = self.lower_impulse;
                self.lower_impulse = (self.lower_impulse + impulse).max(0.0);
                impulse = self.lower_impulse - old_impulse;
                self.apply_axial(data, impulse, &self.ax, self.s_ax, self.s_bx);
            }

            // Upper limit, same constraint with the axis reversed.
            {
                let vel_a = data.velocities[self.body_a.index];
                let vel_b = data.velocities[self.body_b.index];
                let c = self.upper_translation - self.translation;
                let c_dot = self.ax.dot(&(vel_a.linear - vel_b.linear))
                    + self.s_ax * vel_a.angular
                    - self.s_bx * vel_b.angular;
                let mut impulse = -self.axial_mass * (c_dot + c.max(0.0) * data.step.inv_dt);
                let old_impulse = self.upper_impulse;
                self.upper_impulse = (self.upper_impulse + impulse).max(0.0);
                impulse = self.upper_impulse - old_impulse;
                self.apply_axial(data, -impulse, &self.ax, self.s_ax, self.s_bx);
            }
        }

        // Rigid point-to-line constraint.
        {
            let vel_a = data.velocities[self.body_a.index];
            let vel_b = data.velocities[self.body_b.index];
            let c_dot = self.ay.dot(&(vel_b.linear - vel_a.linear))
                + self.s_by * vel_b.angular
                - self.s_ay * vel_a.angular;
            let impulse = -self.mass * c_dot;
            self.impulse += impulse;

            let p = impulse * self.ay;
            let vel_a = &mut data.velocities[self.body_a.index];
            vel_a.linear -= m_a * p;
            vel_a.angular -= i_a * impulse * self.s_ay;
            let vel_b = &mut data.velocities[self.body_b.index];
            vel_b.linear += m_b * p;
            vel_b.angular += i_b * impulse * self.s_by;
        }
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        let mut pos_a = data.positions[self.body_a.index];
        let mut pos_b = data.positions[self.body_b.index];

        let m_a = self.body_a.inv_mass;
        let m_b = self.body_b.inv_mass;
        let i_a = self.body_a.inv_inertia;
        let i_b = self.body_b.inv_inertia;

        let mut linear_error = 0.0_f64;

        if self.enable_limit {
            let q_a = UnitComplex::new(pos_a.angle);
            let q_b = UnitComplex::new(pos_b.angle);
            let r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
            let r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
            let d = (pos_b.center + r_b) - (pos_a.center + r_a);

            let ax = q_a * self.local_axis_a;
            let s_ax = cross(&(d + r_a), &ax);
            let s_bx = cross(&r_b, &ax);
            let translation = d.dot(&ax);

            let c = if (self.upper_translation - self.lower_translation) < 2.0 * LINEAR_SLOP {
                translation.clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION)
            } else if translation <= self.lower_translation {
                (translation - self.lower_translation)
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0)
            } else if translation >= self.upper_translation {
                (translation - self.upper_translation)
                    .clamp(0.0, MAX_LINEAR_CORRECTION)
            } else {
                0.0
            };

            if c != 0.0 {
                let inv_mass = m_a + m_b + i_a * s_ax * s_ax + i_b * s_bx * s_bx;
                let impulse = if inv_mass > 0.0 { -c / inv_mass } else { 0.0 };
                let p = impulse * ax;

                pos_a.center -= m_a * p;
                pos_a.angle -= i_a * impulse * s_ax;
                pos_b.center += m_b * p;
                pos_b.angle += i_b * impulse * s_bx;
                linear_error = c.abs();
            }
        }

        // Perpendicular drift off the axis.
        {
            let q_a = UnitComplex::new(pos_a.angle);
            let q_b = UnitComplex::new(pos_b.angle);
            let r_a = q_a * (self.local_anchor_a - self.body_a.local_center);
            let r_b = q_b * (self.local_anchor_b - self.body_b.local_center);
            let d = (pos_b.center + r_b) - (pos_a.center + r_a);

            let ay = q_a * self.local_perp_a;
            let s_ay = cross(&(d + r_a), &ay);
            let s_by = cross(&r_b, &ay);
            let c = d.dot(&ay);

            let inv_mass = m_a + m_b + i_a * s_ay * s_ay + i_b * s_by * s_by;
            let impulse = if inv_mass > 0.0 { -c / inv_mass } else { 0.0 };
            let p = impulse * ay;

            pos_a.center -= m_a * p;
            pos_a.angle -= i_a * impulse * s_ay;
            pos_b.center += m_b * p;
            pos_b.angle += i_b * impulse * s_by;
            linear_error = linear_error.max(c.abs());
        }

        data.positions[self.body_a.index] = pos_a;
        data.positions[self.body_b.index] = pos_b;

        linear_error <= LINEAR_SLOP
    }
}
