//! The joint solver protocol.

use planar_types::{BodyPosition, BodyVelocity, StepContext};

use crate::{DistanceJoint, PulleyJoint, RopeJoint, WheelJoint};

/// Mutable view of the island state handed to each joint phase.
///
/// Joints address bodies through the slot indices recorded at construction,
/// the same indices contacts use.
pub struct SolverData<'a> {
    /// Timestep and solver flags for this tick.
    pub step: &'a StepContext,
    /// Island position array, indexed by body slot.
    pub positions: &'a mut [BodyPosition],
    /// Island velocity array, indexed by body slot.
    pub velocities: &'a mut [BodyVelocity],
}

/// The three-phase sequential-impulse protocol every joint implements.
pub trait Joint {
    /// Compute effective masses for the current poses and, when warm
    /// starting is on, apply last step's accumulated impulses (scaled by
    /// `dt_ratio`). Called once per step before the velocity iterations.
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>);

    /// One velocity iteration: relax this joint's velocity constraints and
    /// fold the impulses into the accumulators.
    fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>);

    /// One position iteration. Returns `true` when this joint's position
    /// error is within tolerance (soft joints return `true` unconditionally;
    /// they correct through the velocity spring instead).
    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool;
}

/// Convert an oscillation frequency and damping ratio into the stiffness and
/// damping coefficients the soft joints consume.
///
/// The reduced mass of the pair is used, so a spring tuned to 4 Hz oscillates
/// at 4 Hz regardless of which body is heavier. Static bodies (zero mass)
/// drop out of the reduction.
#[must_use]
pub fn linear_stiffness(
    hertz: f64,
    damping_ratio: f64,
    mass_a: f64,
    mass_b: f64,
) -> (f64, f64) {
    let mass = if mass_a > 0.0 && mass_b > 0.0 {
        mass_a * mass_b / (mass_a + mass_b)
    } else if mass_a > 0.0 {
        mass_a
    } else {
        mass_b
    };
    let omega = 2.0 * std::f64::consts::PI * hertz;
    let stiffness = mass * omega * omega;
    let damping = 2.0 * mass * damping_ratio * omega;
    (stiffness, damping)
}

/// A joint of any kind, for storing heterogeneous joints in one island list.
///
/// An enum rather than a trait object so joint lists stay contiguous and the
/// per-iteration dispatch is a jump table instead of a vtable call.
#[derive(Debug, Clone)]
pub enum AnyJoint {
    /// Fixed-length or spring link between two anchor points.
    Distance(DistanceJoint),
    /// One-sided maximum-distance tether.
    Rope(RopeJoint),
    /// Axis-constrained suspension with spring, motor, and limits.
    Wheel(WheelJoint),
    /// Two bodies sharing an idealized rope over two ground pulleys.
    Pulley(PulleyJoint),
}

impl Joint for AnyJoint {
    fn init_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        match self {
            Self::Distance(joint) => joint.init_velocity_constraints(data),
            Self::Rope(joint) => joint.init_velocity_constraints(data),
            Self::Wheel(joint) => joint.init_velocity_constraints(data),
            Self::Pulley(joint) => joint.init_velocity_constraints(data),
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData<'_>) {
        match self {
            Self::Distance(joint) => joint.solve_velocity_constraints(data),
            Self::Rope(joint) => joint.solve_velocity_constraints(data),
            Self::Wheel(joint) => joint.solve_velocity_constraints(data),
            Self::Pulley(joint) => joint.solve_velocity_constraints(data),
        }
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData<'_>) -> bool {
        match self {
            Self::Distance(joint) => joint.solve_position_constraints(data),
            Self::Rope(joint) => joint.solve_position_constraints(data),
            Self::Wheel(joint) => joint.solve_position_constraints(data),
            Self::Pulley(joint) => joint.solve_position_constraints(data),
        }
    }
}

impl From<DistanceJoint> for AnyJoint {
    fn from(joint: DistanceJoint) -> Self {
        Self::Distance(joint)
    }
}

impl From<RopeJoint> for AnyJoint {
    fn from(joint: RopeJoint) -> Self {
        Self::Rope(joint)
    }
}

impl From<WheelJoint> for AnyJoint {
    fn from(joint: WheelJoint) -> Self {
        Self::Wheel(joint)
    }
}

impl From<PulleyJoint> for AnyJoint {
    fn from(joint: PulleyJoint) -> Self {
        Self::Pulley(joint)
    }
}
