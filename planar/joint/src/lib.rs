//! Joint constraints.
//!
//! Joints restrict the relative motion of a body pair and are solved with
//! the same sequential-impulse machinery as contacts: a velocity pass that
//! accumulates impulses (warm-started from last step), and a position pass
//! that removes residual constraint error directly.
//!
//! Every joint implements the three-phase [`Joint`] protocol. The step
//! driver calls [`Joint::init_velocity_constraints`] once per step (which
//! also applies the warm-start impulse), then interleaves
//! [`Joint::solve_velocity_constraints`] with the contact velocity passes,
//! integrates, and finally runs [`Joint::solve_position_constraints`]
//! alongside the contact position passes until every joint reports
//! convergence.
//!
//! Soft joints (a distance joint with positive stiffness, the wheel
//! suspension spring) resolve their constraint error in the velocity pass
//! through an implicit spring and deliberately skip position correction.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod distance;
mod joint;
mod pulley;
mod rope;
mod wheel;

pub use distance::{DistanceJoint, DistanceJointDef};
pub use joint::{linear_stiffness, AnyJoint, Joint, SolverData};
pub use pulley::{PulleyJoint, PulleyJointDef};
pub use rope::{RopeJoint, RopeJointDef};
pub use wheel::{WheelJoint, WheelJointDef};
