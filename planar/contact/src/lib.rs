//! Sequential-impulse contact solver.
//!
//! This crate turns contact manifolds (produced by an external narrow phase)
//! into impulses and position corrections for one island of bodies. It
//! implements the classic two-pass formulation:
//!
//! - A **velocity pass** that solves friction and non-penetration as an
//!   iterative projected Gauss-Seidel sweep over accumulated impulses, with
//!   warm starting, restitution bias, and an optional coupled 2×2 block solve
//!   for two-point manifolds.
//! - A **position pass** (nonlinear Gauss-Seidel) that removes residual
//!   penetration by nudging positions directly, leaving velocities alone.
//!
//! # Call sequence
//!
//! The step driver must call the [`ContactSolver`] operations in strict
//! order once per island per tick:
//!
//! 1. [`ContactSolver::initialize`]
//! 2. [`ContactSolver::initialize_velocity_constraints`]
//! 3. [`ContactSolver::warm_start`]
//! 4. [`ContactSolver::solve_velocity_constraints`] × velocity iterations
//!    (interleaved with the joint velocity passes)
//! 5. integrate positions (driver's job)
//! 6. [`ContactSolver::solve_position_constraints`] × position iterations
//! 7. [`ContactSolver::store_impulses`]
//!
//! # Failure semantics
//!
//! Nothing here returns an error. Degenerate inputs (zero effective mass,
//! ill-conditioned block matrices, unsolvable two-point complementarity
//! problems) are absorbed by disabling the affected constraint contribution
//! for the current step. The only caller-visible signal is the boolean
//! returned by the position passes, which reports whether all separations
//! are within tolerance.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod constraint;
mod manifold;
mod separation;
mod solver;

pub use constraint::{
    ContactPositionConstraint, ContactVelocityConstraint, VelocityConstraintPoint,
};
pub use manifold::{ContactId, Manifold, ManifoldKind, ManifoldPoint, WorldManifold};
pub use separation::{point_separation, PointSeparation};
pub use solver::{ContactDescriptor, ContactSolver};
