//! Core types for the planar rigid-body constraint solver.
//!
//! This crate provides the foundational types shared by the contact and joint
//! solvers:
//!
//! - [`BodyPosition`] / [`BodyVelocity`] - per-island flat solver state
//! - [`SolverBody`] - a body's solver slot plus its mass properties
//! - [`StepContext`] - per-tick timestep data and solver feature flags
//! - [`SolverError`] - configuration-boundary errors
//! - 2D math helpers (scalar cross products, body transforms, guarded
//!   2×2 inversion) in [`math`]
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no solver behavior and no
//! integration. They're the common language between:
//!
//! - The island builder (which owns bodies, contacts, and joints)
//! - The contact solver (`planar-contact`)
//! - The joint solvers (`planar-joint`)
//! - Logging and replay (serialized state trajectories)
//!
//! # Coordinate System
//!
//! Right-handed 2D: X right, Y up, angles counter-clockwise in radians.
//! Positions track the **center of mass**, not the body origin; the body
//! origin is recovered through [`math::body_transform`].

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod body;
mod error;
pub mod math;
mod step;

pub use body::{BodyPosition, BodyVelocity, SolverBody};
pub use error::SolverError;
pub use step::StepContext;

/// Maximum number of points in a contact manifold.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Collision and constraint tolerance (length units).
///
/// Separations are allowed to settle this far into overlap so that contacts
/// stay persistent instead of jittering between touching and separated.
pub const LINEAR_SLOP: f64 = 0.005;

/// Maximum position correction applied by a single position-solver pass.
///
/// Prevents overshoot when a contact or joint starts a step deeply violated.
pub const MAX_LINEAR_CORRECTION: f64 = 0.2;

/// Fraction of position error corrected per regular position pass.
pub const CONTACT_BAUMGARTE: f64 = 0.2;

/// Fraction of position error corrected per time-of-impact position pass.
///
/// Stiffer than [`CONTACT_BAUMGARTE`] because TOI correction runs per
/// sub-step and must converge within a much smaller budget.
pub const TOI_BAUMGARTE: f64 = 0.75;
