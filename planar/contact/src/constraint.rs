//! Per-contact constraint records.
//!
//! These are solver-private caches rebuilt every step from the manifolds and
//! body properties. Velocity constraints hold everything the velocity pass
//! needs (world geometry, effective masses, accumulated impulses); position
//! constraints hold only local-frame geometry, because the position pass
//! re-transforms it at every sub-step while positions change underneath it.

use nalgebra::{Matrix2, Point2, Vector2};

use planar_types::MAX_MANIFOLD_POINTS;

use crate::manifold::ManifoldKind;

/// Velocity-solver state for one contact point.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityConstraintPoint {
    /// Arm from body A's center of mass to the contact point.
    pub r_a: Vector2<f64>,
    /// Arm from body B's center of mass to the contact point.
    pub r_b: Vector2<f64>,
    /// Accumulated non-penetration impulse.
    pub normal_impulse: f64,
    /// Accumulated friction impulse.
    pub tangent_impulse: f64,
    /// Effective mass along the normal (zero when degenerate).
    pub normal_mass: f64,
    /// Effective mass along the tangent (zero when degenerate).
    pub tangent_mass: f64,
    /// Restitution bias added to the normal velocity target.
    pub velocity_bias: f64,
}

/// Cached velocity-solver data for one contact.
#[derive(Debug, Clone)]
pub struct ContactVelocityConstraint {
    /// Per-point solver state.
    pub points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    /// World contact normal (A to B).
    pub normal: Vector2<f64>,
    /// Inverse of `k` when the two-point block solver is armed.
    pub normal_mass: Matrix2<f64>,
    /// Coupling matrix between the two contact points.
    pub k: Matrix2<f64>,
    /// Body A's solver slot.
    pub index_a: usize,
    /// Body B's solver slot.
    pub index_b: usize,
    /// Inverse mass of body A.
    pub inv_mass_a: f64,
    /// Inverse mass of body B.
    pub inv_mass_b: f64,
    /// Inverse inertia of body A.
    pub inv_inertia_a: f64,
    /// Inverse inertia of body B.
    pub inv_inertia_b: f64,
    /// Combined friction coefficient.
    pub friction: f64,
    /// Combined restitution coefficient.
    pub restitution: f64,
    /// Relative normal speed below which restitution is ignored.
    pub restitution_threshold: f64,
    /// Surface (conveyor) speed along the tangent.
    pub tangent_speed: f64,
    /// Active point count for the velocity pass (may be downgraded to 1
    /// when the block matrix is ill-conditioned).
    pub point_count: usize,
    /// Index of the originating contact in the island's contact list.
    pub contact_index: usize,
}

/// Cached position-solver data for one contact.
///
/// Everything geometric is local-frame by construction; world coordinates
/// are recomputed fresh at each position sub-step via
/// [`crate::point_separation`].
#[derive(Debug, Clone)]
pub struct ContactPositionConstraint {
    /// Manifold points in the incident shape's local frame.
    pub local_points: [Point2<f64>; MAX_MANIFOLD_POINTS],
    /// Manifold normal in the reference shape's local frame.
    pub local_normal: Vector2<f64>,
    /// Manifold reference point in the reference shape's local frame.
    pub local_point: Point2<f64>,
    /// Body A's solver slot.
    pub index_a: usize,
    /// Body B's solver slot.
    pub index_b: usize,
    /// Inverse mass of body A.
    pub inv_mass_a: f64,
    /// Inverse mass of body B.
    pub inv_mass_b: f64,
    /// Body A's center of mass in its local frame.
    pub local_center_a: Vector2<f64>,
    /// Body B's center of mass in its local frame.
    pub local_center_b: Vector2<f64>,
    /// Inverse inertia of body A.
    pub inv_inertia_a: f64,
    /// Inverse inertia of body B.
    pub inv_inertia_b: f64,
    /// Manifold anchoring convention.
    pub kind: ManifoldKind,
    /// Surface radius of shape A.
    pub radius_a: f64,
    /// Surface radius of shape B.
    pub radius_b: f64,
    /// Number of manifold points.
    pub point_count: usize,
}
