//! Contact manifolds.
//!
//! A manifold describes how two convex shapes touch: a shared normal and up
//! to two contact points. The narrow phase produces manifolds in local
//! frames so they stay valid while bodies move; the solver recomputes world
//! coordinates from the current transforms whenever it needs them.
//!
//! Manifold points also persist the accumulated normal and tangent impulses
//! from the previous step. The [`ContactId`] feature key identifies which
//! geometric features generated a point, so impulses can be carried across
//! steps even when the point count or ordering changes.

use nalgebra::{Isometry2, Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use planar_types::MAX_MANIFOLD_POINTS;

/// Opaque feature key matching a contact point to its generating features.
///
/// Two manifold points from consecutive steps describe the same contact
/// exactly when their IDs compare equal. The encoding is owned by the narrow
/// phase; the solver only compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactId(pub u32);

impl ContactId {
    /// Create a feature key from a raw encoded value.
    #[must_use]
    pub const fn new(key: u32) -> Self {
        Self(key)
    }
}

/// How the manifold's local geometry is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ManifoldKind {
    /// Circle-circle: `local_point` is circle A's center in A's frame, the
    /// point's `local_point` is circle B's center in B's frame.
    Circles,
    /// Reference face on shape A: `local_normal`/`local_point` describe A's
    /// face plane in A's frame, points are clipped points in B's frame.
    FaceA,
    /// Reference face on shape B, mirror of [`ManifoldKind::FaceA`]. The
    /// world normal is negated after transformation so it always points
    /// from A to B.
    FaceB,
}

/// One persistent contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ManifoldPoint {
    /// Contact point in the incident shape's local frame (see
    /// [`ManifoldKind`] for which shape that is).
    pub local_point: Point2<f64>,
    /// Accumulated non-penetration impulse, persisted for warm starting.
    pub normal_impulse: f64,
    /// Accumulated friction impulse, persisted for warm starting.
    pub tangent_impulse: f64,
    /// Feature key for cross-step point correspondence.
    pub id: ContactId,
}

impl ManifoldPoint {
    /// Create a fresh point with zero accumulated impulses.
    #[must_use]
    pub fn new(local_point: Point2<f64>, id: ContactId) -> Self {
        Self {
            local_point,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            id,
        }
    }
}

impl Default for ManifoldPoint {
    fn default() -> Self {
        Self::new(Point2::origin(), ContactId::default())
    }
}

/// A contact manifold: shared normal plus up to two persistent points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Manifold {
    /// Geometry anchoring convention.
    pub kind: ManifoldKind,
    /// Normal in the reference shape's local frame (unused for circles).
    pub local_normal: Vector2<f64>,
    /// Reference point in the reference shape's local frame.
    pub local_point: Point2<f64>,
    points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    point_count: usize,
}

impl Manifold {
    /// Create an empty manifold of the given kind.
    #[must_use]
    pub fn new(kind: ManifoldKind, local_normal: Vector2<f64>, local_point: Point2<f64>) -> Self {
        Self {
            kind,
            local_normal,
            local_point,
            points: [ManifoldPoint::default(); MAX_MANIFOLD_POINTS],
            point_count: 0,
        }
    }

    /// Circle-circle manifold with a single point.
    #[must_use]
    pub fn circles(center_a: Point2<f64>, center_b: Point2<f64>, id: ContactId) -> Self {
        let mut manifold = Self::new(ManifoldKind::Circles, Vector2::zeros(), center_a);
        manifold.push(ManifoldPoint::new(center_b, id));
        manifold
    }

    /// Add a contact point. Points beyond the manifold capacity are ignored.
    pub fn push(&mut self, point: ManifoldPoint) {
        if self.point_count < MAX_MANIFOLD_POINTS {
            self.points[self.point_count] = point;
            self.point_count += 1;
        }
    }

    /// Number of active points (0, 1, or 2).
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Active contact points.
    #[must_use]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// Active contact points, mutable.
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }
}

/// World-space view of a manifold at a specific pair of transforms.
///
/// Recomputed on demand because manifolds are stored in local frames and the
/// solver moves bodies between narrow phase and constraint setup.
#[derive(Debug, Clone, Copy)]
pub struct WorldManifold {
    /// World normal, pointing from shape A to shape B.
    pub normal: Vector2<f64>,
    /// World contact points (midway between the shape surfaces).
    pub points: [Point2<f64>; MAX_MANIFOLD_POINTS],
    /// Signed separation at each point (negative means overlap).
    pub separations: [f64; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Compute the world-space manifold.
    ///
    /// `radius_a`/`radius_b` are the shapes' surface radii (circle radius,
    /// or the rounding radius of a polygon).
    #[must_use]
    pub fn new(
        manifold: &Manifold,
        xf_a: &Isometry2<f64>,
        radius_a: f64,
        xf_b: &Isometry2<f64>,
        radius_b: f64,
    ) -> Self {
        let mut local_points = [Point2::origin(); MAX_MANIFOLD_POINTS];
        for (slot, point) in local_points.iter_mut().zip(manifold.points()) {
            *slot = point.local_point;
        }
        Self::from_parts(
            manifold.kind,
            &manifold.local_normal,
            &manifold.local_point,
            &local_points[..manifold.point_count()],
            xf_a,
            radius_a,
            xf_b,
            radius_b,
        )
    }

    /// Compute the world manifold from already-split manifold fields.
    ///
    /// The contact solver stores manifold geometry inside its position
    /// constraint records and rebuilds the world view from those copies.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub(crate) fn from_parts(
        kind: ManifoldKind,
        local_normal: &Vector2<f64>,
        local_point: &Point2<f64>,
        local_points: &[Point2<f64>],
        xf_a: &Isometry2<f64>,
        radius_a: f64,
        xf_b: &Isometry2<f64>,
        radius_b: f64,
    ) -> Self {
        let mut world = Self {
            normal: Vector2::x(),
            points: [Point2::origin(); MAX_MANIFOLD_POINTS],
            separations: [0.0; MAX_MANIFOLD_POINTS],
        };
        if local_points.is_empty() {
            return world;
        }

        match kind {
            ManifoldKind::Circles => {
                let point_a = xf_a * local_point;
                let point_b = xf_b * local_points[0];
                let delta = point_b - point_a;
                // Coincident centers have no meaningful direction; fall back
                // to +X so the impulse algebra stays finite.
                if delta.norm_squared() > f64::EPSILON * f64::EPSILON {
                    world.normal = delta.normalize();
                }
                let c_a = point_a + radius_a * world.normal;
                let c_b = point_b - radius_b * world.normal;
                world.points[0] = Point2::from(0.5 * (c_a.coords + c_b.coords));
                world.separations[0] = (c_b - c_a).dot(&world.normal);
            }
            ManifoldKind::FaceA => {
                world.normal = xf_a.rotation * local_normal;
                let plane_point = xf_a * local_point;
                for (j, local) in local_points.iter().enumerate() {
                    let clip_point = xf_b * local;
                    let depth_a = radius_a - (clip_point - plane_point).dot(&world.normal);
                    let c_a = clip_point + depth_a * world.normal;
                    let c_b = clip_point - radius_b * world.normal;
                    world.points[j] = Point2::from(0.5 * (c_a.coords + c_b.coords));
                    world.separations[j] = (c_b - c_a).dot(&world.normal);
                }
            }
            ManifoldKind::FaceB => {
                world.normal = xf_b.rotation * local_normal;
                let plane_point = xf_b * local_point;
                for (j, local) in local_points.iter().enumerate() {
                    let clip_point = xf_a * local;
                    let depth_b = radius_b - (clip_point - plane_point).dot(&world.normal);
                    let c_b = clip_point + depth_b * world.normal;
                    let c_a = clip_point - radius_a * world.normal;
                    world.points[j] = Point2::from(0.5 * (c_a.coords + c_b.coords));
                    world.separations[j] = (c_a - c_b).dot(&world.normal);
                }
                // Convention: normal always points from A to B.
                world.normal = -world.normal;
            }
        }
        world
    }
}
