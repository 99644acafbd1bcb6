//! World-space point separation for the position solver.
//!
//! The position pass runs several sub-steps and moves bodies between them
//! without re-running collision detection, so contact geometry must be
//! recomputed from local frames at the current transforms every time. This
//! module is that recompute: a pure function with no solver state.

use nalgebra::{Isometry2, Point2, Vector2};

use crate::constraint::ContactPositionConstraint;
use crate::manifold::ManifoldKind;

/// World-space contact geometry for one manifold point.
#[derive(Debug, Clone, Copy)]
pub struct PointSeparation {
    /// World normal, pointing from shape A to shape B.
    pub normal: Vector2<f64>,
    /// World contact point.
    pub point: Point2<f64>,
    /// Signed separation (negative means overlap).
    pub separation: f64,
}

/// Compute world normal, point, and separation for manifold point `index`
/// of a position constraint at the given transforms.
///
/// Inputs are not mutated; this is pure geometry.
#[must_use]
pub fn point_separation(
    pc: &ContactPositionConstraint,
    xf_a: &Isometry2<f64>,
    xf_b: &Isometry2<f64>,
    index: usize,
) -> PointSeparation {
    debug_assert!(index < pc.point_count);

    match pc.kind {
        ManifoldKind::Circles => {
            let point_a = xf_a * pc.local_point;
            let point_b = xf_b * pc.local_points[0];
            let delta = point_b - point_a;
            let normal = if delta.norm_squared() > f64::EPSILON * f64::EPSILON {
                delta.normalize()
            } else {
                Vector2::x()
            };
            PointSeparation {
                normal,
                point: Point2::from(0.5 * (point_a.coords + point_b.coords)),
                separation: delta.dot(&normal) - pc.radius_a - pc.radius_b,
            }
        }
        ManifoldKind::FaceA => {
            let normal = xf_a.rotation * pc.local_normal;
            let plane_point = xf_a * pc.local_point;
            let clip_point = xf_b * pc.local_points[index];
            PointSeparation {
                normal,
                point: clip_point,
                separation: (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b,
            }
        }
        ManifoldKind::FaceB => {
            let normal = xf_b.rotation * pc.local_normal;
            let plane_point = xf_b * pc.local_point;
            let clip_point = xf_a * pc.local_points[index];
            let separation =
                (clip_point - plane_point).dot(&normal) - pc.radius_a - pc.radius_b;
            PointSeparation {
                // Convention: normal always points from A to B.
                normal: -normal,
                point: clip_point,
                separation,
            }
        }
    }
}
