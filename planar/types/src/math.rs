//! 2D math helpers shared by the contact and joint solvers.
//!
//! In 2D the cross product degenerates into two useful forms: vector × vector
//! yields a scalar (the z component of the 3D cross product), and
//! scalar × vector yields a vector (angular velocity acting on a lever arm).
//! Both show up in every effective-mass computation, so they live here rather
//! than being open-coded at each call site.

use nalgebra::{Isometry2, Matrix2, Point2, UnitComplex, Vector2};

/// Scalar cross product of two 2D vectors: `a.x * b.y - a.y * b.x`.
#[inline]
#[must_use]
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar (angular velocity) and a vector:
/// `w × v = (-w * v.y, w * v.x)`.
#[inline]
#[must_use]
pub fn cross_scalar(w: f64, v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-w * v.y, w * v.x)
}

/// Clockwise perpendicular of a vector: `v × 1 = (v.y, -v.x)`.
///
/// Applied to a contact normal this yields the friction tangent.
#[inline]
#[must_use]
pub fn right_perp(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// Counter-clockwise perpendicular of a vector: `1 × v = (-v.y, v.x)`.
#[inline]
#[must_use]
pub fn left_perp(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Build a body's origin transform from its solver state.
///
/// Solver positions track the center of mass, while shape geometry is
/// expressed relative to the body origin. The origin transform is therefore
/// `p = c - R * local_center`.
#[must_use]
pub fn body_transform(
    center: &Point2<f64>,
    angle: f64,
    local_center: &Vector2<f64>,
) -> Isometry2<f64> {
    let rotation = UnitComplex::new(angle);
    let translation = center.coords - rotation * local_center;
    Isometry2::from_parts(translation.into(), rotation)
}

/// Invert a 2×2 matrix, returning the zero matrix when the determinant
/// vanishes.
///
/// A zero inverse disables the constraint that owns the matrix instead of
/// producing NaN, matching the scalar effective-mass convention.
#[must_use]
pub fn inverse2x2(m: &Matrix2<f64>) -> Matrix2<f64> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    if det == 0.0 {
        return Matrix2::zeros();
    }
    let inv_det = 1.0 / det;
    Matrix2::new(
        inv_det * m[(1, 1)],
        -inv_det * m[(0, 1)],
        -inv_det * m[(1, 0)],
        inv_det * m[(0, 0)],
    )
}
