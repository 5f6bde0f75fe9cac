//! Plane/line projection helpers used by ground probing and slope limiting.
//!
//! All functions are pure. Plane normals and line directions must be non-zero; they do not
//! need to be normalized.

use crate::types::{Point3, Vec3};

/// Squared-length guard below which a vector is treated as zero.
const ZERO_SQ: f32 = 1.0e-15;

/// Remove the component of `vector` along `normal`.
#[inline]
pub fn project_vector_on_plane(normal: Vec3, vector: Vec3) -> Vec3 {
    let n = normal.normalize();
    vector - n * vector.dot(&n)
}

/// Project `point` onto the plane through `plane_point` with the given `normal`.
#[inline]
pub fn project_point_on_plane(normal: Vec3, plane_point: Point3, point: Point3) -> Point3 {
    let n = normal.normalize();
    let distance = (point - plane_point).dot(&n);
    point - n * distance
}

/// Project `point` onto the infinite line through `line_point` along `line_direction`.
#[inline]
pub fn project_point_on_line(line_point: Point3, line_direction: Vec3, point: Point3) -> Point3 {
    let dir = line_direction.normalize();
    let t = (point - line_point).dot(&dir);
    line_point + dir * t
}

/// Unsigned angle between two vectors in degrees.
///
/// Returns 0 when either vector is (close to) zero.
#[inline]
pub fn angle_deg(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.norm_squared() * b.norm_squared()).sqrt();
    if denom < ZERO_SQ {
        return 0.0;
    }
    let cos = (a.dot(&b) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
#[inline]
pub fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Normalize `v`, returning zero for vectors too short to normalize.
#[inline]
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    v.try_normalize(ZERO_SQ).unwrap_or_else(Vec3::zeros)
}
