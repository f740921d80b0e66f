//! Small geometric helpers shared by the construction and query pipelines.
//!
//! Nothing here owns manifold state; these are pure functions over [`glam`]
//! types so they can be unit tested in isolation from the rest of the crate.

use glam::{Vec2, Vec3};

/// Cross product of `(b - a)` and `(c - a)` projected onto the XZ plane.
///
/// Positive when `a, b, c` turn counter-clockwise seen from above.
#[inline]
pub fn cross_xz(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let ab = Vec2::new(b.x - a.x, b.z - a.z);
    let ac = Vec2::new(c.x - a.x, c.z - a.z);
    ab.x * ac.y - ab.y * ac.x
}

/// Closest point on the 3D segment `a..b` to `p`, with the clamped parameter `t`.
#[inline]
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > f32::EPSILON {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (a + ab * t, t)
}

/// Squared XZ distance between two points, ignoring Y.
#[inline]
pub fn distance_xz_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Cosine threshold below which two 2D directions are considered "nearly parallel".
///
/// Used by the corner-intersection refinement; ~3 degree parallel cutoff.
const NEAR_PARALLEL_COS_THRESHOLD: f32 = 0.9986; // cos(3 degrees)

/// Intersects two lines in the XZ plane, each given as a point and a direction.
///
/// Returns `None` if the lines are within ~3 degrees of parallel. The returned
/// `(t, s)` are the parametric positions along `(p0, d0)` and `(p1, d1)`
/// respectively, i.e. the intersection point is `p0 + d0 * t`.
pub fn intersect_lines_xz(p0: Vec3, d0: Vec3, p1: Vec3, d1: Vec3) -> Option<(f32, f32)> {
    let a = Vec2::new(d0.x, d0.z);
    let b = Vec2::new(d1.x, d1.z);

    let a_norm = a.try_normalize()?;
    let b_norm = b.try_normalize()?;
    if a_norm.dot(b_norm).abs() >= NEAR_PARALLEL_COS_THRESHOLD {
        return None;
    }

    // Solve p0 + d0*t = p1 + d1*s for (t, s).
    let denom = a.x * b.y - a.y * b.x;
    if denom.abs() < f32::EPSILON {
        return None;
    }

    let dp = Vec2::new(p1.x - p0.x, p1.z - p0.z);
    let t = (dp.x * b.y - dp.y * b.x) / denom;
    let s = (dp.x * a.y - dp.y * a.x) / denom;

    Some((t, s))
}

/// Builds a [`Vec3`] offset in the XZ plane from a 2D direction, preserving Y at zero.
#[inline]
pub fn xz(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}
