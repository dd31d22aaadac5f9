//! Closed form signed distance functions for the primitive guide shapes.
//!
//! All functions take a point already expressed in the shape local frame
//! (shape centered at the origin, axis aligned) and return a negative distance inside.
use glam::Vec3;

/// Exact signed distance to a sphere of radius `radius` centered at the origin.
pub fn sd_sphere(p: Vec3, radius: f32) -> f32 {
    p.length() - radius
}

/// Signed distance to an axis aligned ellipsoid with semi-axes `radii`.
///
/// Uses the `k0 * (k0 - 1) / k1` bound: exact for spheres, a close approximation
/// for general ellipsoids. The center itself returns minus the smallest radius.
pub fn sd_ellipsoid(p: Vec3, radii: Vec3) -> f32 {
    let k0 = (p / radii).length();
    let k1 = (p / (radii * radii)).length();
    if k1 <= f32::MIN_POSITIVE {
        return -radii.min_element();
    }
    k0 * (k0 - 1.0) / k1
}

/// Exact signed distance to an axis aligned box with the given half extents.
pub fn sd_box(p: Vec3, half_extents: Vec3) -> f32 {
    let q = p.abs() - half_extents;
    let outside = q.max(Vec3::ZERO).length();
    let inside = q.max_element().min(0.0);
    outside + inside
}

/// Exact signed distance to a capsule aligned with the local Y axis.
///
/// The capsule axis goes from `(0, -half_height, 0)` to `(0, half_height, 0)`,
/// `half_height` being the distance from the center to a cap center.
pub fn sd_capsule(p: Vec3, half_height: f32, radius: f32) -> f32 {
    let half_height = half_height.max(0.0);
    let a = Vec3::new(0.0, -half_height, 0.0);
    let b = Vec3::new(0.0, half_height, 0.0);
    crate::geo::point_segment_distance(p, a, b) - radius
}
