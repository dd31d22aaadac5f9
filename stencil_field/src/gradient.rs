//! Surface normals from central differences.
use glam::Vec3;

/// Direction returned when the gradient vanishes.
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

/// Gradients with a squared length below this are considered flat.
const MIN_GRADIENT_LENGTH_SQUARED: f32 = 1e-4;

/// Normalized gradient of `distance` at `p` using central differences of step `epsilon`.
///
/// `distance` returns `None` where the field is undefined. A side that misses falls back to
/// a one sided difference with the center sample. Flat, undefined or non finite gradients
/// return [`FALLBACK_NORMAL`].
pub fn estimate_normal<F>(distance: F, p: Vec3, epsilon: f32) -> Vec3
where
    F: Fn(Vec3) -> Option<f32>,
{
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return FALLBACK_NORMAL;
    }

    let center = distance(p);
    let partial = |axis: Vec3| {
        let forward = distance(p + axis * epsilon);
        let backward = distance(p - axis * epsilon);
        match (forward, center, backward) {
            (Some(f), _, Some(b)) => (f - b) / (2.0 * epsilon),
            (Some(f), Some(c), None) => (f - c) / epsilon,
            (None, Some(c), Some(b)) => (c - b) / epsilon,
            _ => 0.0,
        }
    };

    let gradient = Vec3::new(partial(Vec3::X), partial(Vec3::Y), partial(Vec3::Z));
    if !gradient.is_finite() || gradient.length_squared() < MIN_GRADIENT_LENGTH_SQUARED {
        FALLBACK_NORMAL
    } else {
        gradient.normalize()
    }
}
