//! Point-to-primitive distance helpers used by the voxelizer and the mesh collider.
use glam::Vec3;

/// Triangles whose squared sine between edges falls below this are treated as segments.
const DEGENERATE_EPSILON: f32 = 1e-10;

/// Closest point to `p` on the triangle `v0 v1 v2`.
///
/// The point is projected on the triangle plane in the `(s, t)` parametrisation
/// `v0 + s * (v1 - v0) + t * (v2 - v0)` and the sign of the unnormalized barycentric
/// coordinates selects one of the seven Voronoi regions of the triangle:
///
/// ```text
///        t
///   \ 2 |
///    \  |
///     \ |
///      \|
///       *
///       |\
///    3  | \   1
///       |0 \
///  _____|___\_______ s
///    4  | 5  \  6
/// ```
///
/// Region 0 is the face, 1, 3 and 5 are the edges, 2, 4 and 6 the vertices.
/// Degenerate triangles (zero area, collinear or coincident vertices) fall back to the
/// closest of the three edges.
pub fn closest_point_on_triangle(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let edge0 = v1 - v0;
    let edge1 = v2 - v0;
    let diff = v0 - p;

    let a = edge0.dot(edge0);
    let b = edge0.dot(edge1);
    let c = edge1.dot(edge1);
    let d = edge0.dot(diff);
    let e = edge1.dot(diff);

    let det = a * c - b * b;
    if a <= f32::MIN_POSITIVE || c <= f32::MIN_POSITIVE || det <= DEGENERATE_EPSILON * a * c {
        return closest_point_on_degenerate_triangle(p, v0, v1, v2);
    }

    let mut s = b * e - c * d;
    let mut t = b * d - a * e;

    if s + t <= det {
        if s < 0.0 {
            if t < 0.0 {
                // region 4
                if d < 0.0 {
                    t = 0.0;
                    s = clamp_ratio(-d, a);
                } else {
                    s = 0.0;
                    t = if e >= 0.0 { 0.0 } else { clamp_ratio(-e, c) };
                }
            } else {
                // region 3
                s = 0.0;
                t = if e >= 0.0 { 0.0 } else { clamp_ratio(-e, c) };
            }
        } else if t < 0.0 {
            // region 5
            t = 0.0;
            s = if d >= 0.0 { 0.0 } else { clamp_ratio(-d, a) };
        } else {
            // region 0
            let inv_det = 1.0 / det;
            s *= inv_det;
            t *= inv_det;
        }
    } else if s < 0.0 {
        // region 2
        let tmp0 = b + d;
        let tmp1 = c + e;
        if tmp1 > tmp0 {
            s = clamp_ratio(tmp1 - tmp0, a - 2.0 * b + c);
            t = 1.0 - s;
        } else {
            s = 0.0;
            t = if tmp1 <= 0.0 {
                1.0
            } else if e >= 0.0 {
                0.0
            } else {
                clamp_ratio(-e, c)
            };
        }
    } else if t < 0.0 {
        // region 6
        let tmp0 = b + e;
        let tmp1 = a + d;
        if tmp1 > tmp0 {
            t = clamp_ratio(tmp1 - tmp0, a - 2.0 * b + c);
            s = 1.0 - t;
        } else {
            t = 0.0;
            s = if tmp1 <= 0.0 {
                1.0
            } else if d >= 0.0 {
                0.0
            } else {
                clamp_ratio(-d, a)
            };
        }
    } else {
        // region 1
        let numer = c + e - b - d;
        s = if numer <= 0.0 {
            0.0
        } else {
            clamp_ratio(numer, a - 2.0 * b + c)
        };
        t = 1.0 - s;
    }

    v0 + s * edge0 + t * edge1
}

/// `numer / denom` clamped to `[0, 1]`, with `numer` known to be positive.
fn clamp_ratio(numer: f32, denom: f32) -> f32 {
    if numer >= denom {
        1.0
    } else {
        numer / denom
    }
}

fn closest_point_on_degenerate_triangle(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    [
        closest_point_on_segment(p, v0, v1),
        closest_point_on_segment(p, v1, v2),
        closest_point_on_segment(p, v2, v0),
    ]
    .into_iter()
    .min_by(|x, y| p.distance_squared(*x).total_cmp(&p.distance_squared(*y)))
    .unwrap_or(v0)
}

/// Unsigned distance from `p` to the triangle `v0 v1 v2`.
pub fn point_triangle_distance(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> f32 {
    p.distance(closest_point_on_triangle(p, v0, v1, v2))
}

/// Squared unsigned distance from `p` to the triangle `v0 v1 v2`.
pub fn point_triangle_distance2(p: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> f32 {
    p.distance_squared(closest_point_on_triangle(p, v0, v1, v2))
}

/// Closest point to `p` on the segment `a b`. A zero-length segment returns `a`.
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let m2 = ab.dot(ab);
    if m2 <= f32::MIN_POSITIVE {
        return a;
    }

    // find parameter value of closest point on segment
    let s = ((p - a).dot(ab) / m2).clamp(0.0, 1.0);
    a + ab * s
}

/// Unsigned distance from `p` to the segment `a b`.
pub fn point_segment_distance(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    p.distance(closest_point_on_segment(p, a, b))
}

/// Axis aligned bounding box of a triangle as `(min, max)`.
pub fn triangle_bounding_box(a: Vec3, b: Vec3, c: Vec3) -> (Vec3, Vec3) {
    (a.min(b).min(c), a.max(b).max(c))
}
