//! Union of analytic guide shapes, queried without any voxel field.
use std::sync::{Arc, OnceLock};

use glam::{Quat, Vec3};
use ordered_float::OrderedFloat;

use crate::{analytic, gradient};

/// Default finite difference step of [`StencilUnion::estimate_normal`], in world units.
pub const DEFAULT_NORMAL_EPSILON: f32 = 0.01;

/// Kind of a guide shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    /// Sphere of diameter `extents`, usually uniform. Evaluated as an ellipsoid.
    Sphere,
    /// Ellipsoid with diameters `extents`.
    Ellipsoid,
    /// Box of size `extents`.
    Cube,
    /// Thin box of size `extents`.
    Plane,
    /// Capsule along the local Y axis, diameter `extents.x` and total height `extents.y`.
    Capsule,
    /// User authored guide, never part of the union.
    Custom,
    /// Any other shape, queried through its [`Collider`].
    Other,
}

/// Kind, pose and size of a guide shape, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeDescriptor {
    /// Which distance function applies.
    pub kind: ShapeKind,
    /// World position of the shape center.
    pub translation: Vec3,
    /// World orientation of the shape.
    pub rotation: Quat,
    /// Full size of the shape along its local axes.
    pub extents: Vec3,
}

impl ShapeDescriptor {
    /// Shape of the given kind and size, centered at the origin.
    pub const fn new(kind: ShapeKind, extents: Vec3) -> Self {
        Self {
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            extents,
        }
    }

    /// Move the shape center.
    #[must_use]
    pub const fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Orient the shape.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Half of the extents.
    pub fn radii(&self) -> Vec3 {
        self.extents * 0.5
    }

    /// Express a world point in the shape frame.
    pub fn to_local(&self, world_point: Vec3) -> Vec3 {
        self.rotation.inverse() * (world_point - self.translation)
    }

    /// Closed form signed distance, `None` for kinds without one.
    pub fn analytic_distance(&self, world_point: Vec3) -> Option<f32> {
        let p = self.to_local(world_point);
        let radii = self.radii();
        match self.kind {
            ShapeKind::Sphere | ShapeKind::Ellipsoid => Some(analytic::sd_ellipsoid(p, radii)),
            ShapeKind::Cube | ShapeKind::Plane => Some(analytic::sd_box(p, radii)),
            ShapeKind::Capsule => Some(analytic::sd_capsule(p, radii.y - radii.x, radii.x)),
            ShapeKind::Custom | ShapeKind::Other => None,
        }
    }
}

/// Collision representation of a shape, queried in the shape frame.
pub trait Collider: Send + Sync + core::fmt::Debug {
    /// Closest point of the surface to `point`, `None` if the collider is empty.
    fn closest_point(&self, point: Vec3) -> Option<Vec3>;
}

/// Signed distance through a collider.
///
/// The sign compares the squared distances of the point and of its closest surface point
/// to the shape center. This is only correct for convex, roughly star shaped bodies:
/// concave shapes get wrong signs in their hollows.
pub fn collider_distance(
    collider: &dyn Collider,
    shape: &ShapeDescriptor,
    world_point: Vec3,
) -> f32 {
    let p = shape.to_local(world_point);
    let Some(closest) = collider.closest_point(p) else {
        return f32::INFINITY;
    };
    let distance = p.distance(closest);
    if p.length_squared() < closest.length_squared() {
        -distance
    } else {
        distance
    }
}

/// A guide shape as exposed by a [`GuideRegistry`].
#[derive(Debug, Clone)]
pub struct GuideShape {
    /// Kind, pose and size.
    pub descriptor: ShapeDescriptor,
    /// Inactive or disabled guides are left out of the union.
    pub active: bool,
    /// Used for [`ShapeKind::Other`].
    pub collider: Option<Arc<dyn Collider>>,
}

impl GuideShape {
    /// An active guide without collider.
    pub fn new(descriptor: ShapeDescriptor) -> Self {
        Self {
            descriptor,
            active: true,
            collider: None,
        }
    }

    /// Attach a collision representation.
    #[must_use]
    pub fn with_collider(mut self, collider: Arc<dyn Collider>) -> Self {
        self.collider = Some(collider);
        self
    }

    /// Enable or disable the guide.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Signed distance from a world point, `+inf` when the shape cannot be evaluated.
    pub fn signed_distance(&self, world_point: Vec3) -> f32 {
        if let Some(distance) = self.descriptor.analytic_distance(world_point) {
            return distance;
        }
        match (self.descriptor.kind, &self.collider) {
            (ShapeKind::Other, Some(collider)) => {
                collider_distance(collider.as_ref(), &self.descriptor, world_point)
            }
            _ => f32::INFINITY,
        }
    }
}

/// Source of the current guide shapes, owned outside of the union.
///
/// Guides are addressed by index. Indices must stay stable until the union cache is invalidated.
pub trait GuideRegistry {
    /// Number of registered guides, active or not.
    fn guide_count(&self) -> usize;

    /// Call `visitor` on the guide at `index`, if there is one.
    fn visit_guide(&self, index: usize, visitor: &mut dyn FnMut(&GuideShape));

    /// Call `visitor` on every registered guide with its index.
    fn visit_guides(&self, visitor: &mut dyn FnMut(usize, &GuideShape)) {
        for index in 0..self.guide_count() {
            self.visit_guide(index, &mut |guide| visitor(index, guide));
        }
    }
}

impl GuideRegistry for [GuideShape] {
    fn guide_count(&self) -> usize {
        self.len()
    }

    fn visit_guide(&self, index: usize, visitor: &mut dyn FnMut(&GuideShape)) {
        if let Some(guide) = self.get(index) {
            visitor(guide);
        }
    }
}

impl GuideRegistry for Vec<GuideShape> {
    fn guide_count(&self) -> usize {
        self.len()
    }

    fn visit_guide(&self, index: usize, visitor: &mut dyn FnMut(&GuideShape)) {
        self.as_slice().visit_guide(index, visitor);
    }
}

impl<R: GuideRegistry + ?Sized> GuideRegistry for &R {
    fn guide_count(&self) -> usize {
        (**self).guide_count()
    }

    fn visit_guide(&self, index: usize, visitor: &mut dyn FnMut(&GuideShape)) {
        (**self).visit_guide(index, visitor);
    }
}

/// Minimum of the signed distances of the active guides.
///
/// Only the indices of the active guides are cached, on the first query. Poses and sizes
/// are read from the registry on every query, so moving or resizing a guide needs nothing.
/// Call [`StencilUnion::invalidate_cache`] after adding, removing or toggling a guide.
#[derive(Debug)]
pub struct StencilUnion<R> {
    registry: R,
    cache: OnceLock<Vec<usize>>,
    normal_epsilon: f32,
}

impl<R: GuideRegistry> StencilUnion<R> {
    /// Union over the guides of `registry`.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            cache: OnceLock::new(),
            normal_epsilon: DEFAULT_NORMAL_EPSILON,
        }
    }

    /// Set the finite difference step of normal estimation.
    #[must_use]
    pub fn with_normal_epsilon(mut self, normal_epsilon: f32) -> Self {
        self.normal_epsilon = normal_epsilon;
        self
    }

    /// The guide registry.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the registry. Invalidates the cache.
    pub fn registry_mut(&mut self) -> &mut R {
        self.invalidate_cache();
        &mut self.registry
    }

    /// Forget the cached active guides, they are collected again on the next query.
    pub fn invalidate_cache(&mut self) {
        self.cache.take();
    }

    /// Registry indices of the active guides, collected if the cache is empty.
    pub fn active_guides(&self) -> &[usize] {
        self.cache.get_or_init(|| {
            let mut indices = vec![];
            self.registry.visit_guides(&mut |index, guide| {
                if guide.active && guide.descriptor.kind != ShapeKind::Custom {
                    indices.push(index);
                }
            });
            log::debug!("[stencil] {} active guides cached", indices.len());
            indices
        })
    }

    /// Signed distance to the guide at `index` in its current pose, `+inf` if it is gone.
    fn guide_distance(&self, index: usize, world_point: Vec3) -> f32 {
        let mut distance = f32::INFINITY;
        self.registry.visit_guide(index, &mut |guide| {
            distance = guide.signed_distance(world_point);
        });
        distance
    }

    /// Minimum signed distance to the active guides, `+inf` when there is none.
    pub fn signed_distance(&self, world_point: Vec3) -> f32 {
        self.active_guides()
            .iter()
            .map(|&index| self.guide_distance(index, world_point))
            .fold(f32::INFINITY, f32::min)
    }

    /// Registry index of the active guide closest to the point, with its signed distance.
    pub fn nearest_guide(&self, world_point: Vec3) -> Option<(usize, f32)> {
        self.active_guides()
            .iter()
            .map(|&index| (index, self.guide_distance(index, world_point)))
            .filter(|(_, distance)| !distance.is_nan())
            .min_by_key(|(_, distance)| OrderedFloat(*distance))
    }

    /// Normalized gradient of the union, up where it is flat or undefined.
    pub fn estimate_normal(&self, world_point: Vec3) -> Vec3 {
        gradient::estimate_normal(
            |p| Some(self.signed_distance(p)).filter(|d| d.is_finite()),
            world_point,
            self.normal_epsilon,
        )
    }

    /// Move `point` by `velocity` along `direction` and pull the result back on the surface
    /// with one Newton step: `candidate - normal * distance`.
    ///
    /// Not a geodesic walk, callers invoke it every tick with small velocities.
    /// Without any active guide the candidate is returned as is.
    pub fn next_point_on_surface(&self, point: Vec3, velocity: f32, direction: Vec3) -> Vec3 {
        let candidate = point + direction.normalize_or_zero() * velocity;
        let distance = self.signed_distance(candidate);
        if !distance.is_finite() {
            return candidate;
        }
        candidate - self.estimate_normal(candidate) * distance
    }
}
