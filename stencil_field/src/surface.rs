//! Closest point on surface queries shared by voxel fields and guide unions.
use glam::Vec3;

use crate::{ComputeBackend, DistanceField, GuideRegistry, Propagator, StencilUnion};

/// A point projected on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Projected position, `query - normal * distance`.
    pub position: Vec3,
    /// Normal estimated at the query point.
    pub normal: Vec3,
    /// Distance of the query point to the surface.
    pub distance: f32,
}

/// Something a pointer can snap onto.
pub trait SurfaceQuery {
    /// Distance to the surface, `None` when the surface cannot answer for this point.
    fn distance(&self, world_point: Vec3) -> Option<f32>;

    /// Normalized direction of increasing distance.
    fn normal(&self, world_point: Vec3) -> Vec3;

    /// Project a point on the surface with one gradient step.
    fn closest_point_on_surface(&self, world_point: Vec3) -> Option<SurfacePoint> {
        let distance = self.distance(world_point)?;
        let normal = self.normal(world_point);
        Some(SurfacePoint {
            position: world_point - normal * distance,
            normal,
            distance,
        })
    }
}

impl SurfaceQuery for DistanceField {
    fn distance(&self, world_point: Vec3) -> Option<f32> {
        self.sample(world_point).distance()
    }

    fn normal(&self, world_point: Vec3) -> Vec3 {
        self.estimate_normal(world_point)
    }
}

impl<B: ComputeBackend> SurfaceQuery for Propagator<B> {
    fn distance(&self, world_point: Vec3) -> Option<f32> {
        self.sample(world_point).distance()
    }

    fn normal(&self, world_point: Vec3) -> Vec3 {
        self.estimate_normal(world_point)
    }
}

impl<R: GuideRegistry> SurfaceQuery for StencilUnion<R> {
    fn distance(&self, world_point: Vec3) -> Option<f32> {
        Some(self.signed_distance(world_point)).filter(|d| d.is_finite())
    }

    fn normal(&self, world_point: Vec3) -> Vec3 {
        self.estimate_normal(world_point)
    }
}
