//! Nearest point queries against a triangle mesh, accelerated by an r-tree.
use glam::Vec3;
use itertools::Itertools;

use crate::{geo, Collider, MeshSnapshot};

/// Wrapper around a point to make it compatible with the r-tree.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointWrapper(Vec3);

impl rstar::Point for PointWrapper {
    type Scalar = f32;

    const DIMENSIONS: usize = 3;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        let x = generator(0);
        let y = generator(1);
        let z = generator(2);
        Self(Vec3::new(x, y, z))
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.0[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.0[index]
    }
}

/// A triangle stored in the r-tree.
#[derive(Debug, Clone)]
struct TriangleNode {
    vertices: (Vec3, Vec3, Vec3),
    bounding_box: (Vec3, Vec3),
}

impl rstar::RTreeObject for TriangleNode {
    type Envelope = rstar::AABB<PointWrapper>;

    fn envelope(&self) -> Self::Envelope {
        rstar::AABB::from_corners(
            PointWrapper(self.bounding_box.0),
            PointWrapper(self.bounding_box.1),
        )
    }
}

impl rstar::PointDistance for TriangleNode {
    fn distance_2(&self, point: &PointWrapper) -> f32 {
        geo::point_triangle_distance2(
            point.0,
            self.vertices.0,
            self.vertices.1,
            self.vertices.2,
        )
    }
}

/// Triangle mesh answering closest point queries in its own frame.
///
/// This is the collision representation of guides without a closed form distance,
/// and of meshes too small to deserve a voxel field.
pub struct TriangleMeshCollider {
    rtree: rstar::RTree<TriangleNode>,
}

impl TriangleMeshCollider {
    /// Build the r-tree over the triangles of `mesh`.
    pub fn new(mesh: &MeshSnapshot) -> Self {
        let nodes = mesh
            .triangles()
            .iter()
            .map(|triangle| {
                let (a, b, c) = mesh.triangle(triangle);
                TriangleNode {
                    vertices: (a, b, c),
                    bounding_box: geo::triangle_bounding_box(a, b, c),
                }
            })
            .collect_vec();

        Self {
            rtree: rstar::RTree::bulk_load(nodes),
        }
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    /// Whether the collider has no triangle.
    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }
}

impl core::fmt::Debug for TriangleMeshCollider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TriangleMeshCollider")
            .field("triangles", &self.len())
            .finish()
    }
}

impl Collider for TriangleMeshCollider {
    fn closest_point(&self, point: Vec3) -> Option<Vec3> {
        let nearest = self.rtree.nearest_neighbor(&PointWrapper(point))?;
        Some(geo::closest_point_on_triangle(
            point,
            nearest.vertices.0,
            nearest.vertices.1,
            nearest.vertices.2,
        ))
    }
}
