//! Read-only mesh snapshots handed to the voxelizer.
use glam::Vec3;
use itertools::Itertools;

use crate::{Bounds, Point};

/// Mesh Topology
#[derive(Debug, Clone, Copy)]
pub enum Topology<'a, I>
where
    // I should be a u32 or u16
    I: Into<u32>,
{
    /// Vertex data is a list of triangles. Each set of 3 vertices composes a new triangle.
    ///
    /// Vertices `0 1 2 3 4 5` create two triangles `0 1 2` and `3 4 5`
    TriangleList(Option<&'a [I]>),
    /// Vertex data is a triangle strip. Each set of three adjacent vertices form a triangle.
    ///
    /// Vertices `0 1 2 3 4 5` create four triangles `0 1 2`, `2 1 3`, `2 3 4`, and `4 3 5`
    TriangleStrip(Option<&'a [I]>),
}

impl<'a, I> Topology<'a, I>
where
    I: Copy + Into<u32>,
{
    /// Iterate the vertex indices of each triangle.
    /// Without an index buffer, indices are `0..vertex_count`.
    pub fn get_triangles(
        self,
        vertex_count: usize,
    ) -> Box<dyn Iterator<Item = (usize, usize, usize)> + 'a> {
        match self {
            Self::TriangleList(Some(indices)) => Box::new(
                indices
                    .iter()
                    .map(|x| (*x).into() as usize)
                    .tuples::<(_, _, _)>(),
            ),
            Self::TriangleList(None) => Box::new((0..vertex_count).tuples::<(_, _, _)>()),
            Self::TriangleStrip(Some(indices)) => Box::new(
                indices
                    .iter()
                    .map(|x| (*x).into() as usize)
                    .tuple_windows::<(_, _, _)>()
                    .enumerate()
                    .map(strip_winding),
            ),
            Self::TriangleStrip(None) => Box::new(
                (0..vertex_count)
                    .tuple_windows::<(_, _, _)>()
                    .enumerate()
                    .map(strip_winding),
            ),
        }
    }
}

/// Odd triangles of a strip have their first two vertices swapped to keep the winding.
const fn strip_winding((i, (a, b, c)): (usize, (usize, usize, usize))) -> (usize, usize, usize) {
    if i % 2 == 0 {
        (a, b, c)
    } else {
        (b, a, c)
    }
}

/// Vertex positions and triangle index triples in the mesh local frame.
///
/// Only lives for the duration of a voxelization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshSnapshot {
    vertices: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
}

impl MeshSnapshot {
    /// Copy a mesh into a snapshot.
    /// Triangles referencing vertices out of range are dropped.
    pub fn new<V, I>(vertices: &[V], topology: Topology<I>) -> Self
    where
        V: Point,
        I: Copy + Into<u32>,
    {
        let vertices = vertices.iter().map(Point::to_vec3).collect_vec();
        let vertex_count = vertices.len();

        let mut dropped = 0_usize;
        let triangles = topology
            .get_triangles(vertex_count)
            .filter(|&(a, b, c)| {
                let valid = a < vertex_count && b < vertex_count && c < vertex_count;
                dropped += usize::from(!valid);
                valid
            })
            .map(|(a, b, c)| [a, b, c])
            .collect_vec();

        if dropped > 0 {
            log::warn!("[mesh] dropped {dropped} triangles with out of range vertex indices");
        }

        Self {
            vertices,
            triangles,
        }
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangle at all.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Positions of the three vertices of a triangle.
    pub fn triangle(&self, triangle: &[usize; 3]) -> (Vec3, Vec3, Vec3) {
        (
            self.vertices[triangle[0]],
            self.vertices[triangle[1]],
            self.vertices[triangle[2]],
        )
    }

    /// Bounds of the vertices referenced by triangles, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.triangles.iter().flatten().map(|&i| self.vertices[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Make sure all topologies give the same triangles.
    #[test]
    fn test_topology() {
        let v0 = [0., 1., 0.];
        let v1 = [1., 2., 3.];
        let v2 = [1., 3., 4.];
        let v3 = [2., 0., 0.];
        // triangles: 012 213 234 (with 4 = 0)

        let list_indices = MeshSnapshot::new(
            &[v0, v1, v2, v3],
            Topology::TriangleList(Some(&[0_u32, 1, 2, 2, 1, 3, 2, 3, 0][..])),
        );
        let list_none = MeshSnapshot::new(
            &[v0, v1, v2, v2, v1, v3, v2, v3, v0],
            Topology::TriangleList::<u32>(None),
        );
        let strip_indices = MeshSnapshot::new(
            &[v0, v1, v2, v3],
            Topology::TriangleStrip(Some(&[0_u16, 1, 2, 3, 0][..])),
        );
        let strip_none =
            MeshSnapshot::new(&[v0, v1, v2, v3, v0], Topology::TriangleStrip::<u32>(None));

        let positions = |mesh: &MeshSnapshot| {
            mesh.triangles()
                .iter()
                .map(|t| mesh.triangle(t))
                .collect_vec()
        };
        assert_eq!(list_indices.triangle_count(), 3);
        assert_eq!(positions(&list_indices), positions(&list_none));
        assert_eq!(positions(&list_indices), positions(&strip_indices));
        assert_eq!(positions(&list_indices), positions(&strip_none));
    }

    #[test]
    fn test_out_of_range_triangles() {
        let mesh = MeshSnapshot::new(
            &[[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
            Topology::TriangleList(Some(&[0_u32, 1, 2, 0, 1, 7][..])),
        );
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(
            mesh.bounds(),
            Some(Bounds::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)))
        );
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = MeshSnapshot::new::<[f32; 3], u32>(&[], Topology::TriangleList(None));
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounds(), None);
    }
}
