//! Coarse previews of a published field. Visualization only, nothing reads them back.
use glam::Vec3;
use itertools::Itertools;

use crate::{primitives, DistanceField};

/// World centers of the cells seeded by the voxelizer.
///
/// After propagation a seed cell is the only kind of cell recording itself as its own
/// nearest seed.
pub fn seed_cell_centers(field: &DistanceField) -> Vec<Vec3> {
    let grid = field.grid();
    field
        .cells()
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| {
            let coords = grid.get_cell_integer_coordinates(idx);
            (cell.seed() == Some(coords)).then(|| {
                field
                    .local_to_world()
                    .transform_point3(grid.get_cell_center(&coords))
            })
        })
        .collect()
}

/// One box per seed cell, in world space, as a triangle list.
pub fn voxel_mesh(field: &DistanceField) -> (Vec<Vec3>, Vec<u32>) {
    let grid = field.grid();
    let (cube_vertices, cube_indices) = primitives::cuboid(grid.get_cell_size() * 0.5);
    let transform = field.local_to_world();
    let world_to_local = transform.inverse();

    let centers = seed_cell_centers(field);
    let vertices = centers
        .iter()
        .flat_map(|center| {
            let local_center = world_to_local.transform_point3(*center);
            cube_vertices
                .iter()
                .map(move |v| transform.transform_point3(local_center + *v))
        })
        .collect_vec();
    let indices = (0..centers.len() as u32)
        .flat_map(|cube| {
            let offset = cube * cube_vertices.len() as u32;
            cube_indices.iter().map(move |i| offset + i)
        })
        .collect_vec();

    log::debug!(
        "[preview] {} voxels, {} vertices, {} triangles",
        centers.len(),
        vertices.len(),
        indices.len() / 3
    );
    (vertices, indices)
}
