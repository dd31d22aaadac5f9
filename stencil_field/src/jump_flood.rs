//! Jump flood propagation of nearest seeds.
//!
//! Each step looks at the 27 cells at offsets `{-step, 0, step}` on every axis and keeps
//! the recorded seed closest to the current cell. Steps go from `max(N) / 2` down to 1,
//! halving each time, for `log2(max(N))` steps in total. Dimensions that are not a power
//! of two are rounded up first, otherwise the farthest cells would never be reached.
//! Volumes are ping-ponged between steps: a step never reads and writes the same volume.
use glam::Vec3;
use rayon::prelude::*;

use crate::{Grid, SeedCell};

/// Uniform block of a jump flood dispatch.
///
/// Laid out like the WGSL `Params` struct: a `vec3<u32>` and a `u32`,
/// then a `vec3<f32>` padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct JumpFloodParams {
    /// Number of cells on each axis.
    pub size: [u32; 3],
    /// Offset, in cells, of the neighbors examined by this step.
    pub step: u32,
    /// Size of a cell in local units, distances are measured in this metric.
    pub cell_size: [f32; 3],
    padding: f32,
}

impl JumpFloodParams {
    /// Parameters of a step over `grid`.
    pub fn new(grid: &Grid, step: usize) -> Self {
        Self::from_size(grid.get_cell_count(), grid.get_cell_size(), step)
    }

    /// Parameters of a step over `size` cells of `cell_size` local units.
    pub fn from_size(size: [usize; 3], cell_size: Vec3, step: usize) -> Self {
        Self {
            size: size.map(|s| s as u32),
            step: step as u32,
            cell_size: cell_size.to_array(),
            padding: 0.0,
        }
    }
}

/// First step of a pass: half the largest dimension, rounded up to a power of two.
pub fn initial_step(size: [usize; 3]) -> usize {
    size.into_iter().max().unwrap_or(0).next_power_of_two() / 2
}

/// All the steps of a pass, in dispatch order.
pub fn step_sequence(size: [usize; 3]) -> impl Iterator<Item = usize> {
    core::iter::successors(Some(initial_step(size)), |step| Some(step / 2))
        .take_while(|step| *step > 0)
}

/// Number of dispatches in a pass.
pub fn iteration_count(size: [usize; 3]) -> usize {
    step_sequence(size).count()
}

/// One jump flood step on the CPU, reading `src` and writing every cell of `dst`.
pub fn jump_flood_step(src: &[SeedCell], dst: &mut [SeedCell], params: &JumpFloodParams) {
    let size = params.size.map(|s| s as usize);
    debug_assert_eq!(src.len(), size[0] * size[1] * size[2]);
    debug_assert_eq!(src.len(), dst.len());

    let cell_size = Vec3::from(params.cell_size);
    let step = params.step as isize;

    dst.par_iter_mut().enumerate().for_each(|(idx, out)| {
        let cell = [
            idx % size[0],
            (idx / size[0]) % size[1],
            idx / (size[0] * size[1]),
        ];
        *out = closest_neighbor_seed(src, size, cell, step, cell_size);
    });
}

/// Closest recorded seed among the 27 neighbors of `cell`, itself included.
/// Ties keep the first neighbor in `z, y, x` order.
fn closest_neighbor_seed(
    src: &[SeedCell],
    size: [usize; 3],
    cell: [usize; 3],
    step: isize,
    cell_size: Vec3,
) -> SeedCell {
    let here = Vec3::new(cell[0] as f32, cell[1] as f32, cell[2] as f32);
    let mut best = SeedCell::EMPTY;
    let mut best_distance = f32::INFINITY;

    for (dz, dy, dx) in itertools::iproduct!(-1..=1_isize, -1..=1_isize, -1..=1_isize) {
        let neighbor = [
            cell[0] as isize + dx * step,
            cell[1] as isize + dy * step,
            cell[2] as isize + dz * step,
        ];
        if neighbor
            .iter()
            .zip(size)
            .any(|(&n, s)| n < 0 || n >= s as isize)
        {
            continue;
        }

        let idx = neighbor[0] as usize
            + neighbor[1] as usize * size[0]
            + neighbor[2] as usize * size[0] * size[1];
        let candidate = src[idx];
        if !candidate.is_seeded() {
            continue;
        }

        let distance = ((Vec3::from(candidate.nearest) - here) * cell_size).length_squared();
        if distance < best_distance {
            best_distance = distance;
            best = candidate;
        }
    }

    best
}

/// Run a full pass on the CPU and return the propagated volume.
pub fn jump_flood(grid: &Grid, seeds: &[SeedCell]) -> Vec<SeedCell> {
    let mut src = seeds.to_vec();
    let mut dst = vec![SeedCell::EMPTY; seeds.len()];
    for step in step_sequence(grid.get_cell_count()) {
        jump_flood_step(&src, &mut dst, &JumpFloodParams::new(grid, step));
        core::mem::swap(&mut src, &mut dst);
    }
    src
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;

    fn grid(size: [usize; 3], extent: Vec3) -> Grid {
        Grid::from_bounds(Bounds::new(Vec3::ZERO, extent), size)
    }

    fn seeded(grid: &Grid, seeds: &[[usize; 3]]) -> Vec<SeedCell> {
        let mut cells = vec![SeedCell::EMPTY; grid.get_total_cell_count()];
        for seed in seeds {
            cells[grid.get_cell_idx(seed)] = SeedCell::seeded(*seed);
        }
        cells
    }

    #[test]
    fn test_step_sequence() {
        assert_eq!(step_sequence([128; 3]).collect::<Vec<_>>(), [64, 32, 16, 8, 4, 2, 1]);
        assert_eq!(iteration_count([32, 8, 4]), 5);
        assert_eq!(step_sequence([9, 3, 3]).collect::<Vec<_>>(), [8, 4, 2, 1]);
        assert_eq!(iteration_count([3, 1, 1]), 2);
        assert_eq!(iteration_count([1, 1, 1]), 0);
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(core::mem::size_of::<JumpFloodParams>(), 32);
        let params = JumpFloodParams::new(&grid([4, 2, 8], Vec3::new(1.0, 1.0, 4.0)), 4);
        assert_eq!(params.size, [4, 2, 8]);
        assert_eq!(params.cell_size, [0.25, 0.5, 0.5]);
    }

    #[test]
    fn test_single_seed_converges() {
        for size in [[16, 16, 16], [32, 8, 5], [7, 9, 3]] {
            let grid = grid(size, Vec3::ONE);
            let seed = [size[0] / 3, size[1] - 1, size[2] / 2];
            let result = jump_flood(&grid, &seeded(&grid, &[seed]));
            assert!(
                result.iter().all(|cell| cell.seed() == Some(seed)),
                "size {size:?}"
            );
        }
    }

    #[test]
    fn test_no_seed_stays_empty() {
        let grid = grid([8; 3], Vec3::ONE);
        let result = jump_flood(&grid, &seeded(&grid, &[]));
        assert!(result.iter().all(|cell| !cell.is_seeded()));
    }

    #[test]
    fn test_two_seeds_cover_the_volume() {
        let grid = grid([16; 3], Vec3::ONE);
        let a = [0, 0, 0];
        let b = [15, 15, 15];
        let result = jump_flood(&grid, &seeded(&grid, &[a, b]));

        assert!(result.iter().all(SeedCell::is_seeded));
        // seeds keep themselves, their direct neighbors see them on the last step.
        assert_eq!(result[grid.get_cell_idx(&a)].seed(), Some(a));
        assert_eq!(result[grid.get_cell_idx(&b)].seed(), Some(b));
        assert_eq!(result[grid.get_cell_idx(&[1, 1, 0])].seed(), Some(a));
        assert_eq!(result[grid.get_cell_idx(&[14, 15, 14])].seed(), Some(b));
    }

    #[test]
    fn test_anisotropic_cells() {
        // cells are four times shorter along y.
        let grid = grid([8; 3], Vec3::new(8.0, 2.0, 8.0));
        let a = [0, 4, 4];
        let b = [4, 0, 4];
        let result = jump_flood(&grid, &seeded(&grid, &[a, b]));
        assert_eq!(result[grid.get_cell_idx(&[4, 4, 4])].seed(), Some(b));
    }
}
