//! Mesh voxelization into jump flood seeds.
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{geo, Grid, MeshSnapshot, SeedCell, VoxelizeMethod};

/// Output of a voxelization: one cell per grid cell, seeded when close to the mesh.
///
/// A seeded cell records its own coordinates as nearest seed. Consumed by the field store
/// right after the voxelization and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedGrid {
    grid: Grid,
    cells: Vec<SeedCell>,
    seed_count: usize,
}

impl SeedGrid {
    /// Grid the seeds were computed on.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Cells in grid order.
    pub fn cells(&self) -> &[SeedCell] {
        &self.cells
    }

    /// Number of seeded cells.
    pub const fn seed_count(&self) -> usize {
        self.seed_count
    }
}

/// Mark every cell whose center lies closer than `threshold` to the mesh.
///
/// No exact nearest point is stored: a seed only says "this cell is on the surface band",
/// distances are recomputed from seed positions at query time.
/// A mesh without triangles yields a grid without seeds.
pub fn voxelize(
    mesh: &MeshSnapshot,
    grid: &Grid,
    threshold: f32,
    method: VoxelizeMethod,
) -> SeedGrid {
    let now = web_time::Instant::now();
    let total = grid.get_total_cell_count();
    let cell_count = grid.get_cell_count();

    log::info!(
        "[voxelize] grid {}x{}x{} ({} voxels), {} vertices, {} triangles, {:?}",
        cell_count[0],
        cell_count[1],
        cell_count[2],
        total,
        mesh.vertices().len(),
        mesh.triangle_count(),
        method,
    );

    let cells = match method {
        VoxelizeMethod::BruteForce => voxelize_brute_force(mesh, grid, threshold),
        VoxelizeMethod::TriangleBounds => voxelize_triangle_bounds(mesh, grid, threshold),
    };
    let seed_count = cells.iter().filter(|cell| cell.is_seeded()).count();

    log::info!(
        "[voxelize] {} seeds ({:.2}% of volume) in {:.3}ms",
        seed_count,
        if total == 0 {
            0.0
        } else {
            seed_count as f64 * 100.0 / total as f64
        },
        now.elapsed().as_secs_f64() * 1000.0
    );

    SeedGrid {
        grid: grid.clone(),
        cells,
        seed_count,
    }
}

/// Every cell against every triangle, cells processed in parallel.
fn voxelize_brute_force(mesh: &MeshSnapshot, grid: &Grid, threshold: f32) -> Vec<SeedCell> {
    (0..grid.get_total_cell_count())
        .into_par_iter()
        .map(|idx| {
            let cell = grid.get_cell_integer_coordinates(idx);
            let center = grid.get_cell_center(&cell);

            let min_distance = mesh
                .triangles()
                .iter()
                .map(|triangle| {
                    let (a, b, c) = mesh.triangle(triangle);
                    geo::point_triangle_distance(center, a, b, c)
                })
                .fold(f32::MAX, f32::min);

            if min_distance < threshold {
                SeedCell::seeded(cell)
            } else {
                SeedCell::EMPTY
            }
        })
        .collect()
}

/// Triangles processed in parallel, each one visiting the cells of its bounding box
/// grown by `threshold`. A cell outside this box cannot be within `threshold` of the triangle.
fn voxelize_triangle_bounds(mesh: &MeshSnapshot, grid: &Grid, threshold: f32) -> Vec<SeedCell> {
    let marks = (0..grid.get_total_cell_count())
        .map(|_| AtomicBool::new(false))
        .collect::<Vec<_>>();
    let bounds = grid.get_bounds();

    mesh.triangles().par_iter().for_each(|triangle| {
        let (a, b, c) = mesh.triangle(triangle);
        let (min, max) = geo::triangle_bounding_box(a, b, c);
        let min = min - glam::Vec3::splat(threshold);
        let max = max + glam::Vec3::splat(threshold);

        // Triangle band entirely outside the grid.
        if max.cmplt(bounds.min).any() || min.cmpgt(bounds.max).any() {
            return;
        }

        let min_cell = grid.snap_point_to_grid(min).cell();
        let max_cell = grid.snap_point_to_grid(max).cell();

        for (z, y, x) in itertools::iproduct!(
            min_cell[2]..=max_cell[2],
            min_cell[1]..=max_cell[1],
            min_cell[0]..=max_cell[0]
        ) {
            let cell = [x, y, z];
            let mark = &marks[grid.get_cell_idx(&cell)];
            // Already a seed, another triangle got there first.
            if mark.load(Ordering::Relaxed) {
                continue;
            }

            let center = grid.get_cell_center(&cell);
            if geo::point_triangle_distance(center, a, b, c) < threshold {
                mark.store(true, Ordering::Relaxed);
            }
        }
    });

    marks
        .into_iter()
        .enumerate()
        .map(|(idx, mark)| {
            if mark.into_inner() {
                SeedCell::seeded(grid.get_cell_integer_coordinates(idx))
            } else {
                SeedCell::EMPTY
            }
        })
        .collect()
}

/// State shared between a voxelization job and its handle.
#[derive(Default)]
struct JobSlot {
    done: AtomicBool,
    result: Mutex<Option<SeedGrid>>,
}

/// Handle to a voxelization running on the rayon thread pool.
///
/// Fire and forget: the job cannot be interrupted. Poll [`VoxelJob::try_take`] once per tick.
/// Dropping the handle discards the result whenever the job finishes.
pub struct VoxelJob {
    slot: Arc<JobSlot>,
}

impl VoxelJob {
    /// Start voxelizing `mesh` in the background.
    pub fn spawn(mesh: MeshSnapshot, grid: Grid, threshold: f32, method: VoxelizeMethod) -> Self {
        let slot = Arc::new(JobSlot::default());
        let job_slot = Arc::clone(&slot);

        rayon::spawn(move || {
            let seeds = voxelize(&mesh, &grid, threshold, method);
            // the snapshot is not retained past the voxelization.
            drop(mesh);
            *job_slot.result.lock() = Some(seeds);
            job_slot.done.store(true, Ordering::Release);
        });

        Self { slot }
    }

    /// Whether the job finished. Never blocks.
    pub fn is_complete(&self) -> bool {
        self.slot.done.load(Ordering::Acquire)
    }

    /// Take the seeds if the job finished. Returns `None` while running or once taken.
    pub fn try_take(&mut self) -> Option<SeedGrid> {
        if !self.is_complete() {
            return None;
        }
        self.slot.result.lock().take()
    }
}

impl core::fmt::Debug for VoxelJob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VoxelJob")
            .field("complete", &self.is_complete())
            .finish()
    }
}
