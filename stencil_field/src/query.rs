//! Published distance fields and their queries.
use glam::{Mat4, Vec3};

use crate::{gradient, Grid, SampleMode, SeedCell, VolumeCells};

/// Result of sampling a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldSample {
    /// Unsigned world space distance to the nearest recorded seed.
    Hit {
        /// Distance from the query point to `nearest`.
        distance: f32,
        /// World position of the nearest seed cell center.
        nearest: Vec3,
    },
    /// No field has been published yet or a rebuild is in progress.
    NotReady,
    /// The query point lies outside the field bounds.
    OutsideBounds,
    /// The field holds no seed: the mesh has no surface inside the bounds.
    NoSurface,
}

impl FieldSample {
    /// The distance, if the sample hit.
    pub const fn distance(&self) -> Option<f32> {
        match *self {
            Self::Hit { distance, .. } => Some(distance),
            _ => None,
        }
    }

    /// Whether the sample produced a distance.
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Immutable snapshot of a fully propagated volume.
///
/// Fields are shared behind an `Arc` and never written once published.
/// Distances are unsigned: propagation never decides inside from outside.
#[derive(Debug, Clone)]
pub struct DistanceField {
    grid: Grid,
    local_to_world: Mat4,
    world_to_local: Mat4,
    cells: VolumeCells,
    seed_count: usize,
    sample_mode: SampleMode,
}

impl DistanceField {
    /// Wrap a propagated volume. `local_to_world` must be invertible.
    pub fn new(
        grid: Grid,
        local_to_world: Mat4,
        cells: VolumeCells,
        sample_mode: SampleMode,
    ) -> Self {
        let seed_count = cells.iter().filter(|cell| cell.is_seeded()).count();
        Self {
            grid,
            local_to_world,
            world_to_local: local_to_world.inverse(),
            cells,
            seed_count,
            sample_mode,
        }
    }

    /// Grid of the field, in the local frame.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Transform from the field local frame to world space.
    pub const fn local_to_world(&self) -> Mat4 {
        self.local_to_world
    }

    /// Propagated cells in grid order.
    pub fn cells(&self) -> &[SeedCell] {
        &self.cells
    }

    /// Number of cells that know a seed.
    pub const fn seed_count(&self) -> usize {
        self.seed_count
    }

    /// Sampling strategy.
    pub const fn sample_mode(&self) -> SampleMode {
        self.sample_mode
    }

    /// Distance from a world point to the nearest seed recorded around it.
    pub fn sample(&self, world_point: Vec3) -> FieldSample {
        let local = self.world_to_local.transform_point3(world_point);
        let normalized = self.grid.normalize(local);
        // NaN coordinates fail both comparisons.
        if !(normalized.cmpge(Vec3::ZERO).all() && normalized.cmple(Vec3::ONE).all()) {
            return FieldSample::OutsideBounds;
        }
        if self.seed_count == 0 {
            return FieldSample::NoSurface;
        }

        let hit = match self.sample_mode {
            SampleMode::Nearest => {
                let cell = self.grid.snap_point_to_grid(local).cell();
                self.seed_hit(world_point, &cell)
            }
            SampleMode::Neighborhood => self.neighborhood_hit(world_point, local),
        };
        hit.unwrap_or(FieldSample::NoSurface)
    }

    /// Minimum over the 2x2x2 cells whose centers surround `local`.
    fn neighborhood_hit(&self, world_point: Vec3, local: Vec3) -> Option<FieldSample> {
        let count = self.grid.get_cell_count();
        let fractional = (local - self.grid.get_first_cell()) / self.grid.get_cell_size();
        let base = [0, 1, 2]
            .map(|axis| (fractional[axis].floor().max(0.0) as usize).min(count[axis] - 1));

        itertools::iproduct!(0..2, 0..2, 0..2)
            .map(|(dz, dy, dx)| {
                [
                    (base[0] + dx).min(count[0] - 1),
                    (base[1] + dy).min(count[1] - 1),
                    (base[2] + dz).min(count[2] - 1),
                ]
            })
            .filter_map(|cell| self.seed_hit(world_point, &cell))
            .min_by(|a, b| {
                let a = a.distance().unwrap_or(f32::INFINITY);
                let b = b.distance().unwrap_or(f32::INFINITY);
                a.total_cmp(&b)
            })
    }

    fn seed_hit(&self, world_point: Vec3, cell: &[usize; 3]) -> Option<FieldSample> {
        let seed = self.cells[self.grid.get_cell_idx(cell)];
        seed.is_seeded().then(|| {
            let local = self
                .grid
                .get_fractional_cell_center(Vec3::from(seed.nearest));
            let nearest = self.local_to_world.transform_point3(local);
            FieldSample::Hit {
                distance: world_point.distance(nearest),
                nearest,
            }
        })
    }

    /// World length of the shortest cell edge, the default normal estimation step.
    pub fn world_cell_size(&self) -> f32 {
        let cell_size = self.grid.get_cell_size();
        [
            Vec3::X * cell_size.x,
            Vec3::Y * cell_size.y,
            Vec3::Z * cell_size.z,
        ]
        .into_iter()
        .map(|edge| self.local_to_world.transform_vector3(edge).length())
        .fold(f32::INFINITY, f32::min)
    }

    /// Direction of increasing distance at `world_point`, one cell wide differences.
    pub fn estimate_normal(&self, world_point: Vec3) -> Vec3 {
        self.estimate_normal_with_epsilon(world_point, self.world_cell_size())
    }

    /// Direction of increasing distance at `world_point` with an explicit step.
    /// Falls back to up where the field is flat or undefined.
    pub fn estimate_normal_with_epsilon(&self, world_point: Vec3, epsilon: f32) -> Vec3 {
        gradient::estimate_normal(|p| self.sample(p).distance(), world_point, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jump_flood, Bounds};
    use float_cmp::assert_approx_eq;
    use glam::Quat;
    use std::sync::Arc;

    fn single_seed_field(transform: Mat4, sample_mode: SampleMode) -> DistanceField {
        let grid = Grid::from_bounds(Bounds::new(Vec3::ZERO, Vec3::splat(4.0)), [4; 3]);
        let mut cells = vec![SeedCell::EMPTY; 64];
        cells[grid.get_cell_idx(&[1, 1, 1])] = SeedCell::seeded([1, 1, 1]);
        let cells = jump_flood::jump_flood(&grid, &cells);
        DistanceField::new(grid, transform, Arc::new(cells), sample_mode)
    }

    #[test]
    fn test_sample() {
        let field = single_seed_field(Mat4::IDENTITY, SampleMode::Nearest);
        // seed cell center is (1.5, 1.5, 1.5).
        let sample = field.sample(Vec3::new(3.5, 1.5, 1.5));
        assert_eq!(
            sample,
            FieldSample::Hit {
                distance: 2.0,
                nearest: Vec3::splat(1.5)
            }
        );
        assert_eq!(field.seed_count(), 64);
    }

    #[test]
    fn test_bounds_rejection() {
        let field = single_seed_field(Mat4::IDENTITY, SampleMode::Nearest);
        for p in [
            Vec3::new(-0.01, 1.0, 1.0),
            Vec3::new(1.0, 4.01, 1.0),
            Vec3::new(1.0, 1.0, 100.0),
            Vec3::NAN,
        ] {
            assert_eq!(field.sample(p), FieldSample::OutsideBounds);
        }
        // faces are inside.
        assert!(field.sample(Vec3::splat(4.0)).is_hit());
        assert!(field.sample(Vec3::ZERO).is_hit());
    }

    #[test]
    fn test_transformed_field() {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_z(core::f32::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        );
        let field = single_seed_field(transform, SampleMode::Nearest);
        let seed_world = transform.transform_point3(Vec3::splat(1.5));
        let probe_local = Vec3::new(1.5, 3.5, 1.5);
        let probe = transform.transform_point3(probe_local);

        let FieldSample::Hit { distance, nearest } = field.sample(probe) else {
            panic!("expected a hit");
        };
        assert!(nearest.distance(seed_world) < 1e-5);
        // 2 local units scaled by 2.
        assert_approx_eq!(f32, distance, 4.0, epsilon = 1e-5);
        assert_approx_eq!(f32, field.world_cell_size(), 2.0, epsilon = 1e-6);
        assert_eq!(
            field.sample(transform.transform_point3(Vec3::splat(-0.1))),
            FieldSample::OutsideBounds
        );
    }

    #[test]
    fn test_no_surface() {
        let grid = Grid::from_bounds(Bounds::new(Vec3::ZERO, Vec3::ONE), [2; 3]);
        let field = DistanceField::new(
            grid,
            Mat4::IDENTITY,
            Arc::new(vec![SeedCell::EMPTY; 8]),
            SampleMode::Nearest,
        );
        assert_eq!(field.sample(Vec3::splat(0.5)), FieldSample::NoSurface);
        assert_eq!(field.sample(Vec3::splat(2.0)), FieldSample::OutsideBounds);
        assert_eq!(field.estimate_normal(Vec3::splat(0.5)), gradient::FALLBACK_NORMAL);
    }

    #[test]
    fn test_neighborhood_never_farther() {
        let nearest = single_seed_field(Mat4::IDENTITY, SampleMode::Nearest);
        let neighborhood = single_seed_field(Mat4::IDENTITY, SampleMode::Neighborhood);
        for p in [
            Vec3::new(0.2, 3.9, 2.0),
            Vec3::new(2.2, 2.1, 0.7),
            Vec3::splat(4.0),
        ] {
            let a = nearest.sample(p).distance().unwrap();
            let b = neighborhood.sample(p).distance().unwrap();
            assert!(b <= a + 1e-6);
        }
    }

    #[test]
    fn test_normal_points_away_from_seed() {
        let field = single_seed_field(Mat4::IDENTITY, SampleMode::Nearest);
        let n = field.estimate_normal(Vec3::new(3.5, 1.5, 1.5));
        assert!(n.x > 0.9, "{n}");
    }
}
