use glam::Vec3;

/// Axis aligned box in the field local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Bounds {
    /// Create bounds from two corners.
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create bounds from a center and half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest bounds containing all the points, `None` if there is no point.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self::new(p, p)),
            Some(bounds) => Some(Self::new(bounds.min.min(p), bounds.max.max(p))),
        })
    }

    /// Size of the box on each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Bounds grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// Whether the point lies inside the box, faces included.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Bounds are valid if finite with a strictly positive size on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.size().cmpgt(Vec3::ZERO).all()
    }
}

/// Result of snapping a point to the grid.
/// If the point is inside the grid, the cell it is within is returned.
/// If the point is outside the grid, the cell index is the nearest cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapResult {
    /// The point is inside the grid.
    /// Cell index is the cell it is within.
    Inside([usize; 3]),
    /// The point is outside the grid
    /// Cell index is the cell it is the nearest from.
    Outside([usize; 3]),
}

impl SnapResult {
    /// Cell index regardless of the point being inside or not.
    pub const fn cell(&self) -> [usize; 3] {
        match *self {
            Self::Inside(cell) | Self::Outside(cell) => cell,
        }
    }
}

/// Lattice of `Nx * Ny * Nz` cells covering a bounding box.
///
/// - `cell_size` is `(max - min) / cell_count` and can be different in each direction.
/// - Cells are stored x first: the linear index of `[x, y, z]` is `x + y * Nx + z * Nx * Ny`,
///   which matches the layout of 3D textures and compute buffers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    /// Covered box.
    bounds: Bounds,
    /// The size of a cell. A cell goes from `center - cell_size / 2` to `center + cell_size / 2`.
    cell_size: Vec3,
    /// The number of cells in each direction.
    cell_count: [usize; 3],
}

impl Grid {
    /// Create a new grid from a bounding box.
    ///
    /// The size of a cell will be `bounding_box_size / cell_count`.
    /// The first cell center will be at `min + cell_size / 2`.
    pub fn from_bounds(bounds: Bounds, cell_count: [usize; 3]) -> Self {
        let fcell_count = Vec3::new(
            cell_count[0] as f32,
            cell_count[1] as f32,
            cell_count[2] as f32,
        );
        let cell_size = bounds.size() / fcell_count;

        Self {
            bounds,
            cell_size,
            cell_count,
        }
    }

    /// Get the covered bounding box.
    pub const fn get_bounds(&self) -> Bounds {
        self.bounds
    }

    /// Get the size of a cell.
    pub const fn get_cell_size(&self) -> Vec3 {
        self.cell_size
    }

    /// Get the number of cells in each direction.
    pub const fn get_cell_count(&self) -> [usize; 3] {
        self.cell_count
    }

    /// Get the total number of cells.
    pub const fn get_total_cell_count(&self) -> usize {
        self.cell_count[0] * self.cell_count[1] * self.cell_count[2]
    }

    /// Largest cell count among the three axes.
    pub fn get_max_cell_count(&self) -> usize {
        self.cell_count.into_iter().max().unwrap_or(0)
    }

    /// Get the center of the first cell.
    pub fn get_first_cell(&self) -> Vec3 {
        self.bounds.min + self.cell_size * 0.5
    }

    /// Get the index of a cell in a grid.
    pub const fn get_cell_idx(&self, cell: &[usize; 3]) -> usize {
        cell[0] + cell[1] * self.cell_count[0] + cell[2] * self.cell_count[0] * self.cell_count[1]
    }

    /// Get the cell coordinates of a linear index.
    pub const fn get_cell_integer_coordinates(&self, idx: usize) -> [usize; 3] {
        let slice = self.cell_count[0] * self.cell_count[1];
        let z = idx / slice;
        let rem = idx % slice;
        [rem % self.cell_count[0], rem / self.cell_count[0], z]
    }

    /// Get the position of a cell center.
    pub fn get_cell_center(&self, cell: &[usize; 3]) -> Vec3 {
        self.get_fractional_cell_center(Vec3::new(
            cell[0] as f32,
            cell[1] as f32,
            cell[2] as f32,
        ))
    }

    /// Position of a cell given by floating point coordinates, as stored in volume cells.
    pub fn get_fractional_cell_center(&self, cell: Vec3) -> Vec3 {
        self.get_first_cell() + cell * self.cell_size
    }

    /// Position of a point in the normalized `[0, 1]` box coordinates.
    pub fn normalize(&self, point: Vec3) -> Vec3 {
        (point - self.bounds.min) / self.bounds.size()
    }

    /// Snap a point to the grid.
    /// Returns a `SnapResult` specifying if the point is inside or outside the grid.
    /// Points exactly on the max faces belong to the last cell.
    pub fn snap_point_to_grid(&self, point: Vec3) -> SnapResult {
        let cell = (point - self.bounds.min) / self.cell_size;

        let cell = [
            cell.x.floor() as isize,
            cell.y.floor() as isize,
            cell.z.floor() as isize,
        ];

        let ires = [
            cell[0].clamp(0, self.cell_count[0] as isize - 1),
            cell[1].clamp(0, self.cell_count[1] as isize - 1),
            cell[2].clamp(0, self.cell_count[2] as isize - 1),
        ];

        let res = [ires[0] as usize, ires[1] as usize, ires[2] as usize];

        if self.bounds.contains(point) {
            SnapResult::Inside(res)
        } else {
            SnapResult::Outside(res)
        }
    }
}
