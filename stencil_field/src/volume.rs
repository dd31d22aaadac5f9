//! Cell layout shared by the CPU volumes and the compute buffers.

/// One cell of a propagation volume, four floats wide to match `vec4<f32>` storage.
///
/// `nearest` holds the integer coordinates of the nearest known seed cell (not a distance)
/// and `marker` is the validity flag: `>= 0` seeded, `< 0` empty.
/// Read it through [`SeedCell::seed`] rather than inspecting the marker sign.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SeedCell {
    /// Coordinates of the nearest seed cell, as floats.
    pub nearest: [f32; 3],
    /// Validity marker.
    pub marker: f32,
}

impl SeedCell {
    /// A cell that knows no seed yet.
    pub const EMPTY: Self = Self {
        nearest: [0.0, 0.0, 0.0],
        marker: -1.0,
    };

    /// A cell whose nearest known seed is `cell`.
    pub fn seeded(cell: [usize; 3]) -> Self {
        Self {
            nearest: [cell[0] as f32, cell[1] as f32, cell[2] as f32],
            marker: 0.0,
        }
    }

    /// Coordinates of the nearest known seed, if any.
    pub fn seed(&self) -> Option<[usize; 3]> {
        // NaN markers are rejected as well.
        if self.marker >= 0.0 {
            Some(self.nearest.map(|c| c.max(0.0).round() as usize))
        } else {
            None
        }
    }

    /// Whether the cell knows a seed.
    pub fn is_seeded(&self) -> bool {
        self.marker >= 0.0
    }
}

impl Default for SeedCell {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_marker() {
        assert_eq!(SeedCell::EMPTY.seed(), None);
        assert_eq!(SeedCell::default(), SeedCell::EMPTY);
        assert_eq!(SeedCell::seeded([3, 0, 12]).seed(), Some([3, 0, 12]));
        let nan = SeedCell {
            nearest: [1.0, 1.0, 1.0],
            marker: f32::NAN,
        };
        assert!(!nan.is_seeded());
        assert_eq!(core::mem::size_of::<SeedCell>(), 16);
    }
}
