mod impl_array;
mod impl_glam;
#[cfg(feature = "mint")]
mod impl_mint;

/// Point is the trait that represents a point in 3D space.
/// It is an abstraction over the type of point used in the client math library,
/// so meshes can be handed over without copying them into a specific vector type first.
///
/// Internally everything is converted to [`glam::Vec3`].
pub trait Point: Sized + Copy + Sync + Send {
    /// Create a new point.
    fn new(x: f32, y: f32, z: f32) -> Self;

    /// Get the x coordinate.
    fn x(&self) -> f32;
    /// Get the y coordinate.
    fn y(&self) -> f32;
    /// Get the z coordinate.
    fn z(&self) -> f32;

    /// Convert the point to a `glam::Vec3`.
    fn to_vec3(&self) -> glam::Vec3 {
        glam::Vec3::new(self.x(), self.y(), self.z())
    }

    /// Create the point from a `glam::Vec3`.
    fn from_vec3(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}
