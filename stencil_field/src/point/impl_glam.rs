use super::Point;

impl Point for glam::Vec3 {
    fn new(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z)
    }

    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn z(&self) -> f32 {
        self.z
    }

    fn to_vec3(&self) -> glam::Vec3 {
        *self
    }

    fn from_vec3(v: glam::Vec3) -> Self {
        v
    }
}

impl Point for glam::Vec3A {
    fn new(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z)
    }

    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn z(&self) -> f32 {
        self.z
    }
}
