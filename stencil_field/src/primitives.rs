//! Vertex and index buffers of simple shapes, for tests, benches and demos.
use glam::Vec3;

/// Axis aligned box centered at the origin, as a triangle list.
///
/// Faces do not share vertices: 24 vertices, 12 triangles.
pub fn cuboid(half_extents: Vec3) -> (Vec<Vec3>, Vec<u32>) {
    let corners = [
        // front
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
        // back
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [1.0, 1.0, -1.0],
        // left
        [-1.0, -1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, 1.0, 1.0],
        // right
        [1.0, -1.0, -1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, -1.0],
        [1.0, 1.0, 1.0],
        // top
        [-1.0, 1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, 1.0],
        [1.0, 1.0, 1.0],
        // bottom
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
    ];

    let vertices = corners
        .into_iter()
        .map(|corner| Vec3::from(corner) * half_extents)
        .collect();
    let indices = (0..6_u32)
        .flat_map(|face| {
            let first = face * 4;
            [first + 2, first + 1, first + 3, first, first + 1, first + 2]
        })
        .collect();

    (vertices, indices)
}

/// Sphere centered at the origin with `sectors` meridians and `stacks` parallels,
/// as a triangle list. Poles are single vertices.
pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> (Vec<Vec3>, Vec<u32>) {
    let sectors = sectors.max(3);
    let stacks = stacks.max(2);

    let mut vertices = vec![Vec3::Y * radius];
    for stack in 1..stacks {
        let polar = core::f32::consts::PI * stack as f32 / stacks as f32;
        for sector in 0..sectors {
            let azimuth = core::f32::consts::TAU * sector as f32 / sectors as f32;
            vertices.push(
                Vec3::new(
                    polar.sin() * azimuth.cos(),
                    polar.cos(),
                    polar.sin() * azimuth.sin(),
                ) * radius,
            );
        }
    }
    vertices.push(-Vec3::Y * radius);

    let ring = |stack: u32, sector: u32| 1 + (stack - 1) * sectors + sector % sectors;
    let south = vertices.len() as u32 - 1;
    let mut indices = vec![];

    for sector in 0..sectors {
        indices.extend([0, ring(1, sector + 1), ring(1, sector)]);
    }
    for stack in 1..stacks - 1 {
        for sector in 0..sectors {
            let a = ring(stack, sector);
            let b = ring(stack, sector + 1);
            let c = ring(stack + 1, sector);
            let d = ring(stack + 1, sector + 1);
            indices.extend([a, b, c, b, d, c]);
        }
    }
    for sector in 0..sectors {
        indices.extend([south, ring(stacks - 1, sector), ring(stacks - 1, sector + 1)]);
    }

    (vertices, indices)
}
