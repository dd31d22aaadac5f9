//! Benchmark for a full jump flood pass on the CPU
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;
use stencil_field::{
    jump_flood, primitives, voxelize, Bounds, Grid, MeshSnapshot, Topology, VoxelizeMethod,
};

fn criterion_benchmark(c: &mut Criterion) {
    let (vertices, indices) = primitives::cuboid(Vec3::splat(0.5));
    let mesh = MeshSnapshot::new(&vertices, Topology::TriangleList(Some(indices.as_slice())));

    for size in [32, 64] {
        let grid = Grid::from_bounds(Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0)), [size; 3]);
        let seeds = voxelize(&mesh, &grid, 0.05, VoxelizeMethod::TriangleBounds);

        c.bench_function(&format!("jump_flood_{size}"), |b| {
            b.iter(|| jump_flood(black_box(&grid), black_box(seeds.cells())));
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
