use criterion::{black_box, criterion_group, criterion_main, Criterion};
use walk_manifold::{Cell, LayerMask, Manifold, Settings, SyntheticWorld};

fn flat_plane_world() -> SyntheticWorld {
    let mut world = SyntheticWorld::new();
    world.add_plane(0.0, LayerMask::ALL);
    world
}

fn many_obstacle_world() -> SyntheticWorld {
    let mut world = flat_plane_world();
    for i in 0..8 {
        let x = (i as f32 - 4.0) * 2.0;
        world.add_cuboid(
            glam::Vec3::new(x, 0.5, 3.0),
            glam::Vec3::new(0.4, 0.5, 0.4),
            LayerMask::ALL,
        );
    }
    world
}

fn criterion_benchmark(c: &mut Criterion) {
    let settings = Settings::from_agent(0.2, 1.0).with_cell_size(0.5);

    let flat = flat_plane_world();
    c.bench_function("flat plane update", |b| {
        b.iter(|| {
            let mut manifold = Manifold::new(settings).unwrap();
            black_box(
                manifold
                    .update(&flat, Cell::new(-20, -20), Cell::new(20, 20), -1.0, 1.0)
                    .unwrap(),
            );
            black_box(manifold.find_closest_point(glam::Vec3::new(3.3, 5.0, -2.1), false));
        })
    });

    let obstacles = many_obstacle_world();
    c.bench_function("plane with obstacles update", |b| {
        b.iter(|| {
            let mut manifold = Manifold::new(settings).unwrap();
            black_box(
                manifold
                    .update(&obstacles, Cell::new(-20, -20), Cell::new(20, 20), -1.0, 2.0)
                    .unwrap(),
            );
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
