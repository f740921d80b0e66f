//! Exercises the synthetic backend end to end: builds a manifold over a
//! small scene with a step and a moving platform, then walks a character
//! across it. Not part of the library's public contract.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use walk_manifold::{Cell, LayerMask, Manifold, ManifoldCharacterController, Settings, SyntheticWorld};

fn main() {
    let mut world = SyntheticWorld::new();
    world.add_plane(0.0, LayerMask::ALL);
    world.add_cuboid(Vec3::new(3.0, 0.25, 0.0), Vec3::new(1.0, 0.05, 1.0), LayerMask::ALL);
    let platform = world.add_kinematic_cuboid(
        Vec3::new(-3.0, 1.0, 0.0),
        Vec3::new(1.0, 0.05, 1.0),
        LayerMask::ALL,
    );

    let settings = Settings::from_agent(0.3, 1.8).with_cell_size(0.5);

    let mut manifold = Manifold::new(settings).unwrap();
    manifold
        .update(&world, Cell::new(-10, -10), Cell::new(10, 10), -1.0, 2.0)
        .unwrap();

    println!(
        "manifold: {} poles, {} vertices, {} rings",
        manifold.pole_vertices_count(),
        manifold.vertices().len(),
        manifold.rings().len(),
    );

    if let Some(start) = manifold.find_closest_ring_index(Vec3::ZERO).unwrap() {
        manifold.mark_reachable(start).unwrap();
        let marked = manifold.rings().iter().filter(|r| r.marked).count();
        println!("{marked}/{} rings reachable from the origin", manifold.rings().len());
    }

    let mut rng = SmallRng::seed_from_u64(1);
    let mut controller =
        ManifoldCharacterController::new(settings, Vec3::new(0.0, 0.0, 0.0), &mut rng);

    for step in 0..6 {
        match controller.simple_move(&world, Vec3::new(-1.0, 0.0, 0.0), 1.0) {
            Ok(()) => println!("step {step}: at {:?}", controller.position()),
            Err(err) => println!("step {step}: move failed: {err}"),
        }
    }

    world.set_isometry(platform, parry3d::math::Isometry::translation(-3.0, 1.0, 2.0));
    match controller.simple_move(&world, Vec3::ZERO, 1.0) {
        Ok(()) => println!("after platform shift: at {:?}", controller.position()),
        Err(err) => println!("after platform shift: move failed: {err}"),
    }
}
