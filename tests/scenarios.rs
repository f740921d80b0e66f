//! Integration scenarios driving the public `Manifold`/`SyntheticWorld` API
//! end to end.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use walk_manifold::{Cell, LayerMask, Manifold, ManifoldCharacterController, Settings, SyntheticWorld};

fn flat_settings() -> Settings {
    Settings::from_agent(0.2, 1.0)
        .with_cell_size(1.0)
        .with_step_height(0.35)
}

#[test]
fn flat_plane_unit_cell() {
    let mut world = SyntheticWorld::new();
    world.add_plane(0.0, LayerMask::ALL);

    let mut manifold = Manifold::new(flat_settings()).unwrap();
    manifold
        .update(&world, Cell::new(-1, -1), Cell::new(1, 1), -1.0, 1.0)
        .unwrap();

    assert_eq!(manifold.rings().len(), 4);

    for ring in manifold.rings() {
        let edges: Vec<(u32, u32)> = ring.edges().collect();
        let interior = edges
            .iter()
            .filter(|&&(u, v)| manifold.is_shared_edge(u, v).unwrap())
            .count();
        assert!(interior <= 4);
    }

    let result = manifold
        .find_closest_point(Vec3::new(0.3, 5.0, -0.7), false)
        .unwrap()
        .expect("a ring exists under the query point");
    assert!((result.point.x - 0.3).abs() < 1e-3);
    assert!((result.point.y).abs() < 1e-3);
    assert!((result.point.z - (-0.7)).abs() < 1e-3);
}

#[test]
fn single_step_staircase_is_traversable() {
    let mut world = SyntheticWorld::new();
    world.add_cuboid(
        Vec3::new(-5.0, -0.05, 0.0),
        Vec3::new(5.0, 0.05, 5.0),
        LayerMask::ALL,
    );
    world.add_cuboid(
        Vec3::new(5.0, 0.25, 0.0),
        Vec3::new(5.0, 0.05, 5.0),
        LayerMask::ALL,
    );

    let mut manifold = Manifold::new(flat_settings()).unwrap();
    manifold
        .update(&world, Cell::new(-4, -4), Cell::new(4, 4), -1.0, 1.0)
        .unwrap();

    assert!(!manifold.rings().is_empty());

    let left_ring = manifold
        .find_closest_ring_index(Vec3::new(-2.0, 0.0, 0.0))
        .unwrap()
        .expect("ring on the low side");
    manifold.mark_reachable(left_ring).unwrap();

    let right = manifold
        .find_closest_point(Vec3::new(2.0, 0.3, 0.0), true)
        .unwrap()
        .expect("the high side is reachable across the step");
    assert!((right.point.y - 0.3).abs() < 1e-2);
}

#[test]
fn step_too_high_gap_blocks_reachability() {
    let mut world = SyntheticWorld::new();
    world.add_cuboid(
        Vec3::new(-5.0, -0.05, 0.0),
        Vec3::new(5.0, 0.05, 5.0),
        LayerMask::ALL,
    );
    world.add_cuboid(
        Vec3::new(5.0, 0.45, 0.0),
        Vec3::new(5.0, 0.05, 5.0),
        LayerMask::ALL,
    );

    let mut manifold = Manifold::new(flat_settings()).unwrap();
    manifold
        .update(&world, Cell::new(-4, -4), Cell::new(4, 4), -1.0, 1.0)
        .unwrap();

    let left_ring = manifold
        .find_closest_ring_index(Vec3::new(-2.0, 0.0, 0.0))
        .unwrap()
        .expect("ring on the low side");
    manifold.mark_reachable(left_ring).unwrap();

    let right = manifold
        .find_closest_point(Vec3::new(2.0, 0.5, 0.0), true)
        .unwrap();
    match right {
        None => {}
        Some(point) => assert!((point.point.y - 0.5).abs() > 0.1),
    }
}

#[test]
fn low_ceiling_excludes_poles_beneath_it() {
    // Ground is walkable; the ceiling blocks standing but isn't itself a
    // walkable surface, so it can't be mistaken for a floor on top of it.
    let ground_layer = LayerMask::single(0);
    let ceiling_layer = LayerMask::single(1);

    let mut world = SyntheticWorld::new();
    world.add_plane(0.0, ground_layer);
    world.add_cuboid(
        Vec3::new(0.0, 0.85, 0.0),
        Vec3::new(0.9, 0.05, 0.9),
        ceiling_layer,
    );

    let settings = Settings::from_agent(0.2, 1.0)
        .with_cell_size(0.5)
        .with_layers(ground_layer, ground_layer.union(ceiling_layer));
    let mut manifold = Manifold::new(settings).unwrap();
    manifold
        .update(&world, Cell::new(-4, -4), Cell::new(4, 4), -1.0, 2.0)
        .unwrap();

    let under_ceiling = manifold
        .find_closest_point(Vec3::new(0.0, 5.0, 0.0), false)
        .unwrap()
        .expect("the ring outside the overlap is found instead");
    assert!(under_ceiling.point.x.abs() >= 0.9 || under_ceiling.point.z.abs() >= 0.9);
}

#[test]
fn sloped_ramp_over_threshold_yields_no_poles() {
    let mut world = SyntheticWorld::new();
    world.add_inclined_plane(0.0, 50.0, LayerMask::ALL);

    let settings = Settings::from_agent(0.2, 1.0)
        .with_cell_size(0.5)
        .with_max_surface_angle(45.0);
    let mut manifold = Manifold::new(settings).unwrap();
    manifold
        .update(&world, Cell::new(-4, -4), Cell::new(4, 4), -5.0, 5.0)
        .unwrap();

    assert_eq!(manifold.pole_vertices_count(), 0);
    assert!(manifold.rings().is_empty());
}

#[test]
fn moving_platform_carries_a_standing_agent() {
    let mut world = SyntheticWorld::new();
    world.add_plane(0.0, LayerMask::ALL);
    let platform = world.add_kinematic_cuboid(
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(2.0, 0.05, 2.0),
        LayerMask::ALL,
    );

    let mut rng = SmallRng::seed_from_u64(42);
    let mut controller =
        ManifoldCharacterController::new(flat_settings(), Vec3::new(0.0, 1.05, 0.0), &mut rng);

    // First move lands the agent on the (still stationary) platform.
    controller.simple_move(&world, Vec3::ZERO, 1.0).unwrap();
    let before = controller.position();

    // Simulate one second of platform travel at 1 m/s on +X, then move with
    // zero input: the carry should account for the whole drift.
    world.set_isometry(platform, parry3d::math::Isometry::translation(1.0, 1.0, 0.0));
    controller.simple_move(&world, Vec3::ZERO, 1.0).unwrap();
    let after = controller.position();

    assert!((after.x - before.x - 1.0).abs() < 0.2);
    assert!((after.y - 1.05).abs() < 0.2);
}
