//! Pole sampling: per-cell-corner vertical columns of stand-height
//! candidates, derived from downward ray queries.

use glam::{IVec2, Vec3};
use tracing::trace;

use crate::error::RejectReason;
use crate::mesh::{Cell, Mesh, Pole};
use crate::physics::PhysicsPort;
use crate::settings::Settings;

/// Samples poles for every grid corner in `[corner_min, corner_max]` (inclusive)
/// over the vertical band `[floor_min, floor_max]`, appending accepted
/// vertices to `mesh` and registering a [`Pole`] per corner that yielded at
/// least one vertex.
pub fn sample_poles<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    corner_min: IVec2,
    corner_max: IVec2,
    floor_min: f32,
    floor_max: f32,
) {
    for z in corner_min.y..=corner_max.y {
        for x in corner_min.x..=corner_max.x {
            let corner = Cell::new(x, z);
            debug_assert!(
                !mesh.poles.contains_key(&corner),
                "cell corner sampled twice in one build"
            );

            let pole = sample_one_pole(mesh, settings, physics, corner, floor_min, floor_max);
            if !pole.is_empty() {
                mesh.poles.insert(corner, pole);
            }
        }
    }
}

fn sample_one_pole<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    corner: Cell,
    floor_min: f32,
    floor_max: f32,
) -> Pole {
    let start = mesh.pole_vertex_count() as u32;

    let world_xz = corner.as_vec2() * settings.cell_size;
    let mut y = floor_max + settings.step_height;

    loop {
        let remaining = y - floor_min;
        if remaining <= 0.0 {
            break;
        }

        let origin = Vec3::new(world_xz.x, y, world_xz.y);
        let Some(hit) = physics.raycast_down(origin, remaining, settings.relevant_layers()) else {
            break;
        };

        match accept_reason(settings, physics, &hit) {
            Ok(()) => {
                mesh.push_pole_vertex(hit.point, hit.collider_id);
            }
            Err(reason) => {
                trace!(?reason, x = corner.x, z = corner.y, y = hit.point.y, "pole vertex rejected");
            }
        }

        y = hit.point.y - settings.agent_height;
    }

    let count = mesh.pole_vertex_count() as u32 - start;
    Pole { start, count }
}

/// The full acceptance test for a candidate surface hit: headroom, slope,
/// walkable layer, and standing-capsule occupancy. Used while sampling poles.
pub fn accept_reason<P: PhysicsPort>(
    settings: &Settings,
    physics: &P,
    hit: &crate::physics::Hit,
) -> Result<(), RejectReason> {
    if hit.distance < settings.step_height {
        return Err(RejectReason::Headroom);
    }
    accept_surface(settings, physics, hit)
}

/// Slope, walkable-layer, and standing-capsule occupancy only — no headroom
/// test. Used by true-edge reconstruction, whose probe ray already starts
/// `step_height` above the band it searches.
pub fn accept_surface<P: PhysicsPort>(
    settings: &Settings,
    physics: &P,
    hit: &crate::physics::Hit,
) -> Result<(), RejectReason> {
    if hit.normal.y < settings.surface_normal_y_threshold() {
        return Err(RejectReason::Slope);
    }
    if !settings.walkable_layers.contains(hit.layer) {
        return Err(RejectReason::Layer);
    }

    let (offset_a, offset_b) = settings.capsule_offsets();
    let point_a = hit.point + Vec3::Y * offset_a;
    let point_b = hit.point + Vec3::Y * offset_b;
    if physics.capsule_occupied(
        point_a,
        point_b,
        settings.agent_radius,
        settings.relevant_layers(),
    ) {
        return Err(RejectReason::CapsuleOccupied);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticWorld;

    #[test]
    fn flat_plane_yields_one_vertex_per_corner() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, crate::physics::LayerMask::ALL);

        let settings = Settings::from_agent(0.2, 1.0).with_cell_size(1.0);
        let mut mesh = Mesh::default();

        sample_poles(
            &mut mesh,
            &settings,
            &world,
            Cell::new(-1, -1),
            Cell::new(1, 1),
            -1.0,
            1.0,
        );

        assert_eq!(mesh.poles.len(), 9);
        for pole in mesh.poles.values() {
            assert_eq!(pole.count, 1);
        }
    }

    #[test]
    fn pole_vertices_strictly_descend() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, crate::physics::LayerMask::ALL);
        world.add_plane(1.0, crate::physics::LayerMask::ALL);

        let settings = Settings::from_agent(0.2, 0.5).with_cell_size(1.0).with_step_height(0.1);
        let mut mesh = Mesh::default();

        sample_poles(
            &mut mesh,
            &settings,
            &world,
            Cell::new(0, 0),
            Cell::new(0, 0),
            -1.0,
            2.0,
        );

        let pole = mesh.poles[&Cell::new(0, 0)];
        let ys: Vec<f32> = mesh.vertices[pole.range()].iter().map(|v| v.y).collect();
        for pair in ys.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }
}
