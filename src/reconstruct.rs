//! Ring reconstruction: completes partial rings by bisection-probing the
//! cell boundary for the geometry the pole sampler could not see directly
//! at a corner.

use glam::{IVec2, Vec3};

use crate::math;
use crate::mesh::{Mesh, PartialRing, Ring, RingKind, CORNER_OFFSETS};
use crate::physics::PhysicsPort;
use crate::poles::accept_surface;
use crate::settings::Settings;

/// Bisection search for the boundary point between two known-good pole
/// positions. `src` is always a pole vertex and therefore always valid,
/// so it seeds the running best answer.
pub fn true_edge<P: PhysicsPort>(settings: &Settings, physics: &P, src: Vec3, dst: Vec3) -> Vec3 {
    let mut fraction = 0.5_f32;
    let mut step = 0.25_f32;
    let mut best = src;

    for _ in 0..settings.reconstruction_iterations {
        let probe_xz = src + (dst - src) * fraction;
        let origin = probe_xz + Vec3::Y * settings.step_height;
        let hit = physics.raycast_down(origin, settings.step_height * 2.0, settings.relevant_layers());

        let accepted_hit =
            hit.filter(|hit| accept_surface(settings, physics, hit).is_ok());

        if let Some(hit) = accepted_hit {
            best = hit.point;
            fraction += step;
        } else {
            fraction -= step;
        }
        step *= 0.5;
    }

    best
}

/// Cache-checked wrapper over [`true_edge`]: looks up `(src_vertex, dir_offset)`
/// in the mesh's true-edge cache, computing and inserting on miss.
pub fn generate_true_edge<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    src_vertex: u32,
    dir_offset: IVec2,
) -> u32 {
    let key = (src_vertex, dir_offset);
    if let Some(&cached) = mesh.true_edge_cache.get(&key) {
        return cached;
    }

    let src = mesh.vertices[src_vertex as usize];
    let dst = src + math::xz(dir_offset.x as f32, dir_offset.y as f32) * settings.cell_size;
    let point = true_edge(settings, physics, src, dst);

    let index = mesh.push_boundary_vertex(point);
    mesh.true_edge_cache.insert(key, index);
    index
}

/// Completes every partial ring currently buffered, then clears the buffer.
pub fn reconstruct_rings<P: PhysicsPort>(mesh: &mut Mesh, settings: &Settings, physics: &P) {
    reconstruct_slice(mesh, settings, physics, 0, mesh.partial_rings.len());
    mesh.partial_rings.clear();
}

/// Completes partial rings `[start, end)` into full rings, without clearing
/// the buffer — used by the async orchestrator to process bounded slices
/// between cooperative yield points.
pub fn reconstruct_slice<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    start: usize,
    end: usize,
) {
    let slice = mesh.partial_rings[start..end].to_vec();
    for partial in &slice {
        if let Some(ring) = complete_ring(mesh, settings, physics, partial) {
            mesh.push_ring(ring);
        }
    }
}

fn corner_offset(partial: &PartialRing, slot: usize) -> IVec2 {
    CORNER_OFFSETS[partial.corners[slot] as usize]
}

fn complete_ring<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    partial: &PartialRing,
) -> Option<Ring> {
    let v0 = partial.vertices[0]?;

    match partial.kind {
        RingKind::Corner => {
            let p3_p0 = corner_offset(partial, 3) - corner_offset(partial, 0);
            let p1_p0 = corner_offset(partial, 1) - corner_offset(partial, 0);
            let e03 = generate_true_edge(mesh, settings, physics, v0, p3_p0);
            let e01 = generate_true_edge(mesh, settings, physics, v0, p1_p0);

            let mut indices = [e03, v0, e01, 0, 0, 0];
            let mut count: u8 = 3;

            if settings.corner_reconstruction {
                if let Some(refined) =
                    corner_intersection_refinement(mesh, settings, physics, partial.cell, v0, e01, e03)
                {
                    indices[3] = refined;
                    count = 4;
                }
            }

            Some(Ring {
                cell: partial.cell,
                count,
                indices,
                marked: false,
            })
        }
        RingKind::Edge => {
            let v1 = partial.vertices[1]?;
            let p3_p0 = corner_offset(partial, 3) - corner_offset(partial, 0);
            let p2_p1 = corner_offset(partial, 2) - corner_offset(partial, 1);
            let e03 = generate_true_edge(mesh, settings, physics, v0, p3_p0);
            let e12 = generate_true_edge(mesh, settings, physics, v1, p2_p1);

            Some(Ring {
                cell: partial.cell,
                count: 4,
                indices: [e03, v0, v1, e12, 0, 0],
                marked: false,
            })
        }
        RingKind::InvertedCorner => {
            let v1 = partial.vertices[1]?;
            let v2 = partial.vertices[2]?;
            let p3_p0 = corner_offset(partial, 3) - corner_offset(partial, 0);
            let p3_p2 = corner_offset(partial, 3) - corner_offset(partial, 2);
            let e03 = generate_true_edge(mesh, settings, physics, v0, p3_p0);
            let e23 = generate_true_edge(mesh, settings, physics, v2, p3_p2);

            Some(Ring {
                cell: partial.cell,
                count: 5,
                indices: [e23, e03, v0, v1, v2, 0],
                marked: false,
            })
        }
        RingKind::Diagonal => {
            let v2 = partial.vertices[2]?;
            let p1_p0 = corner_offset(partial, 1) - corner_offset(partial, 0);
            let p3_p0 = corner_offset(partial, 3) - corner_offset(partial, 0);
            let p1_p2 = corner_offset(partial, 1) - corner_offset(partial, 2);
            let p3_p2 = corner_offset(partial, 3) - corner_offset(partial, 2);

            let e01 = generate_true_edge(mesh, settings, physics, v0, p1_p0);
            let e03 = generate_true_edge(mesh, settings, physics, v0, p3_p0);
            let e21 = generate_true_edge(mesh, settings, physics, v2, p1_p2);
            let e23 = generate_true_edge(mesh, settings, physics, v2, p3_p2);

            Some(Ring {
                cell: partial.cell,
                count: 6,
                indices: [v0, e01, e21, v2, e23, e03],
                marked: false,
            })
        }
        RingKind::Invalid | RingKind::Complete => None,
    }
}

/// The Corner-type refinement: probes two exploratory segments offset from
/// `v0` along each axis, then intersects the lines from `e01` and `e03`
/// through those probes to recover the missing interior corner.
fn corner_intersection_refinement<P: PhysicsPort>(
    mesh: &mut Mesh,
    settings: &Settings,
    physics: &P,
    cell: IVec2,
    v0: u32,
    e01: u32,
    e03: u32,
) -> Option<u32> {
    let v0_pos = mesh.vertices[v0 as usize];
    let e01_pos = mesh.vertices[e01 as usize];
    let e03_pos = mesh.vertices[e03 as usize];

    let dir_a = (e01_pos - v0_pos).with_y(0.0).try_normalize()?;
    let dir_b = (e03_pos - v0_pos).with_y(0.0).try_normalize()?;

    let d1 = (e01_pos - v0_pos).length();
    let d3 = (e03_pos - v0_pos).length();

    let a0 = v0_pos + dir_a * 0.5 * d1;
    let a1 = a0 + dir_b * settings.cell_size;
    let b_prime = true_edge(settings, physics, a0, a1);

    let c0 = v0_pos + dir_b * 0.5 * d3;
    let c1 = c0 + dir_a * settings.cell_size;
    let d_prime = true_edge(settings, physics, c0, c1);

    let (t, _s) = math::intersect_lines_xz(e01_pos, b_prime - e01_pos, e03_pos, d_prime - e03_pos)?;

    let intersection_xz = e01_pos + (b_prime - e01_pos) * t;
    if !point_strictly_inside_cell(cell, intersection_xz, settings.cell_size) {
        return None;
    }
    if math::cross_xz(e01_pos, intersection_xz, e03_pos) <= 0.0 {
        return None;
    }

    let height = e01_pos.y + (b_prime.y - e01_pos.y) * t;
    let point = Vec3::new(intersection_xz.x, height, intersection_xz.z);
    Some(mesh.push_boundary_vertex(point))
}

/// Strict containment in `cell`'s own XZ bounds, rejecting a refined corner
/// that lands in one of the neighboring cells touching the shared corner
/// pole `v0` instead of inside `cell` itself.
fn point_strictly_inside_cell(cell: IVec2, point: Vec3, cell_size: f32) -> bool {
    let min_x = cell.x as f32 * cell_size;
    let min_z = cell.y as f32 * cell_size;
    let max_x = min_x + cell_size;
    let max_z = min_z + cell_size;
    point.x > min_x && point.x < max_x && point.z > min_z && point.z < max_z
}
