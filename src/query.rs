//! Closest-ring, closest-point, and reachability operations over a
//! `Complete` mesh.

use std::collections::VecDeque;

use glam::Vec3;

use crate::math;
use crate::mesh::{Cell, Mesh, Ring};
use crate::settings::Settings;

/// Result of [`find_closest_point`].
#[derive(Debug, Clone, Copy)]
pub struct ClosestPoint {
    pub point: Vec3,
    pub ring_index: usize,
    /// The ring's pole vertex closest to the query point, if it has one.
    pub closest_pole_vertex_index: Option<u32>,
}

/// The grid cell containing `p`, under `settings.cell_size`.
pub fn cell_of(settings: &Settings, p: Vec3) -> Cell {
    Cell::new(
        (p.x / settings.cell_size).floor() as i32,
        (p.z / settings.cell_size).floor() as i32,
    )
}

/// Finds the ring whose vertex-bounding-box *center* lies closest to `p`.
///
/// Note: per the source this mirrors, the comparison is against the box's
/// center rather than a true AABB distance (a latent upstream quirk —
/// `boundsExtents` computes to zero — preserved here for parity rather than
/// fixed, since implementations are expected to match existing behavior).
pub fn find_closest_ring_index(mesh: &Mesh, p: Vec3) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, ring) in mesh.rings.iter().enumerate() {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &idx in ring.indices() {
            let v = mesh.vertices[idx as usize];
            min = min.min(v);
            max = max.max(v);
        }
        let center = (min + max) * 0.5;
        let dist = center.distance_squared(p);

        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((i, dist));
        }
    }

    best.map(|(i, _)| i)
}

/// Attempts interior interpolation, then falls back to closest-edge
/// projection over every ring (restricted to marked rings if `only_marked`).
pub fn find_closest_point(
    mesh: &Mesh,
    settings: &Settings,
    p: Vec3,
    only_marked: bool,
) -> Option<ClosestPoint> {
    let mut best: Option<(Vec3, usize, f32)> = None;

    for (i, ring) in mesh.rings.iter().enumerate() {
        if only_marked && !ring.marked {
            continue;
        }

        if cell_contains_xz(ring.cell, settings.cell_size, p) {
            if let Some(point) = interior_interpolate(mesh, ring, p) {
                let dist = math::distance_xz_squared(point, p);
                if best.is_none_or(|(_, _, best_dist)| dist < best_dist) {
                    best = Some((point, i, dist));
                }
            }
        }

        for (u, v) in ring.edges() {
            let a = mesh.vertices[u as usize];
            let b = mesh.vertices[v as usize];
            let (point, _t) = math::closest_point_on_segment(p, a, b);
            let dist = math::distance_xz_squared(point, p);
            if best.is_none_or(|(_, _, best_dist)| dist < best_dist) {
                best = Some((point, i, dist));
            }
        }
    }

    let (point, ring_index, _) = best?;
    let ring = &mesh.rings[ring_index];
    let closest_pole_vertex_index = ring
        .indices()
        .iter()
        .copied()
        .filter(|&idx| mesh.is_pole_vertex(idx))
        .min_by(|&a, &b| {
            let da = mesh.vertices[a as usize].distance_squared(p);
            let db = mesh.vertices[b as usize].distance_squared(p);
            da.partial_cmp(&db).unwrap()
        });

    Some(ClosestPoint {
        point,
        ring_index,
        closest_pole_vertex_index,
    })
}

fn cell_contains_xz(cell: Cell, cell_size: f32, p: Vec3) -> bool {
    let min_x = cell.x as f32 * cell_size;
    let min_z = cell.y as f32 * cell_size;
    p.x >= min_x && p.x < min_x + cell_size && p.z >= min_z && p.z < min_z + cell_size
}

/// Interpolates a height for `p` inside a convex CCW ring by walking its
/// edges for the unique "left" (`v0.x > v1.x`) and "right" (`v0.x < v1.x`)
/// straddling edges. A near-degenerate or non-straddling ring yields
/// `None`, leaving the caller to fall back to edge projection.
fn interior_interpolate(mesh: &Mesh, ring: &Ring, p: Vec3) -> Option<Vec3> {
    let mut left: Option<(Vec3, Vec3)> = None;
    let mut right: Option<(Vec3, Vec3)> = None;

    for (u, v) in ring.edges() {
        let v0 = mesh.vertices[u as usize];
        let v1 = mesh.vertices[v as usize];

        let (lo, hi) = (v0.x.min(v1.x), v0.x.max(v1.x));
        if p.x < lo || p.x > hi {
            continue;
        }

        if math::cross_xz(v0, v1, p) < 0.0 {
            return None;
        }

        if v0.x > v1.x {
            left = Some((v0, v1));
        } else if v0.x < v1.x {
            right = Some((v0, v1));
        }
    }

    let (l0, l1) = left?;
    let (r0, r1) = right?;

    let left_point = sample_edge_at_x(l0, l1, p.x);
    let right_point = sample_edge_at_x(r0, r1, p.x);

    let (lo, hi) = if left_point.z <= right_point.z {
        (left_point, right_point)
    } else {
        (right_point, left_point)
    };

    let t = if (hi.z - lo.z).abs() > f32::EPSILON {
        ((p.z - lo.z) / (hi.z - lo.z)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let height = lo.y + (hi.y - lo.y) * t;

    Some(Vec3::new(p.x, height, p.z))
}

fn sample_edge_at_x(a: Vec3, b: Vec3, x: f32) -> Vec3 {
    let t = if (b.x - a.x).abs() > f32::EPSILON {
        ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    a + (b - a) * t
}

/// Flood-fills `marked` from `start_ring` over shared (reverse-registered)
/// edges. Safe to call repeatedly; already-marked rings do not re-expand.
pub fn mark_reachable(mesh: &mut Mesh, start_ring: usize) {
    let mut queue = VecDeque::new();
    mesh.rings[start_ring].marked = true;
    queue.push_back(start_ring);

    while let Some(ring_index) = queue.pop_front() {
        let edges: Vec<(u32, u32)> = mesh.rings[ring_index].edges().collect();
        for (u, v) in edges {
            if let Some(&neighbor) = mesh.edge_to_ring.get(&(v, u)) {
                let neighbor = neighbor as usize;
                if !mesh.rings[neighbor].marked {
                    mesh.rings[neighbor].marked = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::connect_edges;
    use crate::physics::LayerMask;
    use crate::poles::sample_poles;
    use crate::rings::build_partial_rings;
    use crate::synthetic::SyntheticWorld;

    fn flat_plane_mesh() -> (Mesh, Settings) {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);

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
        build_partial_rings(&mut mesh, &settings, Cell::new(-1, -1), Cell::new(1, 1));
        connect_edges(&mut mesh);

        (mesh, settings)
    }

    #[test]
    fn closest_point_on_flat_plane_preserves_xz_and_snaps_y() {
        let (mesh, settings) = flat_plane_mesh();
        let query = Vec3::new(0.3, 5.0, -0.2);

        let result = find_closest_point(&mesh, &settings, query, false).expect("a ring exists");
        assert!((result.point.x - 0.3).abs() < 1e-4);
        assert!((result.point.z - (-0.2)).abs() < 1e-4);
        assert!((result.point.y).abs() < 1e-4);
    }

    #[test]
    fn mark_reachable_is_idempotent() {
        let (mut mesh, _settings) = flat_plane_mesh();
        mark_reachable(&mut mesh, 0);
        let first: Vec<bool> = mesh.rings.iter().map(|r| r.marked).collect();

        mark_reachable(&mut mesh, 0);
        let second: Vec<bool> = mesh.rings.iter().map(|r| r.marked).collect();

        assert_eq!(first, second);
        assert!(first.iter().all(|&marked| marked));
    }

    #[test]
    fn find_closest_ring_index_returns_none_when_empty() {
        let mesh = Mesh::default();
        assert_eq!(find_closest_ring_index(&mesh, Vec3::ZERO), None);
    }
}
