//! Partial-ring building: per-cell pairing of up to four corner poles into
//! candidate ring shapes, classified by topological type.

use crate::mesh::{Cell, Mesh, PartialRing, Ring, RingKind, CORNER_OFFSETS};
use crate::settings::Settings;

#[derive(Clone, Copy)]
struct PoleSlice {
    corner: u8,
    next: u32,
    remaining: u32,
}

impl PoleSlice {
    fn top_y(&self, mesh: &Mesh) -> f32 {
        mesh.vertices[self.next as usize].y
    }
}

/// Builds partial (and, where complete, finished) rings for every cell in
/// `[corner_min, corner_max)` — a cell's four corners are
/// `cell + CORNER_OFFSETS`, so the last valid cell is `corner_max - (1,1)`.
pub fn build_partial_rings(mesh: &mut Mesh, settings: &Settings, corner_min: Cell, corner_max: Cell) {
    for z in corner_min.y..corner_max.y {
        for x in corner_min.x..corner_max.x {
            build_cell(mesh, settings, Cell::new(x, z));
        }
    }
}

fn build_cell(mesh: &mut Mesh, settings: &Settings, cell: Cell) {
    let mut slices: [PoleSlice; 4] = std::array::from_fn(|i| {
        let corner = cell + CORNER_OFFSETS[i];
        let pole = mesh.poles.get(&corner).copied().unwrap_or_default();
        PoleSlice {
            corner: i as u8,
            next: pole.start,
            remaining: pole.count,
        }
    });

    loop {
        slices.sort_by(|a, b| match (a.remaining > 0, b.remaining > 0) {
            (true, true) => b.top_y(mesh).partial_cmp(&a.top_y(mesh)).unwrap(),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => std::cmp::Ordering::Equal,
        });

        if slices[0].remaining == 0 {
            break;
        }

        let mut slot_vertex: [Option<u32>; 4] = [None; 4];
        let mut mask: u8 = 0;

        let seed = slices[0];
        slot_vertex[seed.corner as usize] = Some(seed.next);
        mask |= 1 << seed.corner;
        let mut prev_y = seed.top_y(mesh);

        // `prev_y` tracks the immediately preceding accepted vertex, not the
        // seed's own y — this is what permits the documented spiral-staircase
        // quirk (three cumulative step-height drops within one cell).
        for i in 1..4 {
            if slices[i].remaining == 0 {
                break;
            }
            let next_y = slices[i].top_y(mesh);
            if prev_y - next_y > settings.step_height {
                break;
            }
            slot_vertex[slices[i].corner as usize] = Some(slices[i].next);
            mask |= 1 << slices[i].corner;
            prev_y = next_y;
            slices[i].next += 1;
            slices[i].remaining -= 1;
        }

        slices[0].next += 1;
        slices[0].remaining -= 1;

        emit(mesh, settings, cell, mask, slot_vertex);
    }
}

fn emit(mesh: &mut Mesh, settings: &Settings, cell: Cell, mask: u8, slot_vertex: [Option<u32>; 4]) {
    let kind = classify(mask);
    match kind {
        RingKind::Invalid => {}
        RingKind::Complete => {
            let indices = [
                slot_vertex[0].expect("complete ring has corner 0"),
                slot_vertex[1].expect("complete ring has corner 1"),
                slot_vertex[2].expect("complete ring has corner 2"),
                slot_vertex[3].expect("complete ring has corner 3"),
                0,
                0,
            ];
            mesh.push_ring(Ring {
                cell,
                count: 4,
                indices,
                marked: false,
            });
        }
        _ => {
            if !settings.edge_reconstruction {
                return;
            }
            let Some(rotation) = align(mask) else {
                return;
            };

            let mut vertices = [None; 4];
            let mut corners = [0u8; 4];
            for i in 0..4u8 {
                let corner = (rotation + i) % 4;
                vertices[i as usize] = slot_vertex[corner as usize];
                corners[i as usize] = corner;
            }

            mesh.partial_rings.push(PartialRing {
                cell,
                kind,
                vertices,
                corners,
            });
        }
    }
}

fn classify(mask: u8) -> RingKind {
    match mask.count_ones() {
        0 => RingKind::Invalid,
        1 => RingKind::Corner,
        2 if mask == 0b0101 || mask == 0b1010 => RingKind::Diagonal,
        2 => RingKind::Edge,
        3 => RingKind::InvertedCorner,
        4 => RingKind::Complete,
        _ => unreachable!("occupancy mask is 4 bits"),
    }
}

/// Finds the rotation `r` such that corner `r` is occupied and corner
/// `(r+3)%4` is not — the alignment invariant every non-Complete partial
/// ring must satisfy (`V0` set, `V3` unset). Diagonal masks admit two valid
/// rotations by symmetry; the smaller is used.
fn align(mask: u8) -> Option<u8> {
    (0..4).find(|&r| {
        let v3 = (r + 3) % 4;
        (mask & (1 << r)) != 0 && (mask & (1 << v3)) == 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::LayerMask;
    use crate::poles::sample_poles;
    use crate::synthetic::SyntheticWorld;

    #[test]
    fn classifies_masks_into_expected_kinds() {
        assert_eq!(classify(0b0000), RingKind::Invalid);
        assert_eq!(classify(0b0001), RingKind::Corner);
        assert_eq!(classify(0b0011), RingKind::Edge);
        assert_eq!(classify(0b0101), RingKind::Diagonal);
        assert_eq!(classify(0b1010), RingKind::Diagonal);
        assert_eq!(classify(0b0111), RingKind::InvertedCorner);
        assert_eq!(classify(0b1111), RingKind::Complete);
    }

    #[test]
    fn align_places_v0_set_and_v3_unset() {
        for mask in 1u8..15 {
            if let Some(r) = align(mask) {
                assert_ne!(mask & (1 << r), 0);
                assert_eq!(mask & (1 << ((r + 3) % 4)), 0);
            }
        }
    }

    #[test]
    fn flat_plane_yields_one_complete_ring_per_cell() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);

        let settings = Settings::from_agent(0.2, 1.0).with_cell_size(1.0);
        let mut mesh = Mesh::default();

        sample_poles(
            &mut mesh,
            &settings,
            &world,
            Cell::new(0, 0),
            Cell::new(2, 2),
            -1.0,
            1.0,
        );
        build_partial_rings(&mut mesh, &settings, Cell::new(0, 0), Cell::new(2, 2));

        assert_eq!(mesh.rings.len(), 1);
        assert_eq!(mesh.rings[0].count, 4);
        assert!(mesh.partial_rings.is_empty());
    }
}
