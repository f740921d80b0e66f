//! The data model: an append-only vertex arena plus index-based rings,
//! partial rings, and the maps connecting them.
//!
//! Everything here is arena+index, per the design notes: one append-only
//! vertex list, one append-only ring list, and auxiliary maps keyed by edges,
//! cells, and `(source vertex, direction)`. No pointer cycles arise.

use std::collections::HashMap;

use glam::{IVec2, Vec3};

use crate::physics::ColliderId;

/// Integer XZ cell coordinate.
pub type Cell = IVec2;

/// The four corner offsets of a cell, in CCW order starting at the origin
/// corner: `(0,0), (1,0), (1,1), (0,1)`.
pub const CORNER_OFFSETS: [Cell; 4] = [
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
];

/// A slice `(start, count)` into the pole segment of the vertex list.
///
/// Vertices within a pole are strictly descending in Y by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pole {
    pub start: u32,
    pub count: u32,
}

impl Pole {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.count) as usize
    }
}

/// The topological classification of a partial ring, by which of the four
/// corners contributed a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    Invalid,
    Corner,
    Edge,
    Diagonal,
    InvertedCorner,
    Complete,
}

/// An intermediate ring produced by the partial-ring builder, before
/// reconstruction fills in the cell-boundary vertices.
///
/// Aligned so that `vertices[0]` is always occupied and `vertices[3]` is
/// always empty (except for `Complete`, which is emitted directly as a
/// [`Ring`] and never represented here). `corners[i]` gives the original
/// (pre-rotation) corner index (`0..4`, indexing [`CORNER_OFFSETS`]) that
/// `vertices[i]` was sampled from.
#[derive(Debug, Clone, Copy)]
pub struct PartialRing {
    pub cell: Cell,
    pub kind: RingKind,
    pub vertices: [Option<u32>; 4],
    pub corners: [u8; 4],
}

/// A convex polygon occupying one grid cell, with between 3 and 6 vertices.
#[derive(Debug, Clone, Copy)]
pub struct Ring {
    pub cell: Cell,
    pub count: u8,
    pub indices: [u32; 6],
    pub marked: bool,
}

impl Ring {
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.count as usize]
    }

    /// Directed edge `i`: `(indices[i], indices[(i+1) mod count])`.
    #[inline]
    pub fn edge(&self, i: usize) -> (u32, u32) {
        let count = self.count as usize;
        (self.indices[i], self.indices[(i + 1) % count])
    }

    #[inline]
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.count as usize).map(move |i| self.edge(i))
    }
}

/// The append-only vertex arena plus the long-lived maps built on top of it.
///
/// All containers are cleared (not freed) between builds: steady-state
/// allocation is zero.
#[derive(Default)]
pub struct Mesh {
    /// Positions, pole segment `[0, pole_vertex_count)` followed by the
    /// reconstructed-boundary segment.
    pub vertices: Vec<Vec3>,
    /// Collider handles, parallel to the pole segment only
    /// (`vertex_colliders.len() == pole_vertex_count`).
    pub vertex_colliders: Vec<ColliderId>,

    pub poles: HashMap<Cell, Pole>,
    pub partial_rings: Vec<PartialRing>,
    pub rings: Vec<Ring>,
    pub cell_to_rings: HashMap<Cell, Vec<u32>>,
    pub edge_to_ring: HashMap<(u32, u32), u32>,
    pub true_edge_cache: HashMap<(u32, Cell), u32>,
}

impl Mesh {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.vertex_colliders.clear();
        self.poles.clear();
        self.partial_rings.clear();
        self.rings.clear();
        self.cell_to_rings.clear();
        self.edge_to_ring.clear();
        self.true_edge_cache.clear();
    }

    #[inline]
    pub fn pole_vertex_count(&self) -> usize {
        self.vertex_colliders.len()
    }

    /// Appends a pole vertex (with its collider handle) and returns its index.
    pub fn push_pole_vertex(&mut self, position: Vec3, collider: ColliderId) -> u32 {
        debug_assert_eq!(
            self.vertices.len(),
            self.vertex_colliders.len(),
            "pole vertices must be pushed before any boundary vertex"
        );
        self.vertices.push(position);
        self.vertex_colliders.push(collider);
        (self.vertices.len() - 1) as u32
    }

    /// Appends a reconstructed-boundary vertex (no collider) and returns its index.
    pub fn push_boundary_vertex(&mut self, position: Vec3) -> u32 {
        self.vertices.push(position);
        (self.vertices.len() - 1) as u32
    }

    #[inline]
    pub fn is_pole_vertex(&self, index: u32) -> bool {
        (index as usize) < self.pole_vertex_count()
    }

    pub fn push_ring(&mut self, ring: Ring) -> u32 {
        let index = self.rings.len() as u32;
        self.cell_to_rings.entry(ring.cell).or_default().push(index);
        self.rings.push(ring);
        index
    }
}
