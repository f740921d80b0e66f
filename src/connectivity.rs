//! One pass over all rings building the directed edge → owning-ring map.

use crate::mesh::Mesh;

/// Builds `mesh.edge_to_ring` from scratch over every ring currently present.
///
/// A directed edge `(u,v)` is shared with another ring iff the reversed key
/// `(v,u)` is also present in the map after this pass.
pub fn connect_edges(mesh: &mut Mesh) {
    mesh.edge_to_ring.clear();
    for (ring_index, ring) in mesh.rings.iter().enumerate() {
        for (u, v) in ring.edges() {
            mesh.edge_to_ring.insert((u, v), ring_index as u32);
        }
    }
}

/// Whether edge `(u,v)` is interior — both directions are registered.
pub fn is_shared_edge(mesh: &Mesh, u: u32, v: u32) -> bool {
    mesh.edge_to_ring.contains_key(&(u, v)) && mesh.edge_to_ring.contains_key(&(v, u))
}
