//! The adapter seam a consumer implements over their own physics engine.
//!
//! The core never dereferences a collider handle: it is carried as an opaque
//! [`ColliderId`] so the caller can map it back to whatever owns the surface.

use glam::Vec3;

/// Opaque collider handle threaded through pole vertices.
///
/// The core performs no dereference; the implementor's [`PhysicsPort`] is
/// the only place that knows what a `ColliderId` actually points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u64);

/// A bitmask of physics layers. `0` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    #[inline]
    pub const fn single(bit: u8) -> LayerMask {
        LayerMask(1 << bit)
    }

    #[inline]
    pub const fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, layer: LayerMask) -> bool {
        (self.0 & layer.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The result of a downward raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// World-space point of impact.
    pub point: Vec3,
    /// Surface normal at the point of impact, expected to be roughly `+Y`.
    pub normal: Vec3,
    /// Handle of the collider that was hit.
    pub collider_id: ColliderId,
    /// Physics layer the hit collider belongs to.
    pub layer: LayerMask,
    /// Distance travelled from the ray origin to `point`.
    pub distance: f32,
}

/// The physics query interface the manifold construction and reconstruction
/// pipelines consume.
///
/// An implementation may wrap any engine, or be a purely synthetic in-memory
/// world (see [`crate::synthetic::SyntheticWorld`]). Triggers must always be
/// excluded from both query kinds. The core calls this only from a single
/// logical owner thread and never overlaps a call to one of these methods
/// with another call into the same port.
pub trait PhysicsPort {
    /// Casts a ray from `origin` straight down (`-Y`) for at most `max_distance`,
    /// restricted to colliders whose layer intersects `layer_mask`.
    ///
    /// Returns the nearest hit, or `None` if nothing was hit within range.
    fn raycast_down(&self, origin: Vec3, max_distance: f32, layer_mask: LayerMask)
        -> Option<Hit>;

    /// Tests whether a capsule with the given radius and segment endpoints
    /// overlaps any collider whose layer intersects `layer_mask`.
    fn capsule_occupied(&self, point_a: Vec3, point_b: Vec3, radius: f32, layer_mask: LayerMask)
        -> bool;

    /// Forces the backend to finalize any pending transform updates before a
    /// build begins. Implementations for which this is unnecessary may no-op.
    fn sync_transforms(&self) {}
}

/// A second, optional adapter seam: maps a collider back to its current
/// world frame, for moving-platform carry in the character controller.
/// This is distinct from [`PhysicsPort`] because it is only needed by the
/// controller, not by manifold construction; a consumer that never uses
/// `translate_with_colliders`/`rotate_with_colliders` need not implement it.
pub trait ColliderFrame {
    /// Transforms a point from the collider's local space into world space.
    fn local_to_world_point(&self, collider: ColliderId, local: Vec3) -> Option<Vec3>;

    /// Transforms a direction from the collider's local space into world
    /// space (no translation applied).
    fn local_to_world_dir(&self, collider: ColliderId, local_dir: Vec3) -> Option<Vec3>;

    /// Inverse of [`ColliderFrame::local_to_world_point`]: used once per
    /// landed move to record the new `floorLocalPos`.
    fn world_to_local_point(&self, collider: ColliderId, world: Vec3) -> Option<Vec3>;

    /// Inverse of [`ColliderFrame::local_to_world_dir`]: used once per
    /// landed move to record the new `floorLocalForward`.
    fn world_to_local_dir(&self, collider: ColliderId, world_dir: Vec3) -> Option<Vec3>;

    /// Whether `collider` is a non-moving (static/non-kinematic) body, used
    /// to decide whether landing on it is eligible to be pushed to
    /// [`crate::controller::PositionHistory`]. Defaults to `true`: an
    /// implementation with no moving platforms need not override it.
    fn is_static(&self, collider: ColliderId) -> bool {
        let _ = collider;
        true
    }
}
