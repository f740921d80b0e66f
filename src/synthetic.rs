//! An in-memory [`PhysicsPort`] over `parry3d` shapes.
//!
//! Exists for tests, benches, and the `demos/` binary. Not required for
//! production use — any engine-backed adapter that satisfies
//! [`PhysicsPort`]/[`ColliderFrame`] works just as well.

use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::query::{intersection_test, Ray, RayCast};
use parry3d::shape::{Capsule, SharedShape};

use glam::Vec3;

use crate::physics::{ColliderFrame, ColliderId, Hit, LayerMask, PhysicsPort};

struct Collider {
    id: ColliderId,
    shape: SharedShape,
    isometry: Isometry<Real>,
    layer: LayerMask,
    is_trigger: bool,
    kinematic: bool,
}

/// A minimal synthetic scene: a flat list of `parry3d` shapes with
/// isometries and layers, queried linearly. Not optimized for large scenes
/// — it exists to exercise the manifold pipeline deterministically in
/// tests, not to stand in for a production physics engine.
#[derive(Default)]
pub struct SyntheticWorld {
    colliders: Vec<Collider>,
    next_id: u64,
}

impl SyntheticWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collider(
        &mut self,
        shape: SharedShape,
        isometry: Isometry<Real>,
        layer: LayerMask,
    ) -> ColliderId {
        self.add_collider_inner(shape, isometry, layer, false)
    }

    pub fn add_trigger(
        &mut self,
        shape: SharedShape,
        isometry: Isometry<Real>,
        layer: LayerMask,
    ) -> ColliderId {
        self.add_collider_inner(shape, isometry, layer, true)
    }

    fn add_collider_inner(
        &mut self,
        shape: SharedShape,
        isometry: Isometry<Real>,
        layer: LayerMask,
        is_trigger: bool,
    ) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.colliders.push(Collider {
            id,
            shape,
            isometry,
            layer,
            is_trigger,
            kinematic: false,
        });
        id
    }

    /// A moving (kinematic) cuboid, e.g. a platform driven by
    /// [`SyntheticWorld::set_isometry`] between builds.
    pub fn add_kinematic_cuboid(&mut self, center: Vec3, half_extents: Vec3, layer: LayerMask) -> ColliderId {
        let id = self.add_cuboid(center, half_extents, layer);
        if let Some(entry) = self.colliders.iter_mut().find(|c| c.id == id) {
            entry.kinematic = true;
        }
        id
    }

    /// Moves a previously added collider to a new isometry, e.g. to animate
    /// a kinematic platform between builds.
    pub fn set_isometry(&mut self, collider: ColliderId, isometry: Isometry<Real>) {
        if let Some(entry) = self.colliders.iter_mut().find(|c| c.id == collider) {
            entry.isometry = isometry;
        }
    }

    /// A large, thin cuboid standing in for an infinite flat plane at height `y`.
    pub fn add_plane(&mut self, y: f32, layer: LayerMask) -> ColliderId {
        self.add_inclined_plane(y, 0.0, layer)
    }

    /// A large, thin cuboid tilted `degrees` about the X axis, for slope tests.
    ///
    /// `y` is the height of the slab's top surface at `x = 0`, not its
    /// center — the half-thickness is subtracted so callers can reason about
    /// hit height directly.
    pub fn add_inclined_plane(&mut self, y: f32, degrees: f32, layer: LayerMask) -> ColliderId {
        const HALF_EXTENT: f32 = 1_000.0;
        const HALF_THICKNESS: f32 = 0.05;
        let shape = SharedShape::cuboid(HALF_EXTENT, HALF_THICKNESS, HALF_EXTENT);
        let isometry = Isometry::from_parts(
            Vector::new(0.0, y - HALF_THICKNESS, 0.0).into(),
            nalgebra::UnitQuaternion::from_axis_angle(
                &nalgebra::Vector3::x_axis(),
                degrees.to_radians(),
            ),
        );
        self.add_collider(shape, isometry, layer)
    }

    pub fn add_cuboid(&mut self, center: Vec3, half_extents: Vec3, layer: LayerMask) -> ColliderId {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        let isometry = Isometry::translation(center.x, center.y, center.z);
        self.add_collider(shape, isometry, layer)
    }
}

impl PhysicsPort for SyntheticWorld {
    fn raycast_down(&self, origin: Vec3, max_distance: f32, layer_mask: LayerMask) -> Option<Hit> {
        if max_distance <= 0.0 {
            return None;
        }

        let ray = Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(0.0, -1.0, 0.0),
        );

        let mut best: Option<(Real, parry3d::query::RayIntersection, &Collider)> = None;
        for collider in &self.colliders {
            if collider.is_trigger || !collider.layer.contains(layer_mask) {
                continue;
            }
            let Some(ray_cast) = collider.shape.as_ray_cast() else {
                continue;
            };
            if let Some(intersection) =
                ray_cast.cast_ray_and_get_normal(&collider.isometry, &ray, max_distance, true)
            {
                let better = best
                    .as_ref()
                    .is_none_or(|(best_toi, ..)| intersection.time_of_impact < *best_toi);
                if better {
                    best = Some((intersection.time_of_impact, intersection, collider));
                }
            }
        }

        best.map(|(toi, intersection, collider)| Hit {
            point: origin + Vec3::NEG_Y * toi,
            normal: Vec3::new(
                intersection.normal.x,
                intersection.normal.y,
                intersection.normal.z,
            ),
            collider_id: collider.id,
            layer: collider.layer,
            distance: toi,
        })
    }

    fn capsule_occupied(
        &self,
        point_a: Vec3,
        point_b: Vec3,
        radius: f32,
        layer_mask: LayerMask,
    ) -> bool {
        let capsule = Capsule::new(
            Point::new(point_a.x, point_a.y, point_a.z),
            Point::new(point_b.x, point_b.y, point_b.z),
            radius,
        );
        let capsule_isometry = Isometry::identity();

        self.colliders.iter().any(|collider| {
            if collider.is_trigger || !collider.layer.contains(layer_mask) {
                return false;
            }
            intersection_test(
                &capsule_isometry,
                &capsule,
                &collider.isometry,
                collider.shape.as_ref(),
            )
            .unwrap_or(false)
        })
    }
}

impl ColliderFrame for SyntheticWorld {
    fn local_to_world_point(&self, collider: ColliderId, local: Vec3) -> Option<Vec3> {
        let entry = self.colliders.iter().find(|c| c.id == collider)?;
        let point = entry
            .isometry
            .transform_point(&Point::new(local.x, local.y, local.z));
        Some(Vec3::new(point.x, point.y, point.z))
    }

    fn local_to_world_dir(&self, collider: ColliderId, local_dir: Vec3) -> Option<Vec3> {
        let entry = self.colliders.iter().find(|c| c.id == collider)?;
        let dir = entry
            .isometry
            .transform_vector(&Vector::new(local_dir.x, local_dir.y, local_dir.z));
        Some(Vec3::new(dir.x, dir.y, dir.z))
    }

    fn world_to_local_point(&self, collider: ColliderId, world: Vec3) -> Option<Vec3> {
        let entry = self.colliders.iter().find(|c| c.id == collider)?;
        let point = entry
            .isometry
            .inverse_transform_point(&Point::new(world.x, world.y, world.z));
        Some(Vec3::new(point.x, point.y, point.z))
    }

    fn world_to_local_dir(&self, collider: ColliderId, world_dir: Vec3) -> Option<Vec3> {
        let entry = self.colliders.iter().find(|c| c.id == collider)?;
        let dir = entry
            .isometry
            .inverse_transform_vector(&Vector::new(world_dir.x, world_dir.y, world_dir.z));
        Some(Vec3::new(dir.x, dir.y, dir.z))
    }

    fn is_static(&self, collider: ColliderId) -> bool {
        self.colliders
            .iter()
            .find(|c| c.id == collider)
            .is_none_or(|c| !c.kinematic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raycast_hits_plane_from_above() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);

        let hit = world
            .raycast_down(Vec3::new(0.0, 5.0, 0.0), 10.0, LayerMask::ALL)
            .expect("should hit the plane");
        assert!((hit.point.y - 0.0).abs() < 0.01);
        assert!(hit.normal.y > 0.9);
    }

    #[test]
    fn raycast_respects_layer_mask() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::single(2));

        assert!(world
            .raycast_down(Vec3::new(0.0, 5.0, 0.0), 10.0, LayerMask::single(1))
            .is_none());
    }

    #[test]
    fn capsule_detects_overlap_with_cuboid() {
        let mut world = SyntheticWorld::new();
        world.add_cuboid(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(1.0), LayerMask::ALL);

        assert!(world.capsule_occupied(
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(0.0, 1.5, 0.0),
            0.3,
            LayerMask::ALL,
        ));
        assert!(!world.capsule_occupied(
            Vec3::new(10.0, 0.5, 0.0),
            Vec3::new(10.0, 1.5, 0.0),
            0.3,
            LayerMask::ALL,
        ));
    }
}
