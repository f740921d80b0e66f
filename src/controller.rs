//! Closest-point locomotion over an on-the-fly manifold patch, with
//! moving-platform carry and positional-history rewind on failure.

use glam::{IVec2, Vec3};
use rand::Rng;

use crate::error::ManifoldError;
use crate::orchestrator::Manifold;
use crate::physics::{ColliderFrame, ColliderId, PhysicsPort};
use crate::query;
use crate::settings::Settings;

const HISTORY_LEN: usize = 256;
const DEFAULT_RADIX: u32 = 20;
const DEFAULT_CARRY_THRESHOLD: u32 = 1;

/// A fixed-length ring buffer of recent positions with geometric sampling:
/// recent positions dominate the front, the oldest slot changes rarely.
pub struct PositionHistory {
    radix: u32,
    carry_threshold: u32,
    buffer: [Vec3; HISTORY_LEN],
    counters: [u32; HISTORY_LEN],
}

impl PositionHistory {
    #[must_use]
    pub fn new(radix: u32, carry_threshold: u32) -> Self {
        Self {
            radix: radix.max(1),
            carry_threshold,
            buffer: [Vec3::ZERO; HISTORY_LEN],
            counters: [0; HISTORY_LEN],
        }
    }

    /// Fills every slot with `p` and reseeds the rollover counters uniformly
    /// in `[0, radix)`, so that histories reset at different times don't
    /// synchronize their rollovers.
    pub fn reset<R: Rng + ?Sized>(&mut self, p: Vec3, rng: &mut R) {
        self.buffer = [p; HISTORY_LEN];
        for counter in &mut self.counters {
            *counter = rng.gen_range(0..self.radix);
        }
    }

    pub fn push(&mut self, p: Vec3) {
        let mut shift_count = HISTORY_LEN - 1;
        for (i, counter) in self.counters.iter_mut().enumerate() {
            let was = *counter;
            *counter = (was + 1) % self.radix;
            if was < self.carry_threshold || i == HISTORY_LEN - 1 {
                shift_count = i;
                break;
            }
        }

        self.buffer.copy_within(0..shift_count, 1);
        self.buffer[0] = p;
    }

    /// Oldest entry first.
    pub fn oldest_to_newest(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.buffer.iter().rev().copied()
    }
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RADIX, DEFAULT_CARRY_THRESHOLD)
    }
}

struct Landing {
    point: Vec3,
    collider: Option<ColliderId>,
}

/// Locomotion over a manifold rebuilt on demand around the agent for every
/// move: no persistent manifold is required, so the controller can be used
/// against an arbitrarily large or dynamic scene.
pub struct CharacterController {
    settings: Settings,
    position: Vec3,
    current_floor: Option<ColliderId>,
    floor_local_pos: Vec3,
    floor_local_forward: Vec3,
    world_forward: Vec3,
    history: PositionHistory,
    pub translate_with_colliders: bool,
    pub rotate_with_colliders: bool,
}

impl CharacterController {
    pub fn new<R: Rng + ?Sized>(settings: Settings, initial_position: Vec3, rng: &mut R) -> Self {
        let mut history = PositionHistory::default();
        history.reset(initial_position, rng);

        Self {
            settings,
            position: initial_position,
            current_floor: None,
            floor_local_pos: Vec3::ZERO,
            floor_local_forward: Vec3::NEG_Z,
            world_forward: Vec3::NEG_Z,
            history,
            translate_with_colliders: true,
            rotate_with_colliders: true,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn reset_position_history<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.history.reset(self.position, rng);
    }

    pub fn simple_move<P: PhysicsPort + ColliderFrame>(
        &mut self,
        physics: &P,
        direction: Vec3,
        elapsed_seconds: f32,
    ) -> Result<(), ManifoldError> {
        self.move_by(physics, direction * elapsed_seconds)
    }

    /// Attempts to move by `delta` (Y component ignored), carrying along
    /// the current floor's translation/rotation if configured. Falls back
    /// through [`PositionHistory`] oldest-to-newest on failure; fails with
    /// [`ManifoldError::NoSurface`] only if every fallback also fails.
    pub fn move_by<P: PhysicsPort + ColliderFrame>(
        &mut self,
        physics: &P,
        mut delta: Vec3,
    ) -> Result<(), ManifoldError> {
        delta.y = 0.0;

        let src = match self.current_floor.filter(|_| self.translate_with_colliders) {
            Some(floor) => physics
                .local_to_world_point(floor, self.floor_local_pos)
                .unwrap_or(self.position),
            None => self.position,
        };

        if self.rotate_with_colliders {
            if let Some(floor) = self.current_floor {
                if let Some(new_forward) = physics.local_to_world_dir(floor, self.floor_local_forward) {
                    let angle = signed_angle_xz(self.world_forward, new_forward);
                    delta = rotate_y(delta, angle);
                    self.world_forward = new_forward;
                }
            }
        }

        let dst = src + delta;

        let landing = self
            .try_find_next_position(physics, src, dst, 1)
            .or_else(|| {
                let history: Vec<Vec3> = self.history.oldest_to_newest().collect();
                history
                    .into_iter()
                    .find_map(|h| self.try_find_next_position(physics, h, h, 0))
            });

        let Some(landing) = landing else {
            return Err(ManifoldError::NoSurface);
        };

        self.land(physics, landing);
        Ok(())
    }

    fn try_find_next_position<P: PhysicsPort>(
        &self,
        physics: &P,
        src: Vec3,
        dst: Vec3,
        extrude: i32,
    ) -> Option<Landing> {
        let cell_size = self.settings.cell_size;
        let min = query::cell_of(&self.settings, src.min(dst));
        let max = query::cell_of(&self.settings, src.max(dst));
        let corner_min = min - IVec2::splat(extrude);
        let corner_max = max + IVec2::splat(extrude + 1);

        let max_height_delta = src.distance(dst) / cell_size + 1.0 + self.settings.step_height;
        let y_min = src.y.min(dst.y) - max_height_delta;
        let y_max = src.y.max(dst.y) + max_height_delta;

        let mut patch = Manifold::new(self.settings).ok()?;
        patch.update(physics, corner_min, corner_max, y_min, y_max).ok()?;

        let start_ring = patch.find_closest_ring_index(src).ok().flatten()?;
        patch.mark_reachable(start_ring).ok()?;
        let closest = patch.find_closest_point(dst, true).ok().flatten()?;

        let collider = closest
            .closest_pole_vertex_index
            .map(|idx| patch.vertex_colliders()[idx as usize]);

        Some(Landing {
            point: closest.point,
            collider,
        })
    }

    fn land<P: PhysicsPort + ColliderFrame>(&mut self, physics: &P, landing: Landing) {
        let previous = self.position;
        self.position = landing.point;

        if let Some(collider) = landing.collider {
            self.floor_local_pos = physics
                .world_to_local_point(collider, landing.point)
                .unwrap_or(Vec3::ZERO);
            self.floor_local_forward = physics
                .world_to_local_dir(collider, self.world_forward)
                .unwrap_or(self.world_forward);
        }
        self.current_floor = landing.collider;

        let floor_is_static = landing.collider.is_none_or(|c| physics.is_static(c));
        let moved_far_enough =
            previous.distance_squared(self.position) > self.settings.cell_size * self.settings.cell_size;
        if floor_is_static && moved_far_enough {
            self.history.push(self.position);
        }
    }
}

fn signed_angle_xz(a: Vec3, b: Vec3) -> f32 {
    let a = a.with_y(0.0);
    let b = b.with_y(0.0);
    let cross = a.x * b.z - a.z * b.x;
    let dot = a.x * b.x + a.z * b.z;
    cross.atan2(dot)
}

fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}
