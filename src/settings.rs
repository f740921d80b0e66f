//! Immutable per-build configuration.

use crate::error::ManifoldError;
use crate::physics::LayerMask;

/// Minimum permitted [`Settings::cell_size`]; smaller values are clamped up.
const MIN_CELL_SIZE: f32 = 0.01;

/// Settings for manifold generation.
///
/// Constructed via [`Settings::from_agent`] and refined with the `with_*`
/// builders, mirroring the chained-setter style of engine nav-mesh settings
/// types: every setter clamps or normalizes its argument so an invalid value
/// can never make it past construction. [`Settings::validate`] catches
/// anything a setter could not already repair (e.g. a non-positive
/// `agent_height`) and is run once at the start of every build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Radius of the standing cylinder.
    pub agent_radius: f32,
    /// Height of the standing cylinder.
    pub agent_height: f32,
    /// Maximum traversable height difference between adjacent poles.
    pub step_height: f32,
    /// Maximum traversable surface slope, in degrees from horizontal (`[0, 90]`).
    pub max_surface_angle: f32,
    /// Horizontal resolution of the XZ grid.
    pub cell_size: f32,
    /// Whether to reconstruct partial-ring cell edges via bisection probing.
    pub edge_reconstruction: bool,
    /// Whether to additionally reconstruct Corner-type partial rings via
    /// the corner-intersection refinement.
    pub corner_reconstruction: bool,
    /// Number of bisection iterations used by `true_edge`.
    pub reconstruction_iterations: u32,
    /// Layers considered walkable surface.
    pub walkable_layers: LayerMask,
    /// Layers that block standing (headroom / capsule overlap) without
    /// necessarily being walkable themselves.
    pub blocking_layers: LayerMask,
    /// Whether to call [`crate::physics::PhysicsPort::sync_transforms`] once
    /// at the start of a build.
    pub sync_physics_on_update: bool,
}

impl Settings {
    /// Reasonable defaults derived from the agent's radius and height, in
    /// the spirit of a `from_agent_and_bounds`-style constructor: a starting
    /// point to refine with `with_*`, not a one-size-fits-all default.
    #[must_use]
    pub fn from_agent(agent_radius: f32, agent_height: f32) -> Self {
        let cell_size = (agent_radius / 2.0).max(MIN_CELL_SIZE);

        Self {
            agent_radius,
            agent_height,
            step_height: agent_height * 0.3,
            max_surface_angle: 50.0,
            cell_size,
            edge_reconstruction: true,
            corner_reconstruction: true,
            reconstruction_iterations: 4,
            walkable_layers: LayerMask::ALL,
            blocking_layers: LayerMask::ALL,
            sync_physics_on_update: true,
        }
    }

    #[must_use]
    pub fn with_step_height(mut self, step_height: f32) -> Self {
        self.step_height = step_height.max(0.0);
        self
    }

    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size.max(MIN_CELL_SIZE);
        self
    }

    #[must_use]
    pub fn with_max_surface_angle(mut self, degrees: f32) -> Self {
        self.max_surface_angle = degrees.clamp(0.0, 90.0);
        self
    }

    #[must_use]
    pub fn with_layers(mut self, walkable: LayerMask, blocking: LayerMask) -> Self {
        self.walkable_layers = walkable;
        self.blocking_layers = blocking;
        self
    }

    #[must_use]
    pub fn with_reconstruction(
        mut self,
        edge_reconstruction: bool,
        corner_reconstruction: bool,
        iterations: u32,
    ) -> Self {
        self.edge_reconstruction = edge_reconstruction;
        self.corner_reconstruction = corner_reconstruction && edge_reconstruction;
        self.reconstruction_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_sync_physics_on_update(mut self, sync: bool) -> Self {
        self.sync_physics_on_update = sync;
        self
    }

    /// Layers relevant to either standing on or being blocked by: `walkable ∪ blocking`.
    #[inline]
    pub fn relevant_layers(&self) -> LayerMask {
        self.walkable_layers.union(self.blocking_layers)
    }

    /// `cos(max_surface_angle)`; a hit normal's Y component must be at least
    /// this for the surface to be considered walkable.
    #[inline]
    pub fn surface_normal_y_threshold(&self) -> f32 {
        self.max_surface_angle.to_radians().cos()
    }

    /// The two capsule endpoint heights (above the ground point) used for
    /// headroom/capsule-occupancy tests: `(step_height + radius, agent_height - radius)`.
    #[inline]
    pub fn capsule_offsets(&self) -> (f32, f32) {
        (
            self.step_height + self.agent_radius,
            self.agent_height - self.agent_radius,
        )
    }

    /// Validates invariants a setter could not already repair.
    pub fn validate(&self) -> Result<(), ManifoldError> {
        if self.agent_radius <= 0.0
            || self.agent_height <= 0.0
            || self.cell_size < MIN_CELL_SIZE
            || !(0.0..=90.0).contains(&self.max_surface_angle)
        {
            return Err(ManifoldError::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_cell_size_at_ingest() {
        let settings = Settings::from_agent(1.0, 2.0).with_cell_size(0.0);
        assert!(settings.cell_size >= MIN_CELL_SIZE);
    }

    #[test]
    fn rejects_non_positive_agent_dimensions() {
        let mut settings = Settings::from_agent(1.0, 2.0);
        settings.agent_height = 0.0;
        assert_eq!(settings.validate(), Err(ManifoldError::InvalidConfig));
    }

    #[test]
    fn corner_reconstruction_requires_edge_reconstruction() {
        let settings = Settings::from_agent(1.0, 2.0).with_reconstruction(false, true, 4);
        assert!(!settings.corner_reconstruction);
    }
}
