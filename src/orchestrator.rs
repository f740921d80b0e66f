//! Drives pole sampling, partial-ring building, reconstruction, and
//! connectivity indexing as a strict state machine, in a synchronous
//! atomic form and a cooperatively-yielding async form.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use tracing::info_span;

use crate::connectivity::{self, connect_edges};
use crate::error::ManifoldError;
use crate::mesh::{Cell, Mesh, Ring};
use crate::physics::{ColliderId, PhysicsPort};
use crate::poles::sample_poles;
use crate::query::{self, ClosestPoint};
use crate::reconstruct::{reconstruct_rings, reconstruct_slice};
use crate::rings::build_partial_rings;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Cleared,
    CreatingPoles,
    CreatingPartials,
    Reconstructing,
    ConnectingEdges,
    Complete,
}

/// A cooperative cancellation signal for [`Manifold::update_async`]. Cheap
/// to clone; every clone observes the same underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Yields control back to the driving executor exactly once, with no
/// executor dependency: the first poll registers the waker and returns
/// `Pending`, the second returns `Ready`.
async fn yield_now() {
    struct YieldNow(bool);

    impl std::future::Future for YieldNow {
        type Output = ();

        fn poll(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<()> {
            if self.0 {
                std::task::Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
        }
    }

    YieldNow(false).await;
}

/// The walkable surface manifold: owns the vertex/ring arena and drives
/// construction through its state machine. Queries are legal only once
/// `Complete` has been reached; construction methods enforce the monotone
/// ordering `Cleared < CreatingPoles < CreatingPartials < Reconstructing <
/// ConnectingEdges < Complete`.
pub struct Manifold {
    settings: Settings,
    mesh: Mesh,
    state: BuildState,
}

impl Manifold {
    pub fn new(settings: Settings) -> Result<Self, ManifoldError> {
        settings.validate()?;
        Ok(Self {
            settings,
            mesh: Mesh::default(),
            state: BuildState::Cleared,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Destroys any in-progress or complete state and returns to `Cleared`.
    pub fn clear(&mut self) {
        self.mesh.clear();
        self.state = BuildState::Cleared;
    }

    /// Atomic build: clears, then runs every step over the full range in order.
    ///
    /// `cell_max <= cell_min` or `y_max <= y_min` describes an empty build
    /// and is a no-op success, not an error.
    pub fn update<P: PhysicsPort>(
        &mut self,
        physics: &P,
        cell_min: Cell,
        cell_max: Cell,
        y_min: f32,
        y_max: f32,
    ) -> Result<(), ManifoldError> {
        if cell_max.x <= cell_min.x || cell_max.y <= cell_min.y || y_max <= y_min {
            return Ok(());
        }
        self.settings.validate()?;
        self.clear();

        if self.settings.sync_physics_on_update {
            physics.sync_transforms();
        }

        {
            let _guard = info_span!("create_poles").entered();
            self.partial_update_poles(physics, cell_min, cell_max, y_min, y_max)?;
        }
        {
            let _guard = info_span!("create_partial_rings").entered();
            self.partial_update_partial_rings(cell_min, cell_max)?;
        }
        {
            let _guard = info_span!("reconstruct_rings").entered();
            self.partial_update_reconstruction(physics)?;
        }
        {
            let _guard = info_span!("connect_edges").entered();
            self.partial_update_connectivity()?;
        }
        Ok(())
    }

    /// Batched build yielding cooperatively between pole-sampling tiles and
    /// reconstruction slices, observing `cancel` at every yield. On
    /// cancellation the manifold is returned to `Cleared` and
    /// [`ManifoldError::Cancelled`] is returned.
    pub async fn update_async<P: PhysicsPort>(
        &mut self,
        physics: &P,
        cell_min: Cell,
        cell_max: Cell,
        y_min: f32,
        y_max: f32,
        chunk_size: i32,
        cancel: &CancelToken,
    ) -> Result<(), ManifoldError> {
        if cell_max.x <= cell_min.x || cell_max.y <= cell_min.y || y_max <= y_min {
            return Ok(());
        }
        self.settings.validate()?;
        self.clear();

        if self.settings.sync_physics_on_update {
            physics.sync_transforms();
        }

        let chunk = chunk_size.max(1);

        let mut z = cell_min.y;
        while z < cell_max.y {
            let mut x = cell_min.x;
            while x < cell_max.x {
                let tile_min = Cell::new(x, z);
                let tile_max = Cell::new((x + chunk).min(cell_max.x), (z + chunk).min(cell_max.y));
                sample_poles(&mut self.mesh, &self.settings, physics, tile_min, tile_max, y_min, y_max);
                x += chunk;

                if self.bail_if_cancelled(cancel) {
                    return Err(ManifoldError::Cancelled);
                }
                yield_now().await;
                if self.bail_if_cancelled(cancel) {
                    return Err(ManifoldError::Cancelled);
                }
            }
            z += chunk;
        }
        self.state = BuildState::CreatingPoles;

        build_partial_rings(&mut self.mesh, &self.settings, cell_min, cell_max);
        self.state = BuildState::CreatingPartials;

        let slice_size =
            ((chunk as u32 * chunk as u32) / (1 + self.settings.reconstruction_iterations)).max(1) as usize;
        let total = self.mesh.partial_rings.len();
        let mut offset = 0;
        while offset < total {
            let end = (offset + slice_size).min(total);
            reconstruct_slice(&mut self.mesh, &self.settings, physics, offset, end);
            offset = end;

            if self.bail_if_cancelled(cancel) {
                return Err(ManifoldError::Cancelled);
            }
            yield_now().await;
            if self.bail_if_cancelled(cancel) {
                return Err(ManifoldError::Cancelled);
            }
        }
        self.mesh.partial_rings.clear();
        self.state = BuildState::Reconstructing;

        connect_edges(&mut self.mesh);
        self.state = BuildState::Complete;
        Ok(())
    }

    fn bail_if_cancelled(&mut self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Samples poles over `[corner_min, corner_max]`. Legal from `Cleared`
    /// or `CreatingPoles` (repeat calls build disjoint rectangles).
    pub fn partial_update_poles<P: PhysicsPort>(
        &mut self,
        physics: &P,
        corner_min: Cell,
        corner_max: Cell,
        y_min: f32,
        y_max: f32,
    ) -> Result<(), ManifoldError> {
        match self.state {
            BuildState::Cleared | BuildState::CreatingPoles => {}
            _ => return Err(ManifoldError::InvalidOrder),
        }
        sample_poles(&mut self.mesh, &self.settings, physics, corner_min, corner_max, y_min, y_max);
        self.state = BuildState::CreatingPoles;
        Ok(())
    }

    /// Builds partial/complete rings over `[corner_min, corner_max)`. Legal
    /// from `CreatingPoles` or `CreatingPartials`.
    pub fn partial_update_partial_rings(
        &mut self,
        corner_min: Cell,
        corner_max: Cell,
    ) -> Result<(), ManifoldError> {
        match self.state {
            BuildState::CreatingPoles | BuildState::CreatingPartials => {}
            _ => return Err(ManifoldError::InvalidOrder),
        }
        build_partial_rings(&mut self.mesh, &self.settings, corner_min, corner_max);
        self.state = BuildState::CreatingPartials;
        Ok(())
    }

    /// Completes every buffered partial ring. Legal from `CreatingPartials`
    /// or `Reconstructing`.
    pub fn partial_update_reconstruction<P: PhysicsPort>(&mut self, physics: &P) -> Result<(), ManifoldError> {
        match self.state {
            BuildState::CreatingPartials | BuildState::Reconstructing => {}
            _ => return Err(ManifoldError::InvalidOrder),
        }
        reconstruct_rings(&mut self.mesh, &self.settings, physics);
        self.state = BuildState::Reconstructing;
        Ok(())
    }

    /// Builds the edge→ring connectivity index and marks the manifold
    /// `Complete`. Legal from `Reconstructing` or `ConnectingEdges`.
    pub fn partial_update_connectivity(&mut self) -> Result<(), ManifoldError> {
        match self.state {
            BuildState::Reconstructing | BuildState::ConnectingEdges => {}
            _ => return Err(ManifoldError::InvalidOrder),
        }
        connect_edges(&mut self.mesh);
        self.state = BuildState::Complete;
        Ok(())
    }

    fn require_complete(&self) -> Result<(), ManifoldError> {
        if self.state == BuildState::Complete {
            Ok(())
        } else {
            Err(ManifoldError::NotReady)
        }
    }

    pub fn find_closest_ring_index(&self, p: Vec3) -> Result<Option<usize>, ManifoldError> {
        self.require_complete()?;
        Ok(query::find_closest_ring_index(&self.mesh, p))
    }

    pub fn find_closest_point(
        &self,
        p: Vec3,
        only_marked: bool,
    ) -> Result<Option<ClosestPoint>, ManifoldError> {
        self.require_complete()?;
        Ok(query::find_closest_point(&self.mesh, &self.settings, p, only_marked))
    }

    pub fn mark_reachable(&mut self, ring_index: usize) -> Result<(), ManifoldError> {
        self.require_complete()?;
        query::mark_reachable(&mut self.mesh, ring_index);
        Ok(())
    }

    pub fn is_shared_edge(&self, u: u32, v: u32) -> Result<bool, ManifoldError> {
        self.require_complete()?;
        Ok(connectivity::is_shared_edge(&self.mesh, u, v))
    }

    #[must_use]
    pub fn get_cell(&self, p: Vec3) -> Cell {
        query::cell_of(&self.settings, p)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        &self.mesh.vertices
    }

    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.mesh.rings
    }

    #[must_use]
    pub fn pole_vertices_count(&self) -> usize {
        self.mesh.pole_vertex_count()
    }

    #[must_use]
    pub fn vertex_colliders(&self) -> &[ColliderId] {
        &self.mesh.vertex_colliders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::LayerMask;
    use crate::synthetic::SyntheticWorld;

    fn settings() -> Settings {
        Settings::from_agent(0.2, 1.0).with_cell_size(1.0)
    }

    fn block_on<F: std::future::Future>(mut fut: F) -> F::Output {
        use std::task::{Context, Poll, Wake, Waker};

        struct Noop;
        impl Wake for Noop {
            fn wake(self: Arc<Self>) {}
        }

        let waker = Waker::from(Arc::new(Noop));
        let mut cx = Context::from_waker(&waker);
        // Safety: `fut` is never moved after this point.
        let mut fut = unsafe { std::pin::Pin::new_unchecked(&mut fut) };
        loop {
            match fut.as_mut().poll(&mut cx) {
                Poll::Ready(value) => return value,
                Poll::Pending => continue,
            }
        }
    }

    #[test]
    fn queries_fail_before_complete() {
        let manifold = Manifold::new(settings()).unwrap();
        assert_eq!(
            manifold.find_closest_ring_index(Vec3::ZERO),
            Err(ManifoldError::NotReady)
        );
    }

    #[test]
    fn out_of_order_partial_update_is_rejected() {
        let mut manifold = Manifold::new(settings()).unwrap();
        assert_eq!(
            manifold.partial_update_connectivity(),
            Err(ManifoldError::InvalidOrder)
        );
    }

    #[test]
    fn full_update_reaches_complete_and_answers_queries() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);
        let mut manifold = Manifold::new(settings()).unwrap();

        manifold
            .update(&world, Cell::new(-1, -1), Cell::new(1, 1), -1.0, 1.0)
            .unwrap();

        let result = manifold
            .find_closest_point(Vec3::new(0.3, 5.0, -0.2), false)
            .unwrap()
            .expect("ring exists");
        assert!((result.point.y).abs() < 1e-4);
    }

    #[test]
    fn async_update_reaches_complete() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);
        let mut manifold = Manifold::new(settings()).unwrap();
        let cancel = CancelToken::new();

        block_on(manifold.update_async(&world, Cell::new(-1, -1), Cell::new(1, 1), -1.0, 1.0, 1, &cancel))
            .unwrap();

        assert!(!manifold.rings().is_empty());
        assert!(manifold.find_closest_ring_index(Vec3::ZERO).is_ok());
    }

    #[test]
    fn cancelling_async_update_clears_state() {
        let mut world = SyntheticWorld::new();
        world.add_plane(0.0, LayerMask::ALL);
        let mut manifold = Manifold::new(settings()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = block_on(manifold.update_async(
            &world,
            Cell::new(-4, -4),
            Cell::new(4, 4),
            -1.0,
            1.0,
            1,
            &cancel,
        ));

        assert_eq!(result, Err(ManifoldError::Cancelled));
        assert_eq!(manifold.find_closest_ring_index(Vec3::ZERO), Err(ManifoldError::NotReady));
    }
}
