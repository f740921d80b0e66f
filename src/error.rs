//! The error taxonomy for manifold construction and queries.

use thiserror::Error;

/// Errors produced by [`crate::Manifold`] and [`crate::controller::CharacterController`].
///
/// `BadInput` deliberately has no variant here: an empty build range is a
/// no-op, not a failure (see the crate-level docs), so call sites return
/// `Ok(())` early instead of constructing an error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldError {
    /// Settings were missing or out of range at build start.
    #[error("invalid manifold settings")]
    InvalidConfig,
    /// A partial-update step was invoked out of sequence.
    #[error("construction step invoked out of order")]
    InvalidOrder,
    /// A query was attempted before construction reached `Complete`.
    #[error("manifold is not in the Complete state")]
    NotReady,
    /// The character controller exhausted both the current and historical fallbacks.
    #[error("no walkable surface found for the requested move")]
    NoSurface,
    /// An asynchronous build observed cancellation; the manifold was cleared.
    #[error("construction was cancelled")]
    Cancelled,
}

/// Reasons a candidate pole vertex (or true-edge probe) was rejected.
///
/// These are never surfaced as errors — they are purely diagnostic, logged
/// at `trace` level, and simply result in a vertex being omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No collider hit within the remaining band.
    NoHit,
    /// Hit distance was less than `step_height` (insufficient headroom to the prior ceiling).
    Headroom,
    /// Surface normal's Y component was below `surface_normal_y_threshold`.
    Slope,
    /// Hit collider's layer was not in `walkable_layers`.
    Layer,
    /// The standing capsule overlapped another collider.
    CapsuleOccupied,
}
