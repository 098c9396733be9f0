//! Engine Error Types
//!
//! Contract violations surface as `Result<T, WorldError>`; numerical
//! degeneracies inside the solvers never do — the affected constraint is
//! neutralized for the frame instead so one bad joint cannot take down an
//! island.

use thiserror::Error;

/// Errors returned by world mutation entry points.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The world is mid-step; bodies, fixtures, and joints cannot be
    /// created or destroyed until `step()` returns.
    #[error("world is locked during step()")]
    Locked,

    /// A handle referenced an object that no longer exists (or never did).
    #[error("stale {kind} handle")]
    StaleHandle {
        /// The kind of object the handle referred to.
        kind: &'static str,
    },

    /// A joint definition failed validation.
    #[error("invalid joint: {reason}")]
    InvalidJoint {
        /// Human-readable description of the problem.
        reason: &'static str,
    },
}
