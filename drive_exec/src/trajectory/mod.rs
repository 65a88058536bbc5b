//! # Trajectory module
//!
//! An immutable, non-empty sequence of interpolable states, reparameterised
//! by index, cumulative distance or time through views, and walked by a
//! clamping iterator.
//!
//! Trajectories are shared read-only between the generator and any number of
//! followers through an `Arc`, which every view holds.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod iterator;
mod traj;
pub mod util;
mod views;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use iterator::TrajectoryIterator;
pub use traj::{Trajectory, TrajectoryPoint, TrajectorySamplePoint};
pub use views::{DistanceView, IndexView, TimedView, TrajectoryView};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A state stamped with a time, which a [`TimedView`] can search on.
pub trait Timed {
    fn time_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while building trajectories.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("A trajectory must contain at least one state")]
    Empty,

    #[error("At least two waypoints are required to build a path, got {0}")]
    NotEnoughWaypoints(usize),

    /// The follower being simulated commanded no motion before finishing.
    #[error("Path follower stalled after {0} steps")]
    FollowerStalled(usize),

    #[error("Path follower did not finish within {0} steps")]
    FollowerDidNotFinish(usize),
}
