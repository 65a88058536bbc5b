//! # Trajectory control module
//!
//! Trajectory control turns a list of waypoints into wheel commands. The
//! [`DriveMotionPlanner`] joins the waypoints with optimised splines, times
//! the resulting path against the drive's dynamics and then, every cycle,
//! advances a setpoint along it by the elapsed time.
//!
//! The feedforward command at the setpoint comes from the inverse dynamics of
//! the drive model. One of several followers then corrects it using the pose
//! error, the setpoint expressed in the robot frame:
//!
//! - Feedforward only, no correction.
//! - Pure pursuit, steering along an arc to a point ahead on the trajectory.
//! - PID, with a controller on each component of the error.
//! - Nonlinear feedback (Ramsete), a time-varying tracking law which
//!   converges for any initial error.
//!
//! A standalone [`PurePursuitController`] following an untimed path is also
//! provided.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
mod planner;
mod pure_pursuit;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controllers::{PidController, TrajControllers, TrajCorrection};
pub use params::{Params, PurePursuitParams};
pub use planner::{
    DriveMotionPlanner, InputData, Output, StatusReport, TimedPath, TimedPathIterator,
};
pub use pure_pursuit::{PurePursuitController, PursuitArc};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::geom::{Pose2, Twist2};
use crate::physics::PhysicsError;
use crate::timing::TimingError;
use crate::trajectory::TrajectoryError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which steers a robot along a path given its current pose.
pub trait PathFollower {
    /// The body motion to make from `pose`.
    fn steer(&mut self, pose: &Pose2) -> Twist2;

    fn is_done(&self) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The feedback law used by the drive motion planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowerType {
    FeedforwardOnly,
    PurePursuit,
    Pid,
    NonlinearFeedback,
}

/// Possible errors associated with trajectory control.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid drive model: {0}")]
    DriveModelError(#[from] PhysicsError),

    #[error("Could not build the path: {0}")]
    TrajectoryError(#[from] TrajectoryError),

    #[error("Could not time the path: {0}")]
    TimingError(#[from] TimingError),

    #[error("Could not archive the planner output: {0}")]
    ArchiveError(#[from] ArchiveError),

    #[error("No trajectory has been set")]
    NoTrajectory,
}
