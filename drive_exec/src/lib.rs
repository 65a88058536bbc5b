//! # Drive library
//!
//! Motion planning and localisation for a differential drive robot.
//!
//! - [`geom`] - planar poses, twists and the traits states are generic over
//! - [`spline`] - quintic Hermite splines, their sampler and optimiser
//! - [`trajectory`] - trajectories, views over them and a clamping iterator
//! - [`timing`] - constraint based time parameterisation of paths
//! - [`physics`] - kinematic and dynamic model of the drivetrain
//! - [`traj_ctrl`] - the drive motion planner and path followers
//! - [`loc`] - scan registration, particle filter localisation and the
//!   robot state map

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod geom;
pub mod loc;
pub mod physics;
pub mod spline;
pub mod timing;
pub mod traj_ctrl;
pub mod trajectory;
