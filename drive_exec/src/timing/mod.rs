//! # Timing module
//!
//! Turns a geometric path into a timed one. Each sample of the output carries
//! the time it is reached, the velocity there and the constant acceleration
//! held until the next sample, such that for consecutive samples
//!
//! ```text
//! v2 = v1 + a1 * dt
//! d  = v1 * dt + 0.5 * a1 * dt^2
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod constraints;
mod parameterizer;
mod timed_state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use constraints::{
    CentripetalAccelerationConstraint, DifferentialDriveDynamicsConstraint, MinMaxAcceleration,
    TimingConstraint, VelocityLimitRegionConstraint,
};
pub use parameterizer::{time_parameterize_states, time_parameterize_trajectory, TimingLimits};
pub use timed_state::TimedState;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while time parameterising a path.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    #[error("The resampling step must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("No states to parameterise")]
    NoStates,

    #[error("Velocity bound at sample {0} is NaN")]
    NanVelocity(usize),

    #[error("A constraint gave a negative velocity bound at sample {0}")]
    NegativeVelocityBound(usize),

    /// The acceleration window at the sample is empty.
    #[error("No feasible acceleration at sample {0}")]
    InvalidAcceleration(usize),

    /// Zero velocity and zero acceleration, the sample can never be reached.
    #[error("Profile stalls before sample {0}")]
    Stalled(usize),

    #[error("Non-finite time at sample {0}")]
    InvalidTime(usize),

    #[error("Could not build the timed trajectory: {0}")]
    Trajectory(#[from] crate::trajectory::TrajectoryError),
}
