//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::FollowerType;
use crate::physics::DriveModelParams;
use crate::spline::{OptimizerParams, SamplerParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive motion planner
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {
    /// The follower used when none is selected at runtime
    pub follower_type: FollowerType,

    /// Physical model of the drivetrain
    pub drive_model: DriveModelParams,

    /// Bounds on the spacing of path samples
    pub sampler: SamplerParams,

    /// Spline joint optimiser settings
    pub optimizer: OptimizerParams,

    /// Spacing at which paths are resampled before time parameterisation
    pub timing_step_m: f64,

    /// Pure pursuit: initial lookahead along the trajectory
    pub lookahead_time_s: f64,

    /// Pure pursuit: the lookahead is extended until at least this far from
    /// the setpoint
    pub min_lookahead_m: f64,

    /// Pure pursuit: increment used when extending the lookahead
    pub lookahead_search_dt_s: f64,

    /// Pure pursuit: gain on the longitudinal error
    pub path_k_x: f64,

    /// Nonlinear feedback: convergence gain, must be positive
    pub ramsete_beta: f64,

    /// Nonlinear feedback: damping, between 0 and 1
    pub ramsete_zeta: f64,

    /// Longitudinal error controller proportional gain
    pub long_k_p: f64,

    /// Longitudinal error controller integral gain
    pub long_k_i: f64,

    /// Longitudinal error controller derivative gain
    pub long_k_d: f64,

    /// Lateral error controller proportional gain
    pub lat_k_p: f64,

    /// Lateral error controller integral gain
    pub lat_k_i: f64,

    /// Lateral error controller derivative gain
    pub lat_k_d: f64,

    /// Heading error controller proportional gain
    pub head_k_p: f64,

    /// Heading error controller integral gain
    pub head_k_i: f64,

    /// Heading error controller derivative gain
    pub head_k_d: f64,
}

/// Parameters of the standalone pure pursuit controller
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct PurePursuitParams {
    /// Spacing of the samples searched for the goal point
    pub sampling_dist_m: f64,

    /// Radius within which the goal point is chosen
    pub lookahead_m: f64,

    /// Distance from the final state at which the path is complete
    pub goal_tolerance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            follower_type: FollowerType::NonlinearFeedback,
            drive_model: DriveModelParams::default(),
            sampler: SamplerParams::default(),
            optimizer: OptimizerParams::default(),
            timing_step_m: 0.05,
            lookahead_time_s: 0.4,
            min_lookahead_m: 0.61,
            lookahead_search_dt_s: 0.01,
            path_k_x: 4.0,
            ramsete_beta: 2.0,
            ramsete_zeta: 0.7,
            long_k_p: 5.0,
            long_k_i: 0.0,
            long_k_d: 0.0,
            lat_k_p: 1.0,
            lat_k_i: 0.0,
            lat_k_d: 0.0,
            head_k_p: 5.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
        }
    }
}

impl Default for PurePursuitParams {
    fn default() -> Self {
        Self {
            sampling_dist_m: 0.05,
            lookahead_m: 0.6,
            goal_tolerance_m: 0.05,
        }
    }
}
