//! # Trajectory controllers module
//!
//! This module provides the PID controllers used by the PID follower of the
//! drive motion planner.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::geom::Pose2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The trajectory controllers, one for each component of the pose error in
/// the robot frame
#[derive(Debug, Serialize, Clone)]
pub struct TrajControllers {
    /// Longitudinal error controller
    long_ctrl: PidController,

    /// Lateral error controller
    lat_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,
}

/// Corrections produced by the trajectory controllers
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct TrajCorrection {
    /// Added to the linear velocity demand
    pub linear_ms: f64,

    /// Lateral term, scaled by the linear velocity before use
    pub lateral: f64,

    /// Added to the angular velocity demand
    pub angular_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error, `dt_s` after the
    /// previous call.
    ///
    /// A non-positive `dt_s` (the first cycle of a trajectory for example)
    /// gives a purely proportional output.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Accumulate the integral term.
        //
        // With no time difference we don't accumulate, adding on the error
        // would produce a large spike in the integral.
        let deriv = if dt_s > 0.0 {
            self.integral += error * dt_s;

            match self.prev_error {
                Some(e) => (error - e) / dt_s,
                None => 0f64,
            }
        } else {
            0f64
        };

        // Calculate the output
        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        // Remember the previous error
        self.prev_error = Some(error);

        out
    }

    /// Clear the integral and the previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

impl TrajControllers {
    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &super::Params) -> Self {
        Self {
            long_ctrl: PidController::new(params.long_k_p, params.long_k_i, params.long_k_d),
            lat_ctrl: PidController::new(params.lat_k_p, params.lat_k_i, params.lat_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
        }
    }

    /// Get the corrections for a pose error expressed in the robot frame.
    ///
    /// Positive longitudinal error means the setpoint is ahead, positive
    /// lateral error that it is to the left and positive heading error that
    /// it is rotated anticlockwise from the robot.
    pub fn get_correction(&mut self, error: &Pose2, dt_s: f64) -> TrajCorrection {
        TrajCorrection {
            linear_ms: self.long_ctrl.get(error.translation().x(), dt_s),
            lateral: self.lat_ctrl.get(error.translation().y(), dt_s),
            angular_rads: self.head_ctrl.get(error.rotation().radians(), dt_s),
        }
    }

    pub fn reset(&mut self) {
        self.long_ctrl.reset();
        self.lat_ctrl.reset();
        self.head_ctrl.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(2.0, 1.0, 0.5);

        // First call is proportional only
        assert_eq!(pid.get(1.0, 0.0), 2.0);

        // 2*0.5 + 1*(0.5*0.1) + 0.5*(-0.5/0.1)
        assert!((pid.get(0.5, 0.1) - (1.0 + 0.05 - 2.5)).abs() < 1e-12);

        pid.reset();
        assert_eq!(pid.get(0.0, 0.1), 0.0);
    }

    #[test]
    fn test_correction() {
        let mut ctrls = TrajControllers::new(&super::super::Params::default());
        let c = ctrls.get_correction(&Pose2::from_xy_deg(0.1, -0.2, 0.0), 0.01);

        assert!((c.linear_ms - 0.5).abs() < 1e-12);
        assert!((c.lateral + 0.2).abs() < 1e-12);
        assert_eq!(c.angular_rads, 0.0);
    }
}
