//! Wheel odometry kinematics
//!
//! Relates wheel travel to body motion for a differential drive. Wheel
//! scrub while turning is folded into a single scale factor on the track
//! width.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::geom::{Pose2, Rotation2, Twist2, EPSILON};
use super::WheelState;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(default)]
pub struct DriveKinematics {
    /// Distance between the left and right wheel contact patches.
    pub track_width_m: f64,

    /// Ratio of the effective to the geometric track width.
    pub track_scrub_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveKinematics {
    fn default() -> Self {
        Self {
            track_width_m: 0.6488,
            track_scrub_factor: 1.0,
        }
    }
}

impl DriveKinematics {
    /// Body motion from the distance travelled by each wheel.
    pub fn forward_kinematics(&self, left_delta_m: f64, right_delta_m: f64) -> Twist2 {
        let dtheta = (right_delta_m - left_delta_m) / (self.track_width_m * self.track_scrub_factor);
        Self::forward_kinematics_with_rotation(left_delta_m, right_delta_m, dtheta)
    }

    /// Body motion from wheel travel and a measured change of heading, as
    /// given by a gyro.
    pub fn forward_kinematics_with_heading(
        left_delta_m: f64,
        right_delta_m: f64,
        prev_heading: &Rotation2,
        current_heading: &Rotation2,
    ) -> Twist2 {
        let dtheta = prev_heading.inverse().rotate_by(current_heading).radians();
        Self::forward_kinematics_with_rotation(left_delta_m, right_delta_m, dtheta)
    }

    fn forward_kinematics_with_rotation(left_delta_m: f64, right_delta_m: f64, dtheta: f64) -> Twist2 {
        Twist2::new((left_delta_m + right_delta_m) / 2.0, 0.0, dtheta)
    }

    /// Wheel velocities needed to achieve a body velocity.
    pub fn inverse_kinematics(&self, velocity: &Twist2) -> WheelState {
        if velocity.dtheta.abs() < EPSILON {
            return WheelState::new(velocity.dx, velocity.dx);
        }
        let delta_v = self.track_width_m * self.track_scrub_factor * velocity.dtheta / 2.0;
        WheelState::new(velocity.dx - delta_v, velocity.dx + delta_v)
    }
}

/// Apply a body motion to a pose.
pub fn integrate_forward_kinematics(current_pose: &Pose2, motion: &Twist2) -> Pose2 {
    current_pose.transform_by(&Pose2::exp(motion))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_forward_inverse() {
        let k = DriveKinematics {
            track_width_m: 0.5,
            track_scrub_factor: 1.0,
        };

        let twist = k.forward_kinematics(0.9, 1.1);
        assert!((twist.dx - 1.0).abs() < 1e-12);
        assert!((twist.dtheta - 0.4).abs() < 1e-12);

        let wheels = k.inverse_kinematics(&twist);
        assert!((wheels.left - 0.9).abs() < 1e-12);
        assert!((wheels.right - 1.1).abs() < 1e-12);

        assert_eq!(k.inverse_kinematics(&Twist2::new(2.0, 0.0, 0.0)), WheelState::new(2.0, 2.0));
    }

    #[test]
    fn test_scrubbed_round_trip() {
        let k = DriveKinematics {
            track_width_m: 0.6,
            track_scrub_factor: 1.2,
        };

        let wheels = k.inverse_kinematics(&Twist2::new(1.0, 0.0, 0.5));
        let twist = k.forward_kinematics(wheels.left, wheels.right);
        assert!((twist.dx - 1.0).abs() < 1e-12);
        assert!((twist.dtheta - 0.5).abs() < 1e-12);

        // Scrub widens the effective track, so the wheels must differ more
        let unscrubbed = DriveKinematics {
            track_scrub_factor: 1.0,
            ..k
        }
        .inverse_kinematics(&Twist2::new(1.0, 0.0, 0.5));
        assert!(wheels.right - wheels.left > unscrubbed.right - unscrubbed.left);
    }

    #[test]
    fn test_with_heading() {
        let twist = DriveKinematics::forward_kinematics_with_heading(
            1.0,
            1.0,
            &Rotation2::from_degrees(170.0),
            &Rotation2::from_degrees(-170.0),
        );
        assert!((twist.dtheta - 20f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_integrate() {
        // A quarter circle of radius 1
        let quarter = std::f64::consts::FRAC_PI_2;
        let pose = integrate_forward_kinematics(&Pose2::identity(), &Twist2::new(quarter, 0.0, quarter));
        assert_eq!(pose, Pose2::from_xy_deg(1.0, 1.0, 90.0));
    }
}
