//! Timing constraints
//!
//! Each constraint bounds the velocity at a state, and the acceleration at a
//! state given the velocity there.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::{HasCurvature, HasTranslation, Translation2, EPSILON};
use crate::physics::{ChassisState, DifferentialDrive};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A limit applied during time parameterisation.
pub trait TimingConstraint<S> {
    /// Largest velocity allowed at `state`.
    fn max_velocity(&self, state: &S) -> f64;

    /// Acceleration window at `state` when travelling at `velocity`.
    fn min_max_acceleration(&self, state: &S, velocity: f64) -> MinMaxAcceleration;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An acceleration window.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMaxAcceleration {
    pub min_accel_mss: f64,
    pub max_accel_mss: f64,
}

/// Bounds the lateral acceleration on curves.
#[derive(Debug, Copy, Clone)]
pub struct CentripetalAccelerationConstraint {
    pub max_centripetal_accel_mss: f64,
}

/// Limits the velocity inside an axis-aligned box.
#[derive(Debug, Copy, Clone)]
pub struct VelocityLimitRegionConstraint {
    min_corner: Translation2,
    max_corner: Translation2,
    velocity_limit_ms: f64,
}

/// Keeps every wheel's demanded voltage within a supply limit.
#[derive(Debug, Clone)]
pub struct DifferentialDriveDynamicsConstraint {
    drive: DifferentialDrive,
    abs_voltage_limit_v: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MinMaxAcceleration {
    pub fn new(min_accel_mss: f64, max_accel_mss: f64) -> Self {
        Self {
            min_accel_mss,
            max_accel_mss,
        }
    }

    /// The unbounded window.
    pub fn no_limits() -> Self {
        Self::new(std::f64::NEG_INFINITY, std::f64::INFINITY)
    }

    pub fn is_valid(&self) -> bool {
        self.min_accel_mss <= self.max_accel_mss
    }
}

impl CentripetalAccelerationConstraint {
    pub fn new(max_centripetal_accel_mss: f64) -> Self {
        Self {
            max_centripetal_accel_mss,
        }
    }
}

impl<S: HasCurvature> TimingConstraint<S> for CentripetalAccelerationConstraint {
    fn max_velocity(&self, state: &S) -> f64 {
        let curvature = state.curvature();
        if curvature.abs() < EPSILON {
            std::f64::INFINITY
        } else {
            (self.max_centripetal_accel_mss / curvature).abs().sqrt()
        }
    }

    fn min_max_acceleration(&self, _state: &S, _velocity: f64) -> MinMaxAcceleration {
        MinMaxAcceleration::no_limits()
    }
}

impl VelocityLimitRegionConstraint {
    /// Region spanned by two opposite corners, given in any order.
    pub fn new(corner_a: Translation2, corner_b: Translation2, velocity_limit_ms: f64) -> Self {
        Self {
            min_corner: Translation2::new(corner_a.x().min(corner_b.x()), corner_a.y().min(corner_b.y())),
            max_corner: Translation2::new(corner_a.x().max(corner_b.x()), corner_a.y().max(corner_b.y())),
            velocity_limit_ms,
        }
    }

    pub fn contains(&self, point: &Translation2) -> bool {
        point.x() <= self.max_corner.x()
            && point.x() >= self.min_corner.x()
            && point.y() <= self.max_corner.y()
            && point.y() >= self.min_corner.y()
    }
}

impl<S: HasTranslation> TimingConstraint<S> for VelocityLimitRegionConstraint {
    fn max_velocity(&self, state: &S) -> f64 {
        if self.contains(&state.translation()) {
            self.velocity_limit_ms
        } else {
            std::f64::INFINITY
        }
    }

    fn min_max_acceleration(&self, _state: &S, _velocity: f64) -> MinMaxAcceleration {
        MinMaxAcceleration::no_limits()
    }
}

impl DifferentialDriveDynamicsConstraint {
    pub fn new(drive: DifferentialDrive, abs_voltage_limit_v: f64) -> Self {
        Self {
            drive,
            abs_voltage_limit_v,
        }
    }
}

impl<S: HasCurvature> TimingConstraint<S> for DifferentialDriveDynamicsConstraint {
    fn max_velocity(&self, state: &S) -> f64 {
        self.drive
            .max_abs_velocity(state.curvature(), self.abs_voltage_limit_v)
    }

    fn min_max_acceleration(&self, state: &S, velocity: f64) -> MinMaxAcceleration {
        let curvature = state.curvature();
        let min_max = self.drive.min_max_acceleration(
            &ChassisState::new(velocity, curvature * velocity),
            curvature,
            self.abs_voltage_limit_v,
        );
        MinMaxAcceleration::new(min_max.min, min_max.max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{Pose2, Pose2WithCurvature};
    use crate::physics::DriveModelParams;

    #[test]
    fn test_centripetal() {
        let c = CentripetalAccelerationConstraint::new(2.0);

        let straight = Pose2WithCurvature::from_pose(Pose2::identity());
        assert!(c.max_velocity(&straight).is_infinite());

        let curve = Pose2WithCurvature::new(Pose2::identity(), -0.5, 0.0);
        assert!((c.max_velocity(&curve) - 2.0).abs() < 1e-12);
        assert_eq!(c.min_max_acceleration(&curve, 1.0), MinMaxAcceleration::no_limits());
    }

    #[test]
    fn test_velocity_region() {
        let c = VelocityLimitRegionConstraint::new(
            Translation2::new(1.0, 1.0),
            Translation2::new(-1.0, -1.0),
            0.5,
        );

        assert_eq!(c.max_velocity(&Translation2::new(0.0, 0.5)), 0.5);
        assert_eq!(c.max_velocity(&Translation2::new(1.0, -1.0)), 0.5);
        assert!(c.max_velocity(&Translation2::new(1.5, 0.0)).is_infinite());
    }

    #[test]
    fn test_drive_dynamics() {
        let drive = DifferentialDrive::from_params(&DriveModelParams::default()).unwrap();
        let c = DifferentialDriveDynamicsConstraint::new(drive, 10.0);

        let straight = Pose2WithCurvature::from_pose(Pose2::identity());
        let curve = Pose2WithCurvature::new(Pose2::identity(), 2.0, 0.0);

        // Turning lowers the top speed
        let v_straight = c.max_velocity(&straight);
        let v_curve = c.max_velocity(&curve);
        assert!(v_straight > 0.0);
        assert!(v_curve < v_straight);

        // Accelerating and braking are both possible from standstill and at
        // a moderate speed
        for &v in &[0.0, 0.5 * v_straight] {
            let window = c.min_max_acceleration(&straight, v);
            assert!(window.is_valid());
            assert!(window.max_accel_mss > 0.0);
            assert!(window.min_accel_mss < 0.0);
        }

        // At top speed there is no voltage left to speed up
        let window = c.min_max_acceleration(&straight, v_straight);
        assert!(window.max_accel_mss < 1e-6);
    }
}
