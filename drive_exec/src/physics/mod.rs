//! # Physics module
//!
//! Models of the drivetrain: a DC motor and gearbox per side, the rigid body
//! dynamics of a differential drive chassis, and the wheel odometry
//! kinematics used to dead-reckon from encoder readings.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod drive;
pub mod kinematics;
mod transmission;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use drive::{ChassisState, DifferentialDrive, DriveDynamics, MinMax, WheelState};
pub use kinematics::DriveKinematics;
pub use transmission::DCMotorTransmission;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical parameters of the drivetrain.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveModelParams {
    pub mass_kg: f64,

    /// Moment of inertia about the vertical axis.
    pub moi_kgm2: f64,

    /// Drag torque per unit angular velocity.
    pub angular_drag_nm_per_rads: f64,

    pub wheel_radius_m: f64,

    /// Half the effective track width.
    pub effective_wheelbase_radius_m: f64,

    /// Free speed of a wheel per volt above the friction voltage.
    pub speed_per_volt_rads_per_v: f64,

    /// Stall torque at a wheel per volt.
    pub torque_per_volt_nm_per_v: f64,

    /// Voltage needed to overcome static friction.
    pub friction_voltage_v: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("Drive model parameter {0} must be positive, got {1}")]
    NonPositiveParameter(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveModelParams {
    fn default() -> Self {
        let mass_kg = 60.0;
        let wheel_radius_m = 0.0498;

        // Motor constants measured at the wheel: volts per rad/s and volts
        // per rad/s^2
        let kv = 0.135;
        let ka = 0.012;

        Self {
            mass_kg,
            moi_kgm2: 10.0,
            angular_drag_nm_per_rads: 12.0,
            wheel_radius_m,
            effective_wheelbase_radius_m: 0.3244,
            speed_per_volt_rads_per_v: 1.0 / kv,
            torque_per_volt_nm_per_v: wheel_radius_m * wheel_radius_m * mass_kg / (2.0 * ka),
            friction_voltage_v: 1.055,
        }
    }
}
