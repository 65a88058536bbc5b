//! Differential drive dynamics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{DCMotorTransmission, DriveModelParams, PhysicsError};
use crate::geom::EPSILON;
use util::maths::epsilon_equals;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dynamic model of a differential drive chassis.
#[derive(Debug, Copy, Clone)]
pub struct DifferentialDrive {
    mass_kg: f64,
    moi_kgm2: f64,
    angular_drag: f64,
    wheel_radius_m: f64,
    effective_wheelbase_radius_m: f64,
    left_transmission: DCMotorTransmission,
    right_transmission: DCMotorTransmission,
}

/// Linear and angular components of a chassis velocity or acceleration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ChassisState {
    pub linear: f64,
    pub angular: f64,
}

/// A quantity for each side of the drivetrain.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct WheelState {
    pub left: f64,
    pub right: f64,
}

/// Full dynamic state of the drive, as solved by the forward or inverse
/// dynamics.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct DriveDynamics {
    /// Path curvature (rad/m).
    pub curvature: f64,

    /// Rate of change of curvature with distance (rad/m^2).
    pub dcurvature: f64,

    /// m/s and rad/s
    pub chassis_velocity: ChassisState,

    /// m/s^2 and rad/s^2
    pub chassis_acceleration: ChassisState,

    /// rad/s
    pub wheel_velocity: WheelState,

    /// rad/s^2
    pub wheel_acceleration: WheelState,

    /// V
    pub voltage: WheelState,

    /// N m
    pub wheel_torque: WheelState,
}

/// A minimum and maximum pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisState {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }
}

impl WheelState {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn get(&self, left: bool) -> f64 {
        if left {
            self.left
        } else {
            self.right
        }
    }
}

impl Default for DifferentialDrive {
    fn default() -> Self {
        let params = DriveModelParams::default();
        let transmission = DCMotorTransmission::new(
            params.speed_per_volt_rads_per_v,
            params.torque_per_volt_nm_per_v,
            params.friction_voltage_v,
        );

        Self::new(
            params.mass_kg,
            params.moi_kgm2,
            params.angular_drag_nm_per_rads,
            params.wheel_radius_m,
            params.effective_wheelbase_radius_m,
            transmission,
            transmission,
        )
    }
}

impl DifferentialDrive {
    pub fn new(
        mass_kg: f64,
        moi_kgm2: f64,
        angular_drag: f64,
        wheel_radius_m: f64,
        effective_wheelbase_radius_m: f64,
        left_transmission: DCMotorTransmission,
        right_transmission: DCMotorTransmission,
    ) -> Self {
        Self {
            mass_kg,
            moi_kgm2,
            angular_drag,
            wheel_radius_m,
            effective_wheelbase_radius_m,
            left_transmission,
            right_transmission,
        }
    }

    /// Build the model from its parameters, with identical transmissions on
    /// both sides.
    pub fn from_params(params: &DriveModelParams) -> Result<Self, PhysicsError> {
        let positive = [
            ("mass_kg", params.mass_kg),
            ("moi_kgm2", params.moi_kgm2),
            ("wheel_radius_m", params.wheel_radius_m),
            ("effective_wheelbase_radius_m", params.effective_wheelbase_radius_m),
            ("speed_per_volt_rads_per_v", params.speed_per_volt_rads_per_v),
            ("torque_per_volt_nm_per_v", params.torque_per_volt_nm_per_v),
        ];
        for &(name, value) in positive.iter() {
            if !(value > 0.0) {
                return Err(PhysicsError::NonPositiveParameter(name, value));
            }
        }

        let transmission = DCMotorTransmission::new(
            params.speed_per_volt_rads_per_v,
            params.torque_per_volt_nm_per_v,
            params.friction_voltage_v,
        );

        Ok(Self::new(
            params.mass_kg,
            params.moi_kgm2,
            params.angular_drag_nm_per_rads,
            params.wheel_radius_m,
            params.effective_wheelbase_radius_m,
            transmission,
            transmission,
        ))
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    pub fn moi_kgm2(&self) -> f64 {
        self.moi_kgm2
    }

    pub fn wheel_radius_m(&self) -> f64 {
        self.wheel_radius_m
    }

    pub fn effective_wheelbase_radius_m(&self) -> f64 {
        self.effective_wheelbase_radius_m
    }

    pub fn left_transmission(&self) -> &DCMotorTransmission {
        &self.left_transmission
    }

    pub fn right_transmission(&self) -> &DCMotorTransmission {
        &self.right_transmission
    }

    /// Chassis motion from wheel motion.
    pub fn solve_forward_kinematics(&self, wheel_motion: &WheelState) -> ChassisState {
        ChassisState::new(
            self.wheel_radius_m * (wheel_motion.right + wheel_motion.left) / 2.0,
            self.wheel_radius_m * (wheel_motion.right - wheel_motion.left)
                / (2.0 * self.effective_wheelbase_radius_m),
        )
    }

    /// Wheel motion from chassis motion.
    pub fn solve_inverse_kinematics(&self, chassis_motion: &ChassisState) -> WheelState {
        WheelState::new(
            (chassis_motion.linear - self.effective_wheelbase_radius_m * chassis_motion.angular)
                / self.wheel_radius_m,
            (chassis_motion.linear + self.effective_wheelbase_radius_m * chassis_motion.angular)
                / self.wheel_radius_m,
        )
    }

    /// Accelerations resulting from `voltage` applied at `chassis_velocity`.
    pub fn solve_forward_dynamics(
        &self,
        chassis_velocity: &ChassisState,
        voltage: &WheelState,
    ) -> DriveDynamics {
        let mut dynamics = DriveDynamics {
            wheel_velocity: self.solve_inverse_kinematics(chassis_velocity),
            chassis_velocity: *chassis_velocity,
            curvature: nan_to_zero(chassis_velocity.angular / chassis_velocity.linear),
            voltage: *voltage,
            ..DriveDynamics::default()
        };

        let left_stationary = epsilon_equals(dynamics.wheel_velocity.left, 0.0, EPSILON)
            && voltage.left.abs() < self.left_transmission.friction_voltage();
        let right_stationary = epsilon_equals(dynamics.wheel_velocity.right, 0.0, EPSILON)
            && voltage.right.abs() < self.right_transmission.friction_voltage();
        if left_stationary && right_stationary {
            return dynamics;
        }

        dynamics.wheel_torque = WheelState::new(
            self.left_transmission
                .torque_for_volts(dynamics.wheel_velocity.left, voltage.left),
            self.right_transmission
                .torque_for_volts(dynamics.wheel_velocity.right, voltage.right),
        );

        let torque = dynamics.wheel_torque;
        dynamics.chassis_acceleration = ChassisState::new(
            (torque.right + torque.left) / (self.wheel_radius_m * self.mass_kg),
            self.effective_wheelbase_radius_m * (torque.right - torque.left)
                / (self.wheel_radius_m * self.moi_kgm2)
                - chassis_velocity.angular * self.angular_drag / self.moi_kgm2,
        );

        let accel = dynamics.chassis_acceleration;
        dynamics.dcurvature = nan_to_zero(
            (accel.angular - accel.linear * dynamics.curvature)
                / (chassis_velocity.linear * chassis_velocity.linear),
        );

        dynamics.wheel_acceleration = WheelState::new(
            accel.linear - accel.angular * self.effective_wheelbase_radius_m,
            accel.linear + accel.angular * self.effective_wheelbase_radius_m,
        );

        dynamics
    }

    /// Voltages and torques needed to achieve `chassis_acceleration` at
    /// `chassis_velocity`.
    pub fn solve_inverse_dynamics(
        &self,
        chassis_velocity: &ChassisState,
        chassis_acceleration: &ChassisState,
    ) -> DriveDynamics {
        let curvature = nan_to_zero(chassis_velocity.angular / chassis_velocity.linear);

        let mut dynamics = DriveDynamics {
            chassis_velocity: *chassis_velocity,
            chassis_acceleration: *chassis_acceleration,
            curvature,
            dcurvature: nan_to_zero(
                (chassis_acceleration.angular - chassis_acceleration.linear * curvature)
                    / (chassis_velocity.linear * chassis_velocity.linear),
            ),
            wheel_velocity: self.solve_inverse_kinematics(chassis_velocity),
            wheel_acceleration: self.solve_inverse_kinematics(chassis_acceleration),
            ..DriveDynamics::default()
        };

        let half_r = self.wheel_radius_m / 2.0;
        let linear_term = chassis_acceleration.linear * self.mass_kg;
        let angular_term = chassis_acceleration.angular * self.moi_kgm2
            / self.effective_wheelbase_radius_m;
        let drag_term =
            chassis_velocity.angular * self.angular_drag / self.effective_wheelbase_radius_m;

        dynamics.wheel_torque = WheelState::new(
            half_r * (linear_term - angular_term - drag_term),
            half_r * (linear_term + angular_term + drag_term),
        );

        dynamics.voltage = WheelState::new(
            self.left_transmission
                .voltage_for_torque(dynamics.wheel_velocity.left, dynamics.wheel_torque.left),
            self.right_transmission
                .voltage_for_torque(dynamics.wheel_velocity.right, dynamics.wheel_torque.right),
        );

        dynamics
    }

    /// Largest linear speed on a path of `curvature` with no wheel above
    /// `max_abs_voltage`.
    ///
    /// For infinite curvature (turning on the spot) the result is an angular
    /// speed instead.
    pub fn max_abs_velocity(&self, curvature: f64, max_abs_voltage: f64) -> f64 {
        let left_max = self.left_transmission.free_speed_at_voltage(max_abs_voltage);
        let right_max = self.right_transmission.free_speed_at_voltage(max_abs_voltage);
        let r_wb = self.effective_wheelbase_radius_m;

        if epsilon_equals(curvature, 0.0, EPSILON) {
            return self.wheel_radius_m * left_max.min(right_max);
        }
        if curvature.is_infinite() {
            return curvature.signum() * self.wheel_radius_m * left_max.min(right_max) / r_wb;
        }

        let right_if_left_max = left_max * (r_wb * curvature + 1.0) / (1.0 - r_wb * curvature);
        if right_if_left_max.abs() <= right_max + EPSILON {
            return self.wheel_radius_m * (left_max + right_if_left_max) / 2.0;
        }

        let left_if_right_max = right_max * (1.0 - r_wb * curvature) / (1.0 + r_wb * curvature);
        self.wheel_radius_m * (right_max + left_if_right_max) / 2.0
    }

    /// Range of linear acceleration (angular for infinite curvature) at
    /// `chassis_velocity` on a path of `curvature` with no wheel above
    /// `max_abs_voltage`.
    ///
    /// One side is held at full positive or negative voltage and the torque
    /// on the other side solved from
    ///
    /// ```text
    /// (Tl + Tr) / r_w = m * a
    /// (Tr - Tl) * r_wb / r_w - drag * w = I * a * k
    /// ```
    ///
    /// keeping only the cases where the other side needs no more than the
    /// voltage limit.
    pub fn min_max_acceleration(
        &self,
        chassis_velocity: &ChassisState,
        curvature: f64,
        max_abs_voltage: f64,
    ) -> MinMax {
        let wheel_velocities = self.solve_inverse_kinematics(chassis_velocity);
        let mut result = MinMax {
            min: std::f64::INFINITY,
            max: std::f64::NEG_INFINITY,
        };

        let turn_in_place = curvature.is_infinite();
        let linear_term = if turn_in_place {
            0.0
        } else {
            self.mass_kg * self.effective_wheelbase_radius_m
        };
        let angular_term = if turn_in_place {
            self.moi_kgm2
        } else {
            self.moi_kgm2 * curvature
        };
        let drag_torque = chassis_velocity.angular * self.angular_drag;
        let mr = self.mass_kg * self.wheel_radius_m;

        for &left_fixed in &[false, true] {
            for &sign in &[1.0, -1.0] {
                let (fixed, variable) = if left_fixed {
                    (&self.left_transmission, &self.right_transmission)
                } else {
                    (&self.right_transmission, &self.left_transmission)
                };

                let fixed_torque =
                    fixed.torque_for_volts(wheel_velocities.get(left_fixed), sign * max_abs_voltage);

                let variable_torque = if turn_in_place {
                    -fixed_torque
                } else if left_fixed {
                    (drag_torque * mr + fixed_torque * (linear_term + angular_term))
                        / (linear_term - angular_term)
                } else {
                    (fixed_torque * (linear_term - angular_term) - drag_torque * mr)
                        / (linear_term + angular_term)
                };

                let variable_voltage =
                    variable.voltage_for_torque(wheel_velocities.get(!left_fixed), variable_torque);
                if !(variable_voltage.abs() <= max_abs_voltage + EPSILON) {
                    continue;
                }

                let accel = if turn_in_place {
                    let direction = if left_fixed { -1.0 } else { 1.0 };
                    direction * (fixed_torque - variable_torque) * self.effective_wheelbase_radius_m
                        / (self.moi_kgm2 * self.wheel_radius_m)
                        - drag_torque / self.moi_kgm2
                } else {
                    (fixed_torque + variable_torque) / mr
                };

                result.min = result.min.min(accel);
                result.max = result.max.max(accel);
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn nan_to_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
