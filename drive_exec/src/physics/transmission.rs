//! DC motor and gearbox model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::EPSILON;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A DC motor driving a wheel through a gearbox, with all quantities measured
/// at the wheel.
#[derive(Debug, Copy, Clone)]
pub struct DCMotorTransmission {
    speed_per_volt: f64,
    torque_per_volt: f64,
    friction_voltage: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DCMotorTransmission {
    pub fn new(speed_per_volt: f64, torque_per_volt: f64, friction_voltage: f64) -> Self {
        Self {
            speed_per_volt,
            torque_per_volt,
            friction_voltage,
        }
    }

    pub fn speed_per_volt(&self) -> f64 {
        self.speed_per_volt
    }

    pub fn torque_per_volt(&self) -> f64 {
        self.torque_per_volt
    }

    pub fn friction_voltage(&self) -> f64 {
        self.friction_voltage
    }

    /// Unloaded wheel speed at `voltage`.
    pub fn free_speed_at_voltage(&self, voltage: f64) -> f64 {
        if voltage > EPSILON {
            (voltage - self.friction_voltage).max(0.0) * self.speed_per_volt
        } else if voltage < -EPSILON {
            (voltage + self.friction_voltage).min(0.0) * self.speed_per_volt
        } else {
            0.0
        }
    }

    /// Wheel torque produced at `output_speed` (rad/s) when `voltage` is
    /// applied.
    pub fn torque_for_volts(&self, output_speed: f64, voltage: f64) -> f64 {
        let effective_voltage = if output_speed > EPSILON {
            voltage - self.friction_voltage
        } else if output_speed < -EPSILON {
            voltage + self.friction_voltage
        } else if voltage > EPSILON {
            // Static friction opposes the start of motion
            (voltage - self.friction_voltage).max(0.0)
        } else if voltage < -EPSILON {
            (voltage + self.friction_voltage).min(0.0)
        } else {
            return 0.0;
        };

        self.torque_per_volt * (-output_speed / self.speed_per_volt + effective_voltage)
    }

    /// Voltage needed to produce `torque` at `output_speed` (rad/s).
    pub fn voltage_for_torque(&self, output_speed: f64, torque: f64) -> f64 {
        let friction_voltage = if output_speed > EPSILON {
            self.friction_voltage
        } else if output_speed < -EPSILON {
            -self.friction_voltage
        } else if torque > EPSILON {
            self.friction_voltage
        } else if torque < -EPSILON {
            -self.friction_voltage
        } else {
            return 0.0;
        };

        torque / self.torque_per_volt + output_speed / self.speed_per_volt + friction_voltage
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_free_speed() {
        let t = DCMotorTransmission::new(10.0, 2.0, 1.0);

        assert_eq!(t.free_speed_at_voltage(0.0), 0.0);
        assert_eq!(t.free_speed_at_voltage(0.5), 0.0);
        assert_eq!(t.free_speed_at_voltage(-0.5), 0.0);
        assert_eq!(t.free_speed_at_voltage(5.0), 40.0);
        assert_eq!(t.free_speed_at_voltage(-5.0), -40.0);
    }

    #[test]
    fn test_torque_voltage_inverse() {
        let t = DCMotorTransmission::new(10.0, 2.0, 1.0);

        // Stall torque
        assert_eq!(t.torque_for_volts(0.0, 5.0), 8.0);
        assert_eq!(t.torque_for_volts(0.0, 0.5), 0.0);

        // No torque at free speed
        assert!(t.torque_for_volts(40.0, 5.0).abs() < 1e-12);

        for &(speed, voltage) in &[(10.0, 6.0), (-10.0, -3.0), (5.0, -2.0), (0.0, 4.0)] {
            let torque = t.torque_for_volts(speed, voltage);
            assert!((t.voltage_for_torque(speed, torque) - voltage).abs() < 1e-9);
        }
    }
}
