//! Parameters for the drive executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use drive_lib::{
    geom::{Pose2, Translation2},
    timing::{TimingLimits, VelocityLimitRegionConstraint},
    traj_ctrl::FollowerType,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive executable
#[derive(Deserialize, Debug, Clone)]
pub struct DriveExecParams {
    /// Period of the control loop
    pub cycle_period_s: f64,

    /// The simulation is abandoned after this long
    pub max_duration_s: f64,

    /// Overrides the follower set in the planner parameters
    #[serde(default)]
    pub follower_type: Option<FollowerType>,

    /// Drive the path backwards
    #[serde(default)]
    pub reversed: bool,

    /// Pose the simulated robot starts from, offset from the first waypoint
    #[serde(default)]
    pub start_offset: WaypointParams,

    pub waypoints: Vec<WaypointParams>,

    pub limits: TimingLimits,

    pub max_centripetal_accel_mss: f64,

    pub max_voltage_v: f64,

    /// Regions in which the robot must slow down
    #[serde(default)]
    pub slow_regions: Vec<SlowRegionParams>,

    /// Number of states kept in the encoder state map
    pub encoder_map_capacity: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct WaypointParams {
    pub x_m: f64,
    pub y_m: f64,

    #[serde(default)]
    pub heading_deg: f64,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SlowRegionParams {
    pub min_x_m: f64,
    pub min_y_m: f64,
    pub max_x_m: f64,
    pub max_y_m: f64,
    pub max_vel_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointParams {
    pub fn pose(&self) -> Pose2 {
        Pose2::from_xy_deg(self.x_m, self.y_m, self.heading_deg)
    }
}

impl SlowRegionParams {
    pub fn constraint(&self) -> VelocityLimitRegionConstraint {
        VelocityLimitRegionConstraint::new(
            Translation2::new(self.min_x_m, self.min_y_m),
            Translation2::new(self.max_x_m, self.max_y_m),
            self.max_vel_ms,
        )
    }
}
