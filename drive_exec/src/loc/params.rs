//! Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{IcpParams, MclParams, OperatingMode};
use crate::geom::Pose2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the lidar scan pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LidarParams {
    pub mode: OperatingMode,

    /// Mounting position of the lidar on the vehicle
    pub vehicle_to_lidar_x_m: f64,
    pub vehicle_to_lidar_y_m: f64,
    pub vehicle_to_lidar_heading_deg: f64,

    /// Number of completed scans which may wait for processing
    pub queue_capacity: usize,

    /// A scan still open this long after it started is considered stalled
    pub restart_timeout_s: f64,

    /// Number of estimates kept in the lidar state map
    pub state_map_capacity: usize,

    pub icp: IcpParams,

    pub mcl: MclParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LidarParams {
    fn default() -> Self {
        Self {
            mode: OperatingMode::RelativeIcp,
            vehicle_to_lidar_x_m: 0.0,
            vehicle_to_lidar_y_m: 0.0,
            vehicle_to_lidar_heading_deg: 0.0,
            queue_capacity: 4,
            restart_timeout_s: 1.0,
            state_map_capacity: 1000,
            icp: IcpParams::default(),
            mcl: MclParams::default(),
        }
    }
}

impl LidarParams {
    /// Pose of the lidar in the vehicle frame.
    pub fn vehicle_to_lidar(&self) -> Pose2 {
        Pose2::from_xy_deg(
            self.vehicle_to_lidar_x_m,
            self.vehicle_to_lidar_y_m,
            self.vehicle_to_lidar_heading_deg,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load() {
        let p: LidarParams = util::params::from_str(
            "mode = \"absolute_icp\"\n\
             vehicle_to_lidar_x_m = 0.1\n\
             [icp]\n\
             max_iterations = 20\n\
             [mcl]\n\
             num_particles = 50\n",
        )
        .unwrap();

        assert_eq!(p.mode, OperatingMode::AbsoluteIcp);
        assert_eq!(p.vehicle_to_lidar(), Pose2::from_xy_deg(0.1, 0.0, 0.0));
        assert_eq!(p.icp.max_iterations, 20);
        assert_eq!(p.icp.timeout_ms, 50);
        assert_eq!(p.mcl.num_particles, 50);
        assert_eq!(p.queue_capacity, 4);
    }
}
