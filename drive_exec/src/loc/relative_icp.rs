//! Scan to scan registration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use super::{Icp, IcpError, IcpResult, LidarScan, ReferenceModel};
use crate::geom::Pose2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Registers each scan against the one before it, in the sensor frame.
///
/// The resulting transform `T` satisfies `current ≈ T * previous`, so the
/// motion of the sensor between the two scans is `T⁻¹`. No absolute pose is
/// needed.
#[derive(Debug, Clone)]
pub struct RelativeIcp {
    icp: Icp,
    last_reference: Option<ReferenceModel>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RelativeIcp {
    pub fn new(icp: Icp) -> Self {
        Self {
            icp,
            last_reference: None,
        }
    }

    /// Register `scan` against the previous scan, which it then replaces.
    ///
    /// The first scan has nothing to register against and gives an identity
    /// transform.
    pub fn register(&mut self, scan: &LidarScan) -> Result<IcpResult, IcpError> {
        let points = scan.culled_raw_points(self.icp.params().cull_resolution_m);

        let previous = if points.is_empty() {
            warn!("Empty scan at {:.3} s, clearing the relative reference", scan.timestamp_s());
            self.last_reference.take()
        } else {
            // Non-empty so construction cannot fail
            let reference = ReferenceModel::point_cloud(points.clone())?;
            self.last_reference.replace(reference)
        };

        match previous {
            Some(reference) => self.icp.register_points(&points, &Pose2::identity(), &reference),
            None => {
                debug!("No previous scan, relative transform is identity");
                Ok(IcpResult {
                    transform: Pose2::identity(),
                    iterations: 0,
                    converged: true,
                    mean_residual_m: 0.0,
                })
            }
        }
    }

    /// Forget the previous scan.
    pub fn reset(&mut self) {
        self.last_reference = None;
    }

    pub fn has_reference(&self) -> bool {
        self.last_reference.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::icp::test::{ray_cast_scan, room};
    use crate::loc::IcpParams;

    fn relative_icp() -> RelativeIcp {
        RelativeIcp::new(
            Icp::new(IcpParams {
                outlier_thresh: 2.0,
                angle_epsilon_rad: 1e-6,
                translation_epsilon_m: 1e-6,
                max_iterations: 200,
                timeout_ms: 0,
                cull_resolution_m: 0.02,
                ..IcpParams::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_first_scan_identity() {
        let mut rel = relative_icp();
        assert!(!rel.has_reference());

        let scan = ray_cast_scan(&room(), &Pose2::from_xy_deg(2.5, 1.0, 0.0), 0.0);
        let result = rel.register(&scan).unwrap();
        assert_eq!(result.transform, Pose2::identity());
        assert!(rel.has_reference());

        rel.reset();
        assert!(!rel.has_reference());
    }

    #[test]
    fn test_recovers_motion() {
        let model = room();
        let start = Pose2::from_xy_deg(2.5, 1.0, 10.0);
        let motion = Pose2::from_xy_deg(0.05, 0.02, 2.0);
        let end = start.transform_by(&motion);

        let mut rel = relative_icp();
        rel.register(&ray_cast_scan(&model, &start, 0.0)).unwrap();
        let result = rel.register(&ray_cast_scan(&model, &end, 0.1)).unwrap();

        let estimated = result.transform.inverse();
        assert!(
            estimated.translation().epsilon_eq(&motion.translation(), 0.03),
            "{:?}",
            estimated
        );
        assert!(estimated.rotation().epsilon_eq(&motion.rotation(), 1.5f64.to_radians()));
    }
}
