//! Pose with path curvature

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{
    fmt_csv, HasCurvature, HasPose, HasTranslation, Interpolable, Pose2, ToCsv, Translation2,
    EPSILON,
};
use util::maths::{epsilon_equals, interpolate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sample of a geometric path: the pose, the path curvature and the rate
/// of change of curvature with distance along the path.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct Pose2WithCurvature {
    pose: Pose2,
    curvature: f64,
    dcurvature_ds: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2WithCurvature {
    pub fn new(pose: Pose2, curvature: f64, dcurvature_ds: f64) -> Self {
        Self {
            pose,
            curvature,
            dcurvature_ds,
        }
    }

    pub fn from_pose(pose: Pose2) -> Self {
        Self::new(pose, 0.0, 0.0)
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn transform_by(&self, transform: &Pose2) -> Self {
        Self::new(
            self.pose.transform_by(transform),
            self.curvature,
            self.dcurvature_ds,
        )
    }

    /// Reflection in the x axis, which turns every curve the other way.
    pub fn mirror(&self) -> Self {
        Self::new(self.pose.mirror(), -self.curvature, -self.dcurvature_ds)
    }
}

impl PartialEq for Pose2WithCurvature {
    fn eq(&self, other: &Self) -> bool {
        self.pose == other.pose
            && epsilon_equals(self.curvature, other.curvature, EPSILON)
            && epsilon_equals(self.dcurvature_ds, other.dcurvature_ds, EPSILON)
    }
}

impl Interpolable for Pose2WithCurvature {
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        Self::new(
            self.pose.interpolate(&other.pose, x),
            interpolate(self.curvature, other.curvature, x),
            interpolate(self.dcurvature_ds, other.dcurvature_ds, x),
        )
    }

    fn distance(&self, other: &Self) -> f64 {
        self.pose.distance(&other.pose)
    }
}

impl HasTranslation for Pose2WithCurvature {
    fn translation(&self) -> Translation2 {
        self.pose.translation()
    }
}

impl HasPose for Pose2WithCurvature {
    fn pose(&self) -> Pose2 {
        self.pose
    }
}

impl HasCurvature for Pose2WithCurvature {
    fn curvature(&self) -> f64 {
        self.curvature
    }

    fn dcurvature_ds(&self) -> f64 {
        self.dcurvature_ds
    }
}

impl ToCsv for Pose2WithCurvature {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{}",
            self.pose.to_csv(),
            fmt_csv(self.curvature),
            fmt_csv(self.dcurvature_ds)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interpolate() {
        let a = Pose2WithCurvature::new(Pose2::from_xy_deg(0.0, 0.0, 0.0), 0.0, 1.0);
        let b = Pose2WithCurvature::new(Pose2::from_xy_deg(2.0, 0.0, 0.0), 1.0, 3.0);
        let mid = a.interpolate(&b, 0.5);

        assert_eq!(mid.pose(), Pose2::from_xy_deg(1.0, 0.0, 0.0));
        assert_eq!(mid.curvature(), 0.5);
        assert_eq!(mid.dcurvature_ds(), 2.0);
        assert_eq!(a.distance(&b), 2.0);
    }

    #[test]
    fn test_mirror_and_csv() {
        let a = Pose2WithCurvature::new(Pose2::from_xy_deg(1.0, 1.0, 45.0), 0.5, -0.25);
        let m = a.mirror();
        assert_eq!(m.pose(), Pose2::from_xy_deg(1.0, -1.0, -45.0));
        assert_eq!(m.curvature(), -0.5);
        assert_eq!(m.dcurvature_ds(), 0.25);
        assert_eq!(a.to_csv(), "1.000,1.000,45.000,0.500,-0.250");
    }
}
