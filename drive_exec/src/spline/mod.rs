//! # Spline module
//!
//! Parametric curves used to join waypoints into smooth geometric paths. A
//! spline is parameterised on `t` in `[0, 1]`. The [`sampler`] turns splines
//! into dense sequences of [`Pose2WithCurvature`] suitable for building a
//! trajectory, while [`optimize_splines`] adjusts the second derivatives at
//! the joints of a spline chain to minimise the change of curvature.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod quintic;
pub mod sampler;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use quintic::{optimize_splines, sum_dcurvature2, OptimizerParams, QuinticHermiteSpline};
pub use sampler::SamplerParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::{Pose2, Pose2WithCurvature, Rotation2, Translation2, EPSILON};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A planar curve parameterised on `t` in `[0, 1]`.
pub trait Spline {
    fn point(&self, t: f64) -> Translation2;

    fn heading(&self, t: f64) -> Rotation2;

    fn curvature(&self, t: f64) -> f64;

    /// Rate of change of curvature with respect to `t`.
    fn dcurvature(&self, t: f64) -> f64;

    /// Rate of change of arc length with respect to `t`.
    fn velocity(&self, t: f64) -> f64;

    /// Rate of change of curvature with respect to arc length.
    fn dcurvature_ds(&self, t: f64) -> f64 {
        let velocity = self.velocity(t);
        if velocity < EPSILON {
            0.0
        } else {
            self.dcurvature(t) / velocity
        }
    }

    fn pose(&self, t: f64) -> Pose2 {
        Pose2::new(self.point(t), self.heading(t))
    }

    fn pose_with_curvature(&self, t: f64) -> Pose2WithCurvature {
        Pose2WithCurvature::new(self.pose(t), self.curvature(t), self.dcurvature_ds(t))
    }
}
