//! # Geometry module
//!
//! Planar rigid-body algebra used by every other module: translations,
//! rotations, poses (elements of SE(2)) and twists (elements of its tangent
//! space), together with the capability traits that let trajectories,
//! constraints and followers be generic over the kind of state they carry.
//!
//! All equality comparisons between geometric values are epsilon based, with
//! [`EPSILON`] as the tolerance.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod line_seg;
mod pose;
mod pose_curv;
mod rotation;
mod translation;
mod twist;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use line_seg::LineSeg2;
pub use pose::Pose2;
pub use pose_curv::Pose2WithCurvature;
pub use rotation::Rotation2;
pub use translation::Translation2;
pub use twist::Twist2;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used for geometric equality and small-angle approximations.
pub const EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A state which can be blended with another of the same kind and measured
/// against it.
pub trait Interpolable: Clone {
    /// Blend between `self` (`x = 0`) and `other` (`x = 1`).
    fn interpolate(&self, other: &Self, x: f64) -> Self;

    /// Distance between `self` and `other`, in the metric used for
    /// interpolation.
    fn distance(&self, other: &Self) -> f64;
}

/// A state with a stable comma separated text representation.
pub trait ToCsv {
    fn to_csv(&self) -> String;
}

/// A state with a position.
pub trait HasTranslation {
    fn translation(&self) -> Translation2;
}

/// A state with a full planar pose.
pub trait HasPose: HasTranslation {
    fn pose(&self) -> Pose2;
}

/// A state carrying path curvature and its spatial derivative.
pub trait HasCurvature {
    fn curvature(&self) -> f64;
    fn dcurvature_ds(&self) -> f64;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a number as used in every CSV export.
pub(crate) fn fmt_csv(value: f64) -> String {
    format!("{:.3}", value)
}
