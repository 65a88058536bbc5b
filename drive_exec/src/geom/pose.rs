//! Planar pose
//!
//! [`Pose2`] is an element of SE(2). Composition, inversion and the
//! exponential/logarithm maps follow the usual Lie group conventions, with
//! twists expressed in the body frame of the pose they are applied to.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{
    fmt_csv, HasPose, HasTranslation, Interpolable, Rotation2, ToCsv, Translation2, Twist2, EPSILON,
};
use util::maths::epsilon_equals;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position and heading in the plane.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct Pose2 {
    translation: Translation2,
    rotation: Rotation2,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(translation: Translation2, rotation: Rotation2) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pose at `(x, y)` with a heading in degrees.
    pub fn from_xy_deg(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::new(Translation2::new(x, y), Rotation2::from_degrees(heading_deg))
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_translation(translation: Translation2) -> Self {
        Self::new(translation, Rotation2::identity())
    }

    pub fn from_rotation(rotation: Rotation2) -> Self {
        Self::new(Translation2::identity(), rotation)
    }

    pub fn translation(&self) -> Translation2 {
        self.translation
    }

    pub fn rotation(&self) -> Rotation2 {
        self.rotation
    }

    /// Integrate a constant-curvature motion from the origin.
    pub fn exp(delta: &Twist2) -> Self {
        let sin_theta = delta.dtheta.sin();
        let cos_theta = delta.dtheta.cos();

        let (s, c) = if delta.dtheta.abs() < EPSILON {
            (
                1.0 - delta.dtheta * delta.dtheta / 6.0,
                0.5 * delta.dtheta,
            )
        } else {
            (
                sin_theta / delta.dtheta,
                (1.0 - cos_theta) / delta.dtheta,
            )
        };

        Self::new(
            Translation2::new(delta.dx * s - delta.dy * c, delta.dx * c + delta.dy * s),
            Rotation2::new(cos_theta, sin_theta, false),
        )
    }

    /// The constant-curvature motion from the origin which reaches this pose.
    pub fn log(&self) -> Twist2 {
        let dtheta = self.rotation.radians();
        let half_dtheta = 0.5 * dtheta;
        let cos_minus_one = self.rotation.cos() - 1.0;

        let half_theta_by_tan_half = if cos_minus_one.abs() < EPSILON {
            1.0 - dtheta * dtheta / 12.0
        } else {
            -(half_dtheta * self.rotation.sin()) / cos_minus_one
        };

        let translation_part = self.translation.rotate_by(&Rotation2::new(
            half_theta_by_tan_half,
            -half_dtheta,
            false,
        ));

        Twist2::new(translation_part.x(), translation_part.y(), dtheta)
    }

    /// Compose `other` onto this pose, treating `other` as expressed in this
    /// pose's frame.
    pub fn transform_by(&self, other: &Pose2) -> Self {
        Self::new(
            self.translation
                .translate_by(&other.translation.rotate_by(&self.rotation)),
            self.rotation.rotate_by(&other.rotation),
        )
    }

    pub fn inverse(&self) -> Self {
        let rotation_inverted = self.rotation.inverse();
        Self::new(
            self.translation.inverse().rotate_by(&rotation_inverted),
            rotation_inverted,
        )
    }

    /// Map a point expressed in this pose's frame into the parent frame.
    pub fn transform_point(&self, point: &Translation2) -> Translation2 {
        self.translation + point.rotate_by(&self.rotation)
    }

    /// This pose with its heading turned a quarter turn anticlockwise.
    pub fn normal(&self) -> Self {
        Self::new(self.translation, self.rotation.normal())
    }

    /// Intersection of the lines through both poses along their headings.
    ///
    /// Parallel (or numerically degenerate) lines give `(+inf, +inf)`.
    pub fn intersection(&self, other: &Pose2) -> Translation2 {
        let other_rotation = other.rotation;
        if self.rotation.is_parallel(&other_rotation) {
            return Translation2::new(std::f64::INFINITY, std::f64::INFINITY);
        }

        if self.rotation.cos().abs() < other_rotation.cos().abs() {
            intersection_internal(self, other)
        } else {
            intersection_internal(other, self)
        }
    }

    /// True if both poses lie on the same line, heading along it.
    pub fn is_colinear(&self, other: &Pose2) -> bool {
        if !self.rotation.is_parallel(&other.rotation) {
            return false;
        }
        let twist = self.inverse().transform_by(other).log();
        epsilon_equals(twist.dy, 0.0, EPSILON) && epsilon_equals(twist.dtheta, 0.0, EPSILON)
    }

    /// Constant-curvature blend towards `other`, `x` clamped to `[0, 1]`.
    pub fn interpolate(&self, other: &Pose2, x: f64) -> Self {
        if x <= 0.0 {
            return *self;
        } else if x >= 1.0 {
            return *other;
        }
        let twist = self.inverse().transform_by(other).log();
        self.transform_by(&Pose2::exp(&twist.scaled(x)))
    }

    /// Length of the constant-curvature arc between the two poses.
    pub fn distance(&self, other: &Pose2) -> f64 {
        self.inverse().transform_by(other).log().norm()
    }

    /// Reflection in the x axis.
    pub fn mirror(&self) -> Self {
        Self::new(
            Translation2::new(self.translation.x(), -self.translation.y()),
            self.rotation.inverse(),
        )
    }

    pub fn epsilon_eq(&self, other: &Pose2, epsilon: f64) -> bool {
        self.translation.epsilon_eq(&other.translation, epsilon)
            && self.rotation.epsilon_eq(&other.rotation, epsilon)
    }
}

impl PartialEq for Pose2 {
    fn eq(&self, other: &Self) -> bool {
        self.epsilon_eq(other, EPSILON)
    }
}

impl Interpolable for Pose2 {
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        Pose2::interpolate(self, other, x)
    }

    fn distance(&self, other: &Self) -> f64 {
        Pose2::distance(self, other)
    }
}

impl HasTranslation for Pose2 {
    fn translation(&self) -> Translation2 {
        self.translation
    }
}

impl HasPose for Pose2 {
    fn pose(&self) -> Pose2 {
        *self
    }
}

impl ToCsv for Pose2 {
    fn to_csv(&self) -> String {
        format!(
            "{},{}",
            self.translation.to_csv(),
            fmt_csv(self.rotation.degrees())
        )
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Intersect the line of `a` with the line of `b`, `a` being the pose whose
/// heading is further from the x axis.
fn intersection_internal(a: &Pose2, b: &Pose2) -> Translation2 {
    let a_r = a.rotation;
    let b_r = b.rotation;
    let a_t = a.translation;
    let b_t = b.translation;

    let tan_b = b_r.tan();
    let t = ((a_t.x() - b_t.x()) * tan_b + b_t.y() - a_t.y()) / (a_r.sin() - a_r.cos() * tan_b);

    if t.is_nan() {
        return Translation2::new(std::f64::INFINITY, std::f64::INFINITY);
    }

    a_t.translate_by(&a_r.to_translation().scale(t))
}
