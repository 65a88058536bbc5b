//! Planar rotation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{fmt_csv, Interpolable, ToCsv, Translation2, EPSILON};
use util::maths::epsilon_equals;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A rotation in the plane, stored as the unit vector `(cos, sin)`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Rotation2 {
    cos: f64,
    sin: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Rotation2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation2 {
    /// Build a rotation from a direction `(x, y)`.
    ///
    /// With `normalize` set the direction is rescaled to unit length, and a
    /// degenerate (zero length) direction gives the identity rotation.
    pub fn new(x: f64, y: f64, normalize: bool) -> Self {
        if normalize {
            let magnitude = x.hypot(y);
            if magnitude > EPSILON {
                Self {
                    cos: x / magnitude,
                    sin: y / magnitude,
                }
            } else {
                Self::identity()
            }
        } else {
            Self { cos: x, sin: y }
        }
    }

    pub fn identity() -> Self {
        Self { cos: 1.0, sin: 0.0 }
    }

    pub fn from_radians(angle_rad: f64) -> Self {
        Self {
            cos: angle_rad.cos(),
            sin: angle_rad.sin(),
        }
    }

    pub fn from_degrees(angle_deg: f64) -> Self {
        Self::from_radians(angle_deg.to_radians())
    }

    pub fn cos(&self) -> f64 {
        self.cos
    }

    pub fn sin(&self) -> f64 {
        self.sin
    }

    /// Tangent of the angle, saturating to signed infinity when the cosine
    /// vanishes.
    pub fn tan(&self) -> f64 {
        if self.cos.abs() < EPSILON {
            if self.sin >= 0.0 {
                std::f64::INFINITY
            } else {
                std::f64::NEG_INFINITY
            }
        } else {
            self.sin / self.cos
        }
    }

    /// The angle in `(-pi, pi]`.
    pub fn radians(&self) -> f64 {
        self.sin.atan2(self.cos)
    }

    pub fn degrees(&self) -> f64 {
        self.radians().to_degrees()
    }

    /// Compose two rotations, the result is renormalised.
    pub fn rotate_by(&self, other: &Rotation2) -> Self {
        Self::new(
            self.cos * other.cos - self.sin * other.sin,
            self.cos * other.sin + self.sin * other.cos,
            true,
        )
    }

    /// This rotation turned by a further quarter turn anticlockwise.
    pub fn normal(&self) -> Self {
        Self {
            cos: -self.sin,
            sin: self.cos,
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            cos: self.cos,
            sin: -self.sin,
        }
    }

    /// True if the two rotations point along the same line (either sense).
    pub fn is_parallel(&self, other: &Rotation2) -> bool {
        epsilon_equals(
            Translation2::cross(&self.to_translation(), &other.to_translation()),
            0.0,
            EPSILON,
        )
    }

    pub fn to_translation(&self) -> Translation2 {
        Translation2::new(self.cos, self.sin)
    }

    /// Rotate towards `other` along the shortest arc, `x` clamped to `[0, 1]`.
    pub fn interpolate(&self, other: &Rotation2, x: f64) -> Self {
        if x <= 0.0 {
            *self
        } else if x >= 1.0 {
            *other
        } else {
            let angle_diff = self.inverse().rotate_by(other).radians();
            self.rotate_by(&Rotation2::from_radians(angle_diff * x))
        }
    }

    /// The absolute shortest angle to `other` in radians.
    pub fn distance(&self, other: &Rotation2) -> f64 {
        self.inverse().rotate_by(other).radians().abs()
    }

    pub fn epsilon_eq(&self, other: &Rotation2, epsilon: f64) -> bool {
        self.distance(other) < epsilon
    }
}

impl PartialEq for Rotation2 {
    fn eq(&self, other: &Self) -> bool {
        self.epsilon_eq(other, EPSILON)
    }
}

impl Interpolable for Rotation2 {
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        Rotation2::interpolate(self, other, x)
    }

    fn distance(&self, other: &Self) -> f64 {
        Rotation2::distance(self, other)
    }
}

impl ToCsv for Rotation2 {
    fn to_csv(&self) -> String {
        fmt_csv(self.degrees())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalisation() {
        let r = Rotation2::new(3.0, 4.0, true);
        assert!((r.cos() - 0.6).abs() < EPSILON);
        assert!((r.sin() - 0.8).abs() < EPSILON);

        // Degenerate direction collapses to identity
        assert_eq!(Rotation2::new(0.0, 0.0, true), Rotation2::identity());
    }

    #[test]
    fn test_rotate_and_inverse() {
        let a = Rotation2::from_degrees(30.0);
        let b = Rotation2::from_degrees(60.0);
        assert!((a.rotate_by(&b).degrees() - 90.0).abs() < 1e-9);
        assert_eq!(a.rotate_by(&a.inverse()), Rotation2::identity());
        assert!((a.normal().degrees() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_tan_saturates() {
        assert_eq!(Rotation2::from_radians(FRAC_PI_2).tan(), std::f64::INFINITY);
        assert_eq!(Rotation2::from_radians(-FRAC_PI_2).tan(), std::f64::NEG_INFINITY);
        assert!((Rotation2::from_degrees(45.0).tan() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel() {
        let a = Rotation2::from_degrees(10.0);
        assert!(a.is_parallel(&Rotation2::from_degrees(190.0)));
        assert!(!a.is_parallel(&Rotation2::from_degrees(100.0)));
    }

    #[test]
    fn test_interpolate_shortest_arc() {
        let a = Rotation2::from_degrees(170.0);
        let b = Rotation2::from_degrees(-170.0);
        let mid = a.interpolate(&b, 0.5);
        assert!((mid.radians().abs() - PI).abs() < 1e-9);
        assert!((a.distance(&b) - 20f64.to_radians()).abs() < 1e-9);
    }
}
