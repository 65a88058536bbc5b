//! Planar translation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

// Internal
use super::{fmt_csv, HasTranslation, Interpolable, Rotation2, ToCsv, EPSILON};
use util::maths::epsilon_equals;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point or displacement in the plane.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct Translation2 {
    vec: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Translation2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            vec: Vector2::new(x, y),
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// The displacement from `start` to `end`.
    pub fn between(start: &Translation2, end: &Translation2) -> Self {
        *end - *start
    }

    pub fn from_vector(vec: Vector2<f64>) -> Self {
        Self { vec }
    }

    pub fn x(&self) -> f64 {
        self.vec[0]
    }

    pub fn y(&self) -> f64 {
        self.vec[1]
    }

    pub fn as_vector(&self) -> &Vector2<f64> {
        &self.vec
    }

    pub fn norm(&self) -> f64 {
        self.x().hypot(self.y())
    }

    pub fn norm2(&self) -> f64 {
        self.vec.norm_squared()
    }

    pub fn translate_by(&self, other: &Translation2) -> Self {
        *self + *other
    }

    pub fn rotate_by(&self, rotation: &Rotation2) -> Self {
        Self::new(
            self.x() * rotation.cos() - self.y() * rotation.sin(),
            self.x() * rotation.sin() + self.y() * rotation.cos(),
        )
    }

    /// Heading of this vector. A zero vector gives the identity rotation.
    pub fn direction(&self) -> Rotation2 {
        Rotation2::new(self.x(), self.y(), true)
    }

    pub fn inverse(&self) -> Self {
        -*self
    }

    pub fn scale(&self, s: f64) -> Self {
        *self * s
    }

    /// Linear blend towards `other`, with `x` clamped to `[0, 1]`.
    pub fn interpolate(&self, other: &Translation2, x: f64) -> Self {
        if x <= 0.0 {
            *self
        } else if x >= 1.0 {
            *other
        } else {
            self.extrapolate(other, x)
        }
    }

    /// Linear blend towards `other` without clamping `x`.
    pub fn extrapolate(&self, other: &Translation2, x: f64) -> Self {
        Self::from_vector(self.vec + (other.vec - self.vec) * x)
    }

    pub fn distance(&self, other: &Translation2) -> f64 {
        (*other - *self).norm()
    }

    pub fn dot(a: &Translation2, b: &Translation2) -> f64 {
        a.vec.dot(&b.vec)
    }

    /// The z component of the 3D cross product of `a` and `b`.
    pub fn cross(a: &Translation2, b: &Translation2) -> f64 {
        a.x() * b.y() - a.y() * b.x()
    }

    /// The unsigned angle between `a` and `b`.
    ///
    /// If either vector has zero length the identity rotation is returned.
    pub fn angle(a: &Translation2, b: &Translation2) -> Rotation2 {
        let cos_angle = Self::dot(a, b) / (a.norm() * b.norm());
        if cos_angle.is_nan() {
            return Rotation2::identity();
        }
        Rotation2::from_radians(cos_angle.max(-1.0).min(1.0).acos())
    }

    pub fn epsilon_eq(&self, other: &Translation2, epsilon: f64) -> bool {
        epsilon_equals(self.x(), other.x(), epsilon) && epsilon_equals(self.y(), other.y(), epsilon)
    }
}

impl PartialEq for Translation2 {
    fn eq(&self, other: &Self) -> bool {
        self.epsilon_eq(other, EPSILON)
    }
}

impl Add for Translation2 {
    type Output = Translation2;

    fn add(self, rhs: Translation2) -> Translation2 {
        Translation2::from_vector(self.vec + rhs.vec)
    }
}

impl Sub for Translation2 {
    type Output = Translation2;

    fn sub(self, rhs: Translation2) -> Translation2 {
        Translation2::from_vector(self.vec - rhs.vec)
    }
}

impl Neg for Translation2 {
    type Output = Translation2;

    fn neg(self) -> Translation2 {
        Translation2::from_vector(-self.vec)
    }
}

impl Mul<f64> for Translation2 {
    type Output = Translation2;

    fn mul(self, rhs: f64) -> Translation2 {
        Translation2::from_vector(self.vec * rhs)
    }
}

impl Interpolable for Translation2 {
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        Translation2::interpolate(self, other, x)
    }

    fn distance(&self, other: &Self) -> f64 {
        Translation2::distance(self, other)
    }
}

impl HasTranslation for Translation2 {
    fn translation(&self) -> Translation2 {
        *self
    }
}

impl ToCsv for Translation2 {
    fn to_csv(&self) -> String {
        format!("{},{}", fmt_csv(self.x()), fmt_csv(self.y()))
    }
}
