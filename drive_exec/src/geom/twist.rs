//! Planar twist

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EPSILON;
use util::maths::{epsilon_equals, interpolate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A velocity (or a small motion) in the body frame: forward `dx`, leftward
/// `dy` and anticlockwise `dtheta`.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct Twist2 {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Twist2 {
    pub fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Self { dx, dy, dtheta }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(self.dx * scale, self.dy * scale, self.dtheta * scale)
    }

    /// Magnitude of the linear part.
    pub fn norm(&self) -> f64 {
        if self.dy == 0.0 {
            self.dx.abs()
        } else {
            self.dx.hypot(self.dy)
        }
    }

    /// Turn rate per unit distance, zero for a twist with no motion.
    pub fn curvature(&self) -> f64 {
        let norm = self.norm();
        if self.dtheta.abs() < EPSILON && norm < EPSILON {
            0.0
        } else {
            self.dtheta / norm
        }
    }

    /// Component-wise blend, `x` clamped to `[0, 1]`.
    pub fn interpolate(&self, other: &Twist2, x: f64) -> Self {
        Self::new(
            interpolate(self.dx, other.dx, x),
            interpolate(self.dy, other.dy, x),
            interpolate(self.dtheta, other.dtheta, x),
        )
    }

    pub fn epsilon_eq(&self, other: &Twist2, epsilon: f64) -> bool {
        epsilon_equals(self.dx, other.dx, epsilon)
            && epsilon_equals(self.dy, other.dy, epsilon)
            && epsilon_equals(self.dtheta, other.dtheta, epsilon)
    }
}

impl PartialEq for Twist2 {
    fn eq(&self, other: &Self) -> bool {
        self.epsilon_eq(other, EPSILON)
    }
}
