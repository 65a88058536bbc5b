//! Planar line segment

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{Pose2, Translation2, EPSILON};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A straight segment between two points, used as a feature of traced
/// reference maps (walls, field elements).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeg2 {
    pub start: Translation2,
    pub end: Translation2,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineSeg2 {
    pub fn new(start: Translation2, end: Translation2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// The point on the segment closest to `point`.
    pub fn closest_point(&self, point: &Translation2) -> Translation2 {
        let dir = self.end - self.start;
        let len2 = dir.norm2();

        if len2 < EPSILON {
            return self.start;
        }

        // Parameter of the projection along the segment, clamped to the ends
        let t = Translation2::dot(&(*point - self.start), &dir) / len2;
        if t <= 0.0 {
            self.start
        } else if t >= 1.0 {
            self.end
        } else {
            self.start.extrapolate(&self.end, t)
        }
    }

    pub fn transform_by(&self, transform: &Pose2) -> Self {
        Self::new(
            transform.transform_point(&self.start),
            transform.transform_point(&self.end),
        )
    }

    /// Distance along a ray from `origin` in direction `dir` (unit length) to
    /// the segment, or `None` if the ray misses.
    pub fn ray_distance(&self, origin: &Translation2, dir: &Translation2) -> Option<f64> {
        let seg = self.end - self.start;
        let denom = Translation2::cross(dir, &seg);
        if denom.abs() < EPSILON {
            return None;
        }

        let to_start = self.start - *origin;
        let t = Translation2::cross(&to_start, &seg) / denom;
        let u = Translation2::cross(&to_start, dir) / denom;

        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closest_point() {
        let seg = LineSeg2::new(Translation2::new(0.0, 0.0), Translation2::new(10.0, 0.0));
        assert_eq!(seg.closest_point(&Translation2::new(5.0, 3.0)), Translation2::new(5.0, 0.0));
        assert_eq!(seg.closest_point(&Translation2::new(-5.0, 3.0)), seg.start);
        assert_eq!(seg.closest_point(&Translation2::new(15.0, -3.0)), seg.end);
        assert_eq!(seg.length(), 10.0);
    }

    #[test]
    fn test_ray_distance() {
        let seg = LineSeg2::new(Translation2::new(2.0, -1.0), Translation2::new(2.0, 1.0));
        let origin = Translation2::identity();
        assert_eq!(seg.ray_distance(&origin, &Translation2::new(1.0, 0.0)), Some(2.0));
        assert_eq!(seg.ray_distance(&origin, &Translation2::new(-1.0, 0.0)), None);
        assert_eq!(seg.ray_distance(&origin, &Translation2::new(0.0, 1.0)), None);
    }
}
