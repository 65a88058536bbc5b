//! Lidar samples and scans

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::collections::HashSet;

// Internal
use crate::geom::{Pose2, Translation2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of samples held by a scan, further samples are ignored.
pub const MAX_SCAN_SIZE: usize = 400;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single range reading.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LidarSample {
    pub timestamp_s: f64,

    /// Bearing of the beam in the sensor frame, anticlockwise from the
    /// sensor's x axis.
    pub angle_deg: f64,

    pub distance_m: f64,
}

/// One revolution of the sensor.
///
/// The timestamp of a scan is that of its first sample. Each sample is kept
/// alongside its position in the sensor frame and in the frame of the pose
/// it was captured under.
#[derive(Debug, Clone, Default)]
pub struct LidarScan {
    samples: Vec<LidarSample>,
    points: Vec<Translation2>,
    raw_points: Vec<Translation2>,
}

#[derive(Serialize)]
struct ScanJson {
    class: &'static str,
    timestamp: f64,
    pt2list: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LidarSample {
    pub fn new(timestamp_s: f64, angle_deg: f64, distance_m: f64) -> Self {
        Self {
            timestamp_s,
            angle_deg,
            distance_m,
        }
    }

    /// Create a sample from the sensor's native millimetre reading.
    pub fn from_mm(timestamp_s: f64, angle_deg: f64, distance_mm: f64) -> Self {
        Self::new(timestamp_s, angle_deg, distance_mm / 1000.0)
    }

    /// Position of the return in the sensor frame, or in the parent frame of
    /// `sensor_pose` if one is given.
    pub fn to_cartesian(&self, sensor_pose: Option<&Pose2>) -> Translation2 {
        let angle_rad = self.angle_deg.to_radians();
        let point = Translation2::new(
            angle_rad.cos() * self.distance_m,
            angle_rad.sin() * self.distance_m,
        );

        match sensor_pose {
            Some(pose) => pose.transform_point(&point),
            None => point,
        }
    }
}

impl LidarScan {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(MAX_SCAN_SIZE),
            points: Vec::with_capacity(MAX_SCAN_SIZE),
            raw_points: Vec::with_capacity(MAX_SCAN_SIZE),
        }
    }

    /// Add a sample captured with the sensor at `sensor_pose`.
    ///
    /// Returns false, dropping the sample, if the scan is full.
    pub fn add_sample(&mut self, sample: LidarSample, sensor_pose: Option<&Pose2>) -> bool {
        if self.is_full() {
            return false;
        }

        self.points.push(sample.to_cartesian(sensor_pose));
        self.raw_points.push(sample.to_cartesian(None));
        self.samples.push(sample);

        true
    }

    /// Timestamp of the first sample, 0 for an empty scan.
    pub fn timestamp_s(&self) -> f64 {
        self.samples.first().map(|s| s.timestamp_s).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= MAX_SCAN_SIZE
    }

    pub fn samples(&self) -> &[LidarSample] {
        &self.samples
    }

    /// Points in the frame of the capture poses.
    pub fn points(&self) -> &[Translation2] {
        &self.points
    }

    /// Points in the sensor frame.
    pub fn raw_points(&self) -> &[Translation2] {
        &self.raw_points
    }

    /// Points in the frame of the capture poses, keeping only the first
    /// point in each square of side `resolution_m`.
    pub fn culled_points(&self, resolution_m: f64) -> Vec<Translation2> {
        cull(&self.points, resolution_m)
    }

    /// Points in the sensor frame, culled as [`LidarScan::culled_points`].
    pub fn culled_raw_points(&self, resolution_m: f64) -> Vec<Translation2> {
        cull(&self.raw_points, resolution_m)
    }

    /// Debug representation of the scan, points rounded to the millimetre.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let round = |v: f64| (v * 1000.0).round() / 1000.0;

        serde_json::to_string(&ScanJson {
            class: "lidarscan",
            timestamp: self.timestamp_s(),
            pt2list: self
                .points
                .iter()
                .map(|p| [round(p.x()), round(p.y())])
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn cull(points: &[Translation2], resolution_m: f64) -> Vec<Translation2> {
    if !(resolution_m > 0.0) {
        return points.to_vec();
    }

    let mut buckets = HashSet::with_capacity(points.len());
    points
        .iter()
        .filter(|p| {
            buckets.insert((
                (p.x() / resolution_m).floor() as i64,
                (p.y() / resolution_m).floor() as i64,
            ))
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sample_cartesian() {
        let s = LidarSample::from_mm(1.0, 90.0, 2000.0);
        assert_eq!(s.distance_m, 2.0);
        assert!(s.to_cartesian(None).epsilon_eq(&Translation2::new(0.0, 2.0), 1e-9));

        let pose = Pose2::from_xy_deg(1.0, 1.0, 90.0);
        assert!(s
            .to_cartesian(Some(&pose))
            .epsilon_eq(&Translation2::new(-1.0, 1.0), 1e-9));
    }

    #[test]
    fn test_scan_capacity() {
        let mut scan = LidarScan::new();
        assert_eq!(scan.timestamp_s(), 0.0);

        for i in 0..(MAX_SCAN_SIZE + 10) {
            let added = scan.add_sample(LidarSample::new(5.0 + i as f64, 0.0, 1.0), None);
            assert_eq!(added, i < MAX_SCAN_SIZE);
        }

        assert_eq!(scan.len(), MAX_SCAN_SIZE);
        assert!(scan.is_full());
        assert_eq!(scan.timestamp_s(), 5.0);
    }

    #[test]
    fn test_culling() {
        let mut scan = LidarScan::new();
        let pose = Pose2::from_xy_deg(10.0, 0.0, 0.0);

        // Three returns within one 10 cm bucket, one outside it
        for &d in &[1.01, 1.02, 1.05, 1.5] {
            scan.add_sample(LidarSample::new(0.0, 0.0, d), Some(&pose));
        }

        let culled = scan.culled_points(0.1);
        assert_eq!(culled.len(), 2);
        assert!(culled[0].epsilon_eq(&Translation2::new(11.01, 0.0), 1e-9));
        assert!(culled[1].epsilon_eq(&Translation2::new(11.5, 0.0), 1e-9));

        let raw = scan.culled_raw_points(0.1);
        assert_eq!(raw.len(), 2);
        assert!(raw[0].epsilon_eq(&Translation2::new(1.01, 0.0), 1e-9));

        // Negative coordinates fall in their own buckets
        let points = [Translation2::new(-0.05, 0.0), Translation2::new(0.05, 0.0)];
        assert_eq!(cull(&points, 0.1).len(), 2);
    }

    #[test]
    fn test_json() {
        let mut scan = LidarScan::new();
        scan.add_sample(LidarSample::new(2.5, 0.0, 1.23456), None);
        scan.add_sample(LidarSample::new(2.6, 180.0, 1.0), None);

        let value: serde_json::Value = serde_json::from_str(&scan.to_json().unwrap()).unwrap();
        assert_eq!(value["class"], "lidarscan");
        assert_eq!(value["timestamp"], 2.5);
        assert_eq!(value["pt2list"][0][0], 1.235);
        assert_eq!(value["pt2list"][1][0], -1.0);
    }
}
