//! Reference models scans are registered against

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::IcpError;
use crate::geom::{LineSeg2, Pose2, Translation2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A non-empty set of points.
#[derive(Debug, Clone)]
pub struct PointCloudModel {
    points: Vec<Translation2>,
}

/// A non-empty set of line segments, such as the walls of a room.
#[derive(Debug, Clone)]
pub struct SegmentModel {
    segments: Vec<LineSeg2>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The features a scan is matched against.
#[derive(Debug, Clone)]
pub enum ReferenceModel {
    PointCloud(PointCloudModel),
    Segments(SegmentModel),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReferenceModel {
    pub fn point_cloud(points: Vec<Translation2>) -> Result<Self, IcpError> {
        if points.is_empty() {
            return Err(IcpError::EmptyReferenceModel);
        }

        Ok(ReferenceModel::PointCloud(PointCloudModel { points }))
    }

    pub fn segments(segments: Vec<LineSeg2>) -> Result<Self, IcpError> {
        if segments.is_empty() {
            return Err(IcpError::EmptyReferenceModel);
        }

        Ok(ReferenceModel::Segments(SegmentModel { segments }))
    }

    /// Number of points or segments in the model.
    pub fn len(&self) -> usize {
        match self {
            ReferenceModel::PointCloud(m) => m.points.len(),
            ReferenceModel::Segments(m) => m.segments.len(),
        }
    }

    /// The point of the model nearest to `point`.
    pub fn closest_point(&self, point: &Translation2) -> Translation2 {
        let nearest = match self {
            ReferenceModel::PointCloud(m) => m
                .points
                .iter()
                .map(|p| (p.distance(point), *p))
                .min_by(|a, b| a.0.total_cmp(&b.0)),
            ReferenceModel::Segments(m) => m
                .segments
                .iter()
                .map(|s| {
                    let p = s.closest_point(point);
                    (p.distance(point), p)
                })
                .min_by(|a, b| a.0.total_cmp(&b.0)),
        };

        nearest.map(|(_, p)| p).unwrap_or(*point)
    }

    /// Move every feature of the model by `transform`.
    pub fn transform_by(&mut self, transform: &Pose2) {
        match self {
            ReferenceModel::PointCloud(m) => {
                for p in m.points.iter_mut() {
                    *p = transform.transform_point(p);
                }
            }
            ReferenceModel::Segments(m) => {
                for s in m.segments.iter_mut() {
                    *s = s.transform_by(transform);
                }
            }
        }
    }

    /// Range along a unit ray to the nearest segment, used to simulate a
    /// sensor. Point clouds have no surface and always return `None`.
    pub fn ray_distance(&self, origin: &Translation2, direction: &Translation2) -> Option<f64> {
        match self {
            ReferenceModel::PointCloud(_) => None,
            ReferenceModel::Segments(m) => m
                .segments
                .iter()
                .filter_map(|s| s.ray_distance(origin, direction))
                .min_by(|a, b| a.total_cmp(b)),
        }
    }
}

impl PointCloudModel {
    pub fn points(&self) -> &[Translation2] {
        &self.points
    }
}

impl SegmentModel {
    pub fn segments(&self) -> &[LineSeg2] {
        &self.segments
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> ReferenceModel {
        let c = [
            Translation2::new(0.0, 0.0),
            Translation2::new(4.0, 0.0),
            Translation2::new(4.0, 4.0),
            Translation2::new(0.0, 4.0),
        ];
        ReferenceModel::segments((0..4).map(|i| LineSeg2::new(c[i], c[(i + 1) % 4])).collect())
            .unwrap()
    }

    #[test]
    fn test_empty_models_rejected() {
        assert!(matches!(
            ReferenceModel::point_cloud(Vec::new()),
            Err(IcpError::EmptyReferenceModel)
        ));
        assert!(matches!(
            ReferenceModel::segments(Vec::new()),
            Err(IcpError::EmptyReferenceModel)
        ));
    }

    #[test]
    fn test_closest_point() {
        let cloud = ReferenceModel::point_cloud(vec![
            Translation2::new(0.0, 0.0),
            Translation2::new(1.0, 0.0),
            Translation2::new(5.0, 5.0),
        ])
        .unwrap();
        assert_eq!(
            cloud.closest_point(&Translation2::new(0.9, 0.3)),
            Translation2::new(1.0, 0.0)
        );

        let room = square();
        assert_eq!(
            room.closest_point(&Translation2::new(1.0, 3.5)),
            Translation2::new(1.0, 4.0)
        );
    }

    #[test]
    fn test_transform_and_ray() {
        let mut room = square();
        room.transform_by(&Pose2::from_xy_deg(-2.0, -2.0, 0.0));

        let d = room
            .ray_distance(&Translation2::identity(), &Translation2::new(1.0, 0.0))
            .unwrap();
        assert!((d - 2.0).abs() < 1e-9);
        assert_eq!(
            room.closest_point(&Translation2::new(0.0, 1.9)),
            Translation2::new(0.0, 2.0)
        );
    }
}
