//! Reparameterisations of a trajectory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::Arc;

// Internal
use super::{Timed, Trajectory, TrajectorySamplePoint};
use crate::geom::{Interpolable, EPSILON};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trajectory accessed through a monotonic scalar interpolant.
pub trait TrajectoryView<S> {
    /// Sample the trajectory, clamping the interpolant into range.
    fn sample(&self, interpolant: f64) -> TrajectorySamplePoint<S>;

    fn first_interpolant(&self) -> f64;

    fn last_interpolant(&self) -> f64;

    fn trajectory(&self) -> &Trajectory<S>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// View by fractional index.
#[derive(Debug, Clone)]
pub struct IndexView<S> {
    trajectory: Arc<Trajectory<S>>,
}

/// View by cumulative distance along the trajectory.
#[derive(Debug, Clone)]
pub struct DistanceView<S> {
    trajectory: Arc<Trajectory<S>>,

    /// Cumulative distance at each point, starting at zero.
    distances: Vec<f64>,
}

/// View by time, for trajectories of timed states.
#[derive(Debug, Clone)]
pub struct TimedView<S> {
    trajectory: Arc<Trajectory<S>>,
    start_time_s: f64,
    end_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S> IndexView<S> {
    pub fn new(trajectory: impl Into<Arc<Trajectory<S>>>) -> Self {
        Self {
            trajectory: trajectory.into(),
        }
    }
}

impl<S: Interpolable> TrajectoryView<S> for IndexView<S> {
    fn sample(&self, interpolant: f64) -> TrajectorySamplePoint<S> {
        self.trajectory.interpolated(interpolant)
    }

    fn first_interpolant(&self) -> f64 {
        0.0
    }

    fn last_interpolant(&self) -> f64 {
        (self.trajectory.len() - 1) as f64
    }

    fn trajectory(&self) -> &Trajectory<S> {
        &self.trajectory
    }
}

impl<S: Interpolable> DistanceView<S> {
    pub fn new(trajectory: impl Into<Arc<Trajectory<S>>>) -> Self {
        let trajectory = trajectory.into();

        let mut distances = Vec::with_capacity(trajectory.len());
        distances.push(0.0);
        for pair in trajectory.points().windows(2) {
            let last = distances[distances.len() - 1];
            distances.push(last + pair[0].state.distance(&pair[1].state));
        }

        Self {
            trajectory,
            distances,
        }
    }

    /// Total length of the trajectory.
    pub fn length(&self) -> f64 {
        self.distances[self.distances.len() - 1]
    }

    /// Cumulative distance at each trajectory point.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }
}

impl<S: Interpolable> TrajectoryView<S> for DistanceView<S> {
    fn sample(&self, distance: f64) -> TrajectorySamplePoint<S> {
        let points = self.trajectory.points();

        if distance >= self.length() {
            return TrajectorySamplePoint::from_point(&points[points.len() - 1]);
        }
        if distance.is_nan() || distance <= 0.0 {
            return TrajectorySamplePoint::from_point(&points[0]);
        }

        // First point at or beyond the requested distance, never the first
        // point since distance > 0
        let i = self.distances.partition_point(|d| *d < distance);
        let prev = &points[i - 1];
        let next = &points[i];
        let segment = self.distances[i] - self.distances[i - 1];

        if segment.abs() <= EPSILON {
            return TrajectorySamplePoint::from_point(next);
        }

        TrajectorySamplePoint {
            state: prev
                .state
                .interpolate(&next.state, (distance - self.distances[i - 1]) / segment),
            index_floor: i - 1,
            index_ceil: i,
        }
    }

    fn first_interpolant(&self) -> f64 {
        0.0
    }

    fn last_interpolant(&self) -> f64 {
        self.length()
    }

    fn trajectory(&self) -> &Trajectory<S> {
        &self.trajectory
    }
}

impl<S: Timed> TimedView<S> {
    pub fn new(trajectory: impl Into<Arc<Trajectory<S>>>) -> Self {
        let trajectory = trajectory.into();
        let start_time_s = trajectory.first_state().time_s();
        let end_time_s = trajectory.last_state().time_s();

        Self {
            trajectory,
            start_time_s,
            end_time_s,
        }
    }
}

impl<S: Timed + Interpolable> TrajectoryView<S> for TimedView<S> {
    fn sample(&self, time_s: f64) -> TrajectorySamplePoint<S> {
        let points = self.trajectory.points();

        if time_s >= self.end_time_s {
            return TrajectorySamplePoint::from_point(&points[points.len() - 1]);
        }
        if time_s.is_nan() || time_s <= self.start_time_s {
            return TrajectorySamplePoint::from_point(&points[0]);
        }

        let i = points.partition_point(|p| p.state.time_s() < time_s);
        let prev = &points[i - 1];
        let next = &points[i];
        let dt = next.state.time_s() - prev.state.time_s();

        if dt.abs() <= EPSILON {
            return TrajectorySamplePoint::from_point(next);
        }

        TrajectorySamplePoint {
            state: prev
                .state
                .interpolate(&next.state, (time_s - prev.state.time_s()) / dt),
            index_floor: i - 1,
            index_ceil: i,
        }
    }

    fn first_interpolant(&self) -> f64 {
        self.start_time_s
    }

    fn last_interpolant(&self) -> f64 {
        self.end_time_s
    }

    fn trajectory(&self) -> &Trajectory<S> {
        &self.trajectory
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{Pose2, Translation2};

    #[test]
    fn test_distance_view_midpoint() {
        let traj = Trajectory::new(vec![Translation2::new(0.0, 0.0), Translation2::new(24.0, 0.0)]).unwrap();
        let view = DistanceView::new(traj);

        assert_eq!(view.last_interpolant(), 24.0);
        assert_eq!(view.sample(12.0).state, Translation2::new(12.0, 0.0));
    }

    #[test]
    fn test_distance_view_segments() {
        let traj = Trajectory::new(vec![
            Translation2::new(0.0, 0.0),
            Translation2::new(24.0, 0.0),
            Translation2::new(24.0, 0.0),
            Translation2::new(36.0, 12.0),
            Translation2::new(60.0, 12.0),
        ])
        .unwrap();
        let view = DistanceView::new(traj);

        let length = 24.0 + 12.0 * 2f64.sqrt() + 24.0;
        assert!((view.length() - length).abs() < 1e-9);

        assert_eq!(view.sample(-5.0).state, Translation2::new(0.0, 0.0));
        assert_eq!(view.sample(6.0).state, Translation2::new(6.0, 0.0));
        assert_eq!(view.sample(24.0).state, Translation2::new(24.0, 0.0));

        let s = view.sample(24.0 + 6.0 * 2f64.sqrt());
        assert_eq!(s.state, Translation2::new(30.0, 6.0));
        assert_eq!((s.index_floor, s.index_ceil), (2, 3));

        assert_eq!(view.sample(length + 1.0).state, Translation2::new(60.0, 12.0));
    }

    #[test]
    fn test_distance_view_shares_trajectory() {
        let traj = Arc::new(
            Trajectory::new(vec![Pose2::identity(), Pose2::from_xy_deg(1.0, 0.0, 0.0)]).unwrap(),
        );
        let a = DistanceView::new(traj.clone());
        let b = IndexView::new(traj.clone());

        assert_eq!(Arc::strong_count(&traj), 3);
        assert_eq!(a.sample(0.5).state, b.sample(0.5).state);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Stamp {
        t: f64,
        x: f64,
    }

    impl Timed for Stamp {
        fn time_s(&self) -> f64 {
            self.t
        }
    }

    impl Interpolable for Stamp {
        fn interpolate(&self, other: &Self, x: f64) -> Self {
            Stamp {
                t: self.t + (other.t - self.t) * x,
                x: self.x + (other.x - self.x) * x,
            }
        }

        fn distance(&self, other: &Self) -> f64 {
            (other.x - self.x).abs()
        }
    }

    #[test]
    fn test_timed_view() {
        let traj = Trajectory::new(vec![
            Stamp { t: 1.0, x: 0.0 },
            Stamp { t: 2.0, x: 1.0 },
            Stamp { t: 4.0, x: 5.0 },
        ])
        .unwrap();
        let view = TimedView::new(traj);

        assert_eq!(view.first_interpolant(), 1.0);
        assert_eq!(view.last_interpolant(), 4.0);
        assert_eq!(view.sample(0.0).state, Stamp { t: 1.0, x: 0.0 });
        assert_eq!(view.sample(3.0).state, Stamp { t: 3.0, x: 3.0 });
        assert_eq!(view.sample(2.0).state, Stamp { t: 2.0, x: 1.0 });
        assert_eq!(view.sample(10.0).state, Stamp { t: 4.0, x: 5.0 });
    }

    #[test]
    fn test_nan_samples_first_point() {
        let traj = Arc::new(
            Trajectory::new(vec![Translation2::new(0.0, 0.0), Translation2::new(4.0, 0.0)]).unwrap(),
        );
        let s = DistanceView::new(traj.clone()).sample(std::f64::NAN);
        assert_eq!(s.state, Translation2::new(0.0, 0.0));
        assert_eq!((s.index_floor, s.index_ceil), (0, 0));
        assert_eq!(
            IndexView::new(traj).sample(std::f64::NAN).state,
            Translation2::new(0.0, 0.0)
        );

        let timed = TimedView::new(
            Trajectory::new(vec![Stamp { t: 1.0, x: 0.0 }, Stamp { t: 2.0, x: 1.0 }]).unwrap(),
        );
        assert_eq!(timed.sample(std::f64::NAN).state, Stamp { t: 1.0, x: 0.0 });
    }
}
