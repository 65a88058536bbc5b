//! Cursor over a trajectory view

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{Trajectory, TrajectorySamplePoint, TrajectoryView};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cursor moving along a view of a trajectory.
///
/// The progress is always kept within the view's interpolant range, so
/// moving past either end clamps rather than failing.
#[derive(Debug, Clone)]
pub struct TrajectoryIterator<S, V> {
    view: V,
    progress: f64,
    current_sample: TrajectorySamplePoint<S>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: Clone, V: TrajectoryView<S>> TrajectoryIterator<S, V> {
    /// Start a new iterator at the beginning of the view.
    pub fn new(view: V) -> Self {
        let progress = view.first_interpolant();
        let current_sample = view.sample(progress);

        Self {
            view,
            progress,
            current_sample,
        }
    }

    /// True once the cursor has reached the end of the view.
    pub fn is_done(&self) -> bool {
        self.remaining_progress() == 0.0
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn remaining_progress(&self) -> f64 {
        (self.view.last_interpolant() - self.progress).max(0.0)
    }

    pub fn sample(&self) -> &TrajectorySamplePoint<S> {
        &self.current_sample
    }

    pub fn state(&self) -> &S {
        &self.current_sample.state
    }

    /// Move the cursor by `additional_progress` in the view's units.
    pub fn advance(&mut self, additional_progress: f64) -> TrajectorySamplePoint<S> {
        self.progress = self.clamp_progress(self.progress + additional_progress);
        self.current_sample = self.view.sample(self.progress);
        self.current_sample.clone()
    }

    /// The sample `additional_progress` ahead of the cursor, without moving
    /// it.
    pub fn preview(&self, additional_progress: f64) -> TrajectorySamplePoint<S> {
        self.view
            .sample(self.clamp_progress(self.progress + additional_progress))
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn trajectory(&self) -> &Trajectory<S> {
        self.view.trajectory()
    }

    fn clamp_progress(&self, progress: f64) -> f64 {
        progress
            .min(self.view.last_interpolant())
            .max(self.view.first_interpolant())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Translation2;
    use crate::trajectory::{DistanceView, IndexView};

    fn waypoints() -> Trajectory<Translation2> {
        Trajectory::new(vec![
            Translation2::new(0.0, 0.0),
            Translation2::new(24.0, 0.0),
            Translation2::new(36.0, 12.0),
            Translation2::new(60.0, 12.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_index_iterator() {
        let mut iter = TrajectoryIterator::new(IndexView::new(waypoints()));

        assert!(!iter.is_done());
        assert_eq!(*iter.state(), Translation2::new(0.0, 0.0));

        // Preview leaves the cursor in place
        assert_eq!(iter.preview(1.5).state, Translation2::new(30.0, 6.0));
        assert_eq!(iter.progress(), 0.0);

        assert_eq!(iter.advance(1.5).state, Translation2::new(30.0, 6.0));
        assert_eq!(iter.remaining_progress(), 1.5);

        // Past the end clamps and finishes
        assert_eq!(iter.advance(10.0).state, Translation2::new(60.0, 12.0));
        assert_eq!(iter.progress(), 3.0);
        assert!(iter.is_done());

        // Past the start clamps to zero and un-finishes
        assert_eq!(iter.advance(-100.0).state, Translation2::new(0.0, 0.0));
        assert_eq!(iter.progress(), 0.0);
        assert!(!iter.is_done());
    }

    #[test]
    fn test_distance_iterator() {
        let mut iter = TrajectoryIterator::new(DistanceView::new(waypoints()));
        let length = iter.view().last_interpolant();

        assert_eq!(iter.advance(12.0).state, Translation2::new(12.0, 0.0));
        assert_eq!(iter.sample().index_floor, 0);
        assert_eq!(iter.sample().index_ceil, 1);

        iter.advance(2.0 * length);
        assert_eq!(iter.progress(), length);
        assert_eq!(iter.remaining_progress(), 0.0);
        assert!(iter.is_done());
        assert_eq!(iter.trajectory().len(), 4);
    }
}
