//! Trajectory container

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::TrajectoryError;
use crate::geom::{Interpolable, ToCsv, EPSILON};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Ordered, non-empty sequence of states.
#[derive(Debug, Clone)]
pub struct Trajectory<S> {
    points: Vec<TrajectoryPoint<S>>,
}

/// A state of a trajectory together with its index.
#[derive(Debug, Clone)]
pub struct TrajectoryPoint<S> {
    pub state: S,
    pub index: usize,
}

/// The result of sampling a trajectory: the (possibly interpolated) state
/// and the indices of the points either side of it.
#[derive(Debug, Clone)]
pub struct TrajectorySamplePoint<S> {
    pub state: S,
    pub index_floor: usize,
    pub index_ceil: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S> TrajectorySamplePoint<S> {
    /// Sample lying exactly on a trajectory point.
    pub fn from_point(point: &TrajectoryPoint<S>) -> Self
    where
        S: Clone,
    {
        Self {
            state: point.state.clone(),
            index_floor: point.index,
            index_ceil: point.index,
        }
    }
}

impl<S> Trajectory<S> {
    /// Build a trajectory from the given states.
    ///
    /// An empty list of states is rejected.
    pub fn new(states: Vec<S>) -> Result<Self, TrajectoryError> {
        if states.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        Ok(Self {
            points: states
                .into_iter()
                .enumerate()
                .map(|(index, state)| TrajectoryPoint { state, index })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false, construction rejects empty trajectories.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrajectoryPoint<S>] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&TrajectoryPoint<S>> {
        self.points.get(index)
    }

    pub fn state(&self, index: usize) -> Option<&S> {
        self.points.get(index).map(|p| &p.state)
    }

    pub fn first_state(&self) -> &S {
        &self.points[0].state
    }

    pub fn last_state(&self) -> &S {
        &self.points[self.points.len() - 1].state
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.points.iter().map(|p| &p.state)
    }

    /// Map every state, keeping the order.
    pub fn map<T, F: FnMut(&S) -> T>(&self, f: F) -> Trajectory<T> {
        Trajectory {
            points: self
                .states()
                .map(f)
                .enumerate()
                .map(|(index, state)| TrajectoryPoint { state, index })
                .collect(),
        }
    }
}

impl<S: Interpolable> Trajectory<S> {
    /// Sample at a fractional index, clamped to the ends.
    pub fn interpolated(&self, index: f64) -> TrajectorySamplePoint<S> {
        let last = self.points.len() - 1;

        if index.is_nan() || index <= 0.0 {
            return TrajectorySamplePoint::from_point(&self.points[0]);
        }
        if index >= last as f64 {
            return TrajectorySamplePoint::from_point(&self.points[last]);
        }

        let i = index.floor() as usize;
        let frac = index - i as f64;

        if frac <= EPSILON {
            TrajectorySamplePoint::from_point(&self.points[i])
        } else if frac >= 1.0 - EPSILON {
            TrajectorySamplePoint::from_point(&self.points[i + 1])
        } else {
            TrajectorySamplePoint {
                state: self.points[i].state.interpolate(&self.points[i + 1].state, frac),
                index_floor: i,
                index_ceil: i + 1,
            }
        }
    }
}

impl<S: ToCsv> Trajectory<S> {
    /// One line per state, in the state's CSV field order.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for point in &self.points {
            out.push_str(&point.state.to_csv());
            out.push('\n');
        }
        out
    }
}
