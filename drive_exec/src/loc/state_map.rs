//! Time indexed history of robot state estimates

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use ordered_float::NotNan;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

// Internal
use super::StateMapError;
use crate::geom::{Interpolable, Pose2, Twist2};
use util::maths::interpolate;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single estimate of the robot's state.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RobotState {
    pub timestamp_s: f64,

    pub pose: Pose2,

    /// Motion observed since the previous estimate
    pub measured_velocity: Twist2,

    /// Expected motion per second from this estimate onwards
    pub predicted_velocity: Twist2,
}

/// A capped history of robot states, keyed by timestamp.
///
/// One map is kept per estimator. A single producer appends while any number
/// of readers query; the lock is only held to copy states in or out. Once
/// full the oldest state is evicted on every append.
#[derive(Debug)]
pub struct RobotStateMap {
    inner: RwLock<StateMapInner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct StateMapInner {
    states: BTreeMap<NotNan<f64>, RobotState>,
    distance_driven_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RobotState {
    pub fn new(
        timestamp_s: f64,
        pose: Pose2,
        measured_velocity: Twist2,
        predicted_velocity: Twist2,
    ) -> Self {
        Self {
            timestamp_s,
            pose,
            measured_velocity,
            predicted_velocity,
        }
    }
}

impl Interpolable for RobotState {
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        Self::new(
            interpolate(self.timestamp_s, other.timestamp_s, x),
            self.pose.interpolate(&other.pose, x),
            self.measured_velocity.interpolate(&other.measured_velocity, x),
            self.predicted_velocity.interpolate(&other.predicted_velocity, x),
        )
    }

    fn distance(&self, other: &Self) -> f64 {
        self.pose.distance(&other.pose)
    }
}

impl RobotStateMap {
    /// Create an empty map holding at most `capacity` states (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(StateMapInner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a new state, evicting the oldest if the map is full.
    ///
    /// The distance driven is accumulated from the latest state's position.
    pub fn append(
        &self,
        timestamp_s: f64,
        pose: Pose2,
        measured_velocity: Twist2,
        predicted_velocity: Twist2,
    ) -> Result<(), StateMapError> {
        let key = NotNan::new(timestamp_s).map_err(|_| StateMapError::NanTimestamp)?;
        let state = RobotState::new(timestamp_s, pose, measured_velocity, predicted_velocity);

        let mut inner = self.inner.write();

        if let Some((_, latest)) = inner.states.iter().next_back() {
            let step = latest.pose.translation().distance(&pose.translation());
            inner.distance_driven_m += step;
        }

        inner.states.insert(key, state);

        while inner.states.len() > self.capacity {
            let oldest = match inner.states.keys().next() {
                Some(k) => *k,
                None => break,
            };
            inner.states.remove(&oldest);
        }

        Ok(())
    }

    /// The most recent state.
    pub fn latest(&self) -> Option<RobotState> {
        self.inner.read().states.values().next_back().copied()
    }

    /// The state at `timestamp_s`, interpolated between the bracketing
    /// states and clamped to the oldest and newest.
    pub fn state_at(&self, timestamp_s: f64) -> Option<RobotState> {
        let key = NotNan::new(timestamp_s).ok()?;
        let inner = self.inner.read();

        let before = inner.states.range(..=key).next_back().map(|(_, s)| *s);
        let after = inner.states.range(key..).next().map(|(_, s)| *s);

        match (before, after) {
            (Some(b), Some(a)) => {
                let span = a.timestamp_s - b.timestamp_s;
                if span <= 0.0 {
                    Some(b)
                } else {
                    Some(b.interpolate(&a, (timestamp_s - b.timestamp_s) / span))
                }
            }
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// The pose at `timestamp_s`, see [`RobotStateMap::state_at`].
    pub fn pose_at(&self, timestamp_s: f64) -> Option<Pose2> {
        self.state_at(timestamp_s).map(|s| s.pose)
    }

    /// Where the robot is expected to be `lookahead_s` after the latest state,
    /// moving at its predicted velocity.
    pub fn predicted_pose(&self, lookahead_s: f64) -> Option<Pose2> {
        self.latest().map(|s| {
            s.pose
                .transform_by(&Pose2::exp(&s.predicted_velocity.scaled(lookahead_s)))
        })
    }

    /// Total distance between successive states since the last reset.
    pub fn distance_driven(&self) -> f64 {
        self.inner.read().distance_driven_m
    }

    pub fn reset_distance_driven(&self) {
        self.inner.write().distance_driven_m = 0.0;
    }

    /// Clear the history and start again from `pose` at rest.
    pub fn reset(&self, timestamp_s: f64, pose: Pose2) -> Result<(), StateMapError> {
        let key = NotNan::new(timestamp_s).map_err(|_| StateMapError::NanTimestamp)?;

        let mut inner = self.inner.write();
        inner.states.clear();
        inner.distance_driven_m = 0.0;
        inner.states.insert(
            key,
            RobotState::new(timestamp_s, pose, Twist2::identity(), Twist2::identity()),
        );

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().states.is_empty()
    }
}
