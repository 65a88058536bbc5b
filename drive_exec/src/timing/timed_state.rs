//! State stamped with time, velocity and acceleration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::geom::{
    fmt_csv, HasCurvature, HasPose, HasTranslation, Interpolable, Pose2, ToCsv, Translation2,
    EPSILON,
};
use crate::trajectory::Timed;
use util::maths::{epsilon_equals, interpolate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A state of a time-parameterised trajectory.
///
/// `acceleration` is the constant acceleration applied from this state until
/// the next one.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct TimedState<S> {
    state: S,
    t: f64,
    velocity: f64,
    acceleration: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S> TimedState<S> {
    pub fn new(state: S, t: f64, velocity: f64, acceleration: f64) -> Self {
        Self {
            state,
            t,
            velocity,
            acceleration,
        }
    }

    /// A state at rest at time zero.
    pub fn from_state(state: S) -> Self {
        Self::new(state, 0.0, 0.0, 0.0)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub(crate) fn set_acceleration(&mut self, acceleration: f64) {
        self.acceleration = acceleration;
    }
}

impl<S: Interpolable> Interpolable for TimedState<S> {
    /// Kinematic interpolation: the time is blended linearly and the state is
    /// moved by the distance travelled under this state's acceleration.
    fn interpolate(&self, other: &Self, x: f64) -> Self {
        let new_t = interpolate(self.t, other.t, x);
        let delta_t = new_t - self.t;

        if delta_t < 0.0 {
            return other.interpolate(self, 1.0 - x);
        }

        let reversing = self.velocity < 0.0
            || (epsilon_equals(self.velocity, 0.0, EPSILON) && self.acceleration < 0.0);
        let new_v = self.velocity + self.acceleration * delta_t;
        let new_s = if reversing { -1.0 } else { 1.0 }
            * (self.velocity * delta_t + 0.5 * self.acceleration * delta_t * delta_t);

        let distance = self.state.distance(&other.state);
        let fraction = if distance < EPSILON {
            x
        } else {
            new_s / distance
        };

        Self::new(
            self.state.interpolate(&other.state, fraction),
            new_t,
            new_v,
            self.acceleration,
        )
    }

    fn distance(&self, other: &Self) -> f64 {
        self.state.distance(&other.state)
    }
}

impl<S> Timed for TimedState<S> {
    fn time_s(&self) -> f64 {
        self.t
    }
}

impl<S: HasTranslation> HasTranslation for TimedState<S> {
    fn translation(&self) -> Translation2 {
        self.state.translation()
    }
}

impl<S: HasPose> HasPose for TimedState<S> {
    fn pose(&self) -> Pose2 {
        self.state.pose()
    }
}

impl<S: HasCurvature> HasCurvature for TimedState<S> {
    fn curvature(&self) -> f64 {
        self.state.curvature()
    }

    fn dcurvature_ds(&self) -> f64 {
        self.state.dcurvature_ds()
    }
}

impl<S: ToCsv> ToCsv for TimedState<S> {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{}",
            self.state.to_csv(),
            fmt_csv(self.t),
            fmt_csv(self.velocity),
            fmt_csv(self.acceleration)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interpolate_accelerating() {
        let start = TimedState::new(Pose2::from_xy_deg(0.0, 0.0, 0.0), 0.0, 0.0, 1.0);
        let end = TimedState::new(Pose2::from_xy_deg(0.5, 0.0, 0.0), 1.0, 1.0, 0.0);

        assert_eq!(start.interpolate(&end, 0.0).state, start.state);
        assert_eq!(start.interpolate(&end, 1.0).state, end.state);

        // Halfway in time is a quarter of the way in distance
        let mid = start.interpolate(&end, 0.5);
        assert!((mid.t() - 0.5).abs() < 1e-12);
        assert!((mid.velocity() - 0.5).abs() < 1e-12);
        assert_eq!(mid.acceleration(), 1.0);
        assert_eq!(*mid.state(), Pose2::from_xy_deg(0.125, 0.0, 0.0));

        // Interpolating backwards goes through the later state
        let back = end.interpolate(&start, 0.5);
        assert!((back.t() - 0.5).abs() < 1e-12);
        assert_eq!(*back.state(), Pose2::from_xy_deg(0.125, 0.0, 0.0));
    }

    #[test]
    fn test_interpolate_reversing() {
        let start = TimedState::new(Pose2::from_xy_deg(0.0, 0.0, 0.0), 0.0, -1.0, 0.0);
        let end = TimedState::new(Pose2::from_xy_deg(-2.0, 0.0, 0.0), 2.0, -1.0, 0.0);

        let mid = start.interpolate(&end, 0.25);
        assert_eq!(*mid.state(), Pose2::from_xy_deg(-0.5, 0.0, 0.0));
        assert_eq!(mid.velocity(), -1.0);
    }

    #[test]
    fn test_csv() {
        let s = TimedState::new(Translation2::new(1.0, 2.0), 0.5, 1.25, -0.5);
        assert_eq!(s.to_csv(), "1.000,2.000,0.500,1.250,-0.500");
        assert_eq!(s.time_s(), 0.5);
    }
}
