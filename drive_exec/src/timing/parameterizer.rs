//! Time parameterisation of geometric paths
//!
//! The path is resampled at a fixed spacing, then:
//!  1. A forward pass bounds the velocity at each sample by the limits, the
//!     constraints and what is reachable from the previous sample under the
//!     acceleration window. Where a later window is tighter than what was
//!     assumed the previous sample's acceleration is reduced and the sample
//!     recomputed.
//!  2. A backward pass does the same from the end using the deceleration
//!     bound.
//!  3. The profile is integrated forward to find the time of each sample and
//!     the constant acceleration between samples.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Deserialize;

// Internal
use super::{TimedState, TimingConstraint, TimingError};
use crate::geom::Interpolable;
use crate::trajectory::{DistanceView, Trajectory, TrajectoryView};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Scalar bounds on the profile.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct TimingLimits {
    /// Velocity at the first sample.
    #[serde(default)]
    pub start_vel_ms: f64,

    /// Velocity at the last sample.
    #[serde(default)]
    pub end_vel_ms: f64,

    pub max_vel_ms: f64,

    /// Bound on the magnitude of acceleration.
    pub max_accel_mss: f64,
}

/// Working bounds of one sample.
#[derive(Debug, Copy, Clone)]
struct ConstrainedState {
    distance: f64,
    max_velocity: f64,
    min_acceleration: f64,
    max_acceleration: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Resample `distance_view` every `step_size_m` and assign a time, velocity
/// and acceleration to each sample.
///
/// With `reverse` set the path is driven backwards: velocities and
/// accelerations in the output are negated, and constraints are queried with
/// the negated velocity.
pub fn time_parameterize_trajectory<S: Interpolable>(
    reverse: bool,
    distance_view: &DistanceView<S>,
    step_size_m: f64,
    constraints: &[&dyn TimingConstraint<S>],
    limits: &TimingLimits,
) -> Result<Trajectory<TimedState<S>>, TimingError> {
    if !(step_size_m > 0.0) {
        return Err(TimingError::NonPositiveStep(step_size_m));
    }

    let length = distance_view.last_interpolant();
    let num_states = (length / step_size_m + 1.0).ceil() as usize;
    let states: Vec<S> = (0..num_states)
        .map(|i| {
            distance_view
                .sample((i as f64 * step_size_m).min(length))
                .state
        })
        .collect();

    debug!(
        "Time parameterising {:.3} m path with {} samples",
        length,
        states.len()
    );

    time_parameterize_states(reverse, states, constraints, limits)
}

/// Time parameterise an explicit list of states.
pub fn time_parameterize_states<S: Interpolable>(
    reverse: bool,
    states: Vec<S>,
    constraints: &[&dyn TimingConstraint<S>],
    limits: &TimingLimits,
) -> Result<Trajectory<TimedState<S>>, TimingError> {
    if states.is_empty() {
        return Err(TimingError::NoStates);
    }

    let direction = if reverse { -1.0 } else { 1.0 };
    let n = states.len();
    let mut constrained: Vec<ConstrainedState> = Vec::with_capacity(n);

    // Forward pass
    let mut predecessor = ConstrainedState {
        distance: 0.0,
        max_velocity: limits.start_vel_ms,
        min_acceleration: -limits.max_accel_mss,
        max_acceleration: limits.max_accel_mss,
    };

    for i in 0..n {
        let ds = if i == 0 {
            0.0
        } else {
            states[i].distance(&states[i - 1])
        };

        let mut current = ConstrainedState {
            distance: predecessor.distance + ds,
            max_velocity: 0.0,
            min_acceleration: -limits.max_accel_mss,
            max_acceleration: limits.max_accel_mss,
        };

        loop {
            // Reachable velocity under the predecessor's acceleration,
            // vf = sqrt(vi^2 + 2*a*d)
            current.max_velocity = limits.max_vel_ms.min(
                (predecessor.max_velocity * predecessor.max_velocity
                    + 2.0 * predecessor.max_acceleration * ds)
                    .sqrt(),
            );
            if current.max_velocity.is_nan() {
                return Err(TimingError::NanVelocity(i));
            }
            current.min_acceleration = -limits.max_accel_mss;
            current.max_acceleration = limits.max_accel_mss;

            for constraint in constraints {
                current.max_velocity = current.max_velocity.min(constraint.max_velocity(&states[i]));
            }
            if current.max_velocity < 0.0 {
                return Err(TimingError::NegativeVelocityBound(i));
            }

            apply_acceleration_constraints(&mut current, &states[i], constraints, direction, i)?;

            if ds < EPSILON {
                break;
            }

            // If this sample's window is tighter than what the predecessor
            // assumed, tighten the predecessor and try again
            let actual_acceleration = (current.max_velocity * current.max_velocity
                - predecessor.max_velocity * predecessor.max_velocity)
                / (2.0 * ds);

            if current.max_acceleration < actual_acceleration - EPSILON {
                predecessor.max_acceleration = current.max_acceleration;
            } else {
                if actual_acceleration > predecessor.min_acceleration + EPSILON {
                    predecessor.max_acceleration = actual_acceleration;
                }
                // Anything below the predecessor's minimum is repaired in the
                // backward pass
                break;
            }
        }

        if i > 0 {
            constrained[i - 1] = predecessor;
        }
        constrained.push(current);
        predecessor = current;
    }

    // Backward pass
    let mut successor = ConstrainedState {
        distance: constrained[n - 1].distance,
        max_velocity: limits.end_vel_ms,
        min_acceleration: -limits.max_accel_mss,
        max_acceleration: limits.max_accel_mss,
    };

    for i in (0..n).rev() {
        let mut current = constrained[i];

        // Negative, walking backwards
        let ds = current.distance - successor.distance;

        loop {
            let new_max_velocity = (successor.max_velocity * successor.max_velocity
                + 2.0 * successor.min_acceleration * ds)
                .sqrt();
            if new_max_velocity >= current.max_velocity {
                break;
            }

            current.max_velocity = new_max_velocity;
            if current.max_velocity.is_nan() {
                return Err(TimingError::NanVelocity(i));
            }

            apply_acceleration_constraints(&mut current, &states[i], constraints, direction, i)?;

            if ds > EPSILON {
                break;
            }

            let actual_acceleration = (current.max_velocity * current.max_velocity
                - successor.max_velocity * successor.max_velocity)
                / (2.0 * ds);

            if current.min_acceleration > actual_acceleration + EPSILON {
                successor.min_acceleration = current.min_acceleration;
            } else {
                successor.min_acceleration = actual_acceleration;
                break;
            }
        }

        if i < n - 1 {
            constrained[i + 1] = successor;
        }
        constrained[i] = current;
        successor = current;
    }

    // Integrate forward in time
    let mut timed_states: Vec<TimedState<S>> = Vec::with_capacity(n);
    let mut t = 0.0;
    let mut s = 0.0;
    let mut v = 0.0;

    for (i, (state, c)) in states.into_iter().zip(constrained.iter()).enumerate() {
        let ds = c.distance - s;
        let mut accel = 0.0;
        let mut dt = 0.0;

        if i > 0 {
            accel = (c.max_velocity * c.max_velocity - v * v) / (2.0 * ds);
            timed_states[i - 1].set_acceleration(direction * accel);

            if accel.abs() > EPSILON {
                dt = (c.max_velocity - v) / accel;
            } else if v.abs() > EPSILON {
                dt = ds / v;
            } else {
                return Err(TimingError::Stalled(i));
            }
        }

        t += dt;
        if !t.is_finite() {
            return Err(TimingError::InvalidTime(i));
        }

        v = c.max_velocity;
        s = c.distance;
        timed_states.push(TimedState::new(state, t, direction * v, direction * accel));
    }

    Ok(Trajectory::new(timed_states)?)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Narrow the acceleration window of `current` by every constraint.
fn apply_acceleration_constraints<S>(
    current: &mut ConstrainedState,
    state: &S,
    constraints: &[&dyn TimingConstraint<S>],
    direction: f64,
    index: usize,
) -> Result<(), TimingError> {
    for constraint in constraints {
        let window = constraint.min_max_acceleration(state, direction * current.max_velocity);
        if !window.is_valid() {
            return Err(TimingError::InvalidAcceleration(index));
        }

        // Driving backwards the window is mirrored
        let (min, max) = if direction < 0.0 {
            (-window.max_accel_mss, -window.min_accel_mss)
        } else {
            (window.min_accel_mss, window.max_accel_mss)
        };
        current.min_acceleration = current.min_acceleration.max(min);
        current.max_acceleration = current.max_acceleration.min(max);
    }

    if current.min_acceleration > current.max_acceleration {
        return Err(TimingError::InvalidAcceleration(index));
    }

    Ok(())
}
