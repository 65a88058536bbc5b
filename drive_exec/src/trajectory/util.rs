//! Utilities for building and transforming trajectories

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::{Trajectory, TrajectoryError};
use crate::geom::{HasCurvature, HasPose, Pose2, Pose2WithCurvature, Twist2, EPSILON};
use crate::spline::{
    optimize_splines, sampler::sample_splines, OptimizerParams, QuinticHermiteSpline,
    SamplerParams, Spline,
};
use crate::timing::TimedState;
use crate::traj_ctrl::PathFollower;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Sample a chain of splines into a path.
pub fn trajectory_from_splines<S: Spline>(
    splines: &[S],
    params: &SamplerParams,
) -> Result<Trajectory<Pose2WithCurvature>, TrajectoryError> {
    Trajectory::new(sample_splines(splines, params))
}

/// Join the waypoints with quintic splines, optimise the joints and sample
/// the result into a path.
pub fn trajectory_from_spline_waypoints(
    waypoints: &[Pose2],
    sampler_params: &SamplerParams,
    optimizer_params: &OptimizerParams,
) -> Result<Trajectory<Pose2WithCurvature>, TrajectoryError> {
    if waypoints.len() < 2 {
        return Err(TrajectoryError::NotEnoughWaypoints(waypoints.len()));
    }

    let mut splines: Vec<QuinticHermiteSpline> = waypoints
        .windows(2)
        .map(|w| QuinticHermiteSpline::new(&w[0], &w[1]))
        .collect();

    let cost = optimize_splines(&mut splines, optimizer_params);
    debug!(
        "Optimised {} splines, sum of squared dk/ds: {:.6}",
        splines.len(),
        cost
    );

    trajectory_from_splines(&splines, sampler_params)
}

/// Reflect a path in the x axis.
pub fn mirror(trajectory: &Trajectory<Pose2WithCurvature>) -> Trajectory<Pose2WithCurvature> {
    trajectory.map(|s| s.mirror())
}

/// Reflect a timed path in the x axis, keeping its timing.
pub fn mirror_timed(
    trajectory: &Trajectory<TimedState<Pose2WithCurvature>>,
) -> Trajectory<TimedState<Pose2WithCurvature>> {
    trajectory.map(|s| {
        TimedState::new(s.state().mirror(), s.t(), s.velocity(), s.acceleration())
    })
}

/// Build a path by simulating a follower from `start` until it reports done.
///
/// Each step moves at most `step_size_m` along the commanded arc, and the
/// curvature may change by at most `dcurvature_limit` per metre travelled.
pub fn trajectory_from_path_follower<F: PathFollower + ?Sized>(
    follower: &mut F,
    start: Pose2WithCurvature,
    step_size_m: f64,
    dcurvature_limit: f64,
    max_steps: usize,
) -> Result<Trajectory<Pose2WithCurvature>, TrajectoryError> {
    let mut samples = vec![start];
    let mut current = start;
    let mut steps = 0;

    while !follower.is_done() {
        if steps >= max_steps {
            return Err(TrajectoryError::FollowerDidNotFinish(steps));
        }
        steps += 1;

        let command = follower.steer(&current.pose());
        if command.dx.abs() < EPSILON {
            return Err(TrajectoryError::FollowerStalled(steps));
        }

        let ds = command.dx.signum() * step_size_m.min(command.dx.abs());
        let max_dk = dcurvature_limit * ds.abs();
        let curvature = (command.dtheta / command.dx)
            .min(current.curvature() + max_dk)
            .max(current.curvature() - max_dk);
        let dcurvature_ds = (curvature - current.curvature()) / ds.abs();

        let pose = current
            .pose()
            .transform_by(&Pose2::exp(&Twist2::new(ds, 0.0, ds * curvature)));

        current = Pose2WithCurvature::new(pose, curvature, dcurvature_ds);
        samples.push(current);
    }

    debug!("Path follower finished after {} steps", steps);

    Trajectory::new(samples)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::{HasTranslation, Interpolable};

    #[test]
    fn test_from_spline_waypoints() {
        assert!(matches!(
            trajectory_from_spline_waypoints(
                &[Pose2::identity()],
                &SamplerParams::default(),
                &OptimizerParams::default()
            ),
            Err(TrajectoryError::NotEnoughWaypoints(1))
        ));

        let waypoints = [
            Pose2::from_xy_deg(0.0, 0.0, 0.0),
            Pose2::from_xy_deg(2.0, 1.0, 45.0),
            Pose2::from_xy_deg(3.0, 3.0, 90.0),
        ];
        let traj = trajectory_from_spline_waypoints(
            &waypoints,
            &SamplerParams::default(),
            &OptimizerParams::default(),
        )
        .unwrap();

        assert_eq!(traj.first_state().pose(), waypoints[0]);
        assert_eq!(traj.last_state().pose(), waypoints[2]);

        // The middle waypoint is one of the samples
        assert!(traj.states().any(|s| s.pose() == waypoints[1]));
    }

    #[test]
    fn test_straight_spline_length() {
        let traj = trajectory_from_spline_waypoints(
            &[Pose2::identity(), Pose2::from_xy_deg(3.0, 0.0, 0.0)],
            &SamplerParams::default(),
            &OptimizerParams::default(),
        )
        .unwrap();

        let total_dx: f64 = traj
            .points()
            .windows(2)
            .map(|w| w[0].state.pose().inverse().transform_by(&w[1].state.pose()).log().dx)
            .sum();
        assert!((total_dx - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mirror() {
        let traj = Trajectory::new(vec![
            Pose2WithCurvature::new(Pose2::from_xy_deg(0.0, 1.0, 30.0), 0.5, 0.1),
            Pose2WithCurvature::new(Pose2::from_xy_deg(1.0, 2.0, 60.0), -0.5, 0.0),
        ])
        .unwrap();
        let mirrored = mirror(&traj);

        assert_eq!(mirrored.len(), 2);
        assert_eq!(mirrored.first_state().pose(), Pose2::from_xy_deg(0.0, -1.0, -30.0));
        assert_eq!(mirrored.first_state().curvature(), -0.5);
        assert_eq!(mirrored.last_state().curvature(), 0.5);

        let timed = traj.map(|s| TimedState::new(*s, 1.0, 2.0, 3.0));
        let mirrored = mirror_timed(&timed);
        assert_eq!(mirrored.last_state().state().translation().y(), -2.0);
        assert_eq!(mirrored.last_state().t(), 1.0);
        assert_eq!(mirrored.last_state().velocity(), 2.0);
        assert_eq!(mirrored.last_state().acceleration(), 3.0);
    }

    /// Steps along a constant-curvature arc a fixed number of times.
    struct FixedSteps {
        step_m: f64,
        curvature: f64,
        steps_left: usize,
    }

    impl PathFollower for FixedSteps {
        fn steer(&mut self, _pose: &Pose2) -> Twist2 {
            self.steps_left = self.steps_left.saturating_sub(1);
            Twist2::new(self.step_m, 0.0, self.step_m * self.curvature)
        }

        fn is_done(&self) -> bool {
            self.steps_left == 0
        }
    }

    #[test]
    fn test_from_path_follower() {
        let mut follower = FixedSteps {
            step_m: 0.1,
            curvature: 0.0,
            steps_left: 10,
        };
        let traj =
            trajectory_from_path_follower(&mut follower, Pose2WithCurvature::identity(), 0.1, 1.0, 100)
                .unwrap();

        assert_eq!(traj.len(), 11);
        assert!((traj.last_state().translation().x() - 1.0).abs() < 1e-9);
        for w in traj.points().windows(2) {
            assert!(w[0].state.distance(&w[1].state) <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn test_from_path_follower_limits() {
        let mut follower = FixedSteps {
            step_m: 0.1,
            curvature: 1.0,
            steps_left: 100,
        };
        let result =
            trajectory_from_path_follower(&mut follower, Pose2WithCurvature::identity(), 0.1, 2.0, 20);
        assert!(matches!(result, Err(TrajectoryError::FollowerDidNotFinish(20))));

        // Curvature ramps up by at most 2.0 per metre
        let mut follower = FixedSteps {
            step_m: 0.1,
            curvature: 1.0,
            steps_left: 8,
        };
        let traj =
            trajectory_from_path_follower(&mut follower, Pose2WithCurvature::identity(), 0.1, 2.0, 100)
                .unwrap();
        for w in traj.points().windows(2) {
            assert!((w[1].state.curvature() - w[0].state.curvature()).abs() <= 0.2 + 1e-9);
        }
        assert!((traj.last_state().curvature() - 1.0).abs() < 1e-9);

        let mut stalled = FixedSteps {
            step_m: 0.0,
            curvature: 0.0,
            steps_left: 3,
        };
        assert!(matches!(
            trajectory_from_path_follower(&mut stalled, Pose2WithCurvature::identity(), 0.1, 2.0, 100),
            Err(TrajectoryError::FollowerStalled(1))
        ));
    }
}
