//! Drive motion planner
//!
//! Generates timed trajectories from waypoints and follows them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::{FollowerType, Params, PursuitArc, TrajControllers, TrajCtrlError};
use crate::geom::{
    fmt_csv, HasCurvature, HasPose, HasTranslation, Interpolable, Pose2, Pose2WithCurvature,
    Rotation2, ToCsv, Translation2, EPSILON,
};
use crate::physics::{ChassisState, DifferentialDrive, DriveDynamics};
use crate::timing::{
    time_parameterize_trajectory, DifferentialDriveDynamicsConstraint, TimedState,
    TimingConstraint, TimingLimits,
};
use crate::trajectory::{
    util::trajectory_from_spline_waypoints, DistanceView, TimedView, Trajectory,
    TrajectoryIterator,
};
use util::{archive::Archiver, maths::epsilon_equals, module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory timed for the drive.
pub type TimedPath = Trajectory<TimedState<Pose2WithCurvature>>;

/// A cursor over a timed path, advanced by time.
pub type TimedPathIterator =
    TrajectoryIterator<TimedState<Pose2WithCurvature>, TimedView<TimedState<Pose2WithCurvature>>>;

/// Plans and follows trajectories for a differential drive.
pub struct DriveMotionPlanner {
    params: Params,

    model: DifferentialDrive,

    follower_type: FollowerType,

    controllers: TrajControllers,

    current_trajectory: Option<TimedPathIterator>,

    /// True if the current trajectory is driven backwards
    is_reversed: bool,

    /// Time of the previous update, `None` until the first update of a
    /// trajectory
    last_time_s: Option<f64>,

    setpoint: TimedState<Pose2WithCurvature>,

    /// The setpoint in the robot frame
    error: Pose2,

    output: Output,

    prev_velocity: ChassisState,

    dt_s: f64,

    arch: Archiver,
}

/// Wheel commands produced by the planner.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct Output {
    /// rad/s
    pub left_velocity_rads: f64,

    /// rad/s
    pub right_velocity_rads: f64,

    /// rad/s^2
    pub left_accel_radss: f64,

    /// rad/s^2
    pub right_accel_radss: f64,

    /// V
    pub left_feedforward_v: f64,

    /// V
    pub right_feedforward_v: f64,
}

/// Input to the cyclic processing.
#[derive(Debug, Copy, Clone)]
pub struct InputData {
    pub time_s: f64,

    /// The current estimate of the robot's pose
    pub pose: Pose2,
}

#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub is_done: bool,
    pub progress_s: f64,
    pub remaining_s: f64,
    pub error_x_m: f64,
    pub error_y_m: f64,
    pub error_heading_rad: f64,
}

/// One row of the planner's archive.
#[derive(Serialize)]
struct ArchiveRecord {
    time_s: f64,
    left_velocity_rads: f64,
    right_velocity_rads: f64,
    left_feedforward_v: f64,
    right_feedforward_v: f64,
    setpoint_t_s: f64,
    setpoint_x_m: f64,
    setpoint_y_m: f64,
    setpoint_heading_rad: f64,
    setpoint_curvature_radm: f64,
    setpoint_velocity_ms: f64,
    setpoint_accel_mss: f64,
    error_x_m: f64,
    error_y_m: f64,
    error_heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveMotionPlanner {
    fn default() -> Self {
        Self::with_model(Params::default(), DifferentialDrive::default())
    }
}

impl State for DriveMotionPlanner {
    type Params = Params;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = Output;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the planner.
    ///
    /// Expected init data is the parameters and the session, in which the
    /// planner's archive is created.
    fn init(&mut self, params: Self::Params, session: &Session) -> Result<(), Self::InitError> {
        let model = DifferentialDrive::from_params(&params.drive_model)?;
        let arch = Archiver::from_path(session, "drive_motion_planner.csv")?;

        *self = Self::with_model(params, model);
        self.arch = arch;

        info!("Drive motion planner initialised, follower: {:?}", self.follower_type);

        Ok(())
    }

    /// Advance along the current trajectory.
    ///
    /// Unlike [`DriveMotionPlanner::update`], which commands nothing when no
    /// trajectory is set, this returns an error in that case.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if self.current_trajectory.is_none() {
            return Err(TrajCtrlError::NoTrajectory);
        }

        let output = self.update(input_data.time_s, &input_data.pose);

        let setpoint = self.setpoint.state();
        self.arch.serialise(ArchiveRecord {
            time_s: input_data.time_s,
            left_velocity_rads: output.left_velocity_rads,
            right_velocity_rads: output.right_velocity_rads,
            left_feedforward_v: output.left_feedforward_v,
            right_feedforward_v: output.right_feedforward_v,
            setpoint_t_s: self.setpoint.t(),
            setpoint_x_m: setpoint.translation().x(),
            setpoint_y_m: setpoint.translation().y(),
            setpoint_heading_rad: setpoint.pose().rotation().radians(),
            setpoint_curvature_radm: setpoint.curvature(),
            setpoint_velocity_ms: self.setpoint.velocity(),
            setpoint_accel_mss: self.setpoint.acceleration(),
            error_x_m: self.error.translation().x(),
            error_y_m: self.error.translation().y(),
            error_heading_rad: self.error.rotation().radians(),
        })?;

        Ok((output, self.status_report()))
    }
}

impl DriveMotionPlanner {
    /// Create a new planner, validating the drive model.
    pub fn new(params: Params) -> Result<Self, TrajCtrlError> {
        let model = DifferentialDrive::from_params(&params.drive_model)?;
        Ok(Self::with_model(params, model))
    }

    fn with_model(params: Params, model: DifferentialDrive) -> Self {
        Self {
            follower_type: params.follower_type,
            controllers: TrajControllers::new(&params),
            params,
            model,
            current_trajectory: None,
            is_reversed: false,
            last_time_s: None,
            setpoint: TimedState::from_state(Pose2WithCurvature::identity()),
            error: Pose2::identity(),
            output: Output::default(),
            prev_velocity: ChassisState::default(),
            dt_s: 0.0,
            arch: Archiver::default(),
        }
    }

    pub fn follower_type(&self) -> FollowerType {
        self.follower_type
    }

    pub fn set_follower_type(&mut self, follower_type: FollowerType) {
        self.follower_type = follower_type;
    }

    pub fn model(&self) -> &DifferentialDrive {
        &self.model
    }

    /// Build a timed trajectory through the waypoints.
    ///
    /// With `reversed` set the waypoint headings are the direction the robot
    /// faces, and the path is driven backwards. On top of the given
    /// constraints no wheel may need more than `max_voltage`.
    pub fn generate_trajectory(
        &self,
        reversed: bool,
        waypoints: &[Pose2],
        constraints: &[&dyn TimingConstraint<Pose2WithCurvature>],
        limits: &TimingLimits,
        max_voltage: f64,
    ) -> Result<TimedPath, TrajCtrlError> {
        let flip = Pose2::from_rotation(Rotation2::new(-1.0, 0.0, false));

        // Splines are built facing the direction of travel
        let waypoints: Vec<Pose2> = if reversed {
            waypoints.iter().map(|w| w.transform_by(&flip)).collect()
        } else {
            waypoints.to_vec()
        };

        let mut path = trajectory_from_spline_waypoints(
            &waypoints,
            &self.params.sampler,
            &self.params.optimizer,
        )?;

        if reversed {
            path = path.map(|s| {
                Pose2WithCurvature::new(
                    s.pose().transform_by(&flip),
                    -s.curvature(),
                    s.dcurvature_ds(),
                )
            });
        }

        let drive_constraint = DifferentialDriveDynamicsConstraint::new(self.model, max_voltage);
        let mut all_constraints: Vec<&dyn TimingConstraint<Pose2WithCurvature>> =
            Vec::with_capacity(constraints.len() + 1);
        all_constraints.push(&drive_constraint);
        all_constraints.extend_from_slice(constraints);

        let timed = time_parameterize_trajectory(
            reversed,
            &DistanceView::new(path),
            self.params.timing_step_m,
            &all_constraints,
            limits,
        )?;

        debug!(
            "Generated {} trajectory with {} states lasting {:.3} s",
            if reversed { "reversed" } else { "forward" },
            timed.len(),
            timed.last_state().t()
        );

        Ok(timed)
    }

    /// Start following a trajectory.
    ///
    /// The direction of travel is taken from the sign of the first non-zero
    /// velocity. The follower state is reset.
    pub fn set_trajectory(&mut self, trajectory: TimedPathIterator) {
        self.setpoint = trajectory.state().clone();

        if let Some(v) = trajectory
            .trajectory()
            .states()
            .map(|s| s.velocity())
            .find(|v| v.abs() > EPSILON)
        {
            self.is_reversed = v < 0.0;
        }

        self.current_trajectory = Some(trajectory);
        self.reset();
    }

    /// Clear the error, output and timing state.
    pub fn reset(&mut self) {
        self.error = Pose2::identity();
        self.output = Output::default();
        self.last_time_s = None;
        self.prev_velocity = ChassisState::default();
        self.dt_s = 0.0;
        self.controllers.reset();
    }

    /// Advance the setpoint to `time_s` and compute the wheel commands for a
    /// robot at `pose`.
    ///
    /// Without a trajectory, or once it is done, the output is zero.
    pub fn update(&mut self, time_s: f64, pose: &Pose2) -> Output {
        let done = {
            let iterator = match self.current_trajectory.as_mut() {
                Some(i) => i,
                None => return Output::default(),
            };

            let last_time_s = *self.last_time_s.get_or_insert(time_s);
            self.dt_s = time_s - last_time_s;
            self.last_time_s = Some(time_s);

            self.setpoint = iterator.advance(self.dt_s).state;
            iterator.is_done()
        };

        if done {
            self.output = Output::default();
            return self.output;
        }

        let setpoint = *self.setpoint.state();
        let velocity = self.setpoint.velocity();
        let accel = self.setpoint.acceleration();
        let curvature = setpoint.curvature();

        let dynamics = self.model.solve_inverse_dynamics(
            &ChassisState::new(velocity, velocity * curvature),
            &ChassisState::new(
                accel,
                accel * curvature + velocity * velocity * setpoint.dcurvature_ds(),
            ),
        );

        self.error = pose.inverse().transform_by(&setpoint.pose());

        self.output = match self.follower_type {
            FollowerType::FeedforwardOnly => Output {
                left_velocity_rads: dynamics.wheel_velocity.left,
                right_velocity_rads: dynamics.wheel_velocity.right,
                left_accel_radss: dynamics.wheel_acceleration.left,
                right_accel_radss: dynamics.wheel_acceleration.right,
                left_feedforward_v: dynamics.voltage.left,
                right_feedforward_v: dynamics.voltage.right,
            },
            FollowerType::PurePursuit => self.update_pure_pursuit(dynamics, pose),
            FollowerType::Pid => self.update_pid(dynamics),
            FollowerType::NonlinearFeedback => self.update_nonlinear_feedback(dynamics),
        };

        self.output
    }

    /// True once the current trajectory has been followed to its end.
    pub fn is_done(&self) -> bool {
        self.current_trajectory
            .as_ref()
            .map(|i| i.is_done())
            .unwrap_or(false)
    }

    pub fn setpoint(&self) -> &TimedState<Pose2WithCurvature> {
        &self.setpoint
    }

    pub fn error(&self) -> &Pose2 {
        &self.error
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn is_reversed(&self) -> bool {
        self.is_reversed
    }

    pub fn status_report(&self) -> StatusReport {
        let (progress_s, remaining_s) = match &self.current_trajectory {
            Some(i) => (i.progress(), i.remaining_progress()),
            None => (0.0, 0.0),
        };

        StatusReport {
            is_done: self.is_done(),
            progress_s,
            remaining_s,
            error_x_m: self.error.translation().x(),
            error_y_m: self.error.translation().y(),
            error_heading_rad: self.error.rotation().radians(),
        }
    }

    /// The last output and setpoint as
    /// `left_vel,right_vel,left_ff_v,right_ff_v,<setpoint>`.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{}",
            fmt_csv(self.output.left_velocity_rads),
            fmt_csv(self.output.right_velocity_rads),
            fmt_csv(self.output.left_feedforward_v),
            fmt_csv(self.output.right_feedforward_v),
            self.setpoint.to_csv()
        )
    }

    /// Follow an arc to a point ahead on the trajectory, with feedback on
    /// the longitudinal error.
    fn update_pure_pursuit(&self, mut dynamics: DriveDynamics, pose: &Pose2) -> Output {
        let iterator = match &self.current_trajectory {
            Some(i) => i,
            None => return Output::default(),
        };

        let mut lookahead_time = self.params.lookahead_time_s;
        let mut lookahead = iterator.preview(lookahead_time).state;
        let mut lookahead_dist = self.setpoint.state().distance(lookahead.state());

        while lookahead_dist < self.params.min_lookahead_m
            && iterator.remaining_progress() > lookahead_time
        {
            lookahead_time += self.params.lookahead_search_dt_s;
            lookahead = iterator.preview(lookahead_time).state;
            lookahead_dist = self.setpoint.state().distance(lookahead.state());
        }

        // Near the end extend the last state along its heading
        if lookahead_dist < self.params.min_lookahead_m {
            let sign = if self.is_reversed { -1.0 } else { 1.0 };
            let extension = Pose2::from_translation(Translation2::new(
                sign * (self.params.min_lookahead_m - lookahead_dist),
                0.0,
            ));
            lookahead = TimedState::new(
                Pose2WithCurvature::from_pose(lookahead.state().pose().transform_by(&extension)),
                lookahead.t(),
                lookahead.velocity(),
                lookahead.acceleration(),
            );
        }

        let arc = PursuitArc::new(pose, &lookahead.state().translation());
        let curvature = arc.curvature();

        let feedforward = dynamics.chassis_velocity;
        let adjusted = if curvature.is_infinite() {
            ChassisState::new(0.0, feedforward.angular)
        } else {
            ChassisState::new(
                feedforward.linear + self.params.path_k_x * self.error.translation().x(),
                curvature * feedforward.linear,
            )
        };

        dynamics.chassis_velocity = adjusted;
        dynamics.wheel_velocity = self.model.solve_inverse_kinematics(&adjusted);

        Output {
            left_velocity_rads: dynamics.wheel_velocity.left,
            right_velocity_rads: dynamics.wheel_velocity.right,
            left_accel_radss: dynamics.wheel_acceleration.left,
            right_accel_radss: dynamics.wheel_acceleration.right,
            left_feedforward_v: dynamics.voltage.left,
            right_feedforward_v: dynamics.voltage.right,
        }
    }

    /// Correct each component of the error with its own PID controller,
    /// adjusting the feedforward voltages by the change in wheel speed.
    fn update_pid(&mut self, dynamics: DriveDynamics) -> Output {
        let correction = self.controllers.get_correction(&self.error, self.dt_s);
        let feedforward = dynamics.chassis_velocity;

        let mut adjusted = ChassisState::new(
            feedforward.linear + correction.linear_ms,
            feedforward.angular + correction.angular_rads,
        );

        // Lateral error can only be removed while moving
        if !epsilon_equals(feedforward.linear, 0.0, 1e-4) {
            adjusted.angular += feedforward.linear * correction.lateral;
        }

        if (adjusted.angular / adjusted.linear).is_infinite() {
            adjusted = ChassisState::new(0.0, feedforward.angular);
        }

        let wheel_velocity = self.model.solve_inverse_kinematics(&adjusted);
        let left_v = dynamics.voltage.left
            + (wheel_velocity.left - dynamics.wheel_velocity.left)
                / self.model.left_transmission().speed_per_volt();
        let right_v = dynamics.voltage.right
            + (wheel_velocity.right - dynamics.wheel_velocity.right)
                / self.model.right_transmission().speed_per_volt();

        Output {
            left_velocity_rads: wheel_velocity.left,
            right_velocity_rads: wheel_velocity.right,
            left_accel_radss: dynamics.wheel_acceleration.left,
            right_accel_radss: dynamics.wheel_acceleration.right,
            left_feedforward_v: left_v,
            right_feedforward_v: right_v,
        }
    }

    /// Ramsete tracking law, eqn. 5.12 of "Control of Wheeled Mobile Robots:
    /// An Experimental Overview" (De Luca, Oriolo and Vendittelli).
    fn update_nonlinear_feedback(&mut self, mut dynamics: DriveDynamics) -> Output {
        let beta = self.params.ramsete_beta;
        let zeta = self.params.ramsete_zeta;
        let feedforward = dynamics.chassis_velocity;

        let k = 2.0
            * zeta
            * (beta * feedforward.linear * feedforward.linear
                + feedforward.angular * feedforward.angular)
                .sqrt();

        let angle_error = self.error.rotation().radians();
        let sin_x_over_x = if epsilon_equals(angle_error, 0.0, 1e-2) {
            1.0
        } else {
            self.error.rotation().sin() / angle_error
        };

        let adjusted = ChassisState::new(
            feedforward.linear * self.error.rotation().cos() + k * self.error.translation().x(),
            feedforward.angular
                + k * angle_error
                + feedforward.linear * beta * sin_x_over_x * self.error.translation().y(),
        );

        dynamics.chassis_velocity = adjusted;
        dynamics.wheel_velocity = self.model.solve_inverse_kinematics(&adjusted);
        dynamics.chassis_acceleration = if self.dt_s > 0.0 {
            ChassisState::new(
                (adjusted.linear - self.prev_velocity.linear) / self.dt_s,
                (adjusted.angular - self.prev_velocity.angular) / self.dt_s,
            )
        } else {
            ChassisState::default()
        };
        self.prev_velocity = adjusted;

        let voltage = self
            .model
            .solve_inverse_dynamics(&dynamics.chassis_velocity, &dynamics.chassis_acceleration)
            .voltage;

        Output {
            left_velocity_rads: dynamics.wheel_velocity.left,
            right_velocity_rads: dynamics.wheel_velocity.right,
            left_accel_radss: dynamics.wheel_acceleration.left,
            right_accel_radss: dynamics.wheel_acceleration.right,
            left_feedforward_v: voltage.left,
            right_feedforward_v: voltage.right,
        }
    }
}
