//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable plans a path through the configured waypoints and follows
//! it with a simulated differential drive:
//!
//!     - Initialise the session, logging and the drive motion planner
//!     - Generate and time the trajectory, archiving it as CSV
//!     - Main loop:
//!         - Trajectory control processing, giving wheel commands
//!         - Drive simulation, integrating the commanded wheel speeds
//!         - Encoder state map update
//!     - Report the final tracking error

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};

// Internal
use drive_lib::{
    geom::{HasPose, Pose2, Pose2WithCurvature, Twist2},
    loc::RobotStateMap,
    physics::WheelState,
    timing::{CentripetalAccelerationConstraint, TimingConstraint},
    traj_ctrl::{DriveMotionPlanner, InputData},
    trajectory::{TimedView, TrajectoryIterator},
};
use params::DriveExecParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut planner = DriveMotionPlanner::default();
    planner
        .init_from_file("drive_motion_planner.toml", &session)
        .wrap_err("Failed to initialise the drive motion planner")?;

    if let Some(follower_type) = exec_params.follower_type {
        planner.set_follower_type(follower_type);
    }

    let encoder_map = RobotStateMap::new(exec_params.encoder_map_capacity);

    info!("Modules initialised\n");

    // ---- PLAN ----

    let waypoints: Vec<Pose2> = exec_params.waypoints.iter().map(|w| w.pose()).collect();

    let centripetal = CentripetalAccelerationConstraint::new(exec_params.max_centripetal_accel_mss);
    let slow_regions: Vec<_> = exec_params
        .slow_regions
        .iter()
        .map(|r| r.constraint())
        .collect();

    let mut constraints: Vec<&dyn TimingConstraint<Pose2WithCurvature>> =
        Vec::with_capacity(slow_regions.len() + 1);
    constraints.push(&centripetal);
    for region in slow_regions.iter() {
        constraints.push(region);
    }

    let trajectory = planner
        .generate_trajectory(
            exec_params.reversed,
            &waypoints,
            &constraints,
            &exec_params.limits,
            exec_params.max_voltage_v,
        )
        .wrap_err("Failed to generate the trajectory")?;

    let duration_s = trajectory.last_state().t();
    info!(
        "Trajectory of {} states generated, lasting {:.2} s",
        trajectory.len(),
        duration_s
    );

    session
        .write_archive_file("trajectory.csv", &trajectory.to_csv())
        .wrap_err("Failed to archive the trajectory")?;

    let goal = trajectory.last_state().state().pose();
    planner.set_trajectory(TrajectoryIterator::new(TimedView::new(trajectory)));

    // ---- MAIN LOOP ----

    let dt = exec_params.cycle_period_s;
    let mut pose = waypoints
        .first()
        .ok_or_else(|| eyre!("No waypoints given"))?
        .transform_by(&exec_params.start_offset.pose());
    let mut time_s = 0.0;

    encoder_map
        .reset(time_s, pose)
        .wrap_err("Failed to initialise the encoder state map")?;

    info!("Beginning main loop\n");

    loop {
        let (output, status) = planner
            .proc(&InputData { time_s, pose })
            .wrap_err("Error during trajectory control processing")?;

        if status.is_done {
            info!("Trajectory complete at {:.2} s", time_s);
            break;
        }

        debug!(
            "t = {:.2} s: progress {:.2} s, error ({:.3}, {:.3}, {:.3})",
            time_s, status.progress_s, status.error_x_m, status.error_y_m, status.error_heading_rad
        );

        // Perfect wheel tracking
        let chassis = planner.model().solve_forward_kinematics(&WheelState::new(
            output.left_velocity_rads,
            output.right_velocity_rads,
        ));
        let velocity = Twist2::new(chassis.linear, 0.0, chassis.angular);
        let delta = velocity.scaled(dt);

        pose = pose.transform_by(&Pose2::exp(&delta));
        time_s += dt;

        encoder_map
            .append(time_s, pose, delta, velocity)
            .wrap_err("Failed to update the encoder state map")?;

        if time_s > exec_params.max_duration_s {
            warn!(
                "Trajectory not complete after {:.2} s, stopping",
                exec_params.max_duration_s
            );
            break;
        }
    }

    // ---- REPORT ----

    let final_error = pose.inverse().transform_by(&goal);
    info!(
        "Final pose ({:.3}, {:.3}, {:.2} deg), error to goal {:.3} m, {:.2} deg",
        pose.translation().x(),
        pose.translation().y(),
        pose.rotation().degrees(),
        final_error.translation().norm(),
        final_error.rotation().degrees()
    );
    info!(
        "Distance driven {:.3} m over a {:.2} s trajectory",
        encoder_map.distance_driven(),
        duration_s
    );

    Ok(())
}
