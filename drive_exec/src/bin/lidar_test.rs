//! # Lidar Test
//!
//! Runs the lidar scan pipeline against a simulated sensor, without
//! requiring the robot. A robot drives a circle inside a synthetic room
//! while its encoders drift; the sensor is simulated by casting rays against
//! the room's walls. Scans are processed on their own thread in the
//! configured mode and the lidar estimates are archived alongside the true
//! and encoder poses.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{sync::Arc, thread, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use drive_lib::{
    geom::{LineSeg2, Pose2, Rotation2, Translation2, Twist2},
    loc::{
        lidar_pipeline, LidarParams, OperatingMode, PolarGaussian, ReferenceModel, RobotStateMap,
        MAX_SCAN_SIZE,
    },
    physics::{kinematics::integrate_forward_kinematics, DriveKinematics},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Corners of the room, walls join each corner to the next.
const ROOM_CORNERS: [(f64, f64); 6] = [
    (0.0, 0.0),
    (6.0, 0.0),
    (6.0, 3.5),
    (4.5, 3.5),
    (4.5, 5.0),
    (0.0, 5.0),
];

/// Opposite corners of a pillar in the room.
const PILLAR: ((f64, f64), (f64, f64)) = ((0.8, 0.8), (1.3, 1.2));

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LidarTestParams {
    lidar: LidarParams,

    /// Wheel geometry used to simulate the encoders
    #[serde(default)]
    kinematics: DriveKinematics,

    /// Length of the simulation
    duration_s: f64,

    /// Period of the simulated control loop
    cycle_period_s: f64,

    /// Time for one revolution of the sensor
    scan_period_s: f64,

    /// Simulated seconds per wall clock second, 0 to run flat out
    real_time_factor: f64,

    speed_ms: f64,

    turn_rate_rads: f64,

    start_x_m: f64,
    start_y_m: f64,
    start_heading_deg: f64,

    /// Fraction by which the encoders overestimate wheel travel
    encoder_scale_error: f64,

    /// Standard deviation of the range noise
    range_noise_std_mm: f64,

    seed: u64,
}

#[derive(Serialize)]
struct ComparisonRecord {
    time_s: f64,
    truth_x_m: f64,
    truth_y_m: f64,
    truth_heading_deg: f64,
    encoder_x_m: f64,
    encoder_y_m: f64,
    encoder_heading_deg: f64,
    lidar_x_m: f64,
    lidar_y_m: f64,
    lidar_heading_deg: f64,
}

// ---------------------------------------------------------------------------
// MAIN
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("lidar_test", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Lidar Test\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: LidarTestParams =
        util::params::load("lidar_test.toml").wrap_err("Could not load lidar test params")?;

    // ---- INITIALISE PIPELINE ----

    let room = build_room().wrap_err("Failed to build the room model")?;
    let vehicle_to_lidar = params.lidar.vehicle_to_lidar();

    let start = Pose2::from_xy_deg(params.start_x_m, params.start_y_m, params.start_heading_deg);

    let encoder_map = Arc::new(RobotStateMap::new(params.lidar.state_map_capacity));
    let lidar_map = Arc::new(RobotStateMap::new(params.lidar.state_map_capacity));
    encoder_map
        .reset(0.0, start)
        .wrap_err("Failed to initialise the encoder map")?;
    lidar_map
        .reset(0.0, start)
        .wrap_err("Failed to initialise the lidar map")?;

    let reference = match params.lidar.mode {
        OperatingMode::RelativeIcp => None,
        _ => Some(room.clone()),
    };

    let (mut accumulator, mut processor) = lidar_pipeline(
        &params.lidar,
        reference,
        encoder_map.clone(),
        lidar_map.clone(),
    )
    .wrap_err("Failed to create the lidar pipeline")?;

    let processor_handle = thread::spawn(move || processor.run());

    let mut arch = Archiver::from_path(&session, "lidar_test.csv")
        .wrap_err("Failed to create the archive")?;

    info!("Pipeline running in {:?} mode\n", params.lidar.mode);

    // ---- MAIN LOOP ----

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut gaussian = PolarGaussian::default();

    let dt = params.cycle_period_s;
    let samples_per_s = MAX_SCAN_SIZE as f64 / params.scan_period_s;
    let velocity = Twist2::new(params.speed_ms, 0.0, params.turn_rate_rads);

    // Wheel travel per cycle, as read by the encoders
    let wheel_deltas = params.kinematics.inverse_kinematics(&velocity.scaled(dt));
    let encoder_scale = 1.0 + params.encoder_scale_error;
    let encoder_delta = params.kinematics.forward_kinematics(
        wheel_deltas.left * encoder_scale,
        wheel_deltas.right * encoder_scale,
    );
    let encoder_velocity = encoder_delta.scaled(1.0 / dt);

    let mut truth = start;
    let mut encoder = start;
    let mut time_s = 0.0;
    let mut sample_index: usize = 0;
    let mut scan_truths: Vec<(f64, Pose2)> = Vec::new();

    while time_s < params.duration_s {
        // Emit the samples falling within this cycle
        let end_s = time_s + dt;
        loop {
            let sample_time_s = sample_index as f64 / samples_per_s;
            if sample_time_s >= end_s {
                break;
            }

            let vehicle = truth.transform_by(&Pose2::exp(&velocity.scaled(sample_time_s - time_s)));
            let sensor = vehicle.transform_by(&vehicle_to_lidar);
            let scan_index = sample_index % MAX_SCAN_SIZE;
            let angle_deg = scan_index as f64 * 360.0 / MAX_SCAN_SIZE as f64;

            let direction = sensor
                .rotation()
                .rotate_by(&Rotation2::from_degrees(angle_deg))
                .to_translation();

            if scan_index == 0 {
                scan_truths.push((sample_time_s, vehicle));
            }

            if let Some(range_m) = room.ray_distance(&sensor.translation(), &direction) {
                let noise_mm = gaussian.sample(&mut rng) * params.range_noise_std_mm;
                accumulator.add_sample(
                    sample_time_s,
                    angle_deg,
                    range_m * 1000.0 + noise_mm,
                    scan_index == 0,
                );
            }

            sample_index += 1;
        }

        // Integrate the true and believed motion
        truth = truth.transform_by(&Pose2::exp(&velocity.scaled(dt)));
        encoder = integrate_forward_kinematics(&encoder, &encoder_delta);
        time_s = end_s;

        encoder_map
            .append(time_s, encoder, encoder_delta, encoder_velocity)
            .wrap_err("Failed to update the encoder map")?;

        if accumulator.scan_timed_out(time_s) {
            warn!("Scan started at {:.3} s has not completed", accumulator.scan_start_s());
        }

        if params.real_time_factor > 0.0 {
            thread::sleep(Duration::from_secs_f64(dt / params.real_time_factor));
        }
    }

    match accumulator.active_scan().to_json() {
        Ok(json) => {
            session
                .write_archive_file("last_scan.json", &json)
                .wrap_err("Failed to archive the last scan")?;
        }
        Err(e) => warn!("Could not serialise the last scan: {}", e),
    }

    accumulator.flush();
    let dropped = accumulator.dropped_scans();
    drop(accumulator);

    let processed = processor_handle
        .join()
        .map_err(|_| color_eyre::eyre::eyre!("Scan processor thread panicked"))?;

    info!("{} scans processed, {} dropped", processed, dropped);

    // ---- REPORT ----

    let mut sum_encoder_err = 0.0;
    let mut sum_lidar_err = 0.0;
    let mut num_compared = 0;

    for (t, truth) in scan_truths.iter() {
        let encoder = match encoder_map.pose_at(*t) {
            Some(p) => p,
            None => continue,
        };
        let lidar = match lidar_map.pose_at(*t) {
            Some(p) => p,
            None => continue,
        };

        sum_encoder_err += encoder.translation().distance(&truth.translation());
        sum_lidar_err += lidar.translation().distance(&truth.translation());
        num_compared += 1;

        arch.serialise(ComparisonRecord {
            time_s: *t,
            truth_x_m: truth.translation().x(),
            truth_y_m: truth.translation().y(),
            truth_heading_deg: truth.rotation().degrees(),
            encoder_x_m: encoder.translation().x(),
            encoder_y_m: encoder.translation().y(),
            encoder_heading_deg: encoder.rotation().degrees(),
            lidar_x_m: lidar.translation().x(),
            lidar_y_m: lidar.translation().y(),
            lidar_heading_deg: lidar.rotation().degrees(),
        })
        .wrap_err("Failed to archive the comparison")?;
    }

    if num_compared > 0 {
        info!(
            "Mean position error over {} scans: encoder {:.3} m, lidar {:.3} m",
            num_compared,
            sum_encoder_err / num_compared as f64,
            sum_lidar_err / num_compared as f64
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn build_room() -> Result<ReferenceModel> {
    let corners: Vec<Translation2> = ROOM_CORNERS
        .iter()
        .map(|&(x, y)| Translation2::new(x, y))
        .collect();

    let mut walls: Vec<LineSeg2> = (0..corners.len())
        .map(|i| LineSeg2::new(corners[i], corners[(i + 1) % corners.len()]))
        .collect();

    let ((x0, y0), (x1, y1)) = PILLAR;
    let pillar = [
        Translation2::new(x0, y0),
        Translation2::new(x1, y0),
        Translation2::new(x1, y1),
        Translation2::new(x0, y1),
    ];
    walls.extend((0..4).map(|i| LineSeg2::new(pillar[i], pillar[(i + 1) % 4])));

    Ok(ReferenceModel::segments(walls)?)
}
