//! Lidar scan pipeline
//!
//! The [`ScanAccumulator`] is fed samples by the sensor driver. It places
//! each sample under the encoder pose at its timestamp and, whenever a new
//! revolution starts, hands the completed scan to the [`ScanProcessor`] over
//! a bounded channel. If the processor has fallen behind and the channel is
//! full the completed scan is dropped.
//!
//! The processor registers each scan according to its [`OperatingMode`] and
//! appends the resulting estimate to the lidar state map. The start time of
//! the scan being accumulated is published through a [`ScanClock`] so that a
//! stalled sensor can be detected without touching the scan itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

// Internal
use super::{
    Icp, LidarParams, LidarSample, LidarScan, Mcl, ReferenceModel, RelativeIcp, RobotState,
    RobotStateMap, ScanError,
};
use crate::geom::{Pose2, Twist2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of scans between processing rate reports.
const RATE_REPORT_INTERVAL: usize = 10;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How scans are turned into pose estimates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Register each scan against the previous one and integrate the motion
    RelativeIcp,

    /// Register each scan against the reference model to correct the
    /// encoder pose
    AbsoluteIcp,

    /// Track the pose with a particle filter against the reference model
    Mcl,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Start time of the scan being accumulated, shared without locking.
#[derive(Debug)]
pub struct ScanClock {
    bits: AtomicU64,
}

/// Producer half of the pipeline.
pub struct ScanAccumulator {
    active: LidarScan,
    sender: Sender<LidarScan>,
    clock: Arc<ScanClock>,
    encoder_map: Arc<RobotStateMap>,
    vehicle_to_lidar: Pose2,
    restart_timeout_s: f64,
    dropped_scans: usize,
}

/// Consumer half of the pipeline.
pub struct ScanProcessor {
    mode: OperatingMode,
    receiver: Receiver<LidarScan>,
    icp: Icp,
    relative_icp: RelativeIcp,
    reference: Option<ReferenceModel>,
    mcl: Option<Mcl>,
    encoder_map: Arc<RobotStateMap>,
    lidar_map: Arc<RobotStateMap>,
    vehicle_to_lidar: Pose2,

    /// Encoder pose at the previous scan, the odometry source for MCL
    last_encoder_pose: Option<Pose2>,

    num_processed: usize,
    rate_timer: Instant,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build both halves of a scan pipeline.
///
/// Sample poses are read from `encoder_map`, estimates are written to
/// `lidar_map`. The reference model is required in [`OperatingMode::Mcl`];
/// in [`OperatingMode::AbsoluteIcp`] its absence leaves the encoder pose
/// uncorrected.
pub fn lidar_pipeline(
    params: &LidarParams,
    reference: Option<ReferenceModel>,
    encoder_map: Arc<RobotStateMap>,
    lidar_map: Arc<RobotStateMap>,
) -> Result<(ScanAccumulator, ScanProcessor), ScanError> {
    let icp = Icp::new(params.icp)?;
    let vehicle_to_lidar = params.vehicle_to_lidar();
    let (sender, receiver) = bounded(params.queue_capacity.max(1));

    let mcl = match params.mode {
        OperatingMode::Mcl => {
            let map = reference.clone().ok_or(ScanError::MissingReferenceModel)?;
            let initial_pose = lidar_map
                .latest()
                .or_else(|| encoder_map.latest())
                .map(|s| s.pose)
                .unwrap_or_else(Pose2::identity);
            Some(Mcl::new(params.mcl, &initial_pose, map, vehicle_to_lidar)?)
        }
        OperatingMode::AbsoluteIcp if reference.is_none() => {
            warn!("Absolute ICP without a reference model, encoder poses will not be corrected");
            None
        }
        _ => None,
    };

    info!("Lidar pipeline created in {:?} mode", params.mode);

    let accumulator = ScanAccumulator {
        active: LidarScan::new(),
        sender,
        clock: Arc::new(ScanClock::new()),
        encoder_map: encoder_map.clone(),
        vehicle_to_lidar,
        restart_timeout_s: params.restart_timeout_s,
        dropped_scans: 0,
    };

    let processor = ScanProcessor {
        mode: params.mode,
        receiver,
        icp: icp.clone(),
        relative_icp: RelativeIcp::new(icp),
        reference,
        mcl,
        encoder_map,
        lidar_map,
        vehicle_to_lidar,
        last_encoder_pose: None,
        num_processed: 0,
        rate_timer: Instant::now(),
    };

    Ok((accumulator, processor))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScanClock {
    /// A clock with no scan started.
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(std::f64::NEG_INFINITY.to_bits()),
        }
    }

    pub fn store(&self, timestamp_s: f64) {
        self.bits.store(timestamp_s.to_bits(), Ordering::Release);
    }

    /// Start time of the current scan, negative infinity if none has started.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for ScanClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanAccumulator {
    /// Add a sensor reading, `new_scan` marking the first sample of a
    /// revolution.
    ///
    /// Returns false if the sample was not stored because the active scan is
    /// full.
    pub fn add_sample(
        &mut self,
        timestamp_s: f64,
        angle_deg: f64,
        distance_mm: f64,
        new_scan: bool,
    ) -> bool {
        if new_scan {
            self.flush();
        }

        if self.active.is_empty() {
            self.clock.store(timestamp_s);
        }

        let vehicle_pose = self
            .encoder_map
            .pose_at(timestamp_s)
            .unwrap_or_else(Pose2::identity);
        let sensor_pose = vehicle_pose.transform_by(&self.vehicle_to_lidar);

        let added = self.active.add_sample(
            LidarSample::from_mm(timestamp_s, angle_deg, distance_mm),
            Some(&sensor_pose),
        );
        if !added {
            trace!("Scan full, sample at {:.3} s ignored", timestamp_s);
        }

        added
    }

    /// Hand the active scan to the processor and start a new one.
    ///
    /// Returns true if a scan was queued.
    pub fn flush(&mut self) -> bool {
        if self.active.is_empty() {
            return false;
        }

        let scan = std::mem::replace(&mut self.active, LidarScan::new());
        let timestamp_s = scan.timestamp_s();

        match self.sender.try_send(scan) {
            Ok(()) => {
                trace!("Scan at {:.3} s queued", timestamp_s);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.dropped_scans += 1;
                warn!(
                    "Scan queue full, dropping scan at {:.3} s ({} dropped)",
                    timestamp_s, self.dropped_scans
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Scan processor has gone, dropping scan at {:.3} s", timestamp_s);
                false
            }
        }
    }

    /// Start time of the scan being accumulated.
    pub fn scan_start_s(&self) -> f64 {
        self.clock.load()
    }

    /// A handle on the scan start time for other threads.
    pub fn clock(&self) -> Arc<ScanClock> {
        self.clock.clone()
    }

    /// True if a scan has been open for longer than the restart timeout.
    pub fn scan_timed_out(&self, now_s: f64) -> bool {
        let start = self.clock.load();
        start.is_finite() && now_s - start > self.restart_timeout_s
    }

    pub fn dropped_scans(&self) -> usize {
        self.dropped_scans
    }

    /// The scan being accumulated.
    pub fn active_scan(&self) -> &LidarScan {
        &self.active
    }
}

impl ScanProcessor {
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn num_processed(&self) -> usize {
        self.num_processed
    }

    /// Wait for the next completed scan and process it.
    pub fn process_next(&mut self) -> Result<RobotState, ScanError> {
        let scan = self.receiver.recv().map_err(|_| ScanError::Disconnected)?;
        self.process_scan(&scan)
    }

    /// Process a completed scan if one is waiting.
    pub fn try_process(&mut self) -> Result<Option<RobotState>, ScanError> {
        match self.receiver.try_recv() {
            Ok(scan) => self.process_scan(&scan).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ScanError::Disconnected),
        }
    }

    /// Process scans until the accumulator is dropped, returning the number
    /// processed successfully.
    pub fn run(&mut self) -> usize {
        let mut count = 0;

        loop {
            match self.process_next() {
                Ok(_) => count += 1,
                Err(ScanError::Disconnected) => break,
                Err(e) => error!("Scan processing failed: {}", e),
            }
        }

        info!("Scan producer disconnected after {} scans", count);
        count
    }

    /// Register `scan`, append the new estimate to the lidar state map and
    /// return it.
    pub fn process_scan(&mut self, scan: &LidarScan) -> Result<RobotState, ScanError> {
        let timestamp_s = scan.timestamp_s();
        let prior = self.lidar_map.latest();
        let encoder_pose = self.encoder_map.pose_at(timestamp_s);

        let pose = match self.mode {
            OperatingMode::RelativeIcp => {
                let prior_pose = prior
                    .map(|s| s.pose)
                    .or(encoder_pose)
                    .ok_or(ScanError::NoPriorState)?;

                // Sensor motion is the inverse of the registration, moved
                // into the vehicle frame
                let result = self.relative_icp.register(scan)?;
                let lidar_motion = result.transform.inverse();
                let vehicle_motion = self
                    .vehicle_to_lidar
                    .transform_by(&lidar_motion)
                    .transform_by(&self.vehicle_to_lidar.inverse());

                prior_pose.transform_by(&Pose2::exp(&vehicle_motion.log()))
            }
            OperatingMode::AbsoluteIcp => {
                let believed = encoder_pose
                    .or_else(|| prior.map(|s| s.pose))
                    .ok_or(ScanError::NoPriorState)?;

                match &self.reference {
                    Some(reference) => {
                        let result = self.icp.register(scan, None, reference)?;
                        result.transform.inverse().transform_by(&believed)
                    }
                    None => believed,
                }
            }
            OperatingMode::Mcl => {
                let delta = match (self.last_encoder_pose, encoder_pose) {
                    (Some(last), Some(current)) => last.inverse().transform_by(&current).log(),
                    _ => Twist2::identity(),
                };
                self.last_encoder_pose = encoder_pose;

                let mcl = self.mcl.as_mut().ok_or(ScanError::MissingReferenceModel)?;
                mcl.update(&delta, scan)?
            }
        };

        let (measured, predicted) = match prior {
            Some(p) => {
                let measured = p.pose.inverse().transform_by(&pose).log();
                let dt = timestamp_s - p.timestamp_s;
                let predicted = if dt > 0.0 {
                    measured.scaled(1.0 / dt)
                } else {
                    Twist2::identity()
                };
                (measured, predicted)
            }
            None => (Twist2::identity(), Twist2::identity()),
        };

        self.lidar_map.append(timestamp_s, pose, measured, predicted)?;

        debug!(
            "Scan at {:.3} s ({} samples): pose ({:.3}, {:.3}, {:.2} deg)",
            timestamp_s,
            scan.len(),
            pose.translation().x(),
            pose.translation().y(),
            pose.rotation().degrees()
        );

        self.num_processed += 1;
        if self.num_processed % RATE_REPORT_INTERVAL == 0 {
            let elapsed = self.rate_timer.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                info!(
                    "Processing {:.1} scans/s",
                    RATE_REPORT_INTERVAL as f64 / elapsed
                );
            }
            self.rate_timer = Instant::now();
        }

        Ok(RobotState::new(timestamp_s, pose, measured, predicted))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::Rotation2;
    use crate::loc::icp::test::room;
    use crate::loc::{IcpParams, MAX_SCAN_SIZE};

    fn params(mode: OperatingMode) -> LidarParams {
        LidarParams {
            mode,
            vehicle_to_lidar_x_m: 0.1,
            queue_capacity: 16,
            icp: IcpParams {
                max_iterations: 100,
                timeout_ms: 0,
                angle_epsilon_rad: 1e-6,
                translation_epsilon_m: 1e-6,
                ..IcpParams::default()
            },
            ..LidarParams::default()
        }
    }

    /// Feed one simulated revolution of the sensor on a vehicle at `truth`.
    fn feed_scan(
        acc: &mut ScanAccumulator,
        model: &ReferenceModel,
        truth: &Pose2,
        vehicle_to_lidar: &Pose2,
        timestamp_s: f64,
    ) {
        let sensor = truth.transform_by(vehicle_to_lidar);
        let mut first = true;
        for i in 0..MAX_SCAN_SIZE {
            let angle_deg = i as f64 * 0.9;
            let dir = sensor
                .rotation()
                .rotate_by(&Rotation2::from_degrees(angle_deg))
                .to_translation();
            if let Some(d) = model.ray_distance(&sensor.translation(), &dir) {
                acc.add_sample(timestamp_s, angle_deg, d * 1000.0, first);
                first = false;
            }
        }
    }

    #[test]
    fn test_scan_clock() {
        let clock = ScanClock::default();
        assert_eq!(clock.load(), std::f64::NEG_INFINITY);
        clock.store(12.5);
        assert_eq!(clock.load(), 12.5);
    }

    #[test]
    fn test_accumulator() {
        let encoder = Arc::new(RobotStateMap::new(10));
        let lidar = Arc::new(RobotStateMap::new(10));
        let p = LidarParams {
            queue_capacity: 1,
            ..params(OperatingMode::RelativeIcp)
        };
        let (mut acc, mut proc) = lidar_pipeline(&p, None, encoder, lidar).unwrap();

        assert!(!acc.scan_timed_out(100.0));
        assert!(matches!(proc.try_process(), Ok(None)));

        acc.add_sample(1.0, 0.0, 1000.0, true);
        acc.add_sample(1.01, 90.0, 1000.0, false);
        assert_eq!(acc.scan_start_s(), 1.0);
        assert_eq!(acc.active_scan().len(), 2);

        // No encoder pose, so samples sit under the lidar mount alone
        assert!(acc.active_scan().points()[0].epsilon_eq(
            &crate::geom::Translation2::new(1.1, 0.0),
            1e-9
        ));

        assert!(!acc.scan_timed_out(1.5));
        assert!(acc.scan_timed_out(2.5));

        // The first scan fills the queue, the second is dropped
        acc.add_sample(2.0, 0.0, 1000.0, true);
        assert_eq!(acc.scan_start_s(), 2.0);
        acc.add_sample(3.0, 0.0, 1000.0, true);
        assert_eq!(acc.dropped_scans(), 1);

        drop(acc);

        // No encoder or lidar state to register against
        assert!(matches!(proc.process_next(), Err(ScanError::NoPriorState)));
        assert!(matches!(proc.process_next(), Err(ScanError::Disconnected)));
    }

    #[test]
    fn test_mcl_requires_reference() {
        let encoder = Arc::new(RobotStateMap::new(10));
        let lidar = Arc::new(RobotStateMap::new(10));
        assert!(matches!(
            lidar_pipeline(&params(OperatingMode::Mcl), None, encoder, lidar),
            Err(ScanError::MissingReferenceModel)
        ));
    }

    #[test]
    fn test_absolute_pipeline() {
        let model = room();
        let p = params(OperatingMode::AbsoluteIcp);
        let vehicle_to_lidar = p.vehicle_to_lidar();
        let encoder = Arc::new(RobotStateMap::new(100));
        let lidar = Arc::new(RobotStateMap::new(100));

        let (mut acc, mut proc) =
            lidar_pipeline(&p, Some(model.clone()), encoder.clone(), lidar.clone()).unwrap();
        let handle = std::thread::spawn(move || proc.run());

        // The encoders drift sideways by 5 cm
        let bias = Pose2::from_xy_deg(0.0, 0.05, 0.0);
        let truth_at = |k: usize| Pose2::from_xy_deg(2.0 + 0.05 * k as f64, 1.0, 2.0 * k as f64);

        let num_scans = 10;
        for k in 0..num_scans {
            let t = 0.1 * k as f64;
            let truth = truth_at(k);
            let believed = Pose2::new(truth.translation() + bias.translation(), truth.rotation());
            encoder
                .append(t, believed, Twist2::identity(), Twist2::identity())
                .unwrap();
            feed_scan(&mut acc, &model, &truth, &vehicle_to_lidar, t);
        }
        acc.flush();
        assert_eq!(acc.dropped_scans(), 0);
        drop(acc);

        assert_eq!(handle.join().unwrap(), num_scans);
        assert_eq!(lidar.len(), num_scans);

        let latest = lidar.latest().unwrap();
        let truth = truth_at(num_scans - 1);
        assert!((latest.timestamp_s - 0.9).abs() < 1e-9);
        assert!(
            latest.pose.translation().distance(&truth.translation()) < 0.02,
            "{:?}",
            latest.pose
        );
        assert!(latest.pose.rotation().distance(&truth.rotation()) < 0.5f64.to_radians());
    }

    #[test]
    fn test_relative_pipeline() {
        let model = room();
        let p = LidarParams {
            icp: IcpParams {
                outlier_thresh: 2.0,
                cull_resolution_m: 0.02,
                ..params(OperatingMode::RelativeIcp).icp
            },
            ..params(OperatingMode::RelativeIcp)
        };
        let vehicle_to_lidar = p.vehicle_to_lidar();
        let encoder = Arc::new(RobotStateMap::new(100));
        let lidar = Arc::new(RobotStateMap::new(100));

        let start = Pose2::from_xy_deg(2.5, 1.0, 0.0);
        lidar.reset(0.0, start).unwrap();

        let (mut acc, mut proc) = lidar_pipeline(&p, None, encoder, lidar.clone()).unwrap();

        let end = start.transform_by(&Pose2::from_xy_deg(0.04, 0.0, 1.0));
        feed_scan(&mut acc, &model, &start, &vehicle_to_lidar, 0.1);
        feed_scan(&mut acc, &model, &end, &vehicle_to_lidar, 0.2);
        acc.flush();

        // The first scan only sets the reference
        let first = proc.try_process().unwrap().unwrap();
        assert_eq!(first.pose, start);

        let second = proc.try_process().unwrap().unwrap();
        assert!(second.pose.translation().distance(&end.translation()) < 0.03);
        assert!(second.predicted_velocity.dx > 0.0);
        assert!(matches!(proc.try_process(), Ok(None)));
    }
}
