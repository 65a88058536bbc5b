//! Iterative closest point registration
//!
//! Each iteration maps the scan points into the reference frame using the
//! inverse of the current estimate, pairs each with its nearest feature in
//! the reference model, discards pairs further apart than a multiple of the
//! previous mean residual, and solves the least squares rigid transform
//! between the surviving pairs in closed form.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Deserialize;
use std::time::{Duration, Instant};

// Internal
use super::{IcpError, LidarScan, ReferenceModel};
use crate::geom::{Pose2, Rotation2, Translation2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    /// Pairs further apart than this multiple of the previous mean residual
    /// are rejected
    pub outlier_thresh: f64,

    /// Pairs closer than this are never rejected as outliers
    pub min_outlier_dist_m: f64,

    /// Convergence tolerance on the change of rotation between iterations
    pub angle_epsilon_rad: f64,

    /// Convergence tolerance on the change of each translation component
    pub translation_epsilon_m: f64,

    /// Iteration cap, 0 for none
    pub max_iterations: usize,

    /// Wall clock budget, 0 for none
    pub timeout_ms: u64,

    /// Resolution scans are culled to before registration
    pub cull_resolution_m: f64,
}

/// Iterative closest point matcher.
#[derive(Debug, Clone)]
pub struct Icp {
    params: IcpParams,
}

/// The outcome of a registration.
#[derive(Debug, Copy, Clone)]
pub struct IcpResult {
    /// The transform `T` such that `scan = T * reference`
    pub transform: Pose2,

    pub iterations: usize,

    pub converged: bool,

    /// Mean distance between the pairs used in the last iteration
    pub mean_residual_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            outlier_thresh: 3.0,
            min_outlier_dist_m: 0.05,
            angle_epsilon_rad: 1e-4,
            translation_epsilon_m: 1e-4,
            max_iterations: 0,
            timeout_ms: 50,
            cull_resolution_m: 0.075,
        }
    }
}

impl Icp {
    /// Create a matcher, which must have an iteration cap, a timeout, or
    /// both.
    pub fn new(params: IcpParams) -> Result<Self, IcpError> {
        if params.max_iterations == 0 && params.timeout_ms == 0 {
            return Err(IcpError::Unbounded);
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &IcpParams {
        &self.params
    }

    /// Register the culled points of `scan` against `reference`, starting
    /// from `guess` (identity if `None`).
    pub fn register(
        &self,
        scan: &LidarScan,
        guess: Option<&Pose2>,
        reference: &ReferenceModel,
    ) -> Result<IcpResult, IcpError> {
        let points = scan.culled_points(self.params.cull_resolution_m);
        let guess = guess.copied().unwrap_or_else(Pose2::identity);

        self.register_points(&points, &guess, reference)
    }

    /// Register `points` against `reference` starting from `guess`.
    pub fn register_points(
        &self,
        points: &[Translation2],
        guess: &Pose2,
        reference: &ReferenceModel,
    ) -> Result<IcpResult, IcpError> {
        let start = Instant::now();
        let timeout = Duration::from_millis(self.params.timeout_ms);

        let mut transform = *guess;
        let mut iterations = 0;
        let mut converged = false;
        let mut last_mean_dist = std::f64::INFINITY;

        loop {
            let below_cap =
                self.params.max_iterations > 0 && iterations < self.params.max_iterations;
            let within_budget = self.params.timeout_ms > 0 && start.elapsed() < timeout;
            if !(below_cap || within_budget) {
                break;
            }
            iterations += 1;

            let inverse = transform.inverse();

            let threshold =
                (last_mean_dist * self.params.outlier_thresh).max(self.params.min_outlier_dist_m);

            let mut sums = PairSums::default();
            let mut sum_dists = 0.0;
            for p in points {
                let in_reference = inverse.transform_point(p);
                let nearest = reference.closest_point(&in_reference);
                let dist = in_reference.distance(&nearest);
                if dist > threshold {
                    continue;
                }

                sum_dists += dist;
                sums.add(p, &nearest);
            }

            if sums.n == 0 {
                return Err(IcpError::NoCorrespondences);
            }
            last_mean_dist = sum_dists / sums.n as f64;

            let previous = transform;
            transform = sums.solve();

            trace!(
                "ICP iteration {}: {} pairs, mean residual {:.4} m",
                iterations,
                sums.n,
                last_mean_dist
            );

            if self.is_converged(&previous, &transform) {
                converged = true;
                break;
            }
        }

        debug!(
            "ICP converged: {}, iterations: {}, mean residual {:.4} m",
            converged, iterations, last_mean_dist
        );

        Ok(IcpResult {
            transform,
            iterations,
            converged,
            mean_residual_m: last_mean_dist,
        })
    }

    fn is_converged(&self, prev: &Pose2, cur: &Pose2) -> bool {
        let dtheta = prev.rotation().inverse().rotate_by(&cur.rotation()).radians();
        let dt = cur.translation() - prev.translation();

        dtheta.abs() < self.params.angle_epsilon_rad
            && dt.x().abs() < self.params.translation_epsilon_m
            && dt.y().abs() < self.params.translation_epsilon_m
    }
}

/// Accumulated sums of the paired scan (`a`) and reference (`b`) points.
#[derive(Debug, Default)]
struct PairSums {
    n: usize,
    sum_xa: f64,
    sum_ya: f64,
    sum_xb: f64,
    sum_yb: f64,
    sxx: f64,
    sxy: f64,
    syx: f64,
    syy: f64,
}

impl PairSums {
    fn add(&mut self, a: &Translation2, b: &Translation2) {
        self.n += 1;
        self.sum_xa += a.x();
        self.sum_ya += a.y();
        self.sum_xb += b.x();
        self.sum_yb += b.y();
        self.sxx += a.x() * b.x();
        self.sxy += a.x() * b.y();
        self.syx += a.y() * b.x();
        self.syy += a.y() * b.y();
    }

    /// Least squares rigid transform taking the `b` points onto the `a`
    /// points.
    fn solve(&self) -> Pose2 {
        let n = self.n as f64;

        let ax = n * (self.sxx + self.syy) - self.sum_xa * self.sum_xb - self.sum_ya * self.sum_yb;
        let ay = self.sum_xa * self.sum_yb + n * (self.syx - self.sxy) - self.sum_xb * self.sum_ya;

        let theta = if ax == 0.0 && ay == 0.0 {
            0.0
        } else {
            ay.atan2(ax)
        };
        let (sin, cos) = theta.sin_cos();

        let mean_xa = self.sum_xa / n;
        let mean_ya = self.sum_ya / n;
        let mean_xb = self.sum_xb / n;
        let mean_yb = self.sum_yb / n;

        Pose2::new(
            Translation2::new(
                mean_xa - mean_xb * cos + mean_yb * sin,
                mean_ya - mean_xb * sin - mean_yb * cos,
            ),
            Rotation2::from_radians(theta),
        )
    }
}
