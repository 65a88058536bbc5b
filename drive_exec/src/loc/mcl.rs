//! Monte Carlo localisation
//!
//! A fixed size set of weighted pose hypotheses (particles) is seeded around
//! an initial pose, moved by each odometry twist with noise proportional to
//! the motion, reweighted by how well each particle explains the latest scan
//! and resampled once the weights have become too uneven.
//!
//! The measurement model treats every beam endpoint independently: the
//! likelihood of a beam is a Gaussian in the distance from its endpoint to
//! the nearest feature of the map.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

// Internal
use super::{LidarScan, MclError, ReferenceModel};
use crate::geom::{Pose2, Rotation2, Translation2, Twist2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MclParams {
    pub num_particles: usize,

    /// Standard deviation of the initial spread in each position axis
    pub init_position_std_m: f64,

    /// Standard deviation of the initial spread in heading
    pub init_heading_std_deg: f64,

    /// Translation noise as a fraction of the distance moved
    pub motion_translation_noise: f64,

    /// Rotation noise as a fraction of the angle turned
    pub motion_rotation_noise: f64,

    /// Translation noise applied on every motion update
    pub min_translation_noise_m: f64,

    /// Rotation noise applied on every motion update
    pub min_rotation_noise_rad: f64,

    /// Standard deviation of a beam endpoint about the nearest map feature
    pub measurement_std_m: f64,

    /// Maximum number of beams used per measurement update
    pub max_beams: usize,

    /// Resample once the effective number of particles falls below this
    /// fraction of the total
    pub resample_threshold: f64,

    pub seed: u64,
}

/// A weighted pose hypothesis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub pose: Pose2,
    pub weight: f64,
}

/// Particle filter localising the vehicle against a map.
#[derive(Debug, Clone)]
pub struct Mcl {
    params: MclParams,
    particles: Vec<Particle>,
    map: ReferenceModel,

    /// Pose of the lidar in the vehicle frame
    vehicle_to_lidar: Pose2,

    rng: StdRng,

    gaussian: PolarGaussian,
}

/// Standard normal values generated in pairs with the Marsaglia polar
/// method, the second value of each pair kept for the next draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarGaussian {
    spare: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MclParams {
    fn default() -> Self {
        Self {
            num_particles: 100,
            init_position_std_m: 0.1,
            init_heading_std_deg: 5.0,
            motion_translation_noise: 0.1,
            motion_rotation_noise: 0.1,
            min_translation_noise_m: 0.005,
            min_rotation_noise_rad: 0.002,
            measurement_std_m: 0.1,
            max_beams: 60,
            resample_threshold: 0.5,
            seed: 0,
        }
    }
}

impl Mcl {
    /// Create a filter with its particles spread around `initial_pose`.
    pub fn new(
        params: MclParams,
        initial_pose: &Pose2,
        map: ReferenceModel,
        vehicle_to_lidar: Pose2,
    ) -> Result<Self, MclError> {
        if params.num_particles == 0 {
            return Err(MclError::NoParticles);
        }

        let mut mcl = Self {
            params,
            particles: Vec::with_capacity(params.num_particles),
            map,
            vehicle_to_lidar,
            rng: StdRng::seed_from_u64(params.seed),
            gaussian: PolarGaussian::default(),
        };
        mcl.reset(initial_pose);

        Ok(mcl)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Spread the particles around `pose` again, with equal weights.
    pub fn reset(&mut self, pose: &Pose2) {
        let n = self.params.num_particles;
        let position_std = self.params.init_position_std_m;
        let heading_std = self.params.init_heading_std_deg.to_radians();

        self.particles.clear();
        for _ in 0..n {
            let offset = Translation2::new(
                self.random_gaussian() * position_std,
                self.random_gaussian() * position_std,
            );
            let turn = Rotation2::from_radians(self.random_gaussian() * heading_std);

            self.particles.push(Particle {
                pose: Pose2::new(pose.translation() + offset, pose.rotation().rotate_by(&turn)),
                weight: 1.0 / n as f64,
            });
        }

        debug!("MCL reset with {} particles", n);
    }

    /// Move every particle by `delta`, a body frame motion, plus noise.
    pub fn motion_update(&mut self, delta: &Twist2) {
        let translation_std = self.params.motion_translation_noise * delta.norm()
            + self.params.min_translation_noise_m;
        let rotation_std = self.params.motion_rotation_noise * delta.dtheta.abs()
            + self.params.min_rotation_noise_rad;

        for i in 0..self.particles.len() {
            let noisy = Twist2::new(
                delta.dx + self.random_gaussian() * translation_std,
                delta.dy + self.random_gaussian() * translation_std,
                delta.dtheta + self.random_gaussian() * rotation_std,
            );
            let pose = self.particles[i].pose.transform_by(&Pose2::exp(&noisy));
            self.particles[i].pose = pose;
        }
    }

    /// Reweight the particles by the likelihood of `points`, given in the
    /// lidar frame.
    ///
    /// If every weight would vanish the previous weights are kept and an
    /// error is returned.
    pub fn measurement_update(&mut self, points: &[Translation2]) -> Result<(), MclError> {
        if points.is_empty() {
            return Ok(());
        }

        let stride = (points.len() + self.params.max_beams.max(1) - 1) / self.params.max_beams.max(1);
        let beams: Vec<Translation2> = points.iter().step_by(stride.max(1)).copied().collect();
        let inv_two_var = 1.0 / (2.0 * self.params.measurement_std_m.powi(2));

        let log_likelihoods: Vec<f64> = self
            .particles
            .iter()
            .map(|p| {
                let lidar_pose = p.pose.transform_by(&self.vehicle_to_lidar);
                beams
                    .iter()
                    .map(|b| {
                        let endpoint = lidar_pose.transform_point(b);
                        let d = endpoint.distance(&self.map.closest_point(&endpoint));
                        -d * d * inv_two_var
                    })
                    .sum()
            })
            .collect();

        // Relative to the best particle so the exponentials stay in range
        let max_ll = log_likelihoods
            .iter()
            .copied()
            .fold(std::f64::NEG_INFINITY, f64::max);

        let weights: Vec<f64> = self
            .particles
            .iter()
            .zip(log_likelihoods.iter())
            .map(|(p, ll)| p.weight * (ll - max_ll).exp())
            .collect();
        let total: f64 = weights.iter().sum();

        if !(total > 0.0) || !total.is_finite() {
            return Err(MclError::DegenerateWeights);
        }

        for (p, w) in self.particles.iter_mut().zip(weights) {
            p.weight = w / total;
        }

        trace!(
            "MCL measurement update with {} beams, effective particles {:.1}",
            beams.len(),
            self.effective_particles()
        );

        Ok(())
    }

    /// Number of particles carrying significant weight, `1 / Σw²`.
    pub fn effective_particles(&self) -> f64 {
        let sum_sq: f64 = self.particles.iter().map(|p| p.weight * p.weight).sum();
        if sum_sq > 0.0 {
            1.0 / sum_sq
        } else {
            0.0
        }
    }

    /// Draw a new equally weighted set of particles in proportion to the
    /// current weights, using a single random offset.
    pub fn resample(&mut self) {
        let n = self.particles.len();
        if n == 0 {
            return;
        }

        let step = 1.0 / n as f64;
        let start = self.rng.gen::<f64>() * step;

        let mut resampled = Vec::with_capacity(n);
        let mut i = 0;
        let mut cumulative = self.particles[0].weight;
        for m in 0..n {
            let u = start + m as f64 * step;
            while u > cumulative && i < n - 1 {
                i += 1;
                cumulative += self.particles[i].weight;
            }
            resampled.push(Particle {
                pose: self.particles[i].pose,
                weight: step,
            });
        }

        self.particles = resampled;
    }

    /// Weighted mean pose of the particles, heading averaged on the circle.
    pub fn estimate(&self) -> Pose2 {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut cos = 0.0;
        let mut sin = 0.0;
        let mut total = 0.0;

        for p in &self.particles {
            x += p.weight * p.pose.translation().x();
            y += p.weight * p.pose.translation().y();
            cos += p.weight * p.pose.rotation().cos();
            sin += p.weight * p.pose.rotation().sin();
            total += p.weight;
        }

        if total <= 0.0 {
            return Pose2::identity();
        }

        Pose2::new(
            Translation2::new(x / total, y / total),
            Rotation2::new(cos, sin, true),
        )
    }

    /// Run a full filter step for the motion `delta` since the last scan and
    /// the new `scan`, returning the new estimate.
    pub fn update(&mut self, delta: &Twist2, scan: &LidarScan) -> Result<Pose2, MclError> {
        self.motion_update(delta);
        self.measurement_update(scan.raw_points())?;

        let n = self.particles.len() as f64;
        if self.effective_particles() < self.params.resample_threshold * n {
            trace!("MCL resampling");
            self.resample();
        }

        Ok(self.estimate())
    }

    fn random_gaussian(&mut self) -> f64 {
        self.gaussian.sample(&mut self.rng)
    }
}

impl PolarGaussian {
    pub fn sample<R: Rng>(&mut self, rng: &mut R) -> f64 {
        if let Some(spare) = self.spare.take() {
            return spare;
        }

        loop {
            let u: f64 = rng.gen_range(-1.0..1.0);
            let v: f64 = rng.gen_range(-1.0..1.0);
            let s = u * u + v * v;

            if s > 0.0 && s < 1.0 {
                let m = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * m);
                return u * m;
            }
        }
    }
}
