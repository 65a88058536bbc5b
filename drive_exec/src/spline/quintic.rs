//! Quintic Hermite splines and the multi-segment curvature optimiser

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector6;
use serde::Deserialize;
use std::time::Instant;

// Internal
use super::Spline;
use crate::geom::{Pose2, Rotation2, Translation2, EPSILON};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Ratio of the endpoint tangent magnitude to the chord length.
const TANGENT_SCALE: f64 = 1.2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A spline whose x and y components are independent quintic polynomials,
/// fixed by the value, first and second derivative at both ends.
#[derive(Debug, Copy, Clone)]
pub struct QuinticHermiteSpline {
    x: HermiteAxis,
    y: HermiteAxis,
}

/// One component of a quintic Hermite spline.
#[derive(Debug, Copy, Clone)]
struct HermiteAxis {
    p0: f64,
    p1: f64,
    d0: f64,
    d1: f64,
    dd0: f64,
    dd1: f64,

    /// Polynomial coefficients, highest power first.
    coeffs: Vector6<f64>,
}

/// Parameters of [`optimize_splines`].
///
/// Step and finite difference sizes are fractions of the mean chord length
/// of the chain so the optimiser behaves the same whatever the length unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerParams {
    /// Maximum number of gradient steps.
    pub max_iterations: usize,

    /// Stop once an iteration improves the cost by less than this fraction
    /// of the current cost.
    pub min_relative_delta: f64,

    /// Finite difference size as a fraction of the mean chord length.
    pub epsilon_fraction: f64,

    /// Line search step as a fraction of the mean chord length.
    pub step_fraction: f64,

    /// Samples per spline used to integrate the cost.
    pub samples: usize,

    /// Optional wall clock budget for the whole optimisation.
    pub time_budget_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            min_relative_delta: 0.01,
            epsilon_fraction: 1e-7,
            step_fraction: 0.01,
            samples: 100,
            time_budget_s: None,
        }
    }
}

impl HermiteAxis {
    fn new(p0: f64, p1: f64, d0: f64, d1: f64, dd0: f64, dd1: f64) -> Self {
        let mut axis = Self {
            p0,
            p1,
            d0,
            d1,
            dd0,
            dd1,
            coeffs: Vector6::zeros(),
        };
        axis.compute_coefficients();
        axis
    }

    fn compute_coefficients(&mut self) {
        let (p0, p1, d0, d1, dd0, dd1) = (self.p0, self.p1, self.d0, self.d1, self.dd0, self.dd1);

        self.coeffs = Vector6::new(
            -6.0 * p0 - 3.0 * d0 - 0.5 * dd0 + 0.5 * dd1 - 3.0 * d1 + 6.0 * p1,
            15.0 * p0 + 8.0 * d0 + 1.5 * dd0 - dd1 + 7.0 * d1 - 15.0 * p1,
            -10.0 * p0 - 6.0 * d0 - 1.5 * dd0 + 0.5 * dd1 - 4.0 * d1 + 10.0 * p1,
            0.5 * dd0,
            d0,
            p0,
        );
    }

    fn value(&self, t: f64) -> f64 {
        self.coeffs.dot(&Vector6::new(t.powi(5), t.powi(4), t.powi(3), t * t, t, 1.0))
    }

    fn d(&self, t: f64) -> f64 {
        self.coeffs
            .dot(&Vector6::new(5.0 * t.powi(4), 4.0 * t.powi(3), 3.0 * t * t, 2.0 * t, 1.0, 0.0))
    }

    fn dd(&self, t: f64) -> f64 {
        self.coeffs
            .dot(&Vector6::new(20.0 * t.powi(3), 12.0 * t * t, 6.0 * t, 2.0, 0.0, 0.0))
    }

    fn ddd(&self, t: f64) -> f64 {
        self.coeffs
            .dot(&Vector6::new(60.0 * t * t, 24.0 * t, 6.0, 0.0, 0.0, 0.0))
    }
}

impl QuinticHermiteSpline {
    /// Spline from `p0` to `p1`, leaving and arriving along the pose
    /// headings with zero second derivative at both ends.
    pub fn new(p0: &Pose2, p1: &Pose2) -> Self {
        let scale = TANGENT_SCALE * p0.translation().distance(&p1.translation());
        let (t0, t1) = (p0.translation(), p1.translation());
        let (r0, r1) = (p0.rotation(), p1.rotation());

        Self {
            x: HermiteAxis::new(t0.x(), t1.x(), r0.cos() * scale, r1.cos() * scale, 0.0, 0.0),
            y: HermiteAxis::new(t0.y(), t1.y(), r0.sin() * scale, r1.sin() * scale, 0.0, 0.0),
        }
    }

    pub fn start_pose(&self) -> Pose2 {
        Pose2::new(
            Translation2::new(self.x.p0, self.y.p0),
            Rotation2::new(self.x.d0, self.y.d0, true),
        )
    }

    pub fn end_pose(&self) -> Pose2 {
        Pose2::new(
            Translation2::new(self.x.p1, self.y.p1),
            Rotation2::new(self.x.d1, self.y.d1, true),
        )
    }

    /// Length of the straight line between the endpoints.
    pub fn chord_length(&self) -> f64 {
        (self.x.p1 - self.x.p0).hypot(self.y.p1 - self.y.p0)
    }

    /// Squared rate of change of curvature with arc length.
    fn dcurvature2(&self, t: f64) -> f64 {
        let dx2dy2 = self.speed2(t);
        if dx2dy2 < EPSILON {
            return 0.0;
        }
        let num = self.dcurvature_numerator(t);
        num * num / dx2dy2.powi(5)
    }

    /// Integral of the squared dk/ds over the spline parameter.
    pub fn sum_dcurvature2(&self, samples: usize) -> f64 {
        let samples = samples.max(1);
        let dt = 1.0 / samples as f64;
        (0..samples).map(|i| dt * self.dcurvature2(i as f64 * dt)).sum()
    }

    fn speed2(&self, t: f64) -> f64 {
        let (dx, dy) = (self.x.d(t), self.y.d(t));
        dx * dx + dy * dy
    }

    fn dcurvature_numerator(&self, t: f64) -> f64 {
        let (dx, dy) = (self.x.d(t), self.y.d(t));
        let (ddx, ddy) = (self.x.dd(t), self.y.dd(t));
        let (dddx, dddy) = (self.x.ddd(t), self.y.ddd(t));

        (dx * dddy - dddx * dy) * (dx * dx + dy * dy)
            - 3.0 * (dx * ddy - ddx * dy) * (dx * ddx + dy * ddy)
    }

    /// Shift the second derivative at the end of this spline.
    fn offset_end_dd(&mut self, ddx: f64, ddy: f64) {
        self.x.dd1 += ddx;
        self.y.dd1 += ddy;
        self.x.compute_coefficients();
        self.y.compute_coefficients();
    }

    /// Shift the second derivative at the start of this spline.
    fn offset_start_dd(&mut self, ddx: f64, ddy: f64) {
        self.x.dd0 += ddx;
        self.y.dd0 += ddy;
        self.x.compute_coefficients();
        self.y.compute_coefficients();
    }
}

impl Spline for QuinticHermiteSpline {
    fn point(&self, t: f64) -> Translation2 {
        Translation2::new(self.x.value(t), self.y.value(t))
    }

    fn heading(&self, t: f64) -> Rotation2 {
        Rotation2::new(self.x.d(t), self.y.d(t), true)
    }

    fn curvature(&self, t: f64) -> f64 {
        let dx2dy2 = self.speed2(t);
        if dx2dy2 < EPSILON {
            return 0.0;
        }
        let (dx, dy) = (self.x.d(t), self.y.d(t));
        (dx * self.y.dd(t) - self.x.dd(t) * dy) / (dx2dy2 * dx2dy2.sqrt())
    }

    fn dcurvature(&self, t: f64) -> f64 {
        let dx2dy2 = self.speed2(t);
        if dx2dy2 < EPSILON {
            return 0.0;
        }
        self.dcurvature_numerator(t) / (dx2dy2 * dx2dy2)
    }

    fn velocity(&self, t: f64) -> f64 {
        self.speed2(t).sqrt()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Total squared dk/ds cost of a spline chain.
pub fn sum_dcurvature2(splines: &[QuinticHermiteSpline], samples: usize) -> f64 {
    splines.iter().map(|s| s.sum_dcurvature2(samples)).sum()
}

/// Minimise the change of curvature along a chain of splines by adjusting
/// the second derivatives shared at each joint.
///
/// Joints between colinear poses are left untouched, so straight sections
/// keep zero curvature. Returns the best cost reached, stopping early when
/// the improvement stalls, the iteration cap is hit or the time budget runs
/// out.
pub fn optimize_splines(splines: &mut [QuinticHermiteSpline], params: &OptimizerParams) -> f64 {
    let start_time = Instant::now();
    let mut prev = sum_dcurvature2(splines, params.samples);

    if splines.len() <= 1 {
        return prev;
    }

    let scale = splines.iter().map(|s| s.chord_length()).sum::<f64>() / splines.len() as f64;
    let step = params.step_fraction * scale;
    let epsilon = params.epsilon_fraction * scale;

    for iteration in 0..params.max_iterations {
        if let Some(budget_s) = params.time_budget_s {
            if start_time.elapsed().as_secs_f64() >= budget_s {
                debug!("Spline optimisation stopped by time budget after {} iterations", iteration);
                break;
            }
        }

        let snapshot = splines.to_vec();
        run_optimization_iteration(splines, step, epsilon, params.samples);
        let current = sum_dcurvature2(splines, params.samples);

        // Keep the best chain seen, a worse (or NaN) result is rolled back
        if !(current < prev) {
            splines.copy_from_slice(&snapshot);
            trace!("Spline optimisation converged after {} iterations", iteration);
            break;
        }

        let improvement = prev - current;
        prev = current;

        if improvement < params.min_relative_delta * prev {
            trace!("Spline optimisation converged after {} iterations", iteration + 1);
            break;
        }
    }

    prev
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// True if the joint after spline `i` should not be optimised.
fn joint_is_colinear(splines: &[QuinticHermiteSpline], i: usize) -> bool {
    splines[i].start_pose().is_colinear(&splines[i + 1].start_pose())
        || splines[i].end_pose().is_colinear(&splines[i + 1].end_pose())
}

/// Move every joint by `k` times its direction.
fn offset_joints(splines: &mut [QuinticHermiteSpline], directions: &[Option<(f64, f64)>], k: f64) {
    for (i, dir) in directions.iter().enumerate() {
        if let Some((ddx, ddy)) = dir {
            splines[i].offset_end_dd(k * ddx, k * ddy);
            splines[i + 1].offset_start_dd(k * ddx, k * ddy);
        }
    }
}

/// One gradient step with a parabolic line search.
fn run_optimization_iteration(
    splines: &mut [QuinticHermiteSpline],
    step: f64,
    epsilon: f64,
    samples: usize,
) {
    let original = sum_dcurvature2(splines, samples);
    let mut gradient: Vec<Option<(f64, f64)>> = vec![None; splines.len() - 1];
    let mut magnitude = 0.0;

    // Partial derivatives of the cost with respect to each joint's second
    // derivatives
    for i in 0..splines.len() - 1 {
        if joint_is_colinear(splines, i) {
            continue;
        }

        let (a, b) = (splines[i], splines[i + 1]);

        splines[i].offset_end_dd(epsilon, 0.0);
        splines[i + 1].offset_start_dd(epsilon, 0.0);
        let ddx = (sum_dcurvature2(splines, samples) - original) / epsilon;
        splines[i] = a;
        splines[i + 1] = b;

        splines[i].offset_end_dd(0.0, epsilon);
        splines[i + 1].offset_start_dd(0.0, epsilon);
        let ddy = (sum_dcurvature2(splines, samples) - original) / epsilon;
        splines[i] = a;
        splines[i + 1] = b;

        gradient[i] = Some((ddx, ddy));
        magnitude += ddx * ddx + ddy * ddy;
    }

    let magnitude = magnitude.sqrt();
    if !(magnitude > EPSILON) {
        return;
    }

    // Gradient scaled to one step length
    let directions: Vec<Option<(f64, f64)>> = gradient
        .iter()
        .map(|g| g.map(|(ddx, ddy)| (ddx * step / magnitude, ddy * step / magnitude)))
        .collect();

    // Sample the cost one step either side of the current chain
    let p2 = (0.0, original);
    offset_joints(splines, &directions, -1.0);
    let p1 = (-step, sum_dcurvature2(splines, samples));
    offset_joints(splines, &directions, 2.0);
    let p3 = (step, sum_dcurvature2(splines, samples));

    let best = parabola_min(p1, p2, p3);

    // The chain currently sits at +step
    offset_joints(splines, &directions, best / step - 1.0);
}

/// Abscissa minimising the parabola through three points, falling back to
/// the lowest sample when the fit is not convex.
fn parabola_min(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> f64 {
    let a = p3.0 * (p2.1 - p1.1) + p2.0 * (p1.1 - p3.1) + p1.0 * (p3.1 - p2.1);
    let b = p3.0 * p3.0 * (p1.1 - p2.1) + p2.0 * p2.0 * (p3.1 - p1.1) + p1.0 * p1.0 * (p2.1 - p3.1);

    // With p1.0 < p2.0 < p3.0 the denominator of the fit is negative, so a
    // convex parabola has a < 0 here
    if a < 0.0 {
        -b / (2.0 * a)
    } else {
        [p1, p2, p3]
            .iter()
            .fold(p2, |best, p| if p.1 < best.1 { *p } else { best })
            .0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_endpoints() {
        let p0 = Pose2::from_xy_deg(0.0, 0.0, 0.0);
        let p1 = Pose2::from_xy_deg(15.0, 10.0, -78.69006752597981);
        let s = QuinticHermiteSpline::new(&p0, &p1);

        assert_eq!(s.point(0.0), p0.translation());
        assert_eq!(s.point(1.0), p1.translation());
        assert_eq!(s.heading(0.0), p0.rotation());
        assert_eq!(s.heading(1.0), p1.rotation());
        assert_eq!(s.pose(1.0), p1);
        assert_eq!(s.start_pose(), p0);
        assert_eq!(s.end_pose(), p1);

        // Zero second derivatives at the ends means zero curvature there
        assert!(s.curvature(0.0).abs() < 1e-9);
        assert!(s.curvature(1.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line() {
        let s = QuinticHermiteSpline::new(
            &Pose2::from_xy_deg(0.0, 0.0, 0.0),
            &Pose2::from_xy_deg(10.0, 0.0, 0.0),
        );

        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!(s.point(t).y().abs() < 1e-12);
            assert!(s.curvature(t).abs() < 1e-12);
            assert!(s.dcurvature_ds(t).abs() < 1e-12);
        }
        assert_eq!(s.sum_dcurvature2(100), 0.0);
    }

    #[test]
    fn test_parabola_min() {
        // y = (x - 0.5)^2
        let f = |x: f64| (x - 0.5) * (x - 0.5);
        let m = parabola_min((-1.0, f(-1.0)), (0.0, f(0.0)), (1.0, f(1.0)));
        assert!((m - 0.5).abs() < 1e-12);

        // Concave fit falls back to the lowest sample
        let g = |x: f64| -(x * x) + x;
        assert_eq!(parabola_min((-1.0, g(-1.0)), (0.0, g(0.0)), (1.0, g(1.0))), -1.0);
    }

    #[test]
    fn test_optimize_u_turn() {
        let a = Pose2::from_xy_deg(0.0, 100.0, 270.0);
        let b = Pose2::from_xy_deg(50.0, 0.0, 0.0);
        let c = Pose2::from_xy_deg(100.0, 100.0, 90.0);

        let mut splines = vec![QuinticHermiteSpline::new(&a, &b), QuinticHermiteSpline::new(&b, &c)];
        let params = OptimizerParams::default();

        let initial = sum_dcurvature2(&splines, params.samples);
        let optimised = optimize_splines(&mut splines, &params);

        assert!(optimised <= initial);
        assert!((optimised - sum_dcurvature2(&splines, params.samples)).abs() < 1e-12);

        // Joints stay C2: shared position, heading and curvature
        assert_eq!(splines[0].point(1.0), splines[1].point(0.0));
        assert_eq!(splines[0].heading(1.0), splines[1].heading(0.0));
        assert!((splines[0].curvature(1.0) - splines[1].curvature(0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_optimize_keeps_straight_boundaries() {
        let h = Pose2::from_xy_deg(0.0, 0.0, 0.0);
        let i = Pose2::from_xy_deg(50.0, 0.0, 0.0);
        let j = Pose2::from_xy_deg(100.0, 50.0, 90.0);
        let k = Pose2::from_xy_deg(150.0, 0.0, 270.0);
        let l = Pose2::from_xy_deg(150.0, -50.0, 270.0);

        let mut splines = vec![
            QuinticHermiteSpline::new(&h, &i),
            QuinticHermiteSpline::new(&i, &j),
            QuinticHermiteSpline::new(&j, &k),
            QuinticHermiteSpline::new(&k, &l),
        ];
        let params = OptimizerParams::default();
        let initial = sum_dcurvature2(&splines, params.samples);

        assert!(optimize_splines(&mut splines, &params) <= initial);

        // The straight approach and exit are untouched
        assert!(splines[0].curvature(1.0).abs() < 1e-9);
        assert!(splines[2].curvature(1.0).abs() < 1e-9);
        assert!(splines[3].curvature(0.5).abs() < 1e-9);
    }

    #[test]
    fn test_optimize_respects_time_budget() {
        let a = Pose2::from_xy_deg(0.0, 100.0, 270.0);
        let b = Pose2::from_xy_deg(50.0, 0.0, 0.0);
        let c = Pose2::from_xy_deg(100.0, 100.0, 90.0);

        let mut splines = vec![QuinticHermiteSpline::new(&a, &b), QuinticHermiteSpline::new(&b, &c)];
        let initial = sum_dcurvature2(&splines, 100);

        // A zero budget returns the input unchanged
        let params = OptimizerParams {
            time_budget_s: Some(0.0),
            ..OptimizerParams::default()
        };
        assert_eq!(optimize_splines(&mut splines, &params), initial);
    }
}
