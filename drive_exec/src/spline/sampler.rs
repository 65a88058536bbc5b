//! Adaptive sampling of splines into dense paths
//!
//! A spline segment is accepted as soon as the constant-curvature motion
//! between its ends stays within the configured bounds, otherwise it is
//! bisected. Samples are therefore densest where the path bends hardest.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::Spline;
use crate::geom::{Pose2, Pose2WithCurvature};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of bisections of a single segment.
const MAX_DEPTH: u32 = 24;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bounds on the motion between two consecutive samples.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    pub max_dx_m: f64,
    pub max_dy_m: f64,
    pub max_dtheta_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            max_dx_m: 0.05,
            max_dy_m: 0.00635,
            max_dtheta_rad: 5f64.to_radians(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Sample a single spline over `t` in `[0, 1]`.
///
/// The first sample is the start of the spline and the last its end.
pub fn sample_spline<S: Spline + ?Sized>(spline: &S, params: &SamplerParams) -> Vec<Pose2WithCurvature> {
    let mut samples = vec![spline.pose_with_curvature(0.0)];
    sample_segment(spline, &mut samples, 0.0, 1.0, params, 0);
    samples
}

/// Sample a chain of splines into one path, without repeating the shared
/// joint poses.
pub fn sample_splines<S: Spline>(splines: &[S], params: &SamplerParams) -> Vec<Pose2WithCurvature> {
    let mut samples = Vec::new();

    if let Some(first) = splines.first() {
        samples.push(first.pose_with_curvature(0.0));
    }

    for spline in splines {
        sample_segment(spline, &mut samples, 0.0, 1.0, params, 0);
    }

    samples
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Append samples covering `(t0, t1]`.
fn sample_segment<S: Spline + ?Sized>(
    spline: &S,
    samples: &mut Vec<Pose2WithCurvature>,
    t0: f64,
    t1: f64,
    params: &SamplerParams,
    depth: u32,
) {
    let r0_inv = spline.heading(t0).inverse();
    let relative = Pose2::new(
        (spline.point(t1) - spline.point(t0)).rotate_by(&r0_inv),
        spline.heading(t1).rotate_by(&r0_inv),
    );
    let twist = relative.log();

    let too_coarse = twist.dx.abs() > params.max_dx_m
        || twist.dy.abs() > params.max_dy_m
        || twist.dtheta.abs() > params.max_dtheta_rad;

    if too_coarse && depth < MAX_DEPTH {
        let t_mid = 0.5 * (t0 + t1);
        sample_segment(spline, samples, t0, t_mid, params, depth + 1);
        sample_segment(spline, samples, t_mid, t1, params, depth + 1);
    } else {
        samples.push(spline.pose_with_curvature(t1));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::HasPose;
    use crate::spline::QuinticHermiteSpline;

    fn check_spacing(samples: &[Pose2WithCurvature], params: &SamplerParams) {
        for pair in samples.windows(2) {
            let twist = pair[0].pose().inverse().transform_by(&pair[1].pose()).log();
            assert!(twist.dx.abs() <= params.max_dx_m + 1e-9);
            assert!(twist.dy.abs() <= params.max_dy_m + 1e-9);
            assert!(twist.dtheta.abs() <= params.max_dtheta_rad + 1e-9);
        }
    }

    #[test]
    fn test_sample_spline() {
        let p0 = Pose2::from_xy_deg(0.0, 0.0, 0.0);
        let p1 = Pose2::from_xy_deg(2.0, 1.0, 45.0);
        let spline = QuinticHermiteSpline::new(&p0, &p1);
        let params = SamplerParams::default();

        let samples = sample_spline(&spline, &params);

        assert!(samples.len() > 2);
        assert_eq!(samples[0].pose(), p0);
        assert_eq!(samples[samples.len() - 1].pose(), p1);
        check_spacing(&samples, &params);
    }

    #[test]
    fn test_sample_backwards_segment() {
        // A spline heading in -x covers negative dx, which must still be
        // bounded
        let p0 = Pose2::from_xy_deg(0.0, 0.0, 180.0);
        let p1 = Pose2::from_xy_deg(-2.0, 0.0, 180.0);
        let spline = QuinticHermiteSpline::new(&p0, &p1);
        let params = SamplerParams::default();

        let samples = sample_spline(&spline, &params);
        assert!(samples.len() >= 40);
        check_spacing(&samples, &params);
    }

    #[test]
    fn test_sample_chain_shares_joints() {
        let poses = [
            Pose2::from_xy_deg(0.0, 0.0, 0.0),
            Pose2::from_xy_deg(1.0, 0.5, 30.0),
            Pose2::from_xy_deg(2.0, 2.0, 90.0),
        ];
        let splines: Vec<QuinticHermiteSpline> = poses
            .windows(2)
            .map(|w| QuinticHermiteSpline::new(&w[0], &w[1]))
            .collect();
        let params = SamplerParams::default();

        let chain = sample_splines(&splines, &params);
        let first = sample_spline(&splines[0], &params);
        let second = sample_spline(&splines[1], &params);

        assert_eq!(chain.len(), first.len() + second.len() - 1);
        assert_eq!(chain[0].pose(), poses[0]);
        assert_eq!(chain[chain.len() - 1].pose(), poses[2]);

        // No duplicated sample at the joint
        for pair in chain.windows(2) {
            assert!(pair[0].pose().distance(&pair[1].pose()) > 0.0);
        }
        check_spacing(&chain, &params);

        assert!(sample_splines::<QuinticHermiteSpline>(&[], &params).is_empty());
    }
}
