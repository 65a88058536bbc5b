//! Pure pursuit path follower
//!
//! At each step the first point along the path further than the lookahead
//! distance from the robot is chosen as the goal, and the robot is steered
//! along the circular arc tangent to its heading which passes through it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use util::maths::epsilon_equals;

// Internal
use super::{PathFollower, PurePursuitParams};
use crate::geom::{HasTranslation, Interpolable, Pose2, Translation2, Twist2, EPSILON};
use crate::trajectory::{DistanceView, TrajectoryIterator};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a path by repeatedly steering towards a goal point ahead of the
/// robot.
#[derive(Debug, Clone)]
pub struct PurePursuitController<S> {
    iterator: TrajectoryIterator<S, DistanceView<S>>,
    params: PurePursuitParams,
    done: bool,
}

/// The arc tangent to a pose's heading which passes through a point.
#[derive(Debug, Copy, Clone)]
pub struct PursuitArc {
    /// Centre of the circle, infinite for a straight line.
    pub center: Translation2,

    /// Signed radius, positive when the arc turns left.
    pub radius: f64,

    /// Length along the arc from the pose to the point.
    pub length: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S> PurePursuitController<S>
where
    S: Interpolable + HasTranslation,
{
    pub fn new(path: DistanceView<S>, params: PurePursuitParams) -> Self {
        Self {
            iterator: TrajectoryIterator::new(path),
            params,
            done: false,
        }
    }

    /// The current goal point on the path.
    pub fn goal(&self) -> &S {
        self.iterator.state()
    }
}

impl<S> PathFollower for PurePursuitController<S>
where
    S: Interpolable + HasTranslation,
{
    fn steer(&mut self, pose: &Pose2) -> Twist2 {
        let position = pose.translation();

        self.done = self.done
            || (self.iterator.is_done()
                && position.distance(&self.iterator.state().translation())
                    <= self.params.goal_tolerance_m);
        if self.done {
            return Twist2::identity();
        }

        // Find the first sample beyond the lookahead, or the last one
        let remaining = self.iterator.remaining_progress();
        let mut goal_progress = 0.0;
        let mut progress = 0.0;
        while progress <= remaining {
            let dist = position.distance(&self.iterator.preview(progress).state.translation());
            if dist > self.params.lookahead_m {
                // Always make some progress when the sampling is coarse
                // compared to the lookahead.
                if goal_progress == 0.0 && !self.iterator.is_done() {
                    goal_progress = progress;
                }
                break;
            }

            goal_progress = progress;
            if progress == remaining {
                break;
            }

            progress = if self.params.sampling_dist_m > 0.0 {
                (progress + self.params.sampling_dist_m).min(remaining)
            } else {
                remaining
            };
        }

        self.iterator.advance(goal_progress);

        let arc = PursuitArc::new(pose, &self.iterator.state().translation());
        if arc.length < EPSILON {
            Twist2::identity()
        } else {
            Twist2::new(arc.length, 0.0, arc.length / arc.radius)
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

impl PursuitArc {
    pub fn new(pose: &Pose2, point: &Translation2) -> Self {
        let center = find_center(pose, point);
        let radius = Translation2::between(&center, point).norm();
        let length = find_length(pose, point, &center, radius);

        Self {
            center,
            radius: radius * direction(pose, point),
            length,
        }
    }

    /// Signed curvature of the arc, zero for a straight line.
    pub fn curvature(&self) -> f64 {
        1.0 / self.radius
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// +1 if the point is to the left of the pose's heading, -1 otherwise.
fn direction(pose: &Pose2, point: &Translation2) -> f64 {
    let pose_to_point = Translation2::between(&pose.translation(), point);
    let heading = pose.rotation().to_translation();

    if Translation2::cross(&heading, &pose_to_point) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// The centre lies on both the pose's normal and the perpendicular bisector
/// of the chord.
fn find_center(pose: &Pose2, point: &Translation2) -> Translation2 {
    let halfway = pose.translation().interpolate(point, 0.5);
    let chord = Translation2::between(&pose.translation(), point);

    // The point lies on the pose's normal, so the chord is a diameter
    if epsilon_equals(Translation2::dot(&pose.rotation().to_translation(), &chord), 0.0, EPSILON) {
        return halfway;
    }

    let bisector = Pose2::new(halfway, chord.direction().normal());
    let normal_from_pose = Pose2::new(pose.translation(), pose.rotation().normal());

    normal_from_pose.intersection(&bisector)
}

fn find_length(pose: &Pose2, point: &Translation2, center: &Translation2, radius: f64) -> f64 {
    if radius.is_finite() {
        let center_to_point = Translation2::between(center, point);
        let center_to_pose = Translation2::between(center, &pose.translation());

        // The point is behind the pose if it is on the far side of the normal
        let behind = Translation2::cross(
            &pose.rotation().normal().to_translation(),
            &Translation2::between(&pose.translation(), point),
        ) > 0.0;

        let angle = Translation2::angle(&center_to_pose, &center_to_point)
            .radians()
            .abs();

        if behind {
            radius * (2.0 * std::f64::consts::PI - angle)
        } else {
            radius * angle
        }
    } else {
        Translation2::between(&pose.translation(), point).norm()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trajectory::Trajectory;

    #[test]
    fn test_arc_straight() {
        let arc = PursuitArc::new(&Pose2::identity(), &Translation2::new(2.0, 0.0));

        assert!((arc.length - 2.0).abs() < 1e-9);
        assert!(arc.radius.is_infinite());
        assert_eq!(arc.curvature(), 0.0);
    }

    #[test]
    fn test_arc_left_and_right() {
        // Quarter circle of radius 1 to the left
        let arc = PursuitArc::new(&Pose2::identity(), &Translation2::new(1.0, 1.0));
        assert!((arc.radius - 1.0).abs() < 1e-9);
        assert!(arc.center.epsilon_eq(&Translation2::new(0.0, 1.0), 1e-9));
        assert!((arc.length - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        let arc = PursuitArc::new(&Pose2::identity(), &Translation2::new(1.0, -1.0));
        assert!((arc.radius + 1.0).abs() < 1e-9);
        assert!(arc.center.epsilon_eq(&Translation2::new(0.0, -1.0), 1e-9));
    }

    #[test]
    fn test_arc_on_normal() {
        // Half circle to a point directly to the left
        let arc = PursuitArc::new(&Pose2::identity(), &Translation2::new(0.0, 2.0));
        assert!(arc.center.epsilon_eq(&Translation2::new(0.0, 1.0), 1e-9));
        assert!((arc.radius - 1.0).abs() < 1e-9);
        assert!((arc.length - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_follow_straight_line() {
        let path = Trajectory::new(vec![
            Translation2::new(0.0, 0.0),
            Translation2::new(5.0, 0.0),
        ])
        .unwrap();
        let params = PurePursuitParams {
            sampling_dist_m: 0.1,
            lookahead_m: 1.0,
            goal_tolerance_m: 0.05,
        };
        let mut ctrl = PurePursuitController::new(DistanceView::new(path), params);

        let mut pose = Pose2::identity();
        for _ in 0..100 {
            if ctrl.is_done() {
                break;
            }
            let twist = ctrl.steer(&pose);

            // On the line the commanded curvature is zero
            assert!(twist.dtheta.abs() < 1e-9);
            assert!(twist.dx <= 1.0 + 1e-9);

            pose = pose.transform_by(&Pose2::exp(&twist.scaled(0.5)));
        }

        assert!(ctrl.is_done());
        assert!(pose.translation().distance(&Translation2::new(5.0, 0.0)) <= 0.05);
        assert_eq!(ctrl.steer(&pose), Twist2::identity());
    }

    #[test]
    fn test_steers_back_to_path() {
        let path = Trajectory::new(vec![
            Translation2::new(0.0, 0.0),
            Translation2::new(10.0, 0.0),
        ])
        .unwrap();
        let mut ctrl = PurePursuitController::new(DistanceView::new(path), PurePursuitParams::default());

        // Left of the path, the robot turns right
        let twist = ctrl.steer(&Pose2::from_xy_deg(0.0, 0.3, 0.0));
        assert!(twist.dtheta < 0.0);
    }
}
