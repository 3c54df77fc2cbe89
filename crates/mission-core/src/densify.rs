//! Curvature-aware path densification.
//!
//! Consecutive waypoints are joined with turn-constrained curves, each curve
//! is sampled densely, and only a handful of "significant" samples per
//! segment are kept: the segment start, the sample at the middle of the
//! segment and the samples with the sharpest heading change. Every selected
//! sample carries its index in the concatenation of all segment samples, and
//! the final order comes from sorting on that index.

use crate::dubins::CurvePlanner;
use crate::models::{FrameTag, ManeuverKind, Pose2D, Waypoint};
use crate::rules::PlannerRules;
use crate::spatial::{planar_distance, wrap_pi};
use std::collections::BTreeMap;

/// Two selected points closer than this are the same point.
const COINCIDENT_M: f64 = 1e-6;

/// A selected sample and where it sits in the full sample sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificantPoint {
    pub pose: Pose2D,
    pub global_index: usize,
    /// True for the declared mission points (segment starts and the goal)
    pub declared: bool,
}

pub struct PathDensifier<'a, P: CurvePlanner> {
    planner: &'a P,
    turn_radius: f64,
    significant_points: usize,
    sample_step: f64,
}

impl<'a, P: CurvePlanner> PathDensifier<'a, P> {
    pub fn new(planner: &'a P, turn_radius: f64) -> Self {
        let rules = PlannerRules::default();
        Self {
            planner,
            turn_radius,
            significant_points: rules.significant_points_per_segment,
            sample_step: rules.sample_step_m,
        }
    }

    pub fn from_rules(planner: &'a P, rules: &PlannerRules) -> Self {
        Self {
            planner,
            turn_radius: rules.turn_radius_m,
            significant_points: rules.significant_points_per_segment,
            sample_step: rules.sample_step_m,
        }
    }

    /// Number of curvature maxima kept per segment.
    pub fn with_significant_points(mut self, count: usize) -> Self {
        self.significant_points = count;
        self
    }

    pub fn with_sample_step(mut self, step: f64) -> Self {
        self.sample_step = step;
        self
    }

    pub fn turn_radius(&self) -> f64 {
        self.turn_radius
    }

    /// Select the significant points of the whole path, in execution order.
    pub fn select(&self, poses: &[Pose2D]) -> Vec<SignificantPoint> {
        let Some((goal, legs)) = poses.split_last() else {
            return Vec::new();
        };

        let mut selected: BTreeMap<usize, SignificantPoint> = BTreeMap::new();
        let mut offset = 0usize;

        for (i, start) in legs.iter().enumerate() {
            let end = poses[i + 1];
            let samples = self.segment_samples(*start, end);

            selected.insert(
                offset,
                SignificantPoint {
                    pose: *start,
                    global_index: offset,
                    declared: true,
                },
            );

            let mut picks = vec![samples.len() / 2];
            picks.extend(curvature_maxima(&samples, self.significant_points));
            for local in picks {
                let global_index = offset + local;
                selected.entry(global_index).or_insert(SignificantPoint {
                    pose: samples[local],
                    global_index,
                    declared: false,
                });
            }

            offset += samples.len();
        }

        selected.insert(
            offset,
            SignificantPoint {
                pose: *goal,
                global_index: offset,
                declared: true,
            },
        );

        collapse_coincident(selected.into_values())
    }

    /// Densify `poses` into full waypoints.
    ///
    /// Every non-positional attribute comes from `template`, the first
    /// waypoint of the undensified mission.
    pub fn densify(&self, template: &Waypoint, poses: &[Pose2D], name: &str) -> Vec<Waypoint> {
        let points = self.select(poses);
        let total = points.len();
        tracing::debug!(
            input = poses.len(),
            output = total,
            turn_radius = self.turn_radius,
            "Densified path"
        );

        points
            .iter()
            .enumerate()
            .map(|(k, point)| Waypoint {
                name: format!("{}_{}/{}", name, k + 1, total),
                maneuver: ManeuverKind::Goto,
                frame: FrameTag::Utm,
                x: point.pose.x,
                y: point.pose.y,
                heading: Some(point.pose.heading),
                payload: None,
                ..template.clone()
            })
            .collect()
    }

    fn segment_samples(&self, start: Pose2D, end: Pose2D) -> Vec<Pose2D> {
        let samples = self
            .planner
            .connect(start, end, self.turn_radius)
            .map(|curve| self.planner.sample(&curve, self.sample_step))
            .unwrap_or_default();

        if samples.is_empty() {
            tracing::warn!(
                from = ?(start.x, start.y),
                to = ?(end.x, end.y),
                "No turn-constrained curve between waypoints, keeping the endpoints only"
            );
            vec![start]
        } else {
            samples
        }
    }
}

/// Indices of the `k` samples with the largest heading change to their
/// predecessor, ties to the earlier sample, in ascending index order.
pub fn curvature_maxima(samples: &[Pose2D], k: usize) -> Vec<usize> {
    let mut deltas: Vec<(usize, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, pose)| {
            let delta = match i.checked_sub(1).and_then(|prev| samples.get(prev)) {
                Some(prev) => wrap_pi(pose.heading - prev.heading).abs(),
                None => 0.0,
            };
            (i, delta)
        })
        .collect();

    deltas.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut picked: Vec<usize> = deltas.into_iter().take(k).map(|(i, _)| i).collect();
    picked.sort_unstable();
    picked
}

/// Drop a point that lands on the one before it, preferring to keep
/// declared mission points.
fn collapse_coincident(points: impl Iterator<Item = SignificantPoint>) -> Vec<SignificantPoint> {
    let mut out: Vec<SignificantPoint> = Vec::new();
    for point in points {
        if let Some(last) = out.last_mut() {
            if planar_distance(last.pose.point(), point.pose.point()) < COINCIDENT_M {
                if point.declared && !last.declared {
                    *last = point;
                }
                continue;
            }
        }
        out.push(point);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dubins::DubinsPlanner;
    use crate::models::{SpeedControl, VerticalControl};
    use std::f64::consts::FRAC_PI_2;

    /// Straight-line planner with caller-chosen headings, for exact tests.
    struct StraightLine;

    impl CurvePlanner for StraightLine {
        type Curve = (Pose2D, Pose2D);

        fn connect(&self, from: Pose2D, to: Pose2D, _turn_radius: f64) -> Option<Self::Curve> {
            Some((from, to))
        }

        fn sample(&self, curve: &Self::Curve, step: f64) -> Vec<Pose2D> {
            let (from, to) = *curve;
            let length = (to.x - from.x).hypot(to.y - from.y);
            let n = (length / step).ceil() as usize;
            (0..=n)
                .map(|i| {
                    let t = i as f64 / n as f64;
                    Pose2D::new(
                        from.x + t * (to.x - from.x),
                        from.y + t * (to.y - from.y),
                        from.heading,
                    )
                })
                .collect()
        }
    }

    fn collinear() -> Vec<Pose2D> {
        vec![
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(10.0, 0.0, 0.0),
            Pose2D::new(20.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn curvature_maxima_prefers_sharpest_then_earliest() {
        let headings = [0.0, 0.0, 0.3, 0.3, 0.1, 0.1, 0.4];
        let samples: Vec<Pose2D> = headings
            .iter()
            .enumerate()
            .map(|(i, h)| Pose2D::new(i as f64, 0.0, *h))
            .collect();

        // deltas: 0, 0, 0.3, 0, 0.2, 0, 0.3
        assert_eq!(curvature_maxima(&samples, 2), vec![2, 6]);
        assert_eq!(curvature_maxima(&samples, 3), vec![2, 4, 6]);
        // only zero deltas left: earliest wins
        assert_eq!(curvature_maxima(&samples, 4), vec![0, 2, 4, 6]);
    }

    #[test]
    fn curvature_maxima_wraps_heading() {
        let samples = vec![
            Pose2D::new(0.0, 0.0, 6.2),
            Pose2D::new(1.0, 0.0, 0.05),
            Pose2D::new(2.0, 0.0, 0.5),
        ];
        // 6.2 -> 0.05 is a small turn across zero, 0.05 -> 0.5 is the larger one
        assert_eq!(curvature_maxima(&samples, 1), vec![2]);
    }

    #[test]
    fn collinear_path_keeps_endpoints_once() {
        let planner = DubinsPlanner;
        let densifier = PathDensifier::new(&planner, 10.0);
        let points = densifier.select(&collinear());

        let first = points.first().unwrap();
        let last = points.last().unwrap();
        assert_eq!((first.pose.x, first.pose.y), (0.0, 0.0));
        assert_eq!((last.pose.x, last.pose.y), (20.0, 0.0));

        let at_middle = points
            .iter()
            .filter(|p| (p.pose.x - 10.0).abs() < 1e-6 && p.pose.y.abs() < 1e-6)
            .count();
        assert_eq!(at_middle, 1);

        for pair in points.windows(2) {
            assert!(pair[0].global_index < pair[1].global_index);
            assert!(planar_distance(pair[0].pose.point(), pair[1].pose.point()) > COINCIDENT_M);
        }
    }

    #[test]
    fn selection_is_ordered_by_sample_index() {
        let planner = StraightLine;
        let densifier = PathDensifier::new(&planner, 10.0);
        let points = densifier.select(&collinear());

        // Each 10 m segment has 11 samples (both ends), picks: start, middle,
        // and the two earliest zero-delta samples.
        let indices: Vec<usize> = points.iter().map(|p| p.global_index).collect();
        assert_eq!(indices, vec![0, 1, 5, 11, 12, 16, 22]);
        let xs: Vec<f64> = points.iter().map(|p| p.pose.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 5.0, 10.0, 11.0, 15.0, 20.0]);
    }

    #[test]
    fn curved_path_follows_execution_order() {
        let planner = DubinsPlanner;
        let densifier = PathDensifier::new(&planner, 10.0);
        let poses = vec![
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(40.0, 0.0, FRAC_PI_2),
            Pose2D::new(40.0, 40.0, FRAC_PI_2),
        ];
        let points = densifier.select(&poses);

        // Start, middle, two maxima per segment plus the goal, minus merges.
        assert!(points.len() >= 4 && points.len() <= 9);
        assert_eq!(points.first().unwrap().pose, poses[0]);
        assert_eq!(points.last().unwrap().pose, poses[2]);
        assert!(points.iter().any(|p| p.pose == poses[1]));
        for pair in points.windows(2) {
            assert!(pair[0].global_index < pair[1].global_index);
        }
    }

    #[test]
    fn densified_waypoints_copy_template_controls() {
        let planner = DubinsPlanner;
        let densifier = PathDensifier::new(&planner, 10.0);
        let template = Waypoint::geographic("first", 58.0, 11.0, 3.5)
            .with_vertical(VerticalControl::Altitude(4.0))
            .with_speed(SpeedControl::Speed(1.2));

        let waypoints = densifier.densify(&template, &collinear(), "transit");
        let n = waypoints.len();
        assert!(n >= 3);
        assert_eq!(waypoints[0].name, format!("transit_1/{n}"));
        assert_eq!(waypoints[n - 1].name, format!("transit_{n}/{n}"));
        for wp in &waypoints {
            assert_eq!(wp.frame, FrameTag::Utm);
            assert_eq!(wp.tolerance_m, 3.5);
            assert_eq!(wp.vertical, VerticalControl::Altitude(4.0));
            assert_eq!(wp.speed, SpeedControl::Speed(1.2));
            assert!(wp.heading.is_some());
        }
    }

    #[test]
    fn degenerate_inputs() {
        let planner = DubinsPlanner;
        let densifier = PathDensifier::new(&planner, 10.0);
        assert!(densifier.select(&[]).is_empty());

        let single = densifier.select(&[Pose2D::new(1.0, 2.0, 0.0)]);
        assert_eq!(single.len(), 1);
        assert!(single[0].declared);
    }
}
