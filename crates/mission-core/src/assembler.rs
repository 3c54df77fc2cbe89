//! Mission construction from one of three sources.

use crate::coverage::{CoverageParams, CoveragePlanner, LawnmowerCoverage};
use crate::densify::PathDensifier;
use crate::dubins::{CurvePlanner, DubinsPlanner};
use crate::error::{Diagnostics, MissionError};
use crate::geodesy::{FrameTransformGateway, GeodesyError};
use crate::maneuver::{ManeuverDecoder, PlanDbMessage};
use crate::mission::MissionPlan;
use crate::models::{FrameTag, GeoPoint, PlanarPoint, SpeedControl, VerticalControl, Waypoint};
use crate::rules::PlannerRules;
use crate::spatial::poses_with_heading;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Travel values of a goal-oriented waypoint; only the ones selected by the
/// control modes are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelValues {
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub depth: f64,
    #[serde(default)]
    pub rpm: f64,
    #[serde(default)]
    pub speed: f64,
}

/// Goal-oriented waypoint from a mission-control message, degrees. `z` is
/// the altitude handed to the geodesy service when projecting the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlWaypoint {
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub z: f64,
    pub tolerance: f64,
    #[serde(default)]
    pub z_control_mode: u8,
    #[serde(default)]
    pub speed_control_mode: u8,
    #[serde(default)]
    pub travel_values: TravelValues,
}

impl ControlWaypoint {
    pub const Z_CONTROL_NONE: u8 = 0;
    pub const Z_CONTROL_DEPTH: u8 = 1;
    pub const Z_CONTROL_ALTITUDE: u8 = 2;
    pub const SPEED_CONTROL_NONE: u8 = 0;
    pub const SPEED_CONTROL_RPM: u8 = 1;
    pub const SPEED_CONTROL_SPEED: u8 = 2;

    /// Unprojected waypoint carrying this goal's controls.
    pub fn to_waypoint(&self, fallback_name: String, diags: &mut Diagnostics) -> Waypoint {
        let name = if self.name.is_empty() {
            fallback_name
        } else {
            self.name.clone()
        };

        let vertical = match self.z_control_mode {
            Self::Z_CONTROL_NONE => VerticalControl::None,
            Self::Z_CONTROL_DEPTH => VerticalControl::Depth(self.travel_values.depth),
            Self::Z_CONTROL_ALTITUDE => VerticalControl::Altitude(self.travel_values.altitude),
            unit => {
                diags.record(MissionError::UnknownControlUnit {
                    maneuver_id: name.clone(),
                    axis: "z",
                    unit,
                    fallback: "no vertical control",
                });
                VerticalControl::None
            }
        };
        let speed = match self.speed_control_mode {
            Self::SPEED_CONTROL_NONE => SpeedControl::None,
            Self::SPEED_CONTROL_RPM => SpeedControl::Rpm(self.travel_values.rpm),
            Self::SPEED_CONTROL_SPEED => SpeedControl::Speed(self.travel_values.speed),
            unit => {
                diags.record(MissionError::UnknownControlUnit {
                    maneuver_id: name.clone(),
                    axis: "speed",
                    unit,
                    fallback: "no speed control",
                });
                SpeedControl::None
            }
        };

        Waypoint::geographic(name, self.lat, self.lon, self.tolerance)
            .with_vertical(vertical)
            .with_speed(speed)
    }
}

/// Mission-control message: an ordered list of goals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionControlMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub waypoints: Vec<ControlWaypoint>,
}

/// Where a mission comes from. Exactly one per assembly.
#[derive(Debug, Clone)]
pub enum MissionSource {
    /// Waypoints used verbatim.
    Waypoints {
        plan_id: Option<String>,
        waypoints: Vec<Waypoint>,
    },
    PlanDb(PlanDbMessage),
    MissionControl(MissionControlMessage),
}

/// Builds [`MissionPlan`]s.
///
/// Mission-control sources are densified along turn-constrained curves when
/// a curve planner is installed with [`MissionAssembler::with_densifier`].
pub struct MissionAssembler<'a, C: CurvePlanner = DubinsPlanner> {
    gateway: &'a FrameTransformGateway,
    rules: PlannerRules,
    coverage: Box<dyn CoveragePlanner>,
    coverage_params: Option<CoverageParams>,
    densifier: Option<C>,
    vehicle_start: Option<GeoPoint>,
}

impl<'a> MissionAssembler<'a, DubinsPlanner> {
    pub fn new(gateway: &'a FrameTransformGateway) -> Self {
        Self {
            gateway,
            rules: PlannerRules::default(),
            coverage: Box::new(LawnmowerCoverage::default()),
            coverage_params: None,
            densifier: None,
            vehicle_start: None,
        }
    }
}

impl<'a, C: CurvePlanner> MissionAssembler<'a, C> {
    pub fn with_rules(mut self, rules: PlannerRules) -> Self {
        self.rules = rules;
        self
    }

    /// Coverage generator and the mission's swath / error-growth parameters.
    pub fn with_coverage(
        mut self,
        planner: Box<dyn CoveragePlanner>,
        params: Option<CoverageParams>,
    ) -> Self {
        self.coverage = planner;
        self.coverage_params = params;
        self
    }

    pub fn with_coverage_params(mut self, params: Option<CoverageParams>) -> Self {
        self.coverage_params = params;
        self
    }

    /// Densify mission-control paths with `planner`.
    pub fn with_densifier<D: CurvePlanner>(self, planner: D) -> MissionAssembler<'a, D> {
        MissionAssembler {
            gateway: self.gateway,
            rules: self.rules,
            coverage: self.coverage,
            coverage_params: self.coverage_params,
            densifier: Some(planner),
            vehicle_start: self.vehicle_start,
        }
    }

    /// Vehicle position prepended to densified paths.
    pub fn with_vehicle_start(mut self, start: Option<GeoPoint>) -> Self {
        self.vehicle_start = start;
        self
    }

    pub fn rules(&self) -> &PlannerRules {
        &self.rules
    }

    pub fn assemble(&self, source: MissionSource) -> MissionPlan {
        let created_at = Utc::now();
        let mut diags = Diagnostics::new();
        let gateway_available = self.gateway.is_usable();

        let (plan_id, frame, waypoints) = match source {
            MissionSource::Waypoints { plan_id, waypoints } => {
                let plan_id = plan_id.unwrap_or_else(|| MissionPlan::unnamed_id(created_at));
                let frame = waypoints.first().map_or(FrameTag::Utm, |wp| wp.frame);
                let waypoints = match waypoints.iter().find(|wp| wp.frame != frame) {
                    Some(stray) => {
                        diags.record(MissionError::FrameMismatch {
                            expected: frame,
                            found: stray.frame,
                        });
                        Vec::new()
                    }
                    None => waypoints,
                };
                (plan_id, frame, waypoints)
            }
            MissionSource::PlanDb(msg) => {
                let waypoints = if gateway_available {
                    ManeuverDecoder::new(
                        self.gateway,
                        &self.rules,
                        self.coverage.as_ref(),
                        self.coverage_params,
                    )
                    .decode_mission(&msg.plan_id, &msg.maneuvers, &mut diags)
                } else {
                    self.record_unavailable(&mut diags);
                    Vec::new()
                };
                (msg.plan_id, FrameTag::Utm, waypoints)
            }
            MissionSource::MissionControl(msg) => {
                let plan_id = if msg.name.is_empty() {
                    MissionPlan::unnamed_id(created_at)
                } else {
                    msg.name.clone()
                };
                let waypoints = if gateway_available {
                    self.read_mission_control(&plan_id, &msg, &mut diags)
                } else {
                    self.record_unavailable(&mut diags);
                    Vec::new()
                };
                (plan_id, FrameTag::Utm, waypoints)
            }
        };

        let already_reported = diags
            .entries()
            .iter()
            .any(|e| matches!(e, MissionError::EmptyPlan { .. }));
        if waypoints.is_empty() && !already_reported {
            diags.record(MissionError::EmptyPlan {
                plan_id: plan_id.clone(),
            });
        }

        tracing::info!(
            plan_id = %plan_id,
            waypoints = waypoints.len(),
            diagnostics = diags.len(),
            "Mission plan assembled"
        );

        MissionPlan::new(
            plan_id,
            frame,
            waypoints,
            created_at,
            self.coverage_params,
            gateway_available,
            diags,
        )
    }

    fn record_unavailable(&self, diags: &mut Diagnostics) {
        diags.record(MissionError::ServiceUnavailable {
            endpoints: self.gateway.endpoint_names(),
        });
    }

    fn read_mission_control(
        &self,
        plan_id: &str,
        msg: &MissionControlMessage,
        diags: &mut Diagnostics,
    ) -> Vec<Waypoint> {
        let goals: Vec<(Waypoint, f64)> = msg
            .waypoints
            .iter()
            .enumerate()
            .map(|(i, wp)| (wp.to_waypoint(format!("{}_{}", plan_id, i + 1), diags), wp.z))
            .collect();

        match &self.densifier {
            Some(planner) => self.densify(planner, plan_id, &goals, diags),
            None => goals
                .into_iter()
                .filter_map(|(mut wp, z)| match wp.project_at(self.gateway, z, true) {
                    Ok(()) => Some(wp),
                    Err(err) => {
                        record_conversion_failure(diags, &wp.name, wp.geo(), &err);
                        None
                    }
                })
                .collect(),
        }
    }

    fn densify(
        &self,
        planner: &C,
        plan_id: &str,
        goals: &[(Waypoint, f64)],
        diags: &mut Diagnostics,
    ) -> Vec<Waypoint> {
        let Some((template, _)) = goals.first() else {
            return Vec::new();
        };

        let mut points: Vec<PlanarPoint> = Vec::with_capacity(goals.len() + 1);
        if let Some(start) = self.vehicle_start {
            match self.gateway.geo_to_planar(start.lat, start.lon, 0.0) {
                Ok(p) => points.push(p),
                Err(err) => record_conversion_failure(diags, "vehicle start", start, &err),
            }
        }
        for (goal, z) in goals {
            match self.gateway.geo_to_planar(goal.lat, goal.lon, *z) {
                Ok(p) => points.push(p),
                Err(err) => record_conversion_failure(diags, &goal.name, goal.geo(), &err),
            }
        }

        tracing::info!(
            plan_id,
            points = points.len(),
            turn_radius = self.rules.turn_radius_m,
            "Computing turn-constrained path"
        );
        let poses = poses_with_heading(&points);
        PathDensifier::from_rules(planner, &self.rules).densify(template, &poses, plan_id)
    }
}

fn record_conversion_failure(
    diags: &mut Diagnostics,
    name: &str,
    point: GeoPoint,
    err: &GeodesyError,
) {
    diags.record(MissionError::ConversionFailure {
        name: name.to_string(),
        lat: point.lat,
        lon: point.lon,
        reason: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::testing::{dead_gateway, fallback_gateway, StubEndpoint};
    use crate::maneuver::{imc, PlanManeuver};

    fn goal(lat: f64, lon: f64) -> ControlWaypoint {
        ControlWaypoint {
            name: String::new(),
            lat,
            lon,
            z: 0.0,
            tolerance: 3.0,
            z_control_mode: ControlWaypoint::Z_CONTROL_DEPTH,
            speed_control_mode: ControlWaypoint::SPEED_CONTROL_SPEED,
            travel_values: TravelValues {
                depth: 2.0,
                speed: 1.5,
                ..TravelValues::default()
            },
        }
    }

    fn control(n: usize) -> MissionControlMessage {
        MissionControlMessage {
            name: "transit".into(),
            waypoints: (0..n)
                .map(|i| goal(58.25 + 0.001 * i as f64, 15.40 + 0.0005 * (i % 2) as f64))
                .collect(),
        }
    }

    #[test]
    fn explicit_waypoints_are_used_verbatim() {
        let gateway = fallback_gateway();
        let waypoints = vec![
            Waypoint::planar("a", 1.0, 2.0, 2.0),
            Waypoint::planar("b", 3.0, 4.0, 2.0),
        ];
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::Waypoints {
            plan_id: Some("manual".into()),
            waypoints: waypoints.clone(),
        });

        assert_eq!(plan.plan_id(), "manual");
        assert_eq!(plan.frame(), FrameTag::Utm);
        assert_eq!(plan.waypoints(), waypoints.as_slice());
        assert_eq!(plan.waypoint_names(), &["a", "b"]);
        assert!(plan.diagnostics().is_empty());
    }

    #[test]
    fn explicit_plan_takes_the_frame_of_its_waypoints() {
        let gateway = fallback_gateway();
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::Waypoints {
            plan_id: Some("geo".into()),
            waypoints: vec![
                Waypoint::geographic("a", 58.2, 15.4, 2.0),
                Waypoint::geographic("b", 58.3, 15.4, 2.0),
            ],
        });
        assert_eq!(plan.frame(), FrameTag::LatLon);
        assert_eq!(plan.len(), 2);
        assert!(plan.diagnostics().is_empty());
    }

    #[test]
    fn mixed_frames_are_rejected() {
        let gateway = fallback_gateway();
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::Waypoints {
            plan_id: Some("mixed".into()),
            waypoints: vec![
                Waypoint::planar("a", 500_100.0, 6_450_000.0, 2.0),
                Waypoint::geographic("b", 58.2, 15.4, 2.0),
            ],
        });

        assert!(plan.is_empty());
        assert!(plan.pose_list(false).poses.is_empty());
        assert_eq!(
            plan.diagnostics()[0],
            MissionError::FrameMismatch {
                expected: FrameTag::Utm,
                found: FrameTag::LatLon,
            }
        );
        assert!(matches!(plan.diagnostics()[1], MissionError::EmptyPlan { .. }));
    }

    #[test]
    fn unnamed_plans_get_a_placeholder_id() {
        let gateway = fallback_gateway();
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::Waypoints {
            plan_id: None,
            waypoints: vec![Waypoint::planar("a", 1.0, 2.0, 2.0)],
        });
        assert!(plan.plan_id().starts_with("Unnamed - "));
    }

    #[test]
    fn plandb_without_gateway_is_empty_and_reports_service_unavailable() {
        let gateway = dead_gateway();
        let msg = PlanDbMessage {
            request_id: 1,
            plan_id: "survey".into(),
            maneuvers: vec![PlanManeuver {
                maneuver_id: "g".into(),
                maneuver_kind: imc::MANEUVER_GOTO,
                lat: 1.0,
                lon: 0.3,
                z: 0.0,
                z_units: imc::Z_UNITS_DEPTH,
                name: "g".into(),
                speed: 1.0,
                speed_units: imc::SPEED_UNITS_MPS,
                polygon: Vec::new(),
                kind_payload: None,
            }],
        };
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::PlanDb(msg));

        assert!(plan.is_empty());
        assert!(!plan.gateway_available());
        assert!(plan.diagnostics()[0].is_fatal());
        assert!(matches!(plan.diagnostics()[1], MissionError::EmptyPlan { .. }));
    }

    #[test]
    fn empty_plandb_reports_empty_plan_once() {
        let gateway = fallback_gateway();
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::PlanDb(PlanDbMessage {
            request_id: 0,
            plan_id: "nothing".into(),
            maneuvers: Vec::new(),
        }));
        assert!(plan.is_empty());
        assert_eq!(plan.diagnostics().len(), 1);
        assert!(matches!(plan.diagnostics()[0], MissionError::EmptyPlan { .. }));
    }

    #[test]
    fn mission_control_is_projected_in_order() {
        let gateway = fallback_gateway();
        let plan =
            MissionAssembler::new(&gateway).assemble(MissionSource::MissionControl(control(3)));

        assert_eq!(plan.plan_id(), "transit");
        assert_eq!(plan.waypoint_names(), &["transit_1", "transit_2", "transit_3"]);
        for wp in plan.waypoints() {
            assert_eq!(wp.frame, FrameTag::Utm);
            assert!(wp.is_actionable());
            assert_eq!(wp.vertical, VerticalControl::Depth(2.0));
            assert_eq!(wp.speed, SpeedControl::Speed(1.5));
        }
        assert!(plan.waypoints()[1].y > plan.waypoints()[0].y);
    }

    #[test]
    fn goal_z_is_handed_to_the_geodesy_service() {
        let fallback = StubEndpoint::new("fallback", true);
        let altitudes = fallback.altitudes.clone();
        let gateway = FrameTransformGateway::new(
            Box::new(StubEndpoint::new("primary", false)),
            Box::new(fallback),
        );
        let mut msg = control(2);
        msg.waypoints[0].z = -4.0;
        msg.waypoints[1].z = 7.5;

        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::MissionControl(msg));
        assert_eq!(plan.len(), 2);
        assert_eq!(*altitudes.lock().unwrap(), vec![-4.0, 7.5]);
    }

    #[test]
    fn unprojectable_goal_is_dropped() {
        let gateway = fallback_gateway();
        let mut msg = control(3);
        msg.waypoints[1].lat = 89.0;
        let plan = MissionAssembler::new(&gateway).assemble(MissionSource::MissionControl(msg));

        assert_eq!(plan.len(), 2);
        assert!(matches!(
            plan.diagnostics()[0],
            MissionError::ConversionFailure { .. }
        ));
    }

    #[test]
    fn densified_mission_keeps_goals_and_controls() {
        let gateway = fallback_gateway();
        let msg = control(3);
        let plan = MissionAssembler::new(&gateway)
            .with_densifier(DubinsPlanner)
            .assemble(MissionSource::MissionControl(msg.clone()));

        assert!(plan.len() > 3);
        let first = &plan.waypoints()[0];
        let last = &plan.waypoints()[plan.len() - 1];
        let to_planar = |wp: &ControlWaypoint| gateway.geo_to_planar(wp.lat, wp.lon, 0.0).unwrap();
        let expected_first = to_planar(&msg.waypoints[0]);
        let expected_last = to_planar(&msg.waypoints[2]);
        assert!((first.x - expected_first.x).abs() < 1e-9);
        assert!((first.y - expected_first.y).abs() < 1e-9);
        assert!((last.x - expected_last.x).abs() < 1e-9);
        assert!((last.y - expected_last.y).abs() < 1e-9);

        let n = plan.len();
        assert_eq!(plan.waypoint_names()[0], "transit_1/".to_string() + &n.to_string());
        for wp in plan.waypoints() {
            assert_eq!(wp.tolerance_m, 3.0);
            assert_eq!(wp.vertical, VerticalControl::Depth(2.0));
            assert!(wp.heading.is_some());
        }
    }

    #[test]
    fn vehicle_start_is_prepended_before_densifying() {
        let gateway = fallback_gateway();
        let start = GeoPoint::new(58.249, 15.399);
        let plan = MissionAssembler::new(&gateway)
            .with_densifier(DubinsPlanner)
            .with_vehicle_start(Some(start))
            .assemble(MissionSource::MissionControl(control(2)));

        let origin = gateway.geo_to_planar(start.lat, start.lon, 0.0).unwrap();
        let first = &plan.waypoints()[0];
        assert!((first.x - origin.x).abs() < 1e-9 && (first.y - origin.y).abs() < 1e-9);
    }

    #[test]
    fn mission_control_without_gateway_is_empty() {
        let gateway = dead_gateway();
        let plan = MissionAssembler::new(&gateway)
            .with_densifier(DubinsPlanner)
            .assemble(MissionSource::MissionControl(control(2)));
        assert!(plan.is_empty());
        assert!(plan.diagnostics()[0].is_fatal());
    }
}
