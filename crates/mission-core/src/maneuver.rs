//! Plan-database maneuver decoding.
//!
//! Maneuvers arrive in the IMC encoding (numeric kinds, radians, unit
//! enums). [`Maneuver::from_message`] turns one raw record into a typed
//! maneuver, and [`ManeuverDecoder`] expands typed maneuvers into planar
//! waypoints, generating coverage sweeps for cover-area maneuvers.

use crate::coverage::{CoverageParams, CoveragePlanner};
use crate::error::{Diagnostics, MissionError};
use crate::geodesy::FrameTransformGateway;
use crate::models::{
    FrameTag, GeoPoint, ManeuverKind, PlanarPoint, SampleFlags, SpeedControl, VerticalControl,
    Waypoint, WaypointPayload,
};
use crate::rules::PlannerRules;
use serde::{Deserialize, Serialize};

/// IMC enumerations used by plan-database messages.
pub mod imc {
    pub const MANEUVER_GOTO: u16 = 450;
    pub const MANEUVER_COVER_AREA: u16 = 473;
    pub const MANEUVER_SAMPLE: u16 = 489;

    pub const Z_UNITS_NONE: u8 = 0;
    pub const Z_UNITS_DEPTH: u8 = 1;
    pub const Z_UNITS_ALTITUDE: u8 = 2;
    pub const Z_UNITS_HEIGHT: u8 = 3;

    pub const SPEED_UNITS_MPS: u8 = 0;
    pub const SPEED_UNITS_RPM: u8 = 1;
    pub const SPEED_UNITS_PERCENTAGE: u8 = 2;
}

/// Plan-database message carrying a full plan specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDbMessage {
    #[serde(default)]
    pub request_id: u32,
    pub plan_id: String,
    #[serde(default)]
    pub maneuvers: Vec<PlanManeuver>,
}

/// Polygon vertex, radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonVertex {
    pub lat: f64,
    pub lon: f64,
}

/// One raw maneuver record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanManeuver {
    pub maneuver_id: String,
    pub maneuver_kind: u16,
    /// Radians
    pub lat: f64,
    /// Radians
    pub lon: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub z_units: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub speed_units: u8,
    #[serde(default)]
    pub polygon: Vec<PolygonVertex>,
    #[serde(default)]
    pub kind_payload: Option<SampleFlags>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManeuverBody {
    Goto,
    Sample { flags: SampleFlags },
    CoverArea { polygon: Vec<GeoPoint> },
}

impl ManeuverBody {
    pub fn kind(&self) -> ManeuverKind {
        match self {
            ManeuverBody::Goto => ManeuverKind::Goto,
            ManeuverBody::Sample { .. } => ManeuverKind::Sample,
            ManeuverBody::CoverArea { .. } => ManeuverKind::CoverArea,
        }
    }
}

/// A maneuver with its encoding translated to internal types.
#[derive(Debug, Clone, PartialEq)]
pub struct Maneuver {
    pub id: String,
    pub name: String,
    /// Degrees
    pub anchor: GeoPoint,
    /// Raw z, positive down for depth and up for altitude
    pub z: f64,
    pub vertical: VerticalControl,
    pub speed: SpeedControl,
    pub body: ManeuverBody,
}

impl Maneuver {
    /// Decode a raw record. Unknown kinds are recorded and yield `None`;
    /// unknown control units are defaulted and recorded.
    pub fn from_message(raw: &PlanManeuver, diags: &mut Diagnostics) -> Option<Self> {
        let body = match raw.maneuver_kind {
            imc::MANEUVER_GOTO => ManeuverBody::Goto,
            imc::MANEUVER_SAMPLE => ManeuverBody::Sample {
                flags: raw.kind_payload.unwrap_or_default(),
            },
            imc::MANEUVER_COVER_AREA => ManeuverBody::CoverArea {
                polygon: raw
                    .polygon
                    .iter()
                    .map(|v| GeoPoint::from_radians(v.lat, v.lon))
                    .collect(),
            },
            kind => {
                diags.record(MissionError::UnsupportedManeuver {
                    maneuver_id: raw.maneuver_id.clone(),
                    kind,
                });
                return None;
            }
        };

        let vertical = match raw.z_units {
            imc::Z_UNITS_DEPTH => VerticalControl::Depth(raw.z),
            imc::Z_UNITS_ALTITUDE => VerticalControl::Altitude(raw.z),
            unit => {
                diags.record(MissionError::UnknownControlUnit {
                    maneuver_id: raw.maneuver_id.clone(),
                    axis: "z",
                    unit,
                    fallback: "depth 0",
                });
                VerticalControl::Depth(0.0)
            }
        };

        let speed = match raw.speed_units {
            imc::SPEED_UNITS_MPS => SpeedControl::Speed(raw.speed),
            imc::SPEED_UNITS_RPM => SpeedControl::Rpm(raw.speed),
            unit => {
                diags.record(MissionError::UnknownControlUnit {
                    maneuver_id: raw.maneuver_id.clone(),
                    axis: "speed",
                    unit,
                    fallback: "no speed control",
                });
                SpeedControl::None
            }
        };

        Some(Self {
            id: raw.maneuver_id.clone(),
            name: raw.name.clone(),
            anchor: GeoPoint::from_radians(raw.lat, raw.lon),
            z: raw.z,
            vertical,
            speed,
            body,
        })
    }

    pub fn kind(&self) -> ManeuverKind {
        self.body.kind()
    }
}

/// Expands maneuvers into planar waypoints.
pub struct ManeuverDecoder<'a> {
    gateway: &'a FrameTransformGateway,
    rules: &'a PlannerRules,
    coverage: &'a dyn CoveragePlanner,
    params: Option<CoverageParams>,
}

impl<'a> ManeuverDecoder<'a> {
    pub fn new(
        gateway: &'a FrameTransformGateway,
        rules: &'a PlannerRules,
        coverage: &'a dyn CoveragePlanner,
        params: Option<CoverageParams>,
    ) -> Self {
        Self {
            gateway,
            rules,
            coverage,
            params,
        }
    }

    /// Decode every maneuver in order and concatenate the waypoints.
    pub fn decode_mission(
        &self,
        plan_id: &str,
        maneuvers: &[PlanManeuver],
        diags: &mut Diagnostics,
    ) -> Vec<Waypoint> {
        if maneuvers.is_empty() {
            tracing::warn!(
                plan_id,
                "Plan has no maneuvers; does this vehicle know the plan's maneuvers?"
            );
        }

        let waypoints: Vec<Waypoint> = maneuvers
            .iter()
            .flat_map(|raw| self.decode(raw, diags))
            .collect();

        if waypoints.is_empty() {
            diags.record(MissionError::EmptyPlan {
                plan_id: plan_id.to_string(),
            });
        } else {
            tracing::info!(
                plan_id,
                maneuvers = maneuvers.len(),
                waypoints = waypoints.len(),
                "Decoded plan"
            );
        }
        waypoints
    }

    /// Decode one raw maneuver into zero or more waypoints.
    pub fn decode(&self, raw: &PlanManeuver, diags: &mut Diagnostics) -> Vec<Waypoint> {
        match Maneuver::from_message(raw, diags) {
            Some(maneuver) => self.expand(&maneuver, diags),
            None => Vec::new(),
        }
    }

    /// Expand a typed maneuver into waypoints.
    pub fn expand(&self, maneuver: &Maneuver, diags: &mut Diagnostics) -> Vec<Waypoint> {
        match &maneuver.body {
            ManeuverBody::Goto => self
                .anchor_point(maneuver, diags)
                .map(|p| vec![self.waypoint(maneuver, maneuver.name.clone(), p, None)])
                .unwrap_or_default(),
            ManeuverBody::Sample { flags } => self
                .anchor_point(maneuver, diags)
                .map(|p| {
                    let payload = Some(WaypointPayload::Sample(*flags));
                    let mut wp = self.waypoint(maneuver, maneuver.name.clone(), p, payload);
                    wp.maneuver = ManeuverKind::Sample;
                    vec![wp]
                })
                .unwrap_or_default(),
            ManeuverBody::CoverArea { polygon } => self.cover_area(maneuver, polygon, diags),
        }
    }

    fn cover_area(
        &self,
        maneuver: &Maneuver,
        polygon: &[GeoPoint],
        diags: &mut Diagnostics,
    ) -> Vec<Waypoint> {
        let Some(params) = self.params else {
            diags.record(MissionError::CoverageUnavailable {
                maneuver_id: maneuver.id.clone(),
            });
            return Vec::new();
        };

        let anchor: Vec<PlanarPoint> = self.anchor_point(maneuver, diags).into_iter().collect();

        let points = if polygon.len() > 2 {
            let mut planar = anchor.clone();
            for (i, vertex) in polygon.iter().enumerate() {
                let label = format!("{}/vertex{}", maneuver.id, i);
                if let Some(p) = self.convert(&label, *vertex, -maneuver.z, diags) {
                    planar.push(p);
                }
            }

            tracing::info!(
                maneuver_id = %maneuver.id,
                vertices = planar.len(),
                swath_m = params.swath_width_m,
                "Generating coverage pattern"
            );
            let pattern = self.coverage.plan(
                &planar,
                params.swath_width_m,
                params.localization_error_growth,
            );
            if pattern.is_empty() {
                tracing::warn!(
                    maneuver_id = %maneuver.id,
                    "Coverage planner produced no points, using the anchor only"
                );
                anchor
            } else {
                pattern
            }
        } else {
            diags.record(MissionError::DegeneratePolygon {
                maneuver_id: maneuver.id.clone(),
                vertices: polygon.len(),
            });
            anchor
        };

        let total = points.len();
        let payload = WaypointPayload::Polygon {
            vertices: polygon.to_vec(),
        };
        points
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let name = format!("{}_{}/{}", maneuver.id, i + 1, total);
                self.waypoint(maneuver, name, p, Some(payload.clone()))
            })
            .collect()
    }

    fn anchor_point(&self, maneuver: &Maneuver, diags: &mut Diagnostics) -> Option<PlanarPoint> {
        self.convert(&maneuver.name, maneuver.anchor, -maneuver.z, diags)
    }

    fn convert(
        &self,
        label: &str,
        point: GeoPoint,
        alt: f64,
        diags: &mut Diagnostics,
    ) -> Option<PlanarPoint> {
        match self.gateway.geo_to_planar(point.lat, point.lon, alt) {
            Ok(p) => Some(p),
            Err(err) => {
                diags.record(MissionError::ConversionFailure {
                    name: label.to_string(),
                    lat: point.lat,
                    lon: point.lon,
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    fn waypoint(
        &self,
        maneuver: &Maneuver,
        name: String,
        point: PlanarPoint,
        payload: Option<WaypointPayload>,
    ) -> Waypoint {
        Waypoint {
            name,
            maneuver: ManeuverKind::Goto,
            frame: FrameTag::Utm,
            x: point.x,
            y: point.y,
            lat: maneuver.anchor.lat,
            lon: maneuver.anchor.lon,
            heading: None,
            vertical: maneuver.vertical,
            speed: maneuver.speed,
            tolerance_m: self.rules.default_tolerance_m,
            payload,
        }
    }
}
