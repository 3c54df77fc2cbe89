//! Core data models for the mission plan engine.

use crate::geodesy::{FrameTransformGateway, GeodesyError};
use crate::rules::SimilarityRules;
use crate::spatial::planar_distance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame a waypoint position is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameTag {
    /// Locally projected planar frame, meters
    #[default]
    Utm,
    /// Geographic latitude/longitude, degrees
    LatLon,
}

impl FrameTag {
    pub fn is_planar(self) -> bool {
        matches!(self, FrameTag::Utm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameTag::Utm => "utm",
            FrameTag::LatLon => "latlon",
        }
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from radians, the encoding used by plan-database messages.
    pub fn from_radians(lat_rad: f64, lon_rad: f64) -> Self {
        Self {
            lat: lat_rad.to_degrees(),
            lon: lon_rad.to_degrees(),
        }
    }
}

/// Point in the planar frame, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Planar point with a heading in radians (counter-clockwise from +x).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn point(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum VerticalControl {
    #[default]
    None,
    Depth(f64),
    Altitude(f64),
}

impl VerticalControl {
    pub fn same_mode(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn value(&self) -> Option<f64> {
        match *self {
            VerticalControl::None => None,
            VerticalControl::Depth(v) | VerticalControl::Altitude(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum SpeedControl {
    #[default]
    None,
    Rpm(f64),
    Speed(f64),
}

impl SpeedControl {
    pub fn same_mode(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn value(&self) -> Option<f64> {
        match *self {
            SpeedControl::None => None,
            SpeedControl::Rpm(v) | SpeedControl::Speed(v) => Some(v),
        }
    }
}

/// Maneuver a waypoint was produced from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    #[default]
    Goto,
    Sample,
    CoverArea,
}

/// Instrument flags carried by sample maneuvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFlags {
    #[serde(default)]
    pub syringe0: bool,
    #[serde(default)]
    pub syringe1: bool,
    #[serde(default)]
    pub syringe2: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaypointPayload {
    Sample(SampleFlags),
    Polygon { vertices: Vec<GeoPoint> },
}

/// A single navigable target.
///
/// Both planar (`x`, `y`) and geographic (`lat`, `lon`) fields are kept, but
/// only the one named by `frame` is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    #[serde(default)]
    pub maneuver: ManeuverKind,
    #[serde(default)]
    pub frame: FrameTag,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    /// Radians, only set on densified paths
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub vertical: VerticalControl,
    #[serde(default)]
    pub speed: SpeedControl,
    pub tolerance_m: f64,
    #[serde(default)]
    pub payload: Option<WaypointPayload>,
}

impl Waypoint {
    /// Waypoint in the planar frame with no vertical or speed control.
    pub fn planar(name: impl Into<String>, x: f64, y: f64, tolerance_m: f64) -> Self {
        Self {
            name: name.into(),
            maneuver: ManeuverKind::Goto,
            frame: FrameTag::Utm,
            x,
            y,
            lat: 0.0,
            lon: 0.0,
            heading: None,
            vertical: VerticalControl::None,
            speed: SpeedControl::None,
            tolerance_m,
            payload: None,
        }
    }

    /// Waypoint in the geographic frame, not yet projected.
    pub fn geographic(name: impl Into<String>, lat: f64, lon: f64, tolerance_m: f64) -> Self {
        Self {
            frame: FrameTag::LatLon,
            lat,
            lon,
            ..Self::planar(name, 0.0, 0.0, tolerance_m)
        }
    }

    pub fn with_vertical(mut self, vertical: VerticalControl) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn with_speed(mut self, speed: SpeedControl) -> Self {
        self.speed = speed;
        self
    }

    pub fn position(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }

    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Travel depth, zero unless depth-controlled.
    pub fn depth(&self) -> f64 {
        match self.vertical {
            VerticalControl::Depth(depth) => depth,
            _ => 0.0,
        }
    }

    pub fn frame(&self) -> FrameTag {
        self.frame
    }

    /// False only for a planar waypoint sitting exactly on the origin, i.e.
    /// one that was never successfully projected.
    pub fn is_actionable(&self) -> bool {
        !(self.x == 0.0 && self.y == 0.0 && self.frame.is_planar())
    }

    /// Check similarity using the default thresholds.
    pub fn is_too_similar_to(&self, other: &Waypoint) -> bool {
        self.is_too_similar_with_rules(other, &SimilarityRules::default())
    }

    /// Two waypoints are too similar when they share both control modes and
    /// are within tolerance on position, vertical value and speed value.
    ///
    /// An axis in `None` mode has no value and never counts as close.
    pub fn is_too_similar_with_rules(&self, other: &Waypoint, rules: &SimilarityRules) -> bool {
        if !self.vertical.same_mode(&other.vertical) || !self.speed.same_mode(&other.speed) {
            return false;
        }

        let xy_tolerance = self.tolerance_m.min(other.tolerance_m);
        let xy_close = planar_distance(self.position(), other.position()) < xy_tolerance;

        let z_close = match (self.vertical.value(), other.vertical.value()) {
            (Some(a), Some(b)) => (a - b).abs() < rules.vertical_tolerance_m,
            _ => false,
        };

        let speed_tolerance = match self.speed {
            SpeedControl::Rpm(_) => rules.rpm_tolerance,
            _ => rules.speed_tolerance_mps,
        };
        let speed_close = match (self.speed.value(), other.speed.value()) {
            (Some(a), Some(b)) => (a - b).abs() < speed_tolerance,
            _ => false,
        };

        xy_close && z_close && speed_close
    }

    /// Fill `x`/`y` from `lat`/`lon`.
    pub fn project(
        &mut self,
        gateway: &FrameTransformGateway,
        set_frame: bool,
    ) -> Result<(), GeodesyError> {
        self.project_at(gateway, 0.0, set_frame)
    }

    /// Like [`Waypoint::project`], handing `altitude` to the geodesy service.
    pub fn project_at(
        &mut self,
        gateway: &FrameTransformGateway,
        altitude: f64,
        set_frame: bool,
    ) -> Result<(), GeodesyError> {
        let planar = gateway.geo_to_planar(self.lat, self.lon, altitude)?;
        self.x = planar.x;
        self.y = planar.y;
        if set_frame {
            self.frame = FrameTag::Utm;
        }
        Ok(())
    }

    /// Fill `lat`/`lon` from `x`/`y`.
    pub fn unproject(
        &mut self,
        gateway: &FrameTransformGateway,
        set_frame: bool,
    ) -> Result<(), GeodesyError> {
        let geo = gateway.planar_to_geo(self.x, self.y)?;
        self.lat = geo.lat;
        self.lon = geo.lon;
        if set_frame {
            self.frame = FrameTag::LatLon;
        }
        Ok(())
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame {
            FrameTag::Utm => write!(
                f,
                "{} [{}] ({:.2}, {:.2})",
                self.name, self.frame, self.x, self.y
            )?,
            FrameTag::LatLon => write!(
                f,
                "{} [{}] ({:.7}, {:.7})",
                self.name, self.frame, self.lat, self.lon
            )?,
        }
        write!(f, " tol={:.1}m", self.tolerance_m)?;
        match self.vertical {
            VerticalControl::Depth(v) => write!(f, " depth={:.1}", v)?,
            VerticalControl::Altitude(v) => write!(f, " alt={:.1}", v)?,
            VerticalControl::None => {}
        }
        match self.speed {
            SpeedControl::Rpm(v) => write!(f, " rpm={:.0}", v),
            SpeedControl::Speed(v) => write!(f, " speed={:.2}", v),
            SpeedControl::None => Ok(()),
        }
    }
}

/// A single visualization pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A framed list of poses, both produced for visualization and accepted as
/// an externally supplied path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseList {
    /// `None` means the sender did not name a frame.
    #[serde(default)]
    pub frame: Option<FrameTag>,
    pub poses: Vec<Pose>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controlled(x: f64, y: f64) -> Waypoint {
        Waypoint::planar("wp", x, y, 2.0)
            .with_vertical(VerticalControl::Depth(1.0))
            .with_speed(SpeedControl::Rpm(1000.0))
    }

    #[test]
    fn origin_in_planar_frame_is_not_actionable() {
        let wp = Waypoint::planar("unprojected", 0.0, 0.0, 2.0);
        assert!(!wp.is_actionable());
    }

    #[test]
    fn origin_in_geographic_frame_is_actionable() {
        let wp = Waypoint::geographic("null island", 0.0, 0.0, 2.0);
        assert!(wp.is_actionable());
    }

    #[test]
    fn planar_point_off_origin_is_actionable() {
        assert!(Waypoint::planar("a", 0.0, 0.5, 2.0).is_actionable());
        assert!(Waypoint::planar("b", -3.0, 0.0, 2.0).is_actionable());
    }

    #[test]
    fn close_waypoints_with_same_modes_are_similar() {
        let a = controlled(0.0, 0.0);
        let mut b = controlled(1.0, 0.0);
        b.vertical = VerticalControl::Depth(1.5);
        b.speed = SpeedControl::Rpm(1040.0);

        assert!(a.is_too_similar_to(&b));
        assert!(b.is_too_similar_to(&a));
    }

    #[test]
    fn uses_smaller_tolerance() {
        let a = controlled(0.0, 0.0);
        let mut b = controlled(1.5, 0.0);
        b.tolerance_m = 1.0;

        assert!(!a.is_too_similar_to(&b));
        assert!(!b.is_too_similar_to(&a));
    }

    #[test]
    fn differing_vertical_mode_is_never_similar() {
        let a = controlled(0.0, 0.0);
        let b = controlled(0.0, 0.0).with_vertical(VerticalControl::Altitude(1.0));
        assert!(!a.is_too_similar_to(&b));
    }

    #[test]
    fn differing_speed_mode_is_never_similar() {
        let a = controlled(0.0, 0.0);
        let b = controlled(0.0, 0.0).with_speed(SpeedControl::Speed(1000.0));
        assert!(!a.is_too_similar_to(&b));
    }

    #[test]
    fn vertical_threshold_is_shared_by_depth_and_altitude() {
        let depth_a = controlled(0.0, 0.0);
        let depth_b = controlled(0.0, 0.0).with_vertical(VerticalControl::Depth(1.59));
        let alt_a = controlled(0.0, 0.0).with_vertical(VerticalControl::Altitude(1.0));
        let alt_b = controlled(0.0, 0.0).with_vertical(VerticalControl::Altitude(1.59));
        let alt_far = controlled(0.0, 0.0).with_vertical(VerticalControl::Altitude(1.61));

        assert!(depth_a.is_too_similar_to(&depth_b));
        assert!(alt_a.is_too_similar_to(&alt_b));
        assert!(!alt_a.is_too_similar_to(&alt_far));
    }

    #[test]
    fn speed_threshold_depends_on_mode() {
        let slow = controlled(0.0, 0.0).with_speed(SpeedControl::Speed(1.0));
        let slightly_faster = controlled(0.0, 0.0).with_speed(SpeedControl::Speed(1.05));
        let faster = controlled(0.0, 0.0).with_speed(SpeedControl::Speed(1.2));

        assert!(slow.is_too_similar_to(&slightly_faster));
        assert!(!slow.is_too_similar_to(&faster));

        let rpm_far = controlled(0.0, 0.0).with_speed(SpeedControl::Rpm(1060.0));
        assert!(!controlled(0.0, 0.0).is_too_similar_to(&rpm_far));
    }

    #[test]
    fn uncontrolled_axis_never_counts_as_close() {
        let a = Waypoint::planar("a", 0.0, 0.0, 2.0);
        let b = Waypoint::planar("b", 0.0, 0.0, 2.0);
        assert!(!a.is_too_similar_to(&b));
    }

    #[test]
    fn depth_is_zero_unless_depth_controlled() {
        let wp = controlled(0.0, 0.0);
        assert_eq!(wp.depth(), 1.0);
        let alt = wp.with_vertical(VerticalControl::Altitude(4.0));
        assert_eq!(alt.depth(), 0.0);
    }

    #[test]
    fn radians_are_converted_to_degrees() {
        let geo = GeoPoint::from_radians(std::f64::consts::FRAC_PI_4, -std::f64::consts::FRAC_PI_2);
        assert!((geo.lat - 45.0).abs() < 1e-12);
        assert!((geo.lon + 90.0).abs() < 1e-12);
    }

    #[test]
    fn controls_serialize_as_tagged_mode() {
        let json = serde_json::to_value(VerticalControl::Depth(2.5)).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "depth", "value": 2.5}));

        let none: SpeedControl = serde_json::from_value(serde_json::json!({"mode": "none"})).unwrap();
        assert_eq!(none, SpeedControl::None);
    }
}
