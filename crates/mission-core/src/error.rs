//! Mission construction errors and the diagnostics log.
//!
//! Everything below mission construction is absorbed locally: the failure is
//! logged, recorded on the plan, and assembly continues with whatever points
//! survived. Only [`MissionError::ServiceUnavailable`] stops a mission from
//! being geo-anchored at all.

use crate::models::FrameTag;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    /// Neither geodesy endpoint answered within its probe timeout.
    #[error("no geodesy endpoint reachable (tried {endpoints:?}); mission cannot be geo-anchored")]
    ServiceUnavailable { endpoints: Vec<String> },

    /// A single point could not be projected and was dropped.
    #[error("could not convert point {name} ({lat:.6}, {lon:.6}): {reason}")]
    ConversionFailure {
        name: String,
        lat: f64,
        lon: f64,
        reason: String,
    },

    #[error("skipping unsupported maneuver {maneuver_id} (kind {kind})")]
    UnsupportedManeuver { maneuver_id: String, kind: u16 },

    #[error("mission plan {plan_id} has no waypoints")]
    EmptyPlan { plan_id: String },

    /// A waypoint or path is in a frame other than the plan's.
    #[error("frame {found} does not match plan frame {expected}")]
    FrameMismatch { expected: FrameTag, found: FrameTag },

    #[error("maneuver {maneuver_id}: unknown {axis} unit {unit}, using {fallback}")]
    UnknownControlUnit {
        maneuver_id: String,
        axis: &'static str,
        unit: u8,
        fallback: &'static str,
    },

    #[error("cover-area maneuver {maneuver_id} skipped: swath width or localization error growth unknown")]
    CoverageUnavailable { maneuver_id: String },

    #[error("cover-area maneuver {maneuver_id} has {vertices} polygon vertices, using it as a simple waypoint")]
    DegeneratePolygon { maneuver_id: String, vertices: usize },
}

impl MissionError {
    /// The one mission-level hard failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MissionError::ServiceUnavailable { .. })
    }
}

/// Ordered log of everything that went wrong (or was defaulted) while
/// building a plan.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<MissionError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the diagnostic and keep it.
    pub fn record(&mut self, err: MissionError) {
        match &err {
            MissionError::ServiceUnavailable { .. } | MissionError::EmptyPlan { .. } => {
                tracing::error!("{}", err);
            }
            MissionError::DegeneratePolygon { .. } => tracing::info!("{}", err),
            _ => tracing::warn!("{}", err),
        }
        self.entries.push(err);
    }

    pub fn entries(&self) -> &[MissionError] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<MissionError> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_service_unavailable_is_fatal() {
        let fatal = MissionError::ServiceUnavailable {
            endpoints: vec!["primary".into(), "fallback".into()],
        };
        let empty = MissionError::EmptyPlan {
            plan_id: "survey".into(),
        };
        assert!(fatal.is_fatal());
        assert!(!empty.is_fatal());
    }

    #[test]
    fn record_keeps_order() {
        let mut diags = Diagnostics::new();
        diags.record(MissionError::UnsupportedManeuver {
            maneuver_id: "m1".into(),
            kind: 999,
        });
        diags.record(MissionError::EmptyPlan {
            plan_id: "p".into(),
        });

        assert_eq!(diags.len(), 2);
        assert!(matches!(
            diags.entries()[0],
            MissionError::UnsupportedManeuver { kind: 999, .. }
        ));
        assert!(matches!(diags.entries()[1], MissionError::EmptyPlan { .. }));
    }

    #[test]
    fn frame_mismatch_message_names_both_frames() {
        let err = MissionError::FrameMismatch {
            expected: FrameTag::Utm,
            found: FrameTag::LatLon,
        };
        assert_eq!(
            err.to_string(),
            "frame latlon does not match plan frame utm"
        );
    }
}
