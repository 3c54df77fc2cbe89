//! The assembled mission plan and its execution surface.

use crate::coverage::CoverageParams;
use crate::error::{Diagnostics, MissionError};
use crate::models::{FrameTag, Pose, PoseList, Waypoint};
use crate::progress::{MissionProgress, MissionState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// An ordered, fully assembled mission.
///
/// Plans are built once by [`crate::MissionAssembler`] and only their
/// progress changes afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct MissionPlan {
    plan_id: String,
    frame: FrameTag,
    waypoints: Vec<Waypoint>,
    waypoint_names: Vec<String>,
    created_at: DateTime<Utc>,
    coverage: Option<CoverageParams>,
    gateway_available: bool,
    progress: MissionProgress,
    #[serde(skip)]
    diagnostics: Diagnostics,
}

impl MissionPlan {
    pub(crate) fn new(
        plan_id: String,
        frame: FrameTag,
        waypoints: Vec<Waypoint>,
        created_at: DateTime<Utc>,
        coverage: Option<CoverageParams>,
        gateway_available: bool,
        diagnostics: Diagnostics,
    ) -> Self {
        let waypoint_names = waypoints.iter().map(|wp| wp.name.clone()).collect();
        let progress = MissionProgress::new(waypoints.len());
        Self {
            plan_id,
            frame,
            waypoints,
            waypoint_names,
            created_at,
            coverage,
            gateway_available,
            progress,
            diagnostics,
        }
    }

    /// Placeholder id for plans that arrive without one.
    pub fn unnamed_id(created_at: DateTime<Utc>) -> String {
        format!("Unnamed - {}", created_at.to_rfc3339())
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    /// Frame every waypoint position is expressed in.
    pub fn frame(&self) -> FrameTag {
        self.frame
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint_names(&self) -> &[String] {
        &self.waypoint_names
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn coverage(&self) -> Option<CoverageParams> {
        self.coverage
    }

    /// False when the plan was built without a reachable geodesy endpoint.
    pub fn gateway_available(&self) -> bool {
        self.gateway_available
    }

    pub fn diagnostics(&self) -> &[MissionError] {
        self.diagnostics.entries()
    }

    pub fn state(&self) -> MissionState {
        self.progress.state()
    }

    /// Current target, starting the mission on the first call.
    pub fn peek_current(&mut self) -> Option<&Waypoint> {
        let index = self.progress.peek_index()?;
        self.waypoints.get(index)
    }

    /// Move to the next waypoint.
    ///
    /// Call [`MissionPlan::peek_current`] at least once first; advancing a
    /// plan that was never queried lands on the first waypoint.
    pub fn advance(&mut self) {
        self.progress.advance();
        if let MissionState::InProgress(i) = self.progress.state() {
            tracing::debug!(
                plan_id = %self.plan_id,
                index = i,
                waypoint = %self.waypoint_names[i],
                "Advanced to waypoint"
            );
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }

    pub fn is_in_progress(&self) -> bool {
        self.progress.is_in_progress()
    }

    pub fn current_index(&self) -> i64 {
        self.progress.current_index()
    }

    pub fn remaining(&self) -> usize {
        self.progress.remaining()
    }

    /// Waypoint positions for visualization. `z` is the travel depth,
    /// negated when `flip_depth` is set. Geographic plans give longitude as
    /// `x` and latitude as `y`.
    pub fn pose_list(&self, flip_depth: bool) -> PoseList {
        let poses = self
            .waypoints
            .iter()
            .map(|wp| {
                let (x, y) = match self.frame {
                    FrameTag::Utm => (wp.x, wp.y),
                    FrameTag::LatLon => (wp.lon, wp.lat),
                };
                Pose {
                    x,
                    y,
                    z: if flip_depth { -wp.depth() } else { wp.depth() },
                }
            })
            .collect();
        PoseList {
            frame: Some(self.frame),
            poses,
        }
    }

    /// `(x, y, z)` triples of an externally supplied path.
    ///
    /// A path that names a frame other than the plan's is rejected; one that
    /// names no frame is taken as-is.
    pub fn try_path_points(&self, path: &PoseList) -> Result<Vec<(f64, f64, f64)>, MissionError> {
        match path.frame {
            Some(found) if found != self.frame => Err(MissionError::FrameMismatch {
                expected: self.frame,
                found,
            }),
            _ => Ok(path.poses.iter().map(|p| (p.x, p.y, p.z)).collect()),
        }
    }

    /// Like [`MissionPlan::try_path_points`], logging a mismatch and
    /// returning an empty list.
    pub fn path_points(&self, path: &PoseList) -> Vec<(f64, f64, f64)> {
        self.try_path_points(path).unwrap_or_else(|err| {
            tracing::error!(plan_id = %self.plan_id, "{}", err);
            Vec::new()
        })
    }
}

impl fmt::Display for MissionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Mission plan {} ({} waypoints, created {})",
            self.plan_id,
            self.waypoints.len(),
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        for (i, wp) in self.waypoints.iter().enumerate() {
            let marker = match self.progress.state() {
                MissionState::InProgress(current) if current == i => ">",
                _ => " ",
            };
            writeln!(f, "{} {:3}: {}", marker, i, wp)?;
        }
        Ok(())
    }
}
