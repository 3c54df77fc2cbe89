//! Mission CLI - command line front end for the mission plan engine.
//!
//! Reads plan-database or mission-control messages from JSON files and
//! assembles them into mission plans.

pub mod config;

pub use config::Config;

use anyhow::{Context, Result};
use mission_core::{
    DubinsPlanner, FrameTransformGateway, GeoPoint, MissionAssembler, MissionControlMessage,
    MissionError, MissionPlan, MissionSource, PlanDbMessage, PlannerRules,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// What the CLI was asked to assemble.
#[derive(Debug, Clone)]
pub enum Request {
    PlanDb(PlanDbMessage),
    Control {
        message: MissionControlMessage,
        densify: bool,
        vehicle_start: Option<GeoPoint>,
    },
}

impl Request {
    /// First geographic point of the request, used to pick a UTM zone.
    pub fn location_hint(&self) -> Option<GeoPoint> {
        match self {
            Request::PlanDb(msg) => msg
                .maneuvers
                .first()
                .map(|m| GeoPoint::from_radians(m.lat, m.lon)),
            Request::Control {
                message,
                vehicle_start,
                ..
            } => vehicle_start.or_else(|| {
                message
                    .waypoints
                    .first()
                    .map(|wp| GeoPoint::new(wp.lat, wp.lon))
            }),
        }
    }
}

/// Plan plus diagnostics, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct PlanReport<'a> {
    pub plan: &'a MissionPlan,
    pub diagnostics: Vec<String>,
}

impl<'a> PlanReport<'a> {
    pub fn new(plan: &'a MissionPlan) -> Self {
        Self {
            plan,
            diagnostics: plan.diagnostics().iter().map(|d| d.to_string()).collect(),
        }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Assemble `request` through `gateway`.
pub fn assemble(
    request: Request,
    gateway: &FrameTransformGateway,
    config: &Config,
    rules: PlannerRules,
) -> MissionPlan {
    let assembler = MissionAssembler::new(gateway)
        .with_rules(rules)
        .with_coverage_params(config.coverage());

    match request {
        Request::PlanDb(msg) => assembler.assemble(MissionSource::PlanDb(msg)),
        Request::Control {
            message,
            densify: true,
            vehicle_start,
        } => assembler
            .with_densifier(DubinsPlanner)
            .with_vehicle_start(vehicle_start)
            .assemble(MissionSource::MissionControl(message)),
        Request::Control { message, .. } => {
            assembler.assemble(MissionSource::MissionControl(message))
        }
    }
}

/// Render a plan for the terminal.
pub fn render_text(plan: &MissionPlan) -> String {
    let mut out = plan.to_string();
    if !plan.diagnostics().is_empty() {
        out.push_str("Diagnostics:\n");
        for diagnostic in plan.diagnostics() {
            out.push_str(&format!("  - {}\n", diagnostic));
        }
    }
    out
}

/// True when the plan could not be geo-anchored at all.
pub fn is_fatal(plan: &MissionPlan) -> bool {
    plan.diagnostics().iter().any(MissionError::is_fatal)
}
