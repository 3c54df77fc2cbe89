//! Planner thresholds and tunables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds used by [`crate::Waypoint::is_too_similar_to`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRules {
    /// Applied to depth and altitude alike
    pub vertical_tolerance_m: f64,
    pub rpm_tolerance: f64,
    pub speed_tolerance_mps: f64,
}

impl Default for SimilarityRules {
    fn default() -> Self {
        Self {
            vertical_tolerance_m: 0.6,
            rpm_tolerance: 50.0,
            speed_tolerance_mps: 0.1,
        }
    }
}

/// Configuration for mission assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerRules {
    pub similarity: SimilarityRules,
    /// Goal tolerance given to decoded plan-database maneuvers
    pub default_tolerance_m: f64,
    /// Minimum turn radius for densified paths
    pub turn_radius_m: f64,
    /// Curvature maxima kept per densified segment
    pub significant_points_per_segment: usize,
    /// Arc length between curve samples
    pub sample_step_m: f64,
    pub primary_probe_timeout_s: f64,
    pub fallback_probe_timeout_s: f64,
}

impl Default for PlannerRules {
    fn default() -> Self {
        Self {
            similarity: SimilarityRules::default(),
            default_tolerance_m: 2.0,
            turn_radius_m: 10.0,
            significant_points_per_segment: 2,
            sample_step_m: 1.0,
            primary_probe_timeout_s: 0.5,
            fallback_probe_timeout_s: 10.0,
        }
    }
}

impl PlannerRules {
    pub fn primary_probe_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.primary_probe_timeout_s.max(0.0))
    }

    pub fn fallback_probe_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fallback_probe_timeout_s.max(0.0))
    }
}
