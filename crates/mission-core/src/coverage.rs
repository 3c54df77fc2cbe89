//! Area coverage patterns.

use crate::models::PlanarPoint;
use crate::spatial::planar_distance;
use serde::{Deserialize, Serialize};

/// Mission-level coverage parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageParams {
    /// Sensor swath width, meters
    pub swath_width_m: f64,
    /// Localization error accumulated per meter travelled
    pub localization_error_growth: f64,
}

/// Generates an ordered sweep through a planar polygon.
pub trait CoveragePlanner: Send + Sync {
    fn plan(
        &self,
        polygon: &[PlanarPoint],
        swath_width_m: f64,
        localization_error_growth: f64,
    ) -> Vec<PlanarPoint>;
}

/// Upper bound on sweep lines for a single polygon.
pub const MAX_SWEEP_LINES: usize = 10_000;

/// Back-and-forth sweep along the x axis.
///
/// Line spacing starts at the swath width and shrinks by the localization
/// error accumulated over the distance travelled so far, never below
/// `min_spacing_ratio` of the swath.
#[derive(Debug, Clone)]
pub struct LawnmowerCoverage {
    pub min_spacing_ratio: f64,
}

impl Default for LawnmowerCoverage {
    fn default() -> Self {
        Self {
            min_spacing_ratio: 0.1,
        }
    }
}

impl LawnmowerCoverage {
    /// Horizontal extent of the polygon on the line `y`, if it crosses it.
    fn span_at(polygon: &[PlanarPoint], y: f64) -> Option<(f64, f64)> {
        let n = polygon.len();
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;

        let mut j = n - 1;
        for i in 0..n {
            let a = polygon[j];
            let b = polygon[i];
            if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
            j = i;
        }

        if min_x.is_finite() && max_x.is_finite() {
            Some((min_x, max_x))
        } else {
            None
        }
    }
}

impl CoveragePlanner for LawnmowerCoverage {
    fn plan(
        &self,
        polygon: &[PlanarPoint],
        swath_width_m: f64,
        localization_error_growth: f64,
    ) -> Vec<PlanarPoint> {
        if polygon.len() < 3 || swath_width_m.is_nan() || swath_width_m <= 0.0 {
            return Vec::new();
        }

        let min_y = polygon.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = polygon.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let min_spacing = swath_width_m * self.min_spacing_ratio.clamp(0.01, 1.0);
        let growth = localization_error_growth.max(0.0);

        let mut points: Vec<PlanarPoint> = Vec::new();
        let mut travelled = 0.0;
        let mut y = min_y + swath_width_m / 2.0;
        let mut left_to_right = true;
        let mut lines = 0;

        while y < max_y {
            if lines == MAX_SWEEP_LINES {
                tracing::warn!(
                    swath_width_m,
                    lines,
                    "Coverage sweep truncated at the line limit"
                );
                break;
            }
            lines += 1;

            if let Some((x0, x1)) = Self::span_at(polygon, y) {
                let (start, end) = if left_to_right {
                    (PlanarPoint::new(x0, y), PlanarPoint::new(x1, y))
                } else {
                    (PlanarPoint::new(x1, y), PlanarPoint::new(x0, y))
                };
                if let Some(prev) = points.last() {
                    travelled += planar_distance(*prev, start);
                }
                travelled += planar_distance(start, end);
                points.push(start);
                points.push(end);
                left_to_right = !left_to_right;
            }

            let spacing = (swath_width_m - growth * travelled).max(min_spacing);
            let next = y + spacing;
            if next <= y {
                // spacing below the float resolution of y
                break;
            }
            y = next;
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<PlanarPoint> {
        vec![
            PlanarPoint::new(0.0, 0.0),
            PlanarPoint::new(size, 0.0),
            PlanarPoint::new(size, size),
            PlanarPoint::new(0.0, size),
        ]
    }

    #[test]
    fn square_without_error_growth_gets_evenly_spaced_lines() {
        let planner = LawnmowerCoverage::default();
        let points = planner.plan(&square(100.0), 20.0, 0.0);

        // Lines at y = 10, 30, 50, 70, 90
        assert_eq!(points.len(), 10);
        assert!((points[0].y - 10.0).abs() < 1e-9);
        assert!((points[9].y - 90.0).abs() < 1e-9);

        // Alternating direction
        assert!(points[0].x < points[1].x);
        assert!(points[2].x > points[3].x);
    }

    #[test]
    fn error_growth_tightens_spacing() {
        let planner = LawnmowerCoverage::default();
        let steady = planner.plan(&square(100.0), 20.0, 0.0);
        let drifting = planner.plan(&square(100.0), 20.0, 0.01);
        assert!(drifting.len() > steady.len());
    }

    #[test]
    fn degenerate_input_produces_nothing() {
        let planner = LawnmowerCoverage::default();
        assert!(planner.plan(&square(100.0)[..2], 20.0, 0.0).is_empty());
        assert!(planner.plan(&square(100.0), 0.0, 0.0).is_empty());
        assert!(planner.plan(&square(100.0), f64::NAN, 0.0).is_empty());
    }

    #[test]
    fn sub_resolution_swath_terminates() {
        let far_north: Vec<PlanarPoint> = square(100.0)
            .into_iter()
            .map(|p| PlanarPoint::new(p.x + 500_000.0, p.y + 6_450_000.0))
            .collect();
        let points = LawnmowerCoverage::default().plan(&far_north, 1e-10, 0.0);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn sweep_line_count_is_capped() {
        let points = LawnmowerCoverage::default().plan(&square(100.0), 1e-3, 0.0);
        assert_eq!(points.len(), 2 * MAX_SWEEP_LINES);
    }

    #[test]
    fn sweeps_stay_inside_triangle() {
        let triangle = vec![
            PlanarPoint::new(0.0, 0.0),
            PlanarPoint::new(100.0, 0.0),
            PlanarPoint::new(50.0, 100.0),
        ];
        let points = LawnmowerCoverage::default().plan(&triangle, 10.0, 0.0);
        assert!(!points.is_empty());
        for p in &points {
            let half_width = 50.0 * (1.0 - p.y / 100.0);
            assert!((p.x - 50.0).abs() <= half_width + 1e-9);
        }
    }
}
