//! CLI configuration from environment.

use anyhow::{Context, Result};
use mission_core::geodesy::utm::zone_for_longitude;
use mission_core::{
    CoverageParams, FrameTransformGateway, GeoPoint, GeodesyEndpoint, PlannerRules, UtmProjection,
};
use mission_geodesy::HttpGeodesyEndpoint;
use std::env;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub geodesy_primary_url: Option<String>,
    pub geodesy_fallback_url: Option<String>,
    pub utm_zone: Option<u8>,
    pub utm_north: Option<bool>,
    pub coverage_swath_m: Option<f64>,
    pub localization_error_growth: Option<f64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            geodesy_primary_url: get("MISSION_GEODESY_PRIMARY_URL"),
            geodesy_fallback_url: get("MISSION_GEODESY_FALLBACK_URL"),
            utm_zone: get("MISSION_UTM_ZONE")
                .and_then(|s| s.parse().ok())
                .filter(|zone| (1..=60).contains(zone)),
            utm_north: get("MISSION_UTM_NORTH").and_then(|s| parse_bool(&s)),
            coverage_swath_m: get("MISSION_COVERAGE_SWATH_M").and_then(|s| s.parse().ok()),
            localization_error_growth: get("MISSION_LOC_ERROR_GROWTH")
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Coverage parameters, only when both are known.
    pub fn coverage(&self) -> Option<CoverageParams> {
        Some(CoverageParams {
            swath_width_m: self.coverage_swath_m?,
            localization_error_growth: self.localization_error_growth?,
        })
    }

    /// Local projection for the configured zone, or the zone of `hint`.
    pub fn projection(&self, hint: Option<GeoPoint>) -> UtmProjection {
        let zone = self
            .utm_zone
            .or_else(|| hint.map(|p| zone_for_longitude(p.lon)))
            .unwrap_or(1);
        let north = self
            .utm_north
            .or_else(|| hint.map(|p| p.lat >= 0.0))
            .unwrap_or(true);
        UtmProjection::new(zone, north)
    }

    /// Gateway over the configured endpoints. Any endpoint without a URL is
    /// served by the local projection.
    pub fn gateway(
        &self,
        rules: &PlannerRules,
        hint: Option<GeoPoint>,
    ) -> Result<FrameTransformGateway> {
        let primary = self.endpoint("primary", self.geodesy_primary_url.as_deref(), hint)?;
        let fallback = self.endpoint("fallback", self.geodesy_fallback_url.as_deref(), hint)?;
        Ok(FrameTransformGateway::with_timeouts(
            primary,
            rules.primary_probe_timeout(),
            fallback,
            rules.fallback_probe_timeout(),
        ))
    }

    fn endpoint(
        &self,
        role: &str,
        url: Option<&str>,
        hint: Option<GeoPoint>,
    ) -> Result<Box<dyn GeodesyEndpoint>> {
        match url {
            Some(url) => {
                let endpoint = HttpGeodesyEndpoint::new(url)
                    .with_context(|| format!("Invalid {} geodesy endpoint", role))?;
                Ok(Box::new(endpoint))
            }
            None => {
                let projection = self.projection(hint);
                tracing::debug!(role, endpoint = projection.name(), "Using local projection");
                Ok(Box::new(projection))
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "n" | "north" => Some(true),
        "0" | "false" | "no" | "s" | "south" => Some(false),
        _ => None,
    }
}
