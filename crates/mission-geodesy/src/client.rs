//! Geodesy service HTTP client.

use anyhow::{bail, Context, Result};
use mission_core::{GeoPoint, GeodesyEndpoint, GeodesyError, PlanarPoint};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A geodesy service reachable over HTTP.
///
/// Probing hits `GET {base}/health`; conversions are `POST`s to
/// `{base}/latlon_to_utm` and `{base}/utm_to_latlon`.
pub struct HttpGeodesyEndpoint {
    client: Client,
    base_url: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct LatLonToUtmRequest {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

#[derive(Debug, Deserialize)]
struct UtmPointResponse {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct UtmToLatLonRequest {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct LatLonResponse {
    latitude: f64,
    longitude: f64,
}

impl HttpGeodesyEndpoint {
    /// Endpoint named after its base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let name = base_url.clone();
        Self::named(name, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn named(
        name: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            bail!("geodesy endpoint URL is empty");
        }
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url,
            name: name.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health` succeeded within `timeout`.
    pub fn check_health(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Health check at {} returned {}", url, status);
        }
        Ok(())
    }

    pub fn latlon_to_utm(&self, lat: f64, lon: f64, alt: f64) -> Result<PlanarPoint> {
        let body = LatLonToUtmRequest {
            latitude: lat,
            longitude: lon,
            altitude: alt,
        };
        let point: UtmPointResponse = self.post("latlon_to_utm", &body)?;
        Ok(PlanarPoint::new(point.x, point.y))
    }

    pub fn utm_to_latlon(&self, x: f64, y: f64) -> Result<GeoPoint> {
        let body = UtmToLatLonRequest { x, y, z: 0.0 };
        let point: LatLonResponse = self.post("utm_to_latlon", &body)?;
        Ok(GeoPoint::new(point.latitude, point.longitude))
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("Failed to call {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            bail!("{} returned {}: {}", url, status, text);
        }

        response
            .json()
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    fn conversion_error(&self, err: anyhow::Error) -> GeodesyError {
        GeodesyError::Conversion {
            endpoint: self.name.clone(),
            reason: format!("{:#}", err),
        }
    }
}

impl GeodesyEndpoint for HttpGeodesyEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self, timeout: Duration) -> bool {
        match self.check_health(timeout) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(endpoint = %self.name, "Probe failed: {:#}", err);
                false
            }
        }
    }

    fn geo_to_planar(&self, lat: f64, lon: f64, alt: f64) -> Result<PlanarPoint, GeodesyError> {
        self.latlon_to_utm(lat, lon, alt)
            .map_err(|err| self.conversion_error(err))
    }

    fn planar_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, GeodesyError> {
        self.utm_to_latlon(x, y)
            .map_err(|err| self.conversion_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let endpoint = HttpGeodesyEndpoint::new("http://127.0.0.1:9/").unwrap();
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:9");
        assert_eq!(endpoint.name(), "http://127.0.0.1:9/");
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(HttpGeodesyEndpoint::new("").is_err());
    }

    #[test]
    fn unreachable_service_probes_false() {
        // nothing listens on the discard port
        let endpoint = HttpGeodesyEndpoint::new("http://127.0.0.1:9").unwrap();
        assert!(!endpoint.probe(Duration::from_millis(200)));
    }

    #[test]
    fn unreachable_service_conversion_is_an_error() {
        let endpoint =
            HttpGeodesyEndpoint::named("primary", "http://127.0.0.1:9", Duration::from_millis(200))
                .unwrap();
        match endpoint.geo_to_planar(58.0, 15.0, 0.0) {
            Err(GeodesyError::Conversion { endpoint, .. }) => assert_eq!(endpoint, "primary"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn request_bodies_use_service_field_names() {
        let body = serde_json::to_value(LatLonToUtmRequest {
            latitude: 58.0,
            longitude: 15.0,
            altitude: -2.0,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"latitude": 58.0, "longitude": 15.0, "altitude": -2.0})
        );
    }
}
