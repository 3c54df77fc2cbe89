//! Geographic <-> planar conversion through an external geodesy service.
//!
//! The [`FrameTransformGateway`] owns an ordered list of endpoints, probes
//! them lazily on first use and caches the outcome for the life of the
//! gateway. Conversions never panic or block past the probe timeouts; when no
//! endpoint answered they return [`GeodesyError::Unavailable`] so callers can
//! drop the affected point and keep going.

pub mod fallback;
pub mod utm;

pub use fallback::{Availability, FallbackChain, Resolution};
pub use utm::UtmProjection;

use crate::models::{GeoPoint, PlanarPoint};
use crate::rules::PlannerRules;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeodesyError {
    /// No endpoint could be resolved.
    #[error("no geodesy endpoint available")]
    Unavailable,

    /// Every endpoint was probed and none answered.
    #[error("geodesy service unavailable, tried {endpoints:?}")]
    ServiceUnavailable { endpoints: Vec<String> },

    /// The endpoint answered but could not convert this point.
    #[error("{endpoint}: {reason}")]
    Conversion { endpoint: String, reason: String },
}

/// One geodesy service endpoint.
pub trait GeodesyEndpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Report whether the endpoint answers within `timeout`. Must not panic.
    fn probe(&self, timeout: Duration) -> bool;

    fn geo_to_planar(&self, lat: f64, lon: f64, alt: f64) -> Result<PlanarPoint, GeodesyError>;

    fn planar_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, GeodesyError>;
}

/// Injected conversion service with primary/fallback endpoints.
///
/// Resolution happens at most once; a gateway that failed to resolve stays
/// unusable.
pub struct FrameTransformGateway {
    chain: FallbackChain<Box<dyn GeodesyEndpoint>>,
    resolution: OnceLock<Resolution>,
}

impl FrameTransformGateway {
    /// Primary endpoint with a 0.5 s probe, fallback with 10 s.
    pub fn new(primary: Box<dyn GeodesyEndpoint>, fallback: Box<dyn GeodesyEndpoint>) -> Self {
        let rules = PlannerRules::default();
        Self::with_timeouts(
            primary,
            rules.primary_probe_timeout(),
            fallback,
            rules.fallback_probe_timeout(),
        )
    }

    pub fn with_timeouts(
        primary: Box<dyn GeodesyEndpoint>,
        primary_timeout: Duration,
        fallback: Box<dyn GeodesyEndpoint>,
        fallback_timeout: Duration,
    ) -> Self {
        Self::from_chain(
            FallbackChain::new()
                .then(primary, primary_timeout)
                .then(fallback, fallback_timeout),
        )
    }

    pub fn from_chain(chain: FallbackChain<Box<dyn GeodesyEndpoint>>) -> Self {
        Self {
            chain,
            resolution: OnceLock::new(),
        }
    }

    /// Probe a single endpoint.
    pub fn probe(endpoint: &dyn GeodesyEndpoint, timeout: Duration) -> Availability {
        tracing::info!(
            endpoint = endpoint.name(),
            "Waiting ({:.1}s) for geodesy endpoint",
            timeout.as_secs_f64()
        );
        if endpoint.probe(timeout) {
            Availability::Available
        } else {
            tracing::warn!(endpoint = endpoint.name(), "Geodesy endpoint could not be reached");
            Availability::Unavailable
        }
    }

    /// Resolve the endpoint to use, probing on the first call only.
    pub fn resolve(&self) -> Result<&dyn GeodesyEndpoint, GeodesyError> {
        let resolution = self.resolution.get_or_init(|| {
            let resolution = self.chain.resolve(|endpoint, timeout| {
                Self::probe(endpoint.as_ref(), timeout) == Availability::Available
            });
            match resolution.selected().and_then(|index| self.chain.get(index)) {
                Some(endpoint) => {
                    tracing::info!(endpoint = endpoint.name(), "Using geodesy endpoint")
                }
                None => tracing::error!(
                    endpoints = ?self.endpoint_names(),
                    "No geodesy endpoint could be reached; missions cannot be geo-anchored"
                ),
            }
            resolution
        });

        resolution
            .selected()
            .and_then(|index| self.chain.get(index))
            .map(|endpoint| endpoint.as_ref())
            .ok_or_else(|| GeodesyError::ServiceUnavailable {
                endpoints: self.endpoint_names(),
            })
    }

    /// True once resolution succeeded; resolves if needed.
    pub fn is_usable(&self) -> bool {
        self.resolve().is_ok()
    }

    /// Per-endpoint availability, all untested before the first resolve.
    pub fn availability(&self) -> Vec<Availability> {
        match self.resolution.get() {
            Some(resolution) => resolution.statuses().to_vec(),
            None => vec![Availability::Untested; self.chain.len()],
        }
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.chain
            .iter()
            .map(|(endpoint, _)| endpoint.name().to_string())
            .collect()
    }

    pub fn geo_to_planar(&self, lat: f64, lon: f64, alt: f64) -> Result<PlanarPoint, GeodesyError> {
        let endpoint = self.resolve().map_err(|_| GeodesyError::Unavailable)?;
        endpoint.geo_to_planar(lat, lon, alt)
    }

    pub fn planar_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, GeodesyError> {
        let endpoint = self.resolve().map_err(|_| GeodesyError::Unavailable)?;
        endpoint.planar_to_geo(x, y)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Endpoint that is either down or forwards to a UTM projection, counting
    /// probes and keeping the altitudes it was asked to project at.
    pub struct StubEndpoint {
        pub name: String,
        pub up: bool,
        pub probes: Arc<AtomicUsize>,
        pub altitudes: Arc<Mutex<Vec<f64>>>,
        inner: UtmProjection,
    }

    impl StubEndpoint {
        pub fn new(name: &str, up: bool) -> Self {
            Self {
                name: name.to_string(),
                up,
                probes: Arc::new(AtomicUsize::new(0)),
                altitudes: Arc::new(Mutex::new(Vec::new())),
                inner: UtmProjection::new(33, true),
            }
        }
    }

    impl GeodesyEndpoint for StubEndpoint {
        fn name(&self) -> &str {
            &self.name
        }

        fn probe(&self, _timeout: Duration) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.up
        }

        fn geo_to_planar(&self, lat: f64, lon: f64, alt: f64) -> Result<PlanarPoint, GeodesyError> {
            self.altitudes.lock().unwrap().push(alt);
            self.inner.geo_to_planar(lat, lon, alt)
        }

        fn planar_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, GeodesyError> {
            self.inner.planar_to_geo(x, y)
        }
    }

    /// Gateway whose primary is down and fallback is a working UTM zone 33N.
    pub fn fallback_gateway() -> FrameTransformGateway {
        FrameTransformGateway::new(
            Box::new(StubEndpoint::new("primary", false)),
            Box::new(StubEndpoint::new("fallback", true)),
        )
    }

    pub fn dead_gateway() -> FrameTransformGateway {
        FrameTransformGateway::new(
            Box::new(StubEndpoint::new("primary", false)),
            Box::new(StubEndpoint::new("fallback", false)),
        )
    }
}
