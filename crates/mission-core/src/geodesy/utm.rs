//! In-process WGS84 UTM projection.
//!
//! Series expansions after Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), accurate to well under a millimeter inside the zone.

use super::{GeodesyEndpoint, GeodesyError};
use crate::models::{GeoPoint, PlanarPoint};
use std::time::Duration;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Fixed-zone UTM projection usable as a geodesy endpoint.
#[derive(Debug, Clone)]
pub struct UtmProjection {
    name: String,
    zone: u8,
    north: bool,
}

impl UtmProjection {
    pub fn new(zone: u8, north: bool) -> Self {
        let zone = zone.clamp(1, 60);
        Self {
            name: format!("utm-{}{}", zone, if north { 'N' } else { 'S' }),
            zone,
            north,
        }
    }

    /// Projection for the zone containing `point`.
    pub fn for_point(point: GeoPoint) -> Self {
        Self::new(zone_for_longitude(point.lon), point.lat >= 0.0)
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn is_north(&self) -> bool {
        self.north
    }

    fn central_meridian_rad(&self) -> f64 {
        (f64::from(self.zone) * 6.0 - 183.0).to_radians()
    }

    fn false_northing(&self) -> f64 {
        if self.north {
            0.0
        } else {
            FALSE_NORTHING_SOUTH
        }
    }

    fn forward(&self, lat: f64, lon: f64) -> PlanarPoint {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lon.to_radians() - self.central_meridian_rad());
        let m = meridian_arc(phi, e2);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;
        let y = K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0))
            + self.false_northing();

        PlanarPoint::new(x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> GeoPoint {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = (y - self.false_northing()) / K0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let tan_phi1 = phi1.tan();
        let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = WGS84_A / denom.sqrt();
        let r1 = WGS84_A * (1.0 - e2) / denom.powf(1.5);
        let t1 = tan_phi1 * tan_phi1;
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let d = (x - FALSE_EASTING) / (n1 * K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let lambda = self.central_meridian_rad()
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                    / 120.0)
                / cos_phi1;

        GeoPoint::new(phi.to_degrees(), lambda.to_degrees())
    }
}

/// UTM zone number for a longitude in degrees.
pub fn zone_for_longitude(lon: f64) -> u8 {
    let normalized = (lon + 180.0).rem_euclid(360.0);
    ((normalized / 6.0).floor() as u8 + 1).min(60)
}

fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

impl GeodesyEndpoint for UtmProjection {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe(&self, _timeout: Duration) -> bool {
        true
    }

    fn geo_to_planar(&self, lat: f64, lon: f64, _alt: f64) -> Result<PlanarPoint, GeodesyError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 84.0 {
            return Err(GeodesyError::Conversion {
                endpoint: self.name.clone(),
                reason: format!("({lat}, {lon}) is outside the UTM domain"),
            });
        }
        Ok(self.forward(lat, lon))
    }

    fn planar_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint, GeodesyError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeodesyError::Conversion {
                endpoint: self.name.clone(),
                reason: format!("({x}, {y}) is not a finite planar point"),
            });
        }
        Ok(self.inverse(x, y))
    }
}
