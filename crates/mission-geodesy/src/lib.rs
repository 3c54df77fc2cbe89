//! Mission Geodesy - HTTP geodesy service endpoint
//!
//! Lets a [`mission_core::FrameTransformGateway`] convert coordinates
//! through a remote lat/lon <-> UTM service.

pub mod client;

pub use client::HttpGeodesyEndpoint;
