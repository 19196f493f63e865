//! Geographic primitives for viewport caching.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Spans: degrees of latitude/longitude covered by a viewport
//! - Distance: meters

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const DEG_TO_RAD: f64 = PI / 180.0;

/// A point on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(*self, *other)
    }
}

/// Extent of a viewport in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Span {
    pub fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }
}

/// An unquantized viewport: the region a caller actually asked for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: Coordinate,
    pub span: Span,
}

impl Region {
    pub fn new(center: Coordinate, span: Span) -> Self {
        Self { center, span }
    }

    /// Radius in meters of the circle through the viewport corners.
    ///
    /// Handy for backends that query by center and radius.
    pub fn radius_meters(&self) -> f64 {
        let corner = Coordinate::new(
            self.center.latitude + self.span.latitude_delta / 2.0,
            self.center.longitude + self.span.longitude_delta / 2.0,
        );
        distance_meters(self.center, corner)
    }

    /// Whether `point` falls inside the viewport rectangle.
    pub fn contains(&self, point: &Coordinate) -> bool {
        let half_lat = self.span.latitude_delta.abs() / 2.0;
        let half_lon = self.span.longitude_delta.abs() / 2.0;
        (point.latitude - self.center.latitude).abs() <= half_lat
            && (point.longitude - self.center.longitude).abs() <= half_lon
    }
}

/// Calculate the great-circle distance between two coordinates.
///
/// Uses the haversine formula, which stays accurate over the short
/// distances viewport invalidation deals with.
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.latitude * DEG_TO_RAD;
    let lat2_rad = to.latitude * DEG_TO_RAD;
    let delta_lat = (to.latitude - from.latitude) * DEG_TO_RAD;
    let delta_lon = (to.longitude - from.longitude) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

// == Region Key ==
/// Quantized identifier for a viewport.
///
/// Centers and spans are rounded to a fixed number of decimal places so
/// that viewports differing only by sub-resolution jitter share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionKey(String);

impl RegionKey {
    /// Builds the key for `center` and `span` at `precision` decimal places.
    ///
    /// Pure: identical inputs always produce identical keys.
    pub fn quantize(center: Coordinate, span: Span, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        let q = |value: f64| quantize_component(value, scale);
        RegionKey(format!(
            "{}:{}:{}:{}@{}",
            q(center.latitude),
            q(center.longitude),
            q(span.latitude_delta),
            q(span.longitude_delta),
            precision
        ))
    }

    /// Key for a whole region descriptor.
    pub fn for_region(region: &Region, precision: u32) -> Self {
        Self::quantize(region.center, region.span, precision)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rounds to an integer count of `1 / scale` units; `-0` and non-finite
/// inputs collapse to `0`.
fn quantize_component(value: f64, scale: f64) -> i64 {
    let scaled = (value * scale).round();
    if scaled.is_finite() {
        // `as` saturates out-of-range floats.
        scaled as i64
    } else {
        0
    }
}
