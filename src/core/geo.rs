//! Equirectangular kilometer/degree conversions
//!
//! Flat-earth approximations, valid for the few-kilometer offsets a survey
//! grid spans. One degree of latitude is taken as 110.54 km and one degree
//! of longitude as 111.32 km scaled by the cosine of the latitude.

use crate::core::grid::GridCell;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Arithmetic midpoint of two positions. Good enough at survey scale;
    /// not a great-circle midpoint.
    pub fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
        GeoPoint {
            lat: (a.lat + b.lat) / 2.0,
            lng: (a.lng + b.lng) / 2.0,
        }
    }
}

/// Kilometer offset north/south to a latitude delta in degrees.
pub fn delta_km_to_delta_lat(km: f64) -> f64 {
    km / 110.54
}

/// Kilometer offset east/west to a longitude delta in degrees, at the given
/// latitude.
///
/// Undefined at exactly +-90 degrees where the cosine vanishes; callers stay
/// well inside the poles. The magnitude grows without bound as |lat|
/// approaches 90.
pub fn delta_km_to_delta_lng(km: f64, lat: f64) -> f64 {
    km / (111.32 * lat.to_radians().cos())
}

/// Project a grid cell onto the map: `spacing_km` kilometers per grid line,
/// centered on `center`.
///
/// The longitude scale is evaluated at the already-offset latitude, matching
/// the row the cell actually lands on.
pub fn cell_to_point(center: GeoPoint, spacing_km: f64, cell: GridCell) -> GeoPoint {
    let lat = center.lat + delta_km_to_delta_lat(spacing_km * f64::from(cell.y));
    let lng = center.lng + delta_km_to_delta_lng(spacing_km * f64::from(cell.x), lat);
    GeoPoint { lat, lng }
}
