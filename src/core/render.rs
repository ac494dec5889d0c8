//! Parity coloring and rectangle output
//!
//! Rendering proper (basemap, interaction) is a downstream concern; this
//! module owns the documented contract with it: the red/green parity
//! gradient and the geometry of one colored rectangle per sample, plus a
//! GeoJSON serialization any map viewer can load.

use serde_json::{json, Value};

use crate::core::geo::{delta_km_to_delta_lat, delta_km_to_delta_lng, GeoPoint};
use crate::core::pipeline::Sample;

/// Combined-duration gradient color, `#RRGG00` uppercase.
///
/// `red = round(min(total, cap) / cap * 255)`, `green = 255 - red`. A zero
/// total is pure green, anything at or past `cap` is pure red. The cap is
/// explicit configuration; 10800 and 7200 seconds are the values seen in
/// the field.
pub fn parity_color(total_seconds: u32, cap_seconds: u32) -> String {
    let capped = total_seconds.min(cap_seconds);
    let red = (f64::from(capped) / f64::from(cap_seconds) * 255.0).round() as u8;
    let green = 255 - red;
    format!("#{red:02X}{green:02X}00")
}

/// One colored rectangle of the parity layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParityRect {
    pub sw: GeoPoint,
    pub ne: GeoPoint,
    pub color: String,
    pub to_first: Option<u32>,
    pub to_second: Option<u32>,
}

impl ParityRect {
    /// Build the rectangle for a sample: `spacing_km` on a side, centered
    /// on the sample point. Corner longitudes use the equirectangular
    /// scale at that corner's own latitude.
    pub fn from_sample(sample: &Sample, spacing_km: f64, cap_seconds: u32) -> Self {
        let half = spacing_km / 2.0;
        let point = sample.point;

        let sw_lat = point.lat - delta_km_to_delta_lat(half);
        let sw = GeoPoint {
            lat: sw_lat,
            lng: point.lng - delta_km_to_delta_lng(half, sw_lat),
        };

        let ne_lat = point.lat + delta_km_to_delta_lat(half);
        let ne = GeoPoint {
            lat: ne_lat,
            lng: point.lng + delta_km_to_delta_lng(half, ne_lat),
        };

        Self {
            sw,
            ne,
            color: parity_color(sample.total_seconds(cap_seconds), cap_seconds),
            to_first: sample.to_first,
            to_second: sample.to_second,
        }
    }

    fn to_feature(&self) -> Value {
        let ring = [
            [self.sw.lng, self.sw.lat],
            [self.ne.lng, self.sw.lat],
            [self.ne.lng, self.ne.lat],
            [self.sw.lng, self.ne.lat],
            [self.sw.lng, self.sw.lat],
        ];
        json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring],
            },
            "properties": {
                "fill": self.color,
                "fill-opacity": 0.5,
                "stroke": self.color,
                "stroke-opacity": 0.5,
                "stroke-width": 1,
                "minutes_to_first": self.to_first.map(|s| s / 60),
                "minutes_to_second": self.to_second.map(|s| s / 60),
            },
        })
    }
}

/// Serialize a rectangle layer as a GeoJSON `FeatureCollection`.
pub fn to_geojson(rects: &[ParityRect]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": rects.iter().map(ParityRect::to_feature).collect::<Vec<_>>(),
    })
}
