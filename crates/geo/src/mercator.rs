use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use geolayer_common::GeoAnchor;

/// Mean earth radius in meters, as used by the map engine.
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// Length of the parallel at `latitude` degrees, in meters.
pub fn circumference_at_latitude(latitude: f64) -> f64 {
    2.0 * PI * EARTH_RADIUS * latitude.to_radians().cos()
}

fn mercator_x_from_lng(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

fn mercator_y_from_lat(lat: f64) -> f64 {
    (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0
}

fn mercator_z_from_altitude(altitude: f64, lat: f64) -> f64 {
    altitude / circumference_at_latitude(lat)
}

fn lng_from_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

fn lat_from_mercator_y(y: f64) -> f64 {
    let y2 = 180.0 - y * 360.0;
    360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0
}

/// A point in the map's projected space.
///
/// The whole world spans `[0, 1]` on x and y with the origin at the
/// north-west corner; y grows southwards. `z` is altitude in the same units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MercatorCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MercatorCoordinate {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Project a longitude/latitude/altitude triple.
    pub fn from_lng_lat(lng: f64, lat: f64, altitude: f64) -> Self {
        Self {
            x: mercator_x_from_lng(lng),
            y: mercator_y_from_lat(lat),
            z: mercator_z_from_altitude(altitude, lat),
        }
    }

    pub fn from_anchor(anchor: &GeoAnchor) -> Self {
        Self::from_lng_lat(anchor.longitude, anchor.latitude, anchor.altitude)
    }

    /// Inverse projection back to a geographic anchor.
    pub fn to_anchor(&self) -> GeoAnchor {
        let lat = lat_from_mercator_y(self.y);
        GeoAnchor::new(
            lng_from_mercator_x(self.x),
            lat,
            self.z * circumference_at_latitude(lat),
        )
    }

    /// Size of one meter in Mercator units at this coordinate's latitude.
    ///
    /// Mercator is not uniformly scaled, so the factor is only valid near
    /// this coordinate.
    pub fn meter_in_mercator_units(&self) -> f64 {
        1.0 / circumference_at_latitude(lat_from_mercator_y(self.y))
    }

    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}
