use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Latitude limit of the Web Mercator projection, in degrees.
pub const MERCATOR_MAX_LATITUDE: f64 = 85.051_129;

/// Unique identifier for a node in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from validating a geographic anchor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnchorError {
    #[error("{field} is not a finite number: {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("latitude {0} outside the Web Mercator range")]
    LatitudeOutOfRange(f64),
}

/// Real-world placement of a model's local origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoAnchor {
    pub longitude: f64,
    pub latitude: f64,
    /// Meters above the ellipsoid.
    #[serde(default)]
    pub altitude: f64,
}

impl GeoAnchor {
    pub const fn new(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }

    /// Check that the anchor is well formed and projectable.
    pub fn validate(&self) -> Result<(), AnchorError> {
        for (field, value) in [
            ("longitude", self.longitude),
            ("latitude", self.latitude),
            ("altitude", self.altitude),
        ] {
            if !value.is_finite() {
                return Err(AnchorError::NotFinite { field, value });
            }
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AnchorError::LongitudeOutOfRange(self.longitude));
        }
        if self.latitude.abs() > MERCATOR_MAX_LATITUDE {
            return Err(AnchorError::LatitudeOutOfRange(self.latitude));
        }
        Ok(())
    }
}

/// Model rotation in radians, one angle per axis.
///
/// Applied X first, then Y, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelRotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ModelRotation {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Drawing surface dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}
