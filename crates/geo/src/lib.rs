//! Georeference: place a model authored in meters into the map's Mercator space.
//!
//! # Invariants
//! - The anchor is projected once; frames only compose matrices.
//! - Local transform order is Translation · Scale · Rx · Ry · Rz.
//! - The Y scale is always the negation of the X/Z scale.

mod mercator;
mod transform;

pub use mercator::{EARTH_RADIUS, MercatorCoordinate, circumference_at_latitude};
pub use transform::{GeoError, GeoreferenceTransform, ModelTransformParams};

pub fn crate_info() -> &'static str {
    "geolayer-geo v0.1.0"
}
