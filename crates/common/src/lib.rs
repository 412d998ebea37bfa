//! Shared value types and the static configuration surface.
//!
//! # Invariants
//! - A `GeoAnchor` is immutable once configured; change it by replacing it.
//! - Configuration is read once at startup and never written back.

pub mod config;
mod types;

pub use config::{ConfigError, SceneConfig, ViewConfig};
pub use types::{AnchorError, Canvas, GeoAnchor, ModelRotation, NodeId, MERCATOR_MAX_LATITUDE};

pub fn crate_info() -> &'static str {
    "geolayer-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
