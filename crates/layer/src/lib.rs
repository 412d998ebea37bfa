//! Model layer: bridges the map's custom-layer lifecycle to the 3D renderer.
//!
//! # Invariants
//! - Setup never waits for the model; frames render whatever the scene holds.
//! - Each frame composes the map projection with the fixed georeference.
//! - Each frame resets the shared context before drawing and requests exactly one repaint.
//! - A failed model load is logged and leaves the scene without the model.

mod model_layer;
mod status;

pub use model_layer::{LAYER_ID, ModelLayer, ModelLayerConfig};
pub use status::{ModelLoadState, ModelLoadStatus};

pub fn crate_info() -> &'static str {
    "geolayer-layer v0.1.0"
}
