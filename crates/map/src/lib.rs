//! Map engine boundary.
//!
//! The style model, custom layer extension point, view projection and a
//! headless map engine that drives custom layers the way an interactive map
//! would: one `on_add` per layer, one `render` per repaint.
//!
//! # Invariants
//! - Custom layers receive the map's shared context; the map never hands out a second one.
//! - Layers draw in style order.
//! - A frame is repainted only when something requested it.
//!
//! # Workaround
//! Tiles are not fetched or rasterized; the headless map issues one draw per
//! style layer into the shared context so layer ordering and context state
//! can be observed.

mod engine;
mod error;
mod layer;
mod style;
mod view;

pub use engine::{FrameReport, HeadlessMap, LayerSpec, MapEvent, MapOptions};
pub use error::MapError;
pub use layer::{CustomLayer, LayerError, MapContext, RenderingMode, RepaintTrigger};
pub use style::{LayerType, Style, StyleLayer, building_extrusion_layer};
pub use view::{DEFAULT_FOV, MapView, TILE_SIZE};

pub fn crate_info() -> &'static str {
    "geolayer-map v0.1.0"
}
