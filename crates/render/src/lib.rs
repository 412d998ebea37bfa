//! Rendering Adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - A renderer draws into the context it was given; it never creates its own.
//! - Any renderer sharing a context resets the context state before drawing.
//! - The scene graph may be written by a loader while frames read it.
//!
//! # Workaround
//! Provides a trait-based renderer interface with a debug text renderer in
//! place of a GPU backend. The trait is stable; swap in a GPU implementation
//! without changing consumers.

mod context;
mod renderer;
mod scene;

pub use context::{DrawRecord, GlState, SharedContext};
pub use renderer::{DebugTextRenderer, RendererOptions, SceneRenderer};
pub use scene::{Camera, DirectionalLight, ModelNode, Scene, SceneNode, SharedScene};

pub fn crate_info() -> &'static str {
    "geolayer-render v0.1.0"
}
