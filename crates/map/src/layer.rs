use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use geolayer_common::Canvas;
use geolayer_render::SharedContext;

/// How a custom layer shares the depth buffer with the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingMode {
    /// Drawn on top of the map, no depth sharing.
    TwoD,
    /// Shares the depth buffer with 3D map content.
    #[default]
    ThreeD,
}

/// Errors a custom layer can report from setup.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("layer already added to a map")]
    AlreadyAdded,
    #[error("failed to spawn background task: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Requests another repaint from the map.
///
/// Cloned into layers at setup; the map reads the counter after each frame.
#[derive(Debug, Clone, Default)]
pub struct RepaintTrigger {
    requests: Arc<AtomicU64>,
}

impl RepaintTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Total requests since creation.
    pub fn count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// What a custom layer receives when it is added to a map.
#[derive(Debug, Clone)]
pub struct MapContext {
    canvas: Canvas,
    context: SharedContext,
    antialias: bool,
    repaint: RepaintTrigger,
}

impl MapContext {
    pub fn new(context: SharedContext, repaint: RepaintTrigger) -> Self {
        Self {
            canvas: context.canvas(),
            antialias: context.antialias(),
            context,
            repaint,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The map's own graphics context.
    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    pub fn repaint_trigger(&self) -> RepaintTrigger {
        self.repaint.clone()
    }
}

/// Extension point for injecting rendering into the map's draw cycle.
pub trait CustomLayer {
    fn id(&self) -> &str;

    fn rendering_mode(&self) -> RenderingMode {
        RenderingMode::ThreeD
    }

    /// Called once when the layer is added to a map.
    fn on_add(&mut self, map: &MapContext) -> Result<(), LayerError>;

    /// Called once per repaint with the map's column-major projection
    /// matrix in Mercator units. Must not block.
    fn render(&mut self, context: &SharedContext, matrix: &[f64; 16]);

    /// Called when the layer is removed or the style is replaced.
    fn on_remove(&mut self) {}
}
