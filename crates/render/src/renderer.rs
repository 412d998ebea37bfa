use geolayer_common::Canvas;

use crate::context::SharedContext;
use crate::scene::{Camera, Scene};

/// Program id the debug renderer binds while drawing.
const DEBUG_PROGRAM: u32 = 0x3d;

/// Construction parameters for a renderer that draws into an existing context.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub canvas: Canvas,
    pub context: SharedContext,
    pub antialias: bool,
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads a scene and a camera, then draws into the context it
/// was constructed with. It never mutates the scene.
pub trait SceneRenderer {
    /// The output type produced by this renderer.
    type Output;

    /// Restore the shared context state before drawing into it.
    fn reset_state(&mut self);

    /// When false, `render` leaves the frame buffer contents alone.
    fn set_auto_clear(&mut self, auto_clear: bool);

    /// Render one frame of `scene` as seen by `camera`.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Self::Output;
}

/// Debug text renderer, standing in for a GPU backend.
///
/// Issues one draw into the shared context per frame and returns a
/// human-readable description of what it drew.
#[derive(Debug)]
pub struct DebugTextRenderer {
    context: SharedContext,
    canvas: Canvas,
    antialias: bool,
    auto_clear: bool,
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new(options: RendererOptions) -> Self {
        tracing::debug!(
            width = options.canvas.width,
            height = options.canvas.height,
            antialias = options.antialias,
            "debug renderer attached to shared context"
        );
        Self {
            context: options.context,
            canvas: options.canvas,
            antialias: options.antialias,
            auto_clear: true,
            frames: 0,
        }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn auto_clear(&self) -> bool {
        self.auto_clear
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl SceneRenderer for DebugTextRenderer {
    type Output = String;

    fn reset_state(&mut self) {
        self.context.reset_state();
    }

    fn set_auto_clear(&mut self, auto_clear: bool) {
        self.auto_clear = auto_clear;
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> String {
        if self.auto_clear {
            self.context.clear();
        }
        self.context.draw("scene");
        // Leave our own pipeline state behind, as a real backend would.
        self.context.update_state(|s| {
            s.program = Some(DEBUG_PROGRAM);
            s.depth_test = true;
            s.blend = true;
        });
        self.frames += 1;

        let mut out = String::new();
        out.push_str(&format!(
            "=== Scene (frame={}, nodes={}, models={}, lights={}) ===\n",
            self.frames,
            scene.len(),
            scene.models().count(),
            scene.lights().count()
        ));
        out.push_str(&format!(
            "Canvas: {}x{} antialias={}\n",
            self.canvas.width, self.canvas.height, self.antialias
        ));
        let m = camera.projection_matrix;
        let origin = m.project_point3(glam::DVec3::ZERO);
        out.push_str(&format!(
            "Camera: origin -> ({:.4}, {:.4}, {:.4})\n",
            origin.x, origin.y, origin.z
        ));
        for model in scene.models() {
            out.push_str(&format!(
                "  model '{}' entities={} source={}\n",
                model.name,
                model.entity_count,
                model.source.display()
            ));
        }
        for light in scene.lights() {
            let p = light.position;
            out.push_str(&format!(
                "  light #{:06x} intensity={:.1} pos=({:.3}, {:.3}, {:.3})\n",
                light.color, light.intensity, p.x, p.y, p.z
            ));
        }
        tracing::trace!(frame = self.frames, nodes = scene.len(), "scene rendered");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DirectionalLight, ModelNode, SceneNode};
    use glam::{DMat4, DVec3};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn renderer(ctx: &SharedContext) -> DebugTextRenderer {
        DebugTextRenderer::new(RendererOptions {
            canvas: ctx.canvas(),
            context: ctx.clone(),
            antialias: true,
        })
    }

    #[test]
    fn renders_into_given_context() {
        let ctx = SharedContext::new(Canvas::default(), true);
        let r = renderer(&ctx);
        assert!(r.context().same_context(&ctx));
    }

    #[test]
    fn empty_scene_output() {
        let ctx = SharedContext::new(Canvas::default(), true);
        let mut r = renderer(&ctx);
        let out = r.render(&Scene::new(), &Camera::new());
        assert!(out.contains("nodes=0"));
        assert!(out.contains("models=0"));
        assert_eq!(r.frames(), 1);
    }

    #[test]
    fn scene_with_model_and_lights() {
        let ctx = SharedContext::new(Canvas::default(), true);
        let mut r = renderer(&ctx);
        let mut scene = Scene::new();
        scene.add(SceneNode::DirectionalLight(
            DirectionalLight::new(0xffffff).with_position(DVec3::new(0.0, 70.0, 100.0)),
        ));
        scene.add(SceneNode::Model(ModelNode {
            name: "Office".into(),
            source: PathBuf::from("01.ifc"),
            entity_count: 300,
            metadata: BTreeMap::new(),
        }));
        let camera = Camera {
            projection_matrix: DMat4::from_translation(DVec3::new(0.5, 0.25, 0.0)),
        };
        let out = r.render(&scene, &camera);
        assert!(out.contains("model 'Office' entities=300"));
        assert!(out.contains("light #ffffff"));
        assert!(out.contains("origin -> (0.5000, 0.2500, 0.0000)"));
    }

    #[test]
    fn reset_before_draw_sees_defaults() {
        let ctx = SharedContext::new(Canvas::default(), true);
        let mut r = renderer(&ctx);
        ctx.begin_frame();
        ctx.update_state(|s| {
            s.program = Some(1);
            s.cull_face = true;
        });
        ctx.draw("map");

        r.set_auto_clear(false);
        r.reset_state();
        r.render(&Scene::new(), &Camera::new());

        let draws = ctx.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].state.program, Some(1));
        assert_eq!(draws[1].state.program, None);
        assert!(!draws[1].state.cull_face);
        // renderer leaves its own state behind
        assert_eq!(ctx.state().program, Some(DEBUG_PROGRAM));
    }

    #[test]
    fn auto_clear_wipes_map_draws() {
        let ctx = SharedContext::new(Canvas::default(), true);
        let mut r = renderer(&ctx);
        assert!(r.auto_clear());
        ctx.begin_frame();
        ctx.draw("map");
        r.render(&Scene::new(), &Camera::new());
        let draws = ctx.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].source, "scene");
    }
}
