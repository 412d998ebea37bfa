use glam::DVec3;
use std::path::PathBuf;
use std::thread::JoinHandle;

use geolayer_assets::ModelLoader;
use geolayer_common::{GeoAnchor, ModelRotation, SceneConfig};
use geolayer_geo::{GeoError, GeoreferenceTransform};
use geolayer_map::{CustomLayer, LayerError, MapContext, RenderingMode, RepaintTrigger};
use geolayer_render::{
    Camera, DebugTextRenderer, DirectionalLight, RendererOptions, SceneNode, SceneRenderer,
    SharedContext, SharedScene,
};

use crate::status::{ModelLoadState, ModelLoadStatus, SettleOnDrop};

/// Style id of the model layer.
pub const LAYER_ID: &str = "3d-model";

const LIGHT_COLOR: u32 = 0xffffff;

/// Static placement and resources for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayerConfig {
    pub anchor: GeoAnchor,
    pub rotation: ModelRotation,
    pub model_path: PathBuf,
    pub runtime_path: PathBuf,
}

impl From<&SceneConfig> for ModelLayerConfig {
    fn from(config: &SceneConfig) -> Self {
        Self {
            anchor: config.anchor,
            rotation: config.rotation,
            model_path: config.model_path.clone(),
            runtime_path: config.runtime_path.clone(),
        }
    }
}

type RendererFactory<R> = Box<dyn FnOnce(RendererOptions) -> R>;

/// State created by `on_add`.
struct Attached<R: SceneRenderer> {
    camera: Camera,
    scene: SharedScene,
    renderer: R,
    repaint: RepaintTrigger,
    last_output: Option<R::Output>,
}

/// Custom layer drawing one georeferenced model with its own renderer,
/// inside the map's graphics context.
pub struct ModelLayer<L: ModelLoader, R: SceneRenderer> {
    config: ModelLayerConfig,
    transform: GeoreferenceTransform,
    loader: Option<L>,
    make_renderer: Option<RendererFactory<R>>,
    attached: Option<Attached<R>>,
    status: ModelLoadStatus,
    load_thread: Option<JoinHandle<()>>,
}

impl<L: ModelLoader> ModelLayer<L, DebugTextRenderer> {
    pub fn with_debug_renderer(config: ModelLayerConfig, loader: L) -> Result<Self, GeoError> {
        Self::new(config, loader, DebugTextRenderer::new)
    }
}

impl<L: ModelLoader, R: SceneRenderer> ModelLayer<L, R> {
    /// Projects the anchor now; the renderer is built later from the map's context.
    pub fn new(
        config: ModelLayerConfig,
        loader: L,
        make_renderer: impl FnOnce(RendererOptions) -> R + 'static,
    ) -> Result<Self, GeoError> {
        let transform = GeoreferenceTransform::new(config.anchor, config.rotation)?;
        Ok(Self {
            config,
            transform,
            loader: Some(loader),
            make_renderer: Some(Box::new(make_renderer)),
            attached: None,
            status: ModelLoadStatus::new(),
            load_thread: None,
        })
    }

    pub fn config(&self) -> &ModelLayerConfig {
        &self.config
    }

    pub fn transform(&self) -> &GeoreferenceTransform {
        &self.transform
    }

    /// Move the model. The new anchor applies from the next frame.
    pub fn set_anchor(&mut self, anchor: GeoAnchor) -> Result<(), GeoError> {
        self.transform.set_anchor(anchor)?;
        self.config.anchor = anchor;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: ModelRotation) {
        self.transform.set_rotation(rotation);
        self.config.rotation = rotation;
    }

    /// Handle for observing the background load; clone it before handing
    /// the layer to a map.
    pub fn load_status(&self) -> ModelLoadStatus {
        self.status.clone()
    }

    /// Wait for the background load thread to finish.
    pub fn join_model_load(&mut self) -> ModelLoadState {
        if let Some(handle) = self.load_thread.take() {
            if handle.join().is_err() {
                tracing::error!(id = LAYER_ID, "model load thread panicked");
            }
        }
        self.status.get()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.attached.as_ref().map(|a| &a.camera)
    }

    pub fn scene(&self) -> Option<&SharedScene> {
        self.attached.as_ref().map(|a| &a.scene)
    }

    pub fn renderer(&self) -> Option<&R> {
        self.attached.as_ref().map(|a| &a.renderer)
    }

    /// Output of the most recent frame.
    pub fn last_output(&self) -> Option<&R::Output> {
        self.attached.as_ref().and_then(|a| a.last_output.as_ref())
    }

    fn spawn_model_load(&mut self, scene: SharedScene) -> Result<(), LayerError> {
        let Some(mut loader) = self.loader.take() else {
            return Err(LayerError::AlreadyAdded);
        };
        let model_path = self.config.model_path.clone();
        let runtime_path = self.config.runtime_path.clone();
        let status = self.status.clone();
        status.set(ModelLoadState::Pending);

        let spawned = std::thread::Builder::new()
            .name("model-load".into())
            .spawn(move || {
                let _settle = SettleOnDrop::new(status.clone());
                let result = pollster::block_on(async {
                    loader.set_runtime_path(&runtime_path).await?;
                    loader.load(&model_path).await
                });
                match result {
                    Ok(node) => {
                        let name = match &node {
                            SceneNode::Model(m) => m.name.clone(),
                            SceneNode::DirectionalLight(_) => "light".to_string(),
                        };
                        scene.add(node);
                        tracing::info!(model = %name, path = %model_path.display(), "model attached to scene");
                        status.set(ModelLoadState::Loaded { name });
                    }
                    Err(e) => {
                        tracing::error!(
                            path = %model_path.display(),
                            error = %e,
                            "model load failed; rendering without it"
                        );
                        status.set(ModelLoadState::Failed {
                            reason: e.to_string(),
                        });
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.load_thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.status.set(ModelLoadState::Failed {
                    reason: e.to_string(),
                });
                Err(LayerError::Spawn(e))
            }
        }
    }
}

impl<L: ModelLoader, R: SceneRenderer> CustomLayer for ModelLayer<L, R> {
    fn id(&self) -> &str {
        LAYER_ID
    }

    fn rendering_mode(&self) -> RenderingMode {
        RenderingMode::ThreeD
    }

    fn on_add(&mut self, map: &MapContext) -> Result<(), LayerError> {
        if self.attached.is_some() {
            return Err(LayerError::AlreadyAdded);
        }
        let make_renderer = self.make_renderer.take().ok_or(LayerError::AlreadyAdded)?;

        let camera = Camera::new();
        let scene = SharedScene::new();

        self.spawn_model_load(scene.clone())?;

        scene.add(SceneNode::DirectionalLight(
            DirectionalLight::new(LIGHT_COLOR).with_position(DVec3::new(0.0, -70.0, 100.0)),
        ));
        scene.add(SceneNode::DirectionalLight(
            DirectionalLight::new(LIGHT_COLOR).with_position(DVec3::new(0.0, 70.0, 100.0)),
        ));

        let mut renderer = make_renderer(RendererOptions {
            canvas: map.canvas(),
            context: map.context().clone(),
            antialias: map.antialias(),
        });
        // the map has already drawn into the frame buffer
        renderer.set_auto_clear(false);

        self.attached = Some(Attached {
            camera,
            scene,
            renderer,
            repaint: map.repaint_trigger(),
            last_output: None,
        });
        tracing::debug!(id = LAYER_ID, "model layer attached");
        Ok(())
    }

    fn render(&mut self, context: &SharedContext, matrix: &[f64; 16]) {
        let Some(attached) = self.attached.as_mut() else {
            tracing::warn!(id = LAYER_ID, "render called before on_add");
            return;
        };
        let _span = tracing::trace_span!("model_layer_render", frame = context.frame()).entered();

        attached.camera.projection_matrix = self.transform.compose(matrix);
        attached.renderer.reset_state();
        let output = {
            let scene = attached.scene.read();
            attached.renderer.render(&scene, &attached.camera)
        };
        attached.last_output = Some(output);
        attached.repaint.trigger();
    }

    fn on_remove(&mut self) {
        tracing::debug!(id = LAYER_ID, "model layer removed");
    }
}
