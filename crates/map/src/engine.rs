use geolayer_common::config::PLACEHOLDER_ACCESS_TOKEN;
use geolayer_common::{Canvas, SceneConfig};
use geolayer_render::SharedContext;

use crate::error::MapError;
use crate::layer::{CustomLayer, MapContext, RepaintTrigger};
use crate::style::{LayerType, Style, StyleLayer};
use crate::view::MapView;

/// Program id the map binds for its own layers.
const MAP_PROGRAM: u32 = 0x6d;

/// Map construction options.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub access_token: String,
    pub style_url: String,
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub antialias: bool,
    pub canvas: Canvas,
}

impl MapOptions {
    /// Center the map on the model anchor.
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            style_url: config.style_url.clone(),
            center_lng: config.anchor.longitude,
            center_lat: config.anchor.latitude,
            zoom: config.view.zoom,
            pitch: config.view.pitch,
            bearing: config.view.bearing,
            antialias: config.view.antialias,
            canvas: config.view.canvas,
        }
    }
}

/// Lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// A style finished loading. Fires on every `set_style`.
    StyleLoad,
    /// The map finished its first load. Fires once.
    Load,
}

/// Argument to [`HeadlessMap::add_layer`].
pub enum LayerSpec {
    Style(StyleLayer),
    Custom(Box<dyn CustomLayer>),
}

impl LayerSpec {
    pub fn custom(layer: impl CustomLayer + 'static) -> Self {
        Self::Custom(Box::new(layer))
    }
}

impl From<StyleLayer> for LayerSpec {
    fn from(layer: StyleLayer) -> Self {
        Self::Style(layer)
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Draw sources in the order they were issued.
    pub draws: Vec<String>,
    pub repaint_requested: bool,
}

type Handler = Box<dyn FnMut(&mut HeadlessMap) -> Result<(), MapError>>;

/// Map engine without a window or tile fetching.
pub struct HeadlessMap {
    options: MapOptions,
    style: Style,
    custom_layers: Vec<Box<dyn CustomLayer>>,
    context: SharedContext,
    repaint: RepaintTrigger,
    handlers: Vec<(MapEvent, Handler)>,
    errors: Vec<MapError>,
    loaded: bool,
    /// Repaint requests already answered by a frame.
    serviced: u64,
}

impl HeadlessMap {
    pub fn new(options: MapOptions) -> Result<Self, MapError> {
        let token = options.access_token.trim();
        if token.is_empty() || token == PLACEHOLDER_ACCESS_TOKEN {
            return Err(MapError::MissingAccessToken);
        }
        let context = SharedContext::new(options.canvas, options.antialias);
        tracing::info!(
            style = %options.style_url,
            lng = options.center_lng,
            lat = options.center_lat,
            zoom = options.zoom,
            pitch = options.pitch,
            "map created"
        );
        Ok(Self {
            options,
            style: Style::default(),
            custom_layers: Vec::new(),
            context,
            repaint: RepaintTrigger::new(),
            handlers: Vec::new(),
            errors: Vec::new(),
            loaded: false,
            serviced: 0,
        })
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn view(&self) -> MapView {
        MapView {
            center_lng: self.options.center_lng,
            center_lat: self.options.center_lat,
            zoom: self.options.zoom,
            pitch: self.options.pitch,
            bearing: self.options.bearing,
            canvas: self.options.canvas,
        }
    }

    /// Move the camera. Takes effect on the next frame.
    pub fn jump_to(&mut self, lng: f64, lat: f64, zoom: f64) {
        self.options.center_lng = lng;
        self.options.center_lat = lat;
        self.options.zoom = zoom;
        self.trigger_repaint();
    }

    pub fn trigger_repaint(&self) {
        self.repaint.trigger();
    }

    /// Total repaint requests so far.
    pub fn repaint_requests(&self) -> u64 {
        self.repaint.count()
    }

    pub fn on(
        &mut self,
        event: MapEvent,
        handler: impl FnMut(&mut HeadlessMap) -> Result<(), MapError> + 'static,
    ) {
        self.handlers.push((event, Box::new(handler)));
    }

    /// Errors raised by event handlers, oldest first.
    pub fn take_errors(&mut self) -> Vec<MapError> {
        std::mem::take(&mut self.errors)
    }

    fn fire(&mut self, event: MapEvent) {
        let mut handlers = std::mem::take(&mut self.handlers);
        for (kind, handler) in handlers.iter_mut() {
            if *kind != event {
                continue;
            }
            if let Err(e) = handler(self) {
                tracing::error!(?event, error = %e, "map event handler failed");
                self.errors.push(e);
            }
        }
        // handlers registered while firing go after the existing ones
        handlers.append(&mut self.handlers);
        self.handlers = handlers;
    }

    /// Replace the style. Custom layers belong to the old style and are removed.
    pub fn set_style(&mut self, style: Style) {
        for mut layer in self.custom_layers.drain(..) {
            layer.on_remove();
        }
        tracing::debug!(layers = style.layers.len(), "style loaded");
        self.style = style;
        self.fire(MapEvent::StyleLoad);
        if !self.loaded {
            self.loaded = true;
            self.fire(MapEvent::Load);
        }
        self.trigger_repaint();
    }

    /// Add a layer before `before`, or on top when `None`.
    pub fn add_layer(
        &mut self,
        layer: impl Into<LayerSpec>,
        before: Option<&str>,
    ) -> Result<(), MapError> {
        match layer.into() {
            LayerSpec::Style(layer) => {
                let id = layer.id.clone();
                self.style.add_layer(layer, before)?;
                tracing::debug!(%id, ?before, "style layer added");
            }
            LayerSpec::Custom(mut layer) => {
                let id = layer.id().to_string();
                self.style
                    .add_layer(StyleLayer::new(id.clone(), LayerType::Custom), before)?;
                let map = MapContext::new(self.context.clone(), self.repaint.clone());
                if let Err(source) = layer.on_add(&map) {
                    self.style.remove_layer(&id);
                    return Err(MapError::LayerSetup { id, source });
                }
                tracing::debug!(%id, ?before, mode = ?layer.rendering_mode(), "custom layer added");
                self.custom_layers.push(layer);
            }
        }
        self.trigger_repaint();
        Ok(())
    }

    pub fn remove_layer(&mut self, id: &str) -> Result<(), MapError> {
        self.style
            .remove_layer(id)
            .ok_or_else(|| MapError::LayerNotFound(id.to_string()))?;
        if let Some(idx) = self.custom_layers.iter().position(|l| l.id() == id) {
            let mut layer = self.custom_layers.remove(idx);
            layer.on_remove();
        }
        self.trigger_repaint();
        Ok(())
    }

    /// Draw one frame: style layers in order, custom layers at their slot.
    pub fn render_frame(&mut self) -> FrameReport {
        let before = self.repaint.count();
        self.serviced = before;
        let frame = self.context.begin_frame();
        let _span = tracing::trace_span!("map_frame", frame).entered();

        let matrix = self.view().projection_array();
        let zoom = self.options.zoom;

        for entry in &self.style.layers {
            if entry.kind == LayerType::Custom {
                if let Some(layer) = self.custom_layers.iter_mut().find(|l| l.id() == entry.id) {
                    layer.render(&self.context, &matrix);
                }
                continue;
            }
            if !entry.visible_at(zoom) {
                continue;
            }
            self.context.update_state(|s| {
                s.program = Some(MAP_PROGRAM);
                s.blend = true;
                s.cull_face = entry.kind == LayerType::FillExtrusion;
                s.depth_test = entry.kind == LayerType::FillExtrusion;
            });
            self.context.draw(entry.id.clone());
        }

        let repaint_requested = self.repaint.count() > before;
        let draws = self.context.draws().into_iter().map(|d| d.source).collect();
        tracing::trace!(frame, repaint_requested, "frame rendered");
        FrameReport {
            frame,
            draws,
            repaint_requested,
        }
    }

    /// Render frames until nothing asks for a repaint or `max_frames` is hit.
    /// Returns the number of frames drawn.
    pub fn run(&mut self, max_frames: u64) -> u64 {
        let mut frames = 0;
        let mut pending = self.repaint.count() > self.serviced;
        while pending && frames < max_frames {
            pending = self.render_frame().repaint_requested;
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerError;
    use crate::style::building_extrusion_layer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn options() -> MapOptions {
        let mut config = SceneConfig::default();
        config.access_token = "pk.test".into();
        MapOptions::from_config(&config)
    }

    #[derive(Default)]
    struct Probe {
        added: u32,
        removed: u32,
        frames: u32,
        seen_state: Vec<Option<u32>>,
    }

    struct ProbeLayer {
        id: String,
        probe: Rc<RefCell<Probe>>,
        repaint: Option<RepaintTrigger>,
        fail_setup: bool,
    }

    impl ProbeLayer {
        fn new(id: &str, probe: Rc<RefCell<Probe>>) -> Self {
            Self {
                id: id.into(),
                probe,
                repaint: None,
                fail_setup: false,
            }
        }
    }

    impl CustomLayer for ProbeLayer {
        fn id(&self) -> &str {
            &self.id
        }

        fn on_add(&mut self, map: &MapContext) -> Result<(), LayerError> {
            if self.fail_setup {
                return Err(LayerError::AlreadyAdded);
            }
            self.probe.borrow_mut().added += 1;
            self.repaint = Some(map.repaint_trigger());
            Ok(())
        }

        fn render(&mut self, context: &SharedContext, _matrix: &[f64; 16]) {
            let mut probe = self.probe.borrow_mut();
            probe.frames += 1;
            probe.seen_state.push(context.state().program);
            context.draw(self.id.clone());
            if let Some(r) = &self.repaint {
                r.trigger();
            }
        }

        fn on_remove(&mut self) {
            self.probe.borrow_mut().removed += 1;
        }
    }

    #[test]
    fn placeholder_token_rejected() {
        let mut opts = options();
        opts.access_token = PLACEHOLDER_ACCESS_TOKEN.into();
        assert!(matches!(
            HeadlessMap::new(opts.clone()),
            Err(MapError::MissingAccessToken)
        ));
        opts.access_token = "  ".into();
        assert!(matches!(
            HeadlessMap::new(opts),
            Err(MapError::MissingAccessToken)
        ));
    }

    #[test]
    fn options_center_on_anchor() {
        let opts = options();
        assert_eq!(opts.center_lng, -9.260586787894955);
        assert_eq!(opts.zoom, 18.0);
        assert_eq!(opts.pitch, 60.0);
    }

    #[test]
    fn style_load_fires_before_load_and_load_once() {
        let mut map = HeadlessMap::new(options()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        map.on(MapEvent::Load, move |_| {
            l1.borrow_mut().push("load");
            Ok(())
        });
        let l2 = log.clone();
        map.on(MapEvent::StyleLoad, move |_| {
            l2.borrow_mut().push("style.load");
            Ok(())
        });
        map.set_style(Style::bundled_light().unwrap());
        map.set_style(Style::bundled_light().unwrap());
        assert_eq!(*log.borrow(), vec!["style.load", "load", "style.load"]);
    }

    #[test]
    fn handler_errors_are_collected_not_fatal() {
        let mut map = HeadlessMap::new(options()).unwrap();
        map.on(MapEvent::Load, |map| {
            let label = map.style().first_label_layer_id()?.to_string();
            map.add_layer(building_extrusion_layer(), Some(&label))
        });
        map.set_style(Style::default());
        let errors = map.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], MapError::NoLabelLayer));
        assert!(map.style().layer("add-3d-buildings").is_none());
    }

    #[test]
    fn custom_layer_added_once_and_drawn_in_style_order() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        map.add_layer(
            LayerSpec::custom(ProbeLayer::new("3d-model", probe.clone())),
            Some("waterway-label"),
        )
        .unwrap();
        assert_eq!(probe.borrow().added, 1);

        let report = map.render_frame();
        let model_idx = report.draws.iter().position(|d| d == "3d-model").unwrap();
        let label_idx = report.draws.iter().position(|d| d == "waterway-label").unwrap();
        let road_idx = report.draws.iter().position(|d| d == "road-street").unwrap();
        assert!(road_idx < model_idx && model_idx < label_idx);
        assert!(report.repaint_requested);
        assert_eq!(probe.borrow().frames, 1);
        // the map left its program bound for the custom layer to deal with
        assert_eq!(probe.borrow().seen_state[0], Some(MAP_PROGRAM));
    }

    #[test]
    fn continuous_repaint_runs_until_limit() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        map.add_layer(LayerSpec::custom(ProbeLayer::new("probe", probe.clone())), None)
            .unwrap();
        assert_eq!(map.run(5), 5);
        assert_eq!(probe.borrow().frames, 5);
    }

    #[test]
    fn idle_map_stops_repainting() {
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        assert_eq!(map.run(10), 1);
        assert_eq!(map.run(10), 0);
        map.trigger_repaint();
        assert_eq!(map.run(10), 1);
    }

    #[test]
    fn failed_setup_leaves_style_untouched() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        let mut layer = ProbeLayer::new("broken", probe);
        layer.fail_setup = true;
        let err = map.add_layer(LayerSpec::custom(layer), None).unwrap_err();
        assert!(matches!(err, MapError::LayerSetup { ref id, .. } if id == "broken"));
        assert!(map.style().layer("broken").is_none());
    }

    #[test]
    fn style_change_removes_custom_layers() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        map.add_layer(LayerSpec::custom(ProbeLayer::new("probe", probe.clone())), None)
            .unwrap();
        map.set_style(Style::bundled_light().unwrap());
        assert_eq!(probe.borrow().removed, 1);
        map.render_frame();
        assert_eq!(probe.borrow().frames, 0);
    }

    #[test]
    fn remove_layer_calls_on_remove() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        map.add_layer(LayerSpec::custom(ProbeLayer::new("probe", probe.clone())), None)
            .unwrap();
        map.remove_layer("probe").unwrap();
        assert_eq!(probe.borrow().removed, 1);
        assert!(matches!(
            map.remove_layer("probe"),
            Err(MapError::LayerNotFound(_))
        ));
    }

    #[test]
    fn buildings_hidden_below_minzoom() {
        let mut map = HeadlessMap::new(options()).unwrap();
        map.set_style(Style::bundled_light().unwrap());
        map.add_layer(building_extrusion_layer(), Some("waterway-label"))
            .unwrap();
        assert!(map.render_frame().draws.contains(&"add-3d-buildings".to_string()));
        map.jump_to(-9.26, 39.09, 14.0);
        assert!(!map.render_frame().draws.contains(&"add-3d-buildings".to_string()));
    }
}
