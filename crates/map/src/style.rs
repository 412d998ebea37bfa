//! Map style: the ordered list of layers the map draws.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::Path;

use crate::error::MapError;

const BUNDLED_LIGHT: &str = include_str!("../styles/light.json");

/// Layer kinds understood by the map engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Background,
    Fill,
    Line,
    Symbol,
    Circle,
    Heatmap,
    FillExtrusion,
    Raster,
    Hillshade,
    Sky,
    Custom,
    #[serde(other)]
    Unknown,
}

/// One entry of a style's `layers` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        rename = "source-layer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, kind: LayerType) -> Self {
        Self {
            id: id.into(),
            kind,
            source: None,
            source_layer: None,
            filter: None,
            minzoom: None,
            maxzoom: None,
            layout: Map::new(),
            paint: Map::new(),
        }
    }

    /// Symbol layer that draws text labels.
    pub fn is_label(&self) -> bool {
        self.kind == LayerType::Symbol && self.layout.contains_key("text-field")
    }

    /// Whether the layer is drawn at `zoom`.
    pub fn visible_at(&self, zoom: f64) -> bool {
        self.minzoom.is_none_or(|min| zoom >= min) && self.maxzoom.is_none_or(|max| zoom < max)
    }
}

/// The `add-3d-buildings` layer: extruded building footprints that fade in
/// from zoom 15.
pub fn building_extrusion_layer() -> StyleLayer {
    let mut layer = StyleLayer::new("add-3d-buildings", LayerType::FillExtrusion);
    layer.source = Some("composite".into());
    layer.source_layer = Some("building".into());
    layer.filter = Some(json!(["==", "extrude", "true"]));
    layer.minzoom = Some(15.0);
    layer.paint.insert("fill-extrusion-color".into(), json!("#aaa"));
    layer.paint.insert(
        "fill-extrusion-height".into(),
        json!(["interpolate", ["linear"], ["zoom"], 15, 0, 15.05, ["get", "height"]]),
    );
    layer.paint.insert(
        "fill-extrusion-base".into(),
        json!(["interpolate", ["linear"], ["zoom"], 15, 0, 15.05, ["get", "min_height"]]),
    );
    layer.paint.insert("fill-extrusion-opacity".into(), json!(0.6));
    layer
}

fn default_version() -> u8 {
    8
}

/// A map style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sources: Map<String, Value>,
    #[serde(default)]
    pub layers: Vec<StyleLayer>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            sources: Map::new(),
            layers: Vec::new(),
        }
    }
}

impl Style {
    pub fn from_json(text: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// A small light basemap style shipped with the crate.
    pub fn bundled_light() -> Result<Self, MapError> {
        Self::from_json(BUNDLED_LIGHT)
    }

    pub fn to_json(&self) -> Result<String, MapError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn layer(&self, id: &str) -> Option<&StyleLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.id.as_str())
    }

    /// Id of the first symbol layer with a text field. Layers inserted
    /// before it are drawn beneath all labels.
    pub fn first_label_layer_id(&self) -> Result<&str, MapError> {
        self.layers
            .iter()
            .find(|l| l.is_label())
            .map(|l| l.id.as_str())
            .ok_or(MapError::NoLabelLayer)
    }

    /// Insert `layer` before the layer named `before`, or on top when `None`.
    pub fn add_layer(&mut self, layer: StyleLayer, before: Option<&str>) -> Result<(), MapError> {
        if self.index_of(&layer.id).is_some() {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        match before {
            Some(before_id) => {
                let idx = self
                    .index_of(before_id)
                    .ok_or_else(|| MapError::LayerNotFound(before_id.to_string()))?;
                self.layers.insert(idx, layer);
            }
            None => self.layers.push(layer),
        }
        Ok(())
    }

    pub fn remove_layer(&mut self, id: &str) -> Option<StyleLayer> {
        let idx = self.index_of(id)?;
        Some(self.layers.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Style {
        Style::from_json(
            r##"{
                "version": 8,
                "name": "sample",
                "sources": {"composite": {"type": "vector"}},
                "layers": [
                    {"id": "land", "type": "background", "paint": {"background-color": "#eee"}},
                    {"id": "road-shields", "type": "symbol", "layout": {"icon-image": "shield"}},
                    {"id": "waterway-label", "type": "symbol", "layout": {"text-field": ["get", "name"]}},
                    {"id": "poi-label", "type": "symbol", "layout": {"text-field": "{name}"}}
                ]
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn parses_style_document() {
        let style = sample();
        assert_eq!(style.version, 8);
        assert_eq!(style.name.as_deref(), Some("sample"));
        assert_eq!(style.layers.len(), 4);
        assert_eq!(style.layers[0].kind, LayerType::Background);
    }

    #[test]
    fn unknown_layer_type_is_tolerated() {
        let style =
            Style::from_json(r#"{"layers": [{"id": "x", "type": "model"}]}"#).unwrap();
        assert_eq!(style.layers[0].kind, LayerType::Unknown);
        assert_eq!(style.version, 8);
    }

    #[test]
    fn label_lookup_skips_icon_only_symbols() {
        assert_eq!(sample().first_label_layer_id().unwrap(), "waterway-label");
    }

    #[test]
    fn missing_label_layer_is_error() {
        let mut style = sample();
        style.layers.retain(|l| l.kind != LayerType::Symbol || !l.is_label());
        assert!(matches!(
            style.first_label_layer_id(),
            Err(MapError::NoLabelLayer)
        ));
    }

    #[test]
    fn add_layer_before_and_on_top() {
        let mut style = sample();
        style
            .add_layer(building_extrusion_layer(), Some("waterway-label"))
            .unwrap();
        style
            .add_layer(StyleLayer::new("overlay", LayerType::Custom), None)
            .unwrap();
        let ids: Vec<&str> = style.layer_ids().collect();
        assert_eq!(
            ids,
            vec![
                "land",
                "road-shields",
                "add-3d-buildings",
                "waterway-label",
                "poi-label",
                "overlay"
            ]
        );
    }

    #[test]
    fn add_layer_errors() {
        let mut style = sample();
        assert!(matches!(
            style.add_layer(StyleLayer::new("a", LayerType::Fill), Some("nope")),
            Err(MapError::LayerNotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            style.add_layer(StyleLayer::new("land", LayerType::Fill), None),
            Err(MapError::DuplicateLayer(id)) if id == "land"
        ));
        assert_eq!(style.layers.len(), 4);
    }

    #[test]
    fn remove_layer() {
        let mut style = sample();
        assert_eq!(style.remove_layer("land").unwrap().id, "land");
        assert!(style.remove_layer("land").is_none());
    }

    #[test]
    fn building_layer_shape() {
        let layer = building_extrusion_layer();
        assert_eq!(layer.kind, LayerType::FillExtrusion);
        assert_eq!(layer.source.as_deref(), Some("composite"));
        assert_eq!(layer.source_layer.as_deref(), Some("building"));
        assert_eq!(layer.filter, Some(json!(["==", "extrude", "true"])));
        assert_eq!(layer.minzoom, Some(15.0));
        assert_eq!(layer.paint["fill-extrusion-opacity"], json!(0.6));
        assert_eq!(layer.paint["fill-extrusion-height"][6], json!(["get", "height"]));
        assert_eq!(layer.paint["fill-extrusion-base"][6], json!(["get", "min_height"]));
        assert!(layer.visible_at(18.0));
        assert!(!layer.visible_at(14.0));

        let v = serde_json::to_value(&layer).unwrap();
        assert_eq!(v["type"], "fill-extrusion");
        assert_eq!(v["source-layer"], "building");
    }

    #[test]
    fn bundled_style_has_label_layer() {
        let style = Style::bundled_light().unwrap();
        assert!(style.layer("waterway-label").is_some());
        assert!(style.first_label_layer_id().is_ok());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), sample().to_json().unwrap()).unwrap();
        let loaded = Style::load(tmp.path()).unwrap();
        assert_eq!(loaded, sample());
        assert!(matches!(
            Style::load("/no/such/style.json"),
            Err(MapError::Io { .. })
        ));
    }
}
