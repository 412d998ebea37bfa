//! Static configuration surface.
//!
//! Every field has a default, so an empty YAML document is a valid config.
//! The access token can be overridden with `GEOLAYER_ACCESS_TOKEN`.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use crate::types::{AnchorError, Canvas, GeoAnchor, ModelRotation};

/// Environment variable that replaces `access_token` when set.
pub const ACCESS_TOKEN_ENV: &str = "GEOLAYER_ACCESS_TOKEN";

/// Placeholder shipped in the default config. The map engine refuses it.
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "ACCESS_TOKEN";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid anchor: {0}")]
    Anchor(#[from] AnchorError),
}

/// Initial map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub zoom: f64,
    /// Degrees.
    pub pitch: f64,
    /// Degrees.
    pub bearing: f64,
    pub antialias: bool,
    pub canvas: Canvas,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom: 18.0,
            pitch: 60.0,
            bearing: 0.0,
            antialias: true,
            canvas: Canvas::default(),
        }
    }
}

/// Everything needed to place one model on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub access_token: String,
    pub style_url: String,
    pub anchor: GeoAnchor,
    pub rotation: ModelRotation,
    pub model_path: PathBuf,
    /// Directory holding the model parser's runtime resources.
    pub runtime_path: PathBuf,
    pub view: ViewConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            access_token: PLACEHOLDER_ACCESS_TOKEN.into(),
            style_url: "mapbox://styles/mapbox/light-v10".into(),
            anchor: GeoAnchor::new(-9.260586787894955, 39.091593392308724, 0.0),
            rotation: ModelRotation::new(FRAC_PI_2, 0.0, 0.0),
            model_path: PathBuf::from("01.ifc"),
            runtime_path: PathBuf::from("/wasm"),
            view: ViewConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.anchor.validate()?;
        Ok(config)
    }

    /// Load a YAML config file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_yaml(&text)?;
        config.apply_env();
        tracing::debug!(path = %path.as_ref().display(), "loaded scene config");
        Ok(config)
    }

    /// Replace the access token from the environment if it is set.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                self.access_token = token;
            }
        }
    }

    /// Serialize to YAML, e.g. to print the effective config.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
