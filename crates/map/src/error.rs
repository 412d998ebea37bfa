use std::path::PathBuf;

use crate::layer::LayerError;

/// Errors from the map engine.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map access token is missing or still the placeholder")]
    MissingAccessToken,
    #[error("style has no symbol layer with a text field")]
    NoLabelLayer,
    #[error("layer not found: {0}")]
    LayerNotFound(String),
    #[error("layer already exists: {0}")]
    DuplicateLayer(String),
    #[error("style JSON error: {0}")]
    StyleJson(#[from] serde_json::Error),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("custom layer '{id}' failed to initialize: {source}")]
    LayerSetup { id: String, source: LayerError },
}
