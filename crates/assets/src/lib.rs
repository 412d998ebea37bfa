//! Model loading: the loader boundary and an IFC header loader.
//!
//! A loader turns a model file into a scene node the renderer can attach.
//! Loaders are asynchronous; the caller decides where the future runs.
//!
//! # Invariants
//! - `set_runtime_path` completes before `load` is called.
//! - A failed load never touches the scene.

use std::future::Future;
use std::path::{Path, PathBuf};

use geolayer_render::SceneNode;

mod ifc;

pub use ifc::{IfcHeader, IfcLoader};

/// Errors from model loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an IFC file: {0}")]
    NotIfc(PathBuf),
    #[error("IFC header has no FILE_SCHEMA: {0}")]
    MissingSchema(PathBuf),
    #[error("IFC file has no DATA section: {0}")]
    MissingData(PathBuf),
    #[error("runtime path not configured; call set_runtime_path before load")]
    RuntimeNotConfigured,
    #[error("runtime path is not a directory: {0}")]
    RuntimeMissing(PathBuf),
    #[error("model load failed: {0}")]
    Other(String),
}

/// Parses a model file into a renderable scene node.
pub trait ModelLoader: Send + 'static {
    /// Point the parser at its auxiliary runtime resources.
    fn set_runtime_path(
        &mut self,
        path: &Path,
    ) -> impl Future<Output = Result<(), LoadError>> + Send;

    /// Load the model at `path`.
    fn load(&self, path: &Path) -> impl Future<Output = Result<SceneNode, LoadError>> + Send;
}

pub fn crate_info() -> &'static str {
    "geolayer-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }

    #[test]
    fn error_messages() {
        let e = LoadError::NotIfc(PathBuf::from("a.txt"));
        assert_eq!(e.to_string(), "not an IFC file: a.txt");
        assert!(LoadError::RuntimeNotConfigured
            .to_string()
            .contains("set_runtime_path"));
    }
}
