use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use geolayer_common::NodeId;

/// Camera whose projection matrix is supplied from outside every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection_matrix: DMat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection_matrix: DMat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Directional light. Only the direction of `position` matters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// 0xRRGGBB.
    pub color: u32,
    pub intensity: f32,
    pub position: DVec3,
}

impl DirectionalLight {
    pub fn new(color: u32) -> Self {
        Self {
            color,
            intensity: 1.0,
            position: DVec3::Y,
        }
    }

    /// Point the light from `position` towards the origin.
    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position.normalize_or_zero();
        self
    }

    pub fn direction(&self) -> DVec3 {
        -self.position
    }
}

/// A loaded model as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub name: String,
    pub source: PathBuf,
    /// Number of entity instances in the source file.
    pub entity_count: usize,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Model(ModelNode),
    DirectionalLight(DirectionalLight),
}

/// Flat scene graph. Nodes keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<(NodeId, SceneNode)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId::new();
        self.nodes.push((id, node));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|(n, _)| *n == id).map(|(_, node)| node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelNode> {
        self.nodes.iter().filter_map(|(_, node)| match node {
            SceneNode::Model(m) => Some(m),
            _ => None,
        })
    }

    pub fn lights(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.nodes.iter().filter_map(|(_, node)| match node {
            SceneNode::DirectionalLight(l) => Some(l),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Scene graph shared between the render loop and a background loader.
///
/// The loader takes the write lock once to attach its node; each frame takes
/// a read lock for the duration of the draw.
#[derive(Debug, Clone, Default)]
pub struct SharedScene {
    inner: Arc<RwLock<Scene>>,
}

impl SharedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Scene> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Scene> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, node: SceneNode) -> NodeId {
        self.write().add(node)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
