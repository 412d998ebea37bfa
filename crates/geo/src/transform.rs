use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use geolayer_common::{AnchorError, GeoAnchor, ModelRotation};

use crate::mercator::MercatorCoordinate;

/// Errors from building a georeference transform.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("invalid anchor: {0}")]
    InvalidAnchor(#[from] AnchorError),
}

/// Static placement parameters derived from an anchor.
///
/// `scale` is the meters-to-Mercator factor at the anchor itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransformParams {
    pub translate: DVec3,
    pub rotate: ModelRotation,
    pub scale: f64,
}

impl ModelTransformParams {
    /// Project the anchor into Mercator space.
    pub fn from_anchor(anchor: &GeoAnchor, rotate: ModelRotation) -> Result<Self, GeoError> {
        anchor.validate()?;
        let coord = MercatorCoordinate::from_anchor(anchor);
        Ok(Self {
            translate: coord.to_dvec3(),
            rotate,
            scale: coord.meter_in_mercator_units(),
        })
    }

    /// Per-axis scale. Y is flipped: model space is Y-up, Mercator y points south.
    pub fn scale_vector(&self) -> DVec3 {
        DVec3::new(self.scale, -self.scale, self.scale)
    }

    /// Rx · Ry · Rz.
    pub fn rotation_matrix(&self) -> DMat4 {
        DMat4::from_rotation_x(self.rotate.x)
            * DMat4::from_rotation_y(self.rotate.y)
            * DMat4::from_rotation_z(self.rotate.z)
    }

    /// Translation · Scale · Rx · Ry · Rz.
    pub fn local_matrix(&self) -> DMat4 {
        DMat4::from_translation(self.translate)
            * DMat4::from_scale(self.scale_vector())
            * self.rotation_matrix()
    }
}

/// Converts a fixed anchor and rotation into the per-frame camera matrix.
///
/// The anchor is projected when it is set, never during a frame.
#[derive(Debug, Clone)]
pub struct GeoreferenceTransform {
    anchor: GeoAnchor,
    params: ModelTransformParams,
}

impl GeoreferenceTransform {
    pub fn new(anchor: GeoAnchor, rotation: ModelRotation) -> Result<Self, GeoError> {
        let params = ModelTransformParams::from_anchor(&anchor, rotation)?;
        tracing::debug!(
            lng = anchor.longitude,
            lat = anchor.latitude,
            alt = anchor.altitude,
            scale = params.scale,
            "projected model anchor"
        );
        Ok(Self { anchor, params })
    }

    pub fn anchor(&self) -> GeoAnchor {
        self.anchor
    }

    pub fn params(&self) -> &ModelTransformParams {
        &self.params
    }

    /// Move the model. The new anchor is projected before the next frame.
    pub fn set_anchor(&mut self, anchor: GeoAnchor) -> Result<(), GeoError> {
        self.params = ModelTransformParams::from_anchor(&anchor, self.params.rotate)?;
        self.anchor = anchor;
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: ModelRotation) {
        self.params.rotate = rotation;
    }

    pub fn local_matrix(&self) -> DMat4 {
        self.params.local_matrix()
    }

    /// FrameProjection · Local, where `projection` is column-major.
    pub fn compose(&self, projection: &[f64; 16]) -> DMat4 {
        DMat4::from_cols_array(projection) * self.local_matrix()
    }
}
