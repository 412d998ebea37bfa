use glam::{DMat4, DVec3};
use std::f64::consts::{FRAC_PI_2, PI};

use geolayer_common::Canvas;
use geolayer_geo::MercatorCoordinate;

/// Width of one tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 512.0;

/// Vertical field of view of the map camera, in radians.
pub const DEFAULT_FOV: f64 = 0.643_501_108_793_284_4;

/// Camera over the map: where it looks and from which angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: f64,
    /// Degrees from nadir.
    pub pitch: f64,
    /// Degrees clockwise from north.
    pub bearing: f64,
    pub canvas: Canvas,
}

impl MapView {
    /// Map width in pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    /// Distance from the camera to the center point, in pixels.
    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 / (DEFAULT_FOV / 2.0).tan() * self.canvas.height as f64
    }

    /// Projection matrix for geometry in Mercator units.
    ///
    /// This is the matrix a custom layer receives each frame.
    pub fn projection_matrix(&self) -> DMat4 {
        let height = self.canvas.height.max(1) as f64;
        let pitch = self.pitch.to_radians();
        let angle = -self.bearing.to_radians();
        let camera_to_center = self.camera_to_center_distance();

        let ground_angle = FRAC_PI_2 + pitch;
        let fov_above_center = DEFAULT_FOV * 0.5;
        let top_half_surface_distance = fov_above_center.sin() * camera_to_center
            / (PI - ground_angle - fov_above_center)
                .clamp(0.01, PI - 0.01)
                .sin();
        let furthest = (FRAC_PI_2 - pitch).cos() * top_half_surface_distance + camera_to_center;
        let far = furthest * 1.01;
        let near = height / 50.0;

        let world_size = self.world_size();
        let center = MercatorCoordinate::from_lng_lat(self.center_lng, self.center_lat, 0.0);

        DMat4::perspective_rh_gl(DEFAULT_FOV, self.canvas.aspect(), near, far)
            * DMat4::from_scale(DVec3::new(1.0, -1.0, 1.0))
            * DMat4::from_translation(DVec3::new(0.0, 0.0, -camera_to_center))
            * DMat4::from_rotation_x(pitch)
            * DMat4::from_rotation_z(angle)
            * DMat4::from_translation(DVec3::new(
                -center.x * world_size,
                -center.y * world_size,
                0.0,
            ))
            * DMat4::from_scale(DVec3::splat(world_size))
    }

    /// Column-major array, as handed to custom layers.
    pub fn projection_array(&self) -> [f64; 16] {
        self.projection_matrix().to_cols_array()
    }
}
