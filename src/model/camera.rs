use glam::{Mat4, Vec2, Vec3};

use crate::utils;

/// Camera as published to the render cache.
///
/// `Default` is the all-zero camera an empty cache reports; live cameras start from [`Camera::new`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Camera {
    pub position: Vec3,
    /// Pitch, yaw in radians
    pub rotation: Vec2,
    pub zoom: f32,
}

impl Camera {
    pub const FOV_Y: f32 = 60.0 * std::f32::consts::PI / 180.0;
    pub const Z_NEAR: f32 = 0.1;
    pub const Z_FAR: f32 = 1000.0;

    pub fn new(position: Vec3) -> Self {
        Self { position, rotation: Vec2::ZERO, zoom: 1.0 }
    }

    pub fn forward(&self) -> Vec3 {
        utils::forward(self.rotation)
    }

    pub fn target(&self) -> Vec3 {
        self.position + self.forward()
    }

    /// Zoom narrows the field of view; a zero zoom (empty camera) falls back to the base FOV.
    pub fn fov_y(&self) -> f32 {
        if self.zoom > 0.0 {
            (Self::FOV_Y / self.zoom).clamp(0.05, 3.0)
        } else {
            Self::FOV_Y
        }
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.target(), Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y(), aspect, Self::Z_NEAR, Self::Z_FAR);
        proj * view
    }
}
