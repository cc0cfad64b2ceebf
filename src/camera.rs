use glam::{Mat4, Vec3, Vec4};

use crate::config::CameraConfig;

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, viewport: (u32, u32)) -> Self {
        Self {
            fov: config.fov,
            aspect: aspect_ratio(viewport),
            near: config.near,
            far: config.far,
            position: config.position,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    /// Projection with a `0..1` depth range, as wgpu expects.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Projects a world-space point to normalised device coordinates.
    /// Returns `None` for points behind the camera.
    pub fn project(&self, point: Vec3) -> Option<Vec3> {
        let clip: Vec4 = self.view_projection() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }
}

/// Width over height; a zero-height viewport falls back to a square aspect.
pub fn aspect_ratio((width, height): (u32, u32)) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
