use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective camera; the runtime re-derives its aspect ratio on every resize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub orientation: Quat,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Sets the aspect ratio from surface dimensions and rebuilds the projection.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect.max(0.01), self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn look_at(&mut self, target: Vec3) {
        let direction = target - self.position;
        if direction.length_squared() <= f32::EPSILON {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        self.orientation = Quat::from_mat4(&view.inverse()).normalize();
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Moves the camera along its own axes.
    pub fn translate_local(&mut self, offset: Vec3) {
        self.position += self.orientation * offset;
    }

    /// Rotates the camera around its own axes (radians).
    pub fn rotate_local(&mut self, yaw: f32, pitch: f32, roll: f32) {
        let delta = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch) * Quat::from_rotation_z(roll);
        self.orientation = (self.orientation * delta).normalize();
    }

    /// World-space ray through a point in normalised device coordinates.
    pub fn ray_through(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(ndc.extend(-1.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        (self.position, (far - near).normalize_or_zero())
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(75.0, 1.0, 0.1, 1000.0)
    }
}
