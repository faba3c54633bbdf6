use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat, Vec3};

use super::BindingId;
use crate::camera::PerspectiveCamera;

/// Mouse-look while the pointer is captured. Has no per-frame step: the host
/// forwards pointer motion and movement requests as they happen.
#[derive(Debug, Clone)]
pub struct PointerLockControls {
    pub pointer_speed: f32,
    yaw: f32,
    pitch: f32,
    locked: bool,
    pub(super) binding: Option<BindingId>,
}

const RADIANS_PER_PIXEL: f32 = 0.002;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 1e-3;

impl PointerLockControls {
    pub fn new(camera: &PerspectiveCamera, binding: Option<BindingId>) -> Self {
        let (yaw, pitch, _) = camera.orientation.to_euler(EulerRot::YXZ);
        Self {
            pointer_speed: 1.0,
            yaw,
            pitch,
            locked: false,
            binding,
        }
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Turns the camera by a pointer movement in pixels. Ignored while unlocked.
    pub fn apply_motion(&mut self, camera: &mut PerspectiveCamera, dx: f32, dy: f32) {
        if !self.locked {
            return;
        }
        self.yaw -= dx * RADIANS_PER_PIXEL * self.pointer_speed;
        self.pitch = (self.pitch - dy * RADIANS_PER_PIXEL * self.pointer_speed)
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        camera.orientation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
    }

    /// Moves parallel to the ground plane.
    pub fn move_forward(&self, camera: &mut PerspectiveCamera, distance: f32) {
        let forward = Vec3::Y.cross(camera.right()).normalize_or_zero();
        camera.position += forward * distance;
    }

    pub fn move_right(&self, camera: &mut PerspectiveCamera, distance: f32) {
        camera.position += camera.right() * distance;
    }
}
