use glam::{Quat, Vec3};

use super::BindingId;
use crate::camera::PerspectiveCamera;
use crate::input::InputState;

/// Free rotation around a target without a fixed up axis.
#[derive(Debug, Clone)]
pub struct TrackballControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub static_moving: bool,
    pub dynamic_damping_factor: f32,
    axis: Vec3,
    angle: f32,
    pub(super) binding: Option<BindingId>,
}

impl TrackballControls {
    pub fn new(binding: Option<BindingId>) -> Self {
        Self {
            target: Vec3::ZERO,
            rotate_speed: 0.005,
            static_moving: false,
            dynamic_damping_factor: 0.2,
            axis: Vec3::Y,
            angle: 0.0,
            binding,
        }
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState) {
        let motion = input.take_pointer_motion();
        let eye = camera.position - self.target;

        if motion.length_squared() > 0.0 {
            let direction = camera.right() * motion.x - camera.up() * motion.y;
            let axis = direction.cross(eye).normalize_or_zero();
            if axis != Vec3::ZERO {
                self.axis = axis;
                self.angle = motion.length() * self.rotate_speed;
            }
        }

        if self.angle.abs() > f32::EPSILON {
            let rotation = Quat::from_axis_angle(self.axis, self.angle);
            camera.position = self.target + rotation * eye;
            camera.orientation = (rotation * camera.orientation).normalize();
            if self.static_moving {
                self.angle = 0.0;
            } else {
                self.angle *= 1.0 - self.dynamic_damping_factor;
            }
        }
    }
}
