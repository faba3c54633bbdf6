use std::f32::consts::PI;

use glam::Vec3;

use super::BindingId;
use crate::camera::PerspectiveCamera;
use crate::input::InputState;

const MIN_POLAR: f32 = 1e-4;

/// Orbits the camera around a target point, dragged by pointer motion.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    /// Radians of rotation per pixel of pointer motion.
    pub rotate_speed: f32,
    /// Pending azimuth and polar rotation.
    theta_delta: f32,
    phi_delta: f32,
    pub(super) binding: Option<BindingId>,
}

impl OrbitControls {
    pub fn new(binding: Option<BindingId>) -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 0.005,
            theta_delta: 0.0,
            phi_delta: 0.0,
            binding,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.theta_delta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.phi_delta -= angle;
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState) {
        let motion = input.take_pointer_motion();
        self.rotate_left(motion.x * self.rotate_speed);
        self.rotate_up(motion.y * self.rotate_speed);

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius > f32::EPSILON {
            let theta = offset.x.atan2(offset.z) + self.theta_delta;
            let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + self.phi_delta)
                .clamp(MIN_POLAR, PI - MIN_POLAR);
            camera.position = self.target
                + Vec3::new(
                    radius * phi.sin() * theta.sin(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.cos(),
                );
        }
        camera.look_at(self.target);

        if self.enable_damping {
            self.theta_delta *= 1.0 - self.damping_factor;
            self.phi_delta *= 1.0 - self.damping_factor;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::default();
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera
    }

    #[test]
    fn keeps_distance_to_target_while_orbiting() {
        let mut camera = camera();
        let input = InputState::new();
        let mut orbit = OrbitControls::new(None);
        input.add_pointer_motion(100.0, 0.0);
        orbit.update(&mut camera, &input);
        assert!((camera.position.length() - 5.0).abs() < 1e-4);
        assert!(camera.position.x < 0.0);
    }

    #[test]
    fn damping_carries_motion_into_later_frames() {
        let mut camera = camera();
        let input = InputState::new();
        let mut orbit = OrbitControls::new(None);
        orbit.rotate_left(0.1);
        orbit.update(&mut camera, &input);
        let after_first = camera.position;
        orbit.update(&mut camera, &input);
        assert_ne!(camera.position, after_first);

        orbit.enable_damping = false;
        orbit.rotate_left(0.1);
        orbit.update(&mut camera, &input);
        let settled = camera.position;
        orbit.update(&mut camera, &input);
        assert!((camera.position - settled).length() < 1e-5);
    }
}
