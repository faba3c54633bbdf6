use glam::Vec3;

use super::BindingId;
use crate::camera::PerspectiveCamera;
use crate::input::InputState;

/// Six degrees of freedom flight driven by the keyboard.
#[derive(Debug, Clone)]
pub struct FlyControls {
    pub movement_speed: f32,
    pub roll_speed: f32,
    pub(super) binding: Option<BindingId>,
}

fn axis(input: &InputState, positive: &str, negative: &str) -> f32 {
    let pressed = |code: &str| if input.is_key_pressed(code) { 1.0 } else { 0.0 };
    pressed(positive) - pressed(negative)
}

impl FlyControls {
    pub fn new(binding: Option<BindingId>) -> Self {
        Self {
            movement_speed: 10.0,
            roll_speed: 0.1,
            binding,
        }
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState, delta: f32) {
        let movement = Vec3::new(
            axis(input, "KeyD", "KeyA"),
            axis(input, "KeyR", "KeyF"),
            axis(input, "KeyS", "KeyW"),
        );
        camera.translate_local(movement * delta * self.movement_speed);

        let rotation = delta * self.roll_speed;
        let yaw = axis(input, "ArrowLeft", "ArrowRight");
        let pitch = axis(input, "ArrowUp", "ArrowDown");
        let roll = axis(input, "KeyQ", "KeyE");
        if yaw != 0.0 || pitch != 0.0 || roll != 0.0 {
            camera.rotate_local(yaw * rotation, pitch * rotation, roll * rotation);
        }
    }
}
