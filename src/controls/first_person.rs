use glam::Vec3;

use super::BindingId;
use crate::camera::PerspectiveCamera;
use crate::input::InputState;

/// Keyboard movement plus look direction steered by the pointer's offset from the
/// centre of the surface.
#[derive(Debug, Clone)]
pub struct FirstPersonControls {
    pub movement_speed: f32,
    pub look_speed: f32,
    /// Latitude and longitude of the look direction, in degrees.
    lat: f32,
    lon: f32,
    view_half_x: f32,
    view_half_y: f32,
    pub(super) binding: Option<BindingId>,
}

const MOVES: [(&[&str], Vec3); 6] = [
    (&["KeyW", "ArrowUp"], Vec3::NEG_Z),
    (&["KeyS", "ArrowDown"], Vec3::Z),
    (&["KeyA", "ArrowLeft"], Vec3::NEG_X),
    (&["KeyD", "ArrowRight"], Vec3::X),
    (&["KeyR"], Vec3::Y),
    (&["KeyF"], Vec3::NEG_Y),
];

impl FirstPersonControls {
    pub fn new(camera: &PerspectiveCamera, binding: Option<BindingId>, viewport: (u32, u32)) -> Self {
        let forward = camera.forward();
        let mut controls = Self {
            movement_speed: 10.0,
            look_speed: 0.1,
            lat: 90.0 - forward.y.clamp(-1.0, 1.0).acos().to_degrees(),
            lon: forward.z.atan2(forward.x).to_degrees(),
            view_half_x: 0.0,
            view_half_y: 0.0,
            binding,
        };
        controls.handle_resize(viewport.0, viewport.1);
        controls
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.view_half_x = width as f32 / 2.0;
        self.view_half_y = height as f32 / 2.0;
    }

    pub fn view_half(&self) -> (f32, f32) {
        (self.view_half_x, self.view_half_y)
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState, delta: f32) {
        let step = delta * self.movement_speed;
        for (codes, direction) in MOVES {
            if codes.iter().any(|code| input.is_key_pressed(code)) {
                camera.translate_local(direction * step);
            }
        }

        // Pointer offset from the centre in pixels, y pointing down.
        let pointer = input.pointer_position();
        let offset_x = pointer.x * self.view_half_x;
        let offset_y = -pointer.y * self.view_half_y;
        let look = delta * self.look_speed;
        self.lon -= offset_x * look;
        self.lat = (self.lat - offset_y * look).clamp(-85.0, 85.0);

        let phi = (90.0 - self.lat).to_radians();
        let theta = self.lon.to_radians();
        let direction = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
        camera.look_at(camera.position + direction);
    }
}
