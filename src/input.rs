use std::collections::HashMap;

use glam::Vec2;
use parking_lot::RwLock;

/// Converts friendly key names into DOM `KeyboardEvent.code` strings.
///
/// Codes that are already canonical (`KeyW`, `ArrowUp`, `ShiftLeft`) pass through.
pub fn canonical_code(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if name.len() == 1 {
        let ch = name.chars().next()?;
        if ch.is_ascii_alphabetic() {
            return Some(format!("Key{}", ch.to_ascii_uppercase()));
        }
        if ch.is_ascii_digit() {
            return Some(format!("Digit{ch}"));
        }
        return None;
    }
    let code = match name {
        "Up" => "ArrowUp",
        "Down" => "ArrowDown",
        "Left" => "ArrowLeft",
        "Right" => "ArrowRight",
        "Shift" | "LShift" | "LeftShift" => "ShiftLeft",
        "RShift" | "RightShift" => "ShiftRight",
        "Ctrl" | "LCtrl" | "LeftCtrl" => "ControlLeft",
        "RCtrl" | "RightCtrl" => "ControlRight",
        "Esc" => "Escape",
        "Return" => "Enter",
        other => other,
    };
    Some(code.to_string())
}

/// Input snapshot fed by host event listeners and read by the controls.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashMap<String, bool>>,
    pointer: RwLock<Vec2>,
    motion: RwLock<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, code: &str) {
        self.keys.write().insert(code.to_string(), true);
    }

    pub fn set_key_up(&self, code: &str) {
        self.keys.write().insert(code.to_string(), false);
    }

    /// True only for codes whose most recent event was a key press.
    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.keys.read().get(code).copied().unwrap_or(false)
    }

    /// Records the pointer in client pixels, stored as device coordinates in `[-1, 1]`
    /// with y pointing up.
    pub fn set_pointer_position(&self, client_x: f32, client_y: f32, width: u32, height: u32) {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        *self.pointer.write() = Vec2::new(
            (client_x / width) * 2.0 - 1.0,
            -(client_y / height) * 2.0 + 1.0,
        );
    }

    pub fn pointer_position(&self) -> Vec2 {
        *self.pointer.read()
    }

    /// Accumulates relative pointer movement in pixels.
    pub fn add_pointer_motion(&self, dx: f32, dy: f32) {
        *self.motion.write() += Vec2::new(dx, dy);
    }

    /// Returns the movement accumulated since the last call and resets it.
    pub fn take_pointer_motion(&self) -> Vec2 {
        std::mem::take(&mut *self.motion.write())
    }
}
