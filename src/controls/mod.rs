//! Camera control strategies and the selector that swaps them at runtime.

mod first_person;
mod fly;
mod orbit;
mod pointer_lock;
mod trackball;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;
use crate::input::InputState;

pub use first_person::FirstPersonControls;
pub use fly::FlyControls;
pub use orbit::OrbitControls;
pub use pointer_lock::PointerLockControls;
pub use trackball::TrackballControls;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    Orbit,
    FirstPerson,
    PointerLock,
    Trackball,
    Fly,
}

impl ControlKind {
    pub const ALL: [ControlKind; 5] = [
        Self::Orbit,
        Self::FirstPerson,
        Self::PointerLock,
        Self::Trackball,
        Self::Fly,
    ];

    /// Accepts kebab-case (`first-person`) and camelCase (`firstPerson`) names.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "orbit" => Some(Self::Orbit),
            "firstperson" => Some(Self::FirstPerson),
            "pointerlock" => Some(Self::PointerLock),
            "trackball" => Some(Self::Trackball),
            "fly" => Some(Self::Fly),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Orbit => "orbit",
            Self::FirstPerson => "first-person",
            Self::PointerLock => "pointer-lock",
            Self::Trackball => "trackball",
            Self::Fly => "fly",
        }
    }
}

/// Listener registration a control holds on the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub u64);

/// Host element the controls attach their event listeners to.
pub trait InputSurface: Send {
    /// Registers listeners for a control. `None` means nothing was bound.
    fn bind(&mut self, kind: ControlKind) -> Option<BindingId>;

    fn unbind(&mut self, binding: BindingId);
}

/// Surface for headless hosts; never binds anything.
#[derive(Debug, Default)]
pub struct DetachedSurface;

impl InputSurface for DetachedSurface {
    fn bind(&mut self, _kind: ControlKind) -> Option<BindingId> {
        None
    }

    fn unbind(&mut self, _binding: BindingId) {}
}

#[derive(Debug, Clone)]
pub enum Control {
    Orbit(OrbitControls),
    FirstPerson(FirstPersonControls),
    PointerLock(PointerLockControls),
    Trackball(TrackballControls),
    Fly(FlyControls),
}

impl Control {
    /// Builds a control of `kind` with its default tuning.
    pub fn new(
        kind: ControlKind,
        camera: &PerspectiveCamera,
        binding: Option<BindingId>,
        viewport: (u32, u32),
    ) -> Self {
        match kind {
            ControlKind::Orbit => Self::Orbit(OrbitControls::new(binding)),
            ControlKind::FirstPerson => {
                Self::FirstPerson(FirstPersonControls::new(camera, binding, viewport))
            }
            ControlKind::PointerLock => Self::PointerLock(PointerLockControls::new(camera, binding)),
            ControlKind::Trackball => Self::Trackball(TrackballControls::new(binding)),
            ControlKind::Fly => Self::Fly(FlyControls::new(binding)),
        }
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Orbit(_) => ControlKind::Orbit,
            Self::FirstPerson(_) => ControlKind::FirstPerson,
            Self::PointerLock(_) => ControlKind::PointerLock,
            Self::Trackball(_) => ControlKind::Trackball,
            Self::Fly(_) => ControlKind::Fly,
        }
    }

    pub fn binding(&self) -> Option<BindingId> {
        match self {
            Self::Orbit(control) => control.binding,
            Self::FirstPerson(control) => control.binding,
            Self::PointerLock(control) => control.binding,
            Self::Trackball(control) => control.binding,
            Self::Fly(control) => control.binding,
        }
    }

    /// Per-frame step. Orbit and trackball ignore `delta`; pointer-lock only moves
    /// in response to pointer events.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState, delta: f32) {
        match self {
            Self::Orbit(control) => control.update(camera, input),
            Self::Trackball(control) => control.update(camera, input),
            Self::FirstPerson(control) => control.update(camera, input, delta),
            Self::Fly(control) => control.update(camera, input, delta),
            Self::PointerLock(_) => {}
        }
    }
}

/// Holds at most one active control.
#[derive(Debug, Default)]
pub struct ControlSelector {
    active: Option<Control>,
    viewport: (u32, u32),
}

impl ControlSelector {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            active: None,
            viewport,
        }
    }

    /// Disposes the current control, then binds and constructs a fresh one of `kind`.
    pub fn set_control(
        &mut self,
        kind: ControlKind,
        camera: &PerspectiveCamera,
        surface: &mut dyn InputSurface,
    ) {
        self.dispose(surface);
        let binding = surface.bind(kind);
        self.active = Some(Control::new(kind, camera, binding, self.viewport));
        info!("controls: {} active", kind.name());
    }

    pub fn active(&self) -> Option<&Control> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Control> {
        self.active.as_mut()
    }

    pub fn active_kind(&self) -> Option<ControlKind> {
        self.active.as_ref().map(Control::kind)
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState, delta: f32) {
        if let Some(control) = self.active.as_mut() {
            control.update(camera, input, delta);
        }
    }

    /// Detaches the active control from the surface. Controls that never bound
    /// anything are dropped without an unbind call.
    pub fn dispose(&mut self, surface: &mut dyn InputSurface) {
        let Some(previous) = self.active.take() else {
            return;
        };
        match previous.binding() {
            Some(binding) => {
                surface.unbind(binding);
                debug!("controls: disposed {}", previous.kind().name());
            }
            None => debug!("controls: {} had no binding to dispose", previous.kind().name()),
        }
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        if let Some(Control::FirstPerson(control)) = self.active.as_mut() {
            control.handle_resize(width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        next: u64,
        log: Vec<String>,
    }

    impl InputSurface for Recording {
        fn bind(&mut self, kind: ControlKind) -> Option<BindingId> {
            self.next += 1;
            self.log.push(format!("bind {} #{}", kind.name(), self.next));
            Some(BindingId(self.next))
        }

        fn unbind(&mut self, binding: BindingId) {
            self.log.push(format!("unbind #{}", binding.0));
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ControlKind::ALL {
            assert_eq!(ControlKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ControlKind::from_name("firstPerson"), Some(ControlKind::FirstPerson));
        assert_eq!(ControlKind::from_name("pointerLock"), Some(ControlKind::PointerLock));
        assert_eq!(ControlKind::from_name("drone"), None);
    }

    #[test]
    fn previous_control_is_disposed_before_the_next_binds() {
        let camera = PerspectiveCamera::default();
        let mut surface = Recording::default();
        let mut selector = ControlSelector::new((800, 600));
        selector.set_control(ControlKind::Orbit, &camera, &mut surface);
        selector.set_control(ControlKind::Fly, &camera, &mut surface);
        assert_eq!(
            surface.log,
            vec!["bind orbit #1", "unbind #1", "bind fly #2"]
        );
        assert_eq!(selector.active_kind(), Some(ControlKind::Fly));
    }

    #[test]
    fn reselecting_a_kind_builds_a_fresh_instance() {
        let camera = PerspectiveCamera::default();
        let mut surface = Recording::default();
        let mut selector = ControlSelector::new((800, 600));
        selector.set_control(ControlKind::Orbit, &camera, &mut surface);
        let first = selector.active().and_then(Control::binding);
        selector.set_control(ControlKind::Orbit, &camera, &mut surface);
        let second = selector.active().and_then(Control::binding);
        assert_ne!(first, second);
        assert_eq!(surface.log.len(), 3);
    }

    #[test]
    fn unbound_controls_skip_disposal() {
        let camera = PerspectiveCamera::default();
        let mut selector = ControlSelector::new((800, 600));
        selector.set_control(ControlKind::Trackball, &camera, &mut DetachedSurface);
        let mut surface = Recording::default();
        selector.set_control(ControlKind::Orbit, &camera, &mut surface);
        assert_eq!(surface.log, vec!["bind orbit #1"]);
    }

    #[test]
    fn orbit_defaults_match_the_tuning() {
        let camera = PerspectiveCamera::default();
        match Control::new(ControlKind::Orbit, &camera, None, (1, 1)) {
            Control::Orbit(orbit) => {
                assert!(orbit.enable_damping);
                assert_eq!(orbit.damping_factor, 0.05);
            }
            other => panic!("unexpected control {other:?}"),
        }
        match Control::new(ControlKind::Fly, &camera, None, (1, 1)) {
            Control::Fly(fly) => {
                assert_eq!(fly.movement_speed, 10.0);
                assert_eq!(fly.roll_speed, 0.1);
            }
            other => panic!("unexpected control {other:?}"),
        }
    }

    #[test]
    fn resize_reaches_first_person_controls() {
        let camera = PerspectiveCamera::default();
        let mut selector = ControlSelector::new((800, 600));
        selector.set_control(ControlKind::FirstPerson, &camera, &mut DetachedSurface);
        selector.handle_resize(1024, 512);
        match selector.active() {
            Some(Control::FirstPerson(control)) => {
                assert_eq!(control.view_half(), (512.0, 256.0));
                assert_eq!(control.look_speed, 0.1);
                assert_eq!(control.movement_speed, 10.0);
            }
            other => panic!("unexpected control {other:?}"),
        }
    }
}
