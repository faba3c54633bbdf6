//! Host glue for running a scene without a window: a renderer and input surface
//! that only count what they are asked to do, and manifest population helpers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use pollster::block_on;

use crate::controls::{BindingId, ControlKind, InputSurface};
use crate::manifest::{ObjectShape, SceneManifest};
use crate::object::GpuResourceId;
use crate::render::{FrameView, RenderTarget, Renderer, ShaderPass};
use crate::runtime::SceneRuntime;

/// Work recorded by a [`HeadlessRenderer`].
#[derive(Debug, Default)]
pub struct RendererStats {
    pub scene_draws: AtomicU64,
    pub pass_draws: AtomicU64,
    pub released: AtomicU64,
    pub disposed: AtomicU64,
}

impl RendererStats {
    pub fn scene_draws(&self) -> u64 {
        self.scene_draws.load(Ordering::Relaxed)
    }

    pub fn pass_draws(&self) -> u64 {
        self.pass_draws.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}

/// Renderer that draws nothing. Counters stay readable after the runtime takes
/// ownership of the renderer.
#[derive(Debug)]
pub struct HeadlessRenderer {
    size: (u32, u32),
    pixel_ratio: f32,
    stats: Arc<RendererStats>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            size: (1, 1),
            pixel_ratio: 1.0,
            stats: Arc::new(RendererStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RendererStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HeadlessRenderer {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        debug!("headless: surface {}x{}", self.size.0, self.size.1);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn draw_scene(&mut self, view: &FrameView<'_>, _target: RenderTarget) -> Result<()> {
        self.stats.scene_draws.fetch_add(1, Ordering::Relaxed);
        let _ = view.camera_params();
        Ok(())
    }

    fn draw_pass(&mut self, _pass: &ShaderPass, _to_screen: bool) -> Result<()> {
        self.stats.pass_draws.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release(&mut self, _resource: GpuResourceId) {
        self.stats.released.fetch_add(1, Ordering::Relaxed);
    }

    fn dispose(&mut self) {
        self.stats.disposed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Input surface that hands out sequential binding ids.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next: u64,
    bound: Vec<BindingId>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSurface for HeadlessSurface {
    fn bind(&mut self, kind: ControlKind) -> Option<BindingId> {
        self.next += 1;
        let binding = BindingId(self.next);
        debug!("headless: bound {} as #{}", kind.name(), binding.0);
        self.bound.push(binding);
        Some(binding)
    }

    fn unbind(&mut self, binding: BindingId) {
        self.bound.retain(|existing| *existing != binding);
    }
}

/// Registers every manifest object. Models load synchronously; a model that fails
/// to load is skipped with a warning.
pub fn populate(runtime: &SceneRuntime, manifest: &SceneManifest) -> Result<usize> {
    if manifest.basic_scene {
        runtime.create_basic_scene()?;
    }
    let mut added = 0;
    for spec in &manifest.objects {
        if let ObjectShape::Model { path } = &spec.shape {
            match block_on(runtime.add_model(&spec.name, path)) {
                Ok(()) => {
                    runtime.update_object(&spec.name, |object| {
                        object.transform.position = spec.position;
                        object.transform.rotation = spec.rotation;
                    });
                    added += 1;
                }
                Err(err) => warn!("skipping model {}: {err}", spec.name),
            }
            continue;
        }
        let Some(object) = spec.build() else {
            continue;
        };
        match spec.update_fn() {
            Some(update) => runtime.add_object_with_update(&spec.name, object, update)?,
            None => runtime.add_object(&spec.name, object)?,
        }
        added += 1;
    }
    Ok(added)
}

pub fn print_final_state(runtime: &SceneRuntime) {
    println!("Final object states:");
    for id in runtime.object_ids() {
        runtime.with_object(&id, |object| {
            let position = object.transform.position;
            let rotation = object.transform.rotation;
            println!(
                " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2})",
                id, position.x, position.y, position.z, rotation.x, rotation.y, rotation.z
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::runtime::RuntimeBuilder;

    #[test]
    fn headless_surface_issues_distinct_bindings() {
        let mut surface = HeadlessSurface::new();
        let first = surface.bind(ControlKind::Orbit).unwrap();
        let second = surface.bind(ControlKind::Fly).unwrap();
        assert_ne!(first, second);
        surface.unbind(first);
        assert_eq!(surface.bound, vec![second]);
    }

    #[test]
    fn populate_registers_primitives_with_spin() {
        let manifest = SceneManifest::from_xml(
            r#"<scene>
                <object><name>box</name><spin>1 0 0</spin></object>
                <object><name>ball</name><type>sphere</type></object>
                <object><name>ghost</name><type>model</type><path>missing.obj</path></object>
            </scene>"#,
        )
        .unwrap();
        let renderer = HeadlessRenderer::new();
        let stats = renderer.stats();
        let runtime = RuntimeBuilder::new(RuntimeConfig::default(), Box::new(renderer)).build();

        assert_eq!(populate(&runtime, &manifest).unwrap(), 2);
        assert_eq!(runtime.object_ids(), vec!["box", "ball"]);

        runtime.tick(0.0).unwrap();
        runtime.tick(0.5).unwrap();
        let spin = runtime.with_object("box", |object| object.transform.rotation.x);
        assert_eq!(spin, Some(0.5));
        assert_eq!(stats.scene_draws(), 2);
        assert_eq!(stats.pass_draws(), 4);

        runtime.shutdown();
        assert_eq!(stats.released(), 4);
        assert_eq!(stats.disposed.load(Ordering::Relaxed), 1);
    }
}
