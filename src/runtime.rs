//! The scene runtime: owns the registries, camera, controls and pipeline, and
//! advances them once per frame.

use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, Weak};

use anyhow::Result;
use glam::{Vec2, Vec3};
use log::{debug, info};
use parking_lot::Mutex;

use crate::animation::{AnimationClip, AnimationMixer};
use crate::audio::{
    AudioHandle, AudioKind, AudioListener, AudioOptions, AudioRegistry, AudioSink,
    AudioSourceEntry, NullAudioSink,
};
use crate::camera::PerspectiveCamera;
use crate::config::RuntimeConfig;
use crate::controls::{Control, ControlKind, ControlSelector, DetachedSurface, InputSurface};
use crate::error::{LoadError, RegistryError, RuntimeError};
use crate::frame_loop::{FrameLoop, FrameStats, LoopSummary, TickSource};
use crate::input::InputState;
use crate::loader::{
    decode_hdr, AssetLoader, AssetSource, FileSource, Font, Load, Model, Texture,
};
use crate::object::{Color, Geometry, GeometryShape, Material, Object3D};
use crate::primitives::{create_cube, create_text, PrimitiveOptions, TextOptions};
use crate::raycast::{Intersection, Raycaster};
use crate::registry::{FrameContext, ObjectRegistry};
use crate::render::{FrameView, Pass, Pipeline, RenderPass, RenderTarget, Renderer, Viewport};
use crate::scene::{NodeRef, Scene};

/// Environment map requested by [`SceneRuntime::create_basic_scene`].
pub const BASIC_SCENE_HDRI: &str = "assets/hdri/sunset.hdr";

struct RuntimeState {
    renderer: Box<dyn Renderer>,
    surface: Box<dyn InputSurface>,
    audio_sink: Box<dyn AudioSink>,
    camera: PerspectiveCamera,
    controls: ControlSelector,
    pipeline: Option<Pipeline>,
    viewport: Viewport,
    scene: Scene,
    objects: ObjectRegistry,
    audio: AudioRegistry,
    listener: AudioListener,
    mixers: Vec<AnimationMixer>,
    stats: FrameStats,
}

impl RuntimeState {
    fn tick(&mut self, input: &InputState, delta: f32) -> Result<()> {
        self.controls.update(&mut self.camera, input, delta);

        for mixer in &mut self.mixers {
            if let Some(root) = self.objects.get_mut(mixer.root()) {
                mixer.update(delta, root);
            }
        }

        let frame = FrameContext {
            camera: &self.camera,
            control: self.controls.active_kind(),
            input,
        };
        self.objects.run_updates(&frame, delta);

        self.listener.follow(&self.camera);
        self.audio_sink.set_listener(&self.listener);

        let view = FrameView {
            scene: &self.scene,
            objects: &self.objects,
            camera: &self.camera,
        };
        let rendered = match self.pipeline.as_mut() {
            Some(pipeline) if pipeline.has_enabled_passes() => {
                pipeline.render(self.renderer.as_mut(), &view)
            }
            _ => self.renderer.draw_scene(&view, RenderTarget::Screen),
        };
        self.stats.record(delta);
        rendered
    }
}

/// Assembles a [`SceneRuntime`] from its host collaborators.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    renderer: Box<dyn Renderer>,
    surface: Box<dyn InputSurface>,
    audio_sink: Box<dyn AudioSink>,
    source: Option<Arc<dyn AssetSource>>,
    input: Option<Arc<InputState>>,
}

impl RuntimeBuilder {
    pub fn new(config: RuntimeConfig, renderer: Box<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            surface: Box::new(DetachedSurface),
            audio_sink: Box::new(NullAudioSink),
            source: None,
            input: None,
        }
    }

    pub fn input_surface(mut self, surface: Box<dyn InputSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio_sink = sink;
        self
    }

    /// Defaults to the file system below `config.asset_root`.
    pub fn asset_source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Shares an input snapshot the host already feeds.
    pub fn input(mut self, input: Arc<InputState>) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets up the renderer surface, then the camera, controls, pipeline and
    /// registries, in that order.
    pub fn build(self) -> SceneRuntime {
        let Self {
            config,
            mut renderer,
            mut surface,
            audio_sink,
            source,
            input,
        } = self;

        renderer.set_pixel_ratio(config.effective_pixel_ratio());
        renderer.set_size(config.width, config.height);

        let mut camera = PerspectiveCamera::new(
            config.camera.fov,
            1.0,
            config.camera.near,
            config.camera.far,
        );
        camera.set_viewport(config.width, config.height);
        camera.position = config.camera.position;
        camera.look_at(config.camera.target);

        let mut controls = ControlSelector::new((config.width, config.height));
        if let Some(kind) = config.controls {
            controls.set_control(kind, &camera, surface.as_mut());
        }

        let viewport = Viewport {
            width: config.width,
            height: config.height,
            pixel_ratio: renderer.pixel_ratio(),
        };
        let pipeline = config.post_processing.then(|| Pipeline::standard(viewport));

        let source: Arc<dyn AssetSource> = match (source, &config.asset_root) {
            (Some(source), _) => source,
            (None, Some(root)) => Arc::new(FileSource::with_root(root.clone())),
            (None, None) => Arc::new(FileSource::new()),
        };

        let state = RuntimeState {
            renderer,
            surface,
            audio_sink,
            camera,
            controls,
            pipeline,
            viewport,
            scene: Scene::new(),
            objects: ObjectRegistry::new(),
            audio: AudioRegistry::new(),
            listener: AudioListener::default(),
            mixers: Vec::new(),
            stats: FrameStats::default(),
        };
        info!(
            "runtime ready: {}x{} @{}x, post-processing {}",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio,
            if config.post_processing { "on" } else { "off" }
        );

        SceneRuntime {
            state: Arc::new(Mutex::new(state)),
            input: input.unwrap_or_default(),
            loader: AssetLoader::new(source),
            config,
        }
    }
}

/// Shared handle to the running scene. Every method takes `&self`; state is
/// serialized behind one lock.
pub struct SceneRuntime {
    state: Arc<Mutex<RuntimeState>>,
    input: Arc<InputState>,
    loader: AssetLoader,
    config: RuntimeConfig,
}

impl SceneRuntime {
    pub fn builder(config: RuntimeConfig, renderer: Box<dyn Renderer>) -> RuntimeBuilder {
        RuntimeBuilder::new(config, renderer)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn input(&self) -> &Arc<InputState> {
        &self.input
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    // Objects

    pub fn add_object(&self, id: &str, object: Object3D) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.objects.add(&mut state.scene, id, object, None)
    }

    /// Registers an object whose `update` runs every frame, after the control and
    /// animation updates, with the frame context and delta.
    ///
    /// The callback runs while the runtime is locked: it must read the camera and
    /// input through the [`FrameContext`] rather than through this handle.
    pub fn add_object_with_update<F>(
        &self,
        id: &str,
        object: Object3D,
        update: F,
    ) -> Result<(), RegistryError>
    where
        F: FnMut(&mut Object3D, &FrameContext<'_>, f32) + Send + 'static,
    {
        let mut state = self.state.lock();
        let state = &mut *state;
        state
            .objects
            .add(&mut state.scene, id, object, Some(Box::new(update)))
    }

    /// Detaches the object and releases its GPU resources. Unknown ids are ignored.
    pub fn remove_object(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.mixers.retain(|mixer| mixer.root() != id);
        state
            .objects
            .remove(&mut state.scene, state.renderer.as_mut(), id)
    }

    /// Snapshot of a registered object.
    pub fn object(&self, id: &str) -> Option<Object3D> {
        self.state.lock().objects.get(id).cloned()
    }

    pub fn with_object<R>(&self, id: &str, read: impl FnOnce(&Object3D) -> R) -> Option<R> {
        self.state.lock().objects.get(id).map(read)
    }

    pub fn update_object<R>(&self, id: &str, update: impl FnOnce(&mut Object3D) -> R) -> Option<R> {
        self.state.lock().objects.update(id, update)
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn object_ids(&self) -> Vec<String> {
        self.state.lock().objects.ids()
    }

    pub fn with_scene<R>(&self, read: impl FnOnce(&Scene) -> R) -> R {
        read(&self.state.lock().scene)
    }

    // Camera and controls

    pub fn camera(&self) -> PerspectiveCamera {
        self.state.lock().camera.clone()
    }

    pub fn with_camera<R>(&self, update: impl FnOnce(&mut PerspectiveCamera) -> R) -> R {
        update(&mut self.state.lock().camera)
    }

    /// Replaces the active control; the previous one is disposed first.
    pub fn set_control(&self, kind: ControlKind) {
        let mut state = self.state.lock();
        let state = &mut *state;
        state
            .controls
            .set_control(kind, &state.camera, state.surface.as_mut());
    }

    pub fn control_kind(&self) -> Option<ControlKind> {
        self.state.lock().controls.active_kind()
    }

    /// Gives host event handlers access to the active control, e.g. to feed
    /// pointer-lock motion.
    pub fn with_control<R>(
        &self,
        handle: impl FnOnce(Option<&mut Control>, &mut PerspectiveCamera) -> R,
    ) -> R {
        let mut state = self.state.lock();
        let state = &mut *state;
        handle(state.controls.active_mut(), &mut state.camera)
    }

    // Viewport and post-processing

    /// Propagates a new surface size to the camera, renderer, pipeline and controls.
    pub fn on_resize(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.camera.set_viewport(width, height);
        state.renderer.set_size(width, height);
        state.viewport = Viewport {
            width,
            height,
            pixel_ratio: state.renderer.pixel_ratio(),
        };
        if let Some(pipeline) = state.pipeline.as_mut() {
            pipeline.set_size(state.viewport);
        }
        state.controls.handle_resize(width, height);
    }

    pub fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    /// Appends a pass after the existing ones. Without a pipeline, one holding only a
    /// render pass is created first so the new pass has a frame to work on.
    pub fn add_pass(&self, pass: Box<dyn Pass>) {
        let mut state = self.state.lock();
        let viewport = state.viewport;
        let pipeline = state.pipeline.get_or_insert_with(|| {
            let mut pipeline = Pipeline::empty(viewport);
            pipeline.add_pass(Box::new(RenderPass));
            pipeline
        });
        pipeline.add_pass(pass);
    }

    /// Switches between the standard pipeline and drawing straight to the screen.
    pub fn set_post_processing(&self, enabled: bool) {
        let mut state = self.state.lock();
        match (enabled, state.pipeline.is_some()) {
            (true, false) => state.pipeline = Some(Pipeline::standard(state.viewport)),
            (false, true) => {
                if let Some(mut pipeline) = state.pipeline.take() {
                    pipeline.dispose();
                }
            }
            _ => {}
        }
    }

    /// Installs a caller-built pipeline, disposing the current one. A pipeline with
    /// no enabled pass falls back to drawing the scene straight to the screen.
    pub fn set_pipeline(&self, pipeline: Option<Pipeline>) {
        let mut state = self.state.lock();
        let viewport = state.viewport;
        if let Some(mut previous) = state.pipeline.take() {
            previous.dispose();
        }
        state.pipeline = pipeline.map(|mut pipeline| {
            pipeline.set_size(viewport);
            pipeline
        });
    }

    pub fn pass_names(&self) -> Vec<String> {
        self.state
            .lock()
            .pipeline
            .as_ref()
            .map(Pipeline::pass_names)
            .unwrap_or_default()
    }

    /// Resolution uniforms of the pipeline's passes, in order.
    pub fn pass_resolutions(&self) -> Vec<Option<Vec2>> {
        self.state
            .lock()
            .pipeline
            .as_ref()
            .map(|pipeline| pipeline.passes().iter().map(|pass| pass.resolution()).collect())
            .unwrap_or_default()
    }

    // Frame loop

    /// One frame: controls, animation mixers, per-object callbacks, listener, render.
    pub fn tick(&self, delta: f32) -> Result<()> {
        self.state.lock().tick(&self.input, delta)
    }

    /// Drives [`tick`](Self::tick) from `ticks` with the configured error policy.
    pub fn run<T: TickSource>(&self, ticks: T) -> Result<LoopSummary> {
        FrameLoop::new(ticks, self.config.error_policy).run(|delta| self.tick(delta))
    }

    pub fn stats(&self) -> FrameStats {
        self.state.lock().stats
    }

    // Animation

    /// Attaches a mixer to a registered object. Returns false for unknown ids; an
    /// object keeps a single mixer.
    pub fn create_animation_mixer(&self, root: &str) -> bool {
        let mut state = self.state.lock();
        if !state.objects.contains(root) {
            return false;
        }
        if !state.mixers.iter().any(|mixer| mixer.root() == root) {
            state.mixers.push(AnimationMixer::new(root));
        }
        true
    }

    pub fn with_mixer<R>(&self, root: &str, update: impl FnOnce(&mut AnimationMixer) -> R) -> Option<R> {
        self.state
            .lock()
            .mixers
            .iter_mut()
            .find(|mixer| mixer.root() == root)
            .map(update)
    }

    pub fn mixer_count(&self) -> usize {
        self.state.lock().mixers.len()
    }

    /// Loads a glTF model, registers it under `id` with a mixer and plays clip
    /// `clip_index`. The model stays in the scene even when it has no such clip.
    pub async fn play_gltf_animation(
        &self,
        id: &str,
        path: &str,
        clip_index: usize,
    ) -> Result<AnimationClip, RuntimeError> {
        let Model { root, animations } = self.loader.load_gltf(path).await?;
        self.add_object(id, root)?;
        self.create_animation_mixer(id);

        if animations.is_empty() {
            return Err(LoadError::NoAnimations { path: path.into() }.into());
        }
        let clip = animations.get(clip_index).ok_or_else(|| LoadError::MissingClip {
            path: path.into(),
            index: clip_index,
            available: animations.len(),
        })?;
        self.with_mixer(id, |mixer| {
            mixer.clip_action(clip).play();
        });
        Ok(clip.clone())
    }

    // Loading

    pub fn load_texture(&self, path: &str) -> Load<Texture> {
        self.loader.load_texture(path)
    }

    pub fn load_gltf(&self, path: &str) -> Load<Model> {
        self.loader.load_gltf(path)
    }

    pub fn load_obj(&self, path: &str) -> Load<Model> {
        self.loader.load_obj(path)
    }

    /// Loads `options.font` and builds a centred text mesh. The mesh is returned,
    /// not registered.
    pub fn create_text3d(&self, text: &str, options: TextOptions) -> Load<Object3D> {
        let text = text.to_string();
        let font_path = options.font.clone();
        self.loader.spawn(&font_path, move |path, bytes| {
            let font = Font::from_json(path, &bytes)?;
            create_text(&text, &font, &options).map_err(|err| LoadError::decode_failed(path, err))
        })
    }

    /// Loads a glTF or OBJ model and registers its root under `id`.
    pub async fn add_model(&self, id: &str, path: &str) -> Result<(), RuntimeError> {
        let model = self.loader.load_model(path).await?;
        self.add_object(id, model.root)?;
        Ok(())
    }

    /// Loads an HDR panorama and installs it as the scene environment as soon as it
    /// is decoded, whether or not the returned future is awaited.
    pub fn load_hdri(&self, path: &str) -> Load<Arc<Texture>> {
        let state: Weak<Mutex<RuntimeState>> = Arc::downgrade(&self.state);
        self.loader.spawn(path, move |path, bytes| {
            let texture = Arc::new(decode_hdr(path, &bytes)?);
            if let Some(state) = state.upgrade() {
                state.lock().scene.environment = Some(Arc::clone(&texture));
            }
            Ok(texture)
        })
    }

    // Audio

    /// Plays a non-positional sound under `id`. A second request for the same id
    /// reuses the existing source.
    pub async fn play_audio(
        &self,
        id: &str,
        path: &str,
        options: AudioOptions,
    ) -> Result<AudioHandle, LoadError> {
        self.play_source(id, path, AudioKind::Global, options).await
    }

    /// Plays a sound attached to the scene at `position`. A second request for the
    /// same id moves the existing source instead of creating another one.
    pub async fn play_positional_audio(
        &self,
        id: &str,
        path: &str,
        position: Vec3,
        options: AudioOptions,
    ) -> Result<AudioHandle, LoadError> {
        let kind = AudioKind::Positional {
            position,
            ref_distance: options.ref_distance,
            max_distance: options.max_distance,
        };
        self.play_source(id, path, kind, options).await
    }

    async fn play_source(
        &self,
        id: &str,
        path: &str,
        kind: AudioKind,
        options: AudioOptions,
    ) -> Result<AudioHandle, LoadError> {
        let position = match kind {
            AudioKind::Positional { position, .. } => Some(position),
            AudioKind::Global => None,
        };
        if let Some(existing) = self.reuse_audio(id, position, options.autoplay) {
            return Ok(existing);
        }

        let buffer = Arc::new(self.loader.load_audio(path).await?);

        // Another request for the same id may have finished while this one loaded.
        if let Some(existing) = self.reuse_audio(id, position, options.autoplay) {
            return Ok(existing);
        }
        let handle = AudioHandle::new(buffer, kind, &options);
        let mut state = self.state.lock();
        let state = &mut *state;
        state
            .audio
            .insert_or_reuse(state.audio_sink.as_mut(), id, handle, options.autoplay);
        if position.is_some() {
            state.scene.attach(NodeRef::PositionalAudio(id.to_string()));
        }
        state
            .audio
            .get(id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| LoadError::Interrupted { path: path.into() })
    }

    fn reuse_audio(&self, id: &str, position: Option<Vec3>, autoplay: bool) -> Option<AudioHandle> {
        let mut state = self.state.lock();
        let state = &mut *state;
        state
            .audio
            .reuse(state.audio_sink.as_mut(), id, position, autoplay)
            .cloned()
    }

    pub fn audio_source(&self, id: &str) -> Option<AudioSourceEntry> {
        self.state.lock().audio.get(id).cloned()
    }

    pub fn audio_count(&self) -> usize {
        self.state.lock().audio.len()
    }

    pub fn stop_audio(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.audio.stop(state.audio_sink.as_mut(), id)
    }

    pub fn remove_audio(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let state = &mut *state;
        state.scene.detach(&NodeRef::PositionalAudio(id.to_string()));
        state.audio.remove(state.audio_sink.as_mut(), id).is_some()
    }

    // Interaction

    /// Objects under the pointer, nearest first. `None` tests every registered object.
    pub fn raycast(&self, targets: Option<&[String]>) -> Vec<Intersection> {
        let pointer = self.input.pointer_position();
        let state = self.state.lock();
        Raycaster::from_camera(pointer, &state.camera).intersect_objects(&state.objects, targets)
    }

    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.input.is_key_pressed(code)
    }

    // Scene setup

    /// Sky, fog, lights and helpers plus a `ground` plane and a spinning `cube`.
    /// Also starts loading the environment map; a failed load is only logged.
    pub fn create_basic_scene(&self) -> Result<(), RegistryError> {
        self.state.lock().scene.configure_basic_environment();

        let mut material = Material::standard(Color(0x999999));
        material.roughness = 0.8;
        material.metalness = 0.2;
        let mut ground = Object3D::mesh(
            Geometry::new(GeometryShape::Plane {
                width: 100.0,
                height: 100.0,
            }),
            material,
        );
        ground.name = "ground".into();
        ground.transform.rotation.x = -FRAC_PI_2;
        ground.receive_shadow = true;
        self.add_object("ground", ground)?;

        let mut cube = create_cube(1.0, Color(0x00ff00), &PrimitiveOptions::default());
        cube.name = "cube".into();
        cube.transform.position = Vec3::new(0.0, 0.5, 0.0);
        self.add_object_with_update("cube", cube, |cube, _frame, delta| {
            cube.transform.rotation.x += 0.5 * delta;
            cube.transform.rotation.y += 0.2 * delta;
        })?;

        let _environment = self.load_hdri(BASIC_SCENE_HDRI);
        Ok(())
    }

    /// Disposes the pipeline and the active control, releases every registered
    /// resource and finally the renderer itself.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let state = &mut *state;
        if let Some(mut pipeline) = state.pipeline.take() {
            pipeline.dispose();
        }
        state.controls.dispose(state.surface.as_mut());
        state.mixers.clear();
        state
            .objects
            .clear(&mut state.scene, state.renderer.as_mut());
        let stopped = state.audio.clear(state.audio_sink.as_mut());
        if !stopped.is_empty() {
            debug!("shutdown stopped {} audio source(s)", stopped.len());
        }
        state.scene.clear();
        state.renderer.dispose();
        info!("runtime shut down after {} frames", state.stats.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::object::GpuResourceId;
    use crate::render::ShaderPass;

    #[derive(Default)]
    struct Counters {
        scenes: AtomicUsize,
        passes: AtomicUsize,
    }

    struct CountingRenderer(Arc<Counters>);

    impl Renderer for CountingRenderer {
        fn set_size(&mut self, _width: u32, _height: u32) {}
        fn set_pixel_ratio(&mut self, _ratio: f32) {}
        fn pixel_ratio(&self) -> f32 {
            1.0
        }
        fn draw_scene(&mut self, _view: &FrameView<'_>, _target: RenderTarget) -> Result<()> {
            self.0.scenes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn draw_pass(&mut self, _pass: &ShaderPass, _to_screen: bool) -> Result<()> {
            self.0.passes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn release(&mut self, _resource: GpuResourceId) {}
    }

    fn runtime(post_processing: bool) -> (SceneRuntime, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let config = RuntimeConfig {
            post_processing,
            ..RuntimeConfig::default()
        };
        let runtime =
            RuntimeBuilder::new(config, Box::new(CountingRenderer(Arc::clone(&counters)))).build();
        (runtime, counters)
    }

    #[test]
    fn builder_applies_config() {
        let (runtime, _) = runtime(true);
        assert_eq!(runtime.control_kind(), Some(ControlKind::Orbit));
        assert_eq!(runtime.pass_names(), vec!["render", "fxaa", "gamma-correction"]);
        let camera = runtime.camera();
        assert_eq!(camera.position, Vec3::new(0.0, 2.0, 5.0));
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn frames_render_through_pipeline_or_directly() {
        let (runtime, counters) = runtime(true);
        runtime.tick(0.016).unwrap();
        assert_eq!(counters.scenes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.passes.load(Ordering::SeqCst), 2);

        runtime.set_post_processing(false);
        runtime.tick(0.016).unwrap();
        assert_eq!(counters.scenes.load(Ordering::SeqCst), 2);
        assert_eq!(counters.passes.load(Ordering::SeqCst), 2);
        assert_eq!(runtime.stats().frames, 2);
    }

    #[test]
    fn pipeline_without_enabled_passes_draws_directly() {
        let (runtime, counters) = runtime(true);
        runtime.set_pipeline(Some(Pipeline::empty(runtime.viewport())));
        runtime.tick(0.016).unwrap();
        assert_eq!(counters.scenes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.passes.load(Ordering::SeqCst), 0);

        let mut gamma = ShaderPass::gamma_correction();
        gamma.enabled = false;
        let mut pipeline = Pipeline::empty(runtime.viewport());
        pipeline.add_pass(Box::new(gamma));
        runtime.set_pipeline(Some(pipeline));
        runtime.tick(0.016).unwrap();
        assert_eq!(counters.scenes.load(Ordering::SeqCst), 2);
        assert_eq!(counters.passes.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.pass_names(), vec!["gamma-correction"]);
    }

    #[test]
    fn callbacks_see_the_camera_moved_this_frame() {
        let (runtime, _) = runtime(false);
        runtime.set_control(ControlKind::Fly);
        runtime.input().set_key_down("KeyW");
        runtime
            .add_object_with_update("marker", Object3D::group("marker"), |marker, frame, _delta| {
                marker.transform.position = frame.camera.position;
                if frame.control == Some(ControlKind::Fly) {
                    marker.transform.scale = Vec3::splat(2.0);
                }
            })
            .unwrap();

        let before = runtime.camera().position;
        runtime.tick(0.5).unwrap();
        let camera = runtime.camera().position;
        assert_ne!(camera, before);
        let marker = runtime.object("marker").unwrap();
        assert_eq!(marker.transform.position, camera);
        assert_eq!(marker.transform.scale, Vec3::splat(2.0));
    }

    #[test]
    fn add_pass_without_pipeline_starts_with_render() {
        let (runtime, _) = runtime(false);
        assert!(runtime.pass_names().is_empty());
        runtime.add_pass(Box::new(ShaderPass::gamma_correction()));
        assert_eq!(runtime.pass_names(), vec!["render", "gamma-correction"]);
    }

    #[test]
    fn basic_scene_registers_ground_and_spinning_cube() {
        let (runtime, _) = runtime(false);
        runtime.create_basic_scene().unwrap();
        assert_eq!(runtime.object_ids(), vec!["ground", "cube"]);
        runtime.tick(0.0).unwrap();
        runtime.tick(1.0).unwrap();
        let cube = runtime.object("cube").unwrap();
        assert_eq!(cube.transform.rotation.x, 0.5);
        assert_eq!(cube.transform.rotation.y, 0.2);
        assert!(runtime.with_scene(|scene| scene.lights.len()) == 3);
        assert!(runtime.create_basic_scene().is_err());
    }

    #[test]
    fn removing_an_object_drops_its_mixer() {
        let (runtime, _) = runtime(false);
        runtime
            .add_object("rig", Object3D::group("rig"))
            .unwrap();
        assert!(runtime.create_animation_mixer("rig"));
        assert!(runtime.create_animation_mixer("rig"));
        assert!(!runtime.create_animation_mixer("ghost"));
        assert_eq!(runtime.mixer_count(), 1);
        runtime.remove_object("rig");
        assert_eq!(runtime.mixer_count(), 0);
    }
}
