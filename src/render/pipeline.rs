use std::collections::BTreeMap;

use anyhow::{Context, Result};
use glam::Vec2;
use log::debug;

use super::{FrameView, RenderTarget, Renderer, Viewport};

/// One stage of the post-processing pipeline.
pub trait Pass: Send {
    fn name(&self) -> &str;

    /// Called with the logical output size whenever the viewport changes.
    fn set_size(&mut self, _viewport: Viewport) {}

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        view: &FrameView<'_>,
        to_screen: bool,
    ) -> Result<()>;

    /// Resolution uniform, for passes whose output depends on the drawing buffer size.
    fn resolution(&self) -> Option<Vec2> {
        None
    }

    /// Disabled passes are skipped and never receive the screen.
    fn is_enabled(&self) -> bool {
        true
    }

    fn dispose(&mut self) {}
}

/// Draws the scene into the pipeline's buffers.
#[derive(Debug, Default)]
pub struct RenderPass;

impl Pass for RenderPass {
    fn name(&self) -> &str {
        "render"
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        view: &FrameView<'_>,
        to_screen: bool,
    ) -> Result<()> {
        let target = if to_screen {
            RenderTarget::Screen
        } else {
            RenderTarget::Composer
        };
        renderer.draw_scene(view, target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shader {
    Fxaa,
    GammaCorrection,
    Custom(String),
}

impl Shader {
    pub fn name(&self) -> &str {
        match self {
            Self::Fxaa => "fxaa",
            Self::GammaCorrection => "gamma-correction",
            Self::Custom(name) => name,
        }
    }
}

/// Full-screen shader pass with its uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPass {
    pub shader: Shader,
    resolution: Option<Vec2>,
    pub uniforms: BTreeMap<String, f32>,
    pub enabled: bool,
}

impl ShaderPass {
    pub fn new(shader: Shader) -> Self {
        Self {
            shader,
            resolution: None,
            uniforms: BTreeMap::new(),
            enabled: true,
        }
    }

    /// FXAA samples neighbouring texels, so it carries a resolution uniform.
    pub fn fxaa(viewport: Viewport) -> Self {
        let mut pass = Self::new(Shader::Fxaa);
        pass.resolution = Some(Vec2::ZERO);
        pass.set_size(viewport);
        pass
    }

    pub fn gamma_correction() -> Self {
        Self::new(Shader::GammaCorrection)
    }

    /// Gives a custom pass a resolution uniform kept in sync with the viewport.
    pub fn with_resolution(mut self, viewport: Viewport) -> Self {
        self.resolution = Some(Vec2::ZERO);
        self.set_size(viewport);
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>, value: f32) -> Self {
        self.uniforms.insert(name.into(), value);
        self
    }
}

/// `1 / (dimension * pixel_ratio)` per axis.
pub fn texel_size(viewport: Viewport) -> Vec2 {
    Vec2::new(
        1.0 / (viewport.width.max(1) as f32 * viewport.pixel_ratio),
        1.0 / (viewport.height.max(1) as f32 * viewport.pixel_ratio),
    )
}

impl Pass for ShaderPass {
    fn name(&self) -> &str {
        self.shader.name()
    }

    fn set_size(&mut self, viewport: Viewport) {
        if let Some(resolution) = self.resolution.as_mut() {
            *resolution = texel_size(viewport);
        }
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        _view: &FrameView<'_>,
        to_screen: bool,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        renderer.draw_pass(self, to_screen)
    }

    fn resolution(&self) -> Option<Vec2> {
        self.resolution
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Ordered list of passes; the last enabled one renders to the screen.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
    viewport: Viewport,
}

impl Pipeline {
    pub fn empty(viewport: Viewport) -> Self {
        Self {
            passes: Vec::new(),
            viewport,
        }
    }

    /// Render, FXAA and gamma correction, in that order.
    pub fn standard(viewport: Viewport) -> Self {
        let mut pipeline = Self::empty(viewport);
        pipeline.add_pass(Box::new(RenderPass));
        pipeline.add_pass(Box::new(ShaderPass::fxaa(viewport)));
        pipeline.add_pass(Box::new(ShaderPass::gamma_correction()));
        pipeline
    }

    pub fn add_pass(&mut self, mut pass: Box<dyn Pass>) {
        pass.set_size(self.viewport);
        debug!("pipeline: added pass {}", pass.name());
        self.passes.push(pass);
    }

    pub fn passes(&self) -> &[Box<dyn Pass>] {
        &self.passes
    }

    pub fn pass_names(&self) -> Vec<String> {
        self.passes.iter().map(|pass| pass.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// False when nothing would reach the screen, either because the pipeline is
    /// empty or because every pass is disabled.
    pub fn has_enabled_passes(&self) -> bool {
        self.passes.iter().any(|pass| pass.is_enabled())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_size(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for pass in &mut self.passes {
            pass.set_size(viewport);
        }
    }

    pub fn render(&mut self, renderer: &mut dyn Renderer, view: &FrameView<'_>) -> Result<()> {
        let Some(last) = self.passes.iter().rposition(|pass| pass.is_enabled()) else {
            return Ok(());
        };
        for (index, pass) in self.passes.iter_mut().enumerate() {
            if !pass.is_enabled() {
                continue;
            }
            pass.render(renderer, view, index == last)
                .with_context(|| format!("pass `{}` failed", pass.name()))?;
        }
        Ok(())
    }

    pub fn dispose(&mut self) {
        for pass in &mut self.passes {
            pass.dispose();
        }
        self.passes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::object::GpuResourceId;
    use crate::registry::ObjectRegistry;
    use crate::scene::Scene;

    #[derive(Default)]
    struct DrawLog {
        draws: Vec<(String, bool)>,
    }

    impl Renderer for DrawLog {
        fn set_size(&mut self, _width: u32, _height: u32) {}
        fn set_pixel_ratio(&mut self, _ratio: f32) {}
        fn pixel_ratio(&self) -> f32 {
            1.0
        }
        fn draw_scene(&mut self, _view: &FrameView<'_>, target: RenderTarget) -> Result<()> {
            self.draws
                .push(("scene".to_string(), target == RenderTarget::Screen));
            Ok(())
        }
        fn draw_pass(&mut self, pass: &ShaderPass, to_screen: bool) -> Result<()> {
            self.draws.push((pass.name().to_string(), to_screen));
            Ok(())
        }
        fn release(&mut self, _resource: GpuResourceId) {}
    }

    fn render_once(pipeline: &mut Pipeline) -> Vec<(String, bool)> {
        let scene = Scene::new();
        let objects = ObjectRegistry::new();
        let camera = PerspectiveCamera::default();
        let view = FrameView {
            scene: &scene,
            objects: &objects,
            camera: &camera,
        };
        let mut renderer = DrawLog::default();
        pipeline.render(&mut renderer, &view).unwrap();
        renderer.draws
    }

    fn viewport(width: u32, height: u32, pixel_ratio: f32) -> Viewport {
        Viewport {
            width,
            height,
            pixel_ratio,
        }
    }

    #[test]
    fn standard_pipeline_order() {
        let pipeline = Pipeline::standard(viewport(800, 600, 1.0));
        assert_eq!(
            pipeline.pass_names(),
            vec!["render", "fxaa", "gamma-correction"]
        );
    }

    #[test]
    fn fxaa_resolution_tracks_viewport() {
        let mut pipeline = Pipeline::standard(viewport(800, 600, 2.0));
        let fxaa = pipeline.passes()[1].resolution().unwrap();
        assert_eq!(fxaa, Vec2::new(1.0 / 1600.0, 1.0 / 1200.0));

        pipeline.set_size(viewport(1024, 512, 1.5));
        let fxaa = pipeline.passes()[1].resolution().unwrap();
        assert_eq!(fxaa, Vec2::new(1.0 / 1536.0, 1.0 / 768.0));
        assert!(pipeline.passes()[2].resolution().is_none());
    }

    #[test]
    fn user_passes_are_sized_when_added() {
        let mut pipeline = Pipeline::standard(viewport(400, 200, 1.0));
        pipeline.add_pass(Box::new(
            ShaderPass::new(Shader::Custom("vignette".into()))
                .with_uniform("darkness", 1.2)
                .with_resolution(viewport(1, 1, 1.0)),
        ));
        let custom = pipeline.passes().last().unwrap();
        assert_eq!(custom.name(), "vignette");
        assert_eq!(custom.resolution(), Some(Vec2::new(1.0 / 400.0, 1.0 / 200.0)));
    }

    #[test]
    fn screen_goes_to_the_last_enabled_pass() {
        let mut pipeline = Pipeline::empty(viewport(100, 100, 1.0));
        let mut gamma = ShaderPass::gamma_correction();
        gamma.enabled = false;
        pipeline.add_pass(Box::new(RenderPass));
        pipeline.add_pass(Box::new(ShaderPass::fxaa(viewport(100, 100, 1.0))));
        pipeline.add_pass(Box::new(gamma));

        assert!(pipeline.has_enabled_passes());
        assert_eq!(
            render_once(&mut pipeline),
            vec![("scene".to_string(), false), ("fxaa".to_string(), true)]
        );
    }

    #[test]
    fn disabled_only_pipeline_draws_nothing() {
        let mut pipeline = Pipeline::empty(viewport(100, 100, 1.0));
        assert!(!pipeline.has_enabled_passes());
        let mut fxaa = ShaderPass::fxaa(viewport(100, 100, 1.0));
        fxaa.enabled = false;
        pipeline.add_pass(Box::new(fxaa));
        assert!(!pipeline.has_enabled_passes());
        assert!(render_once(&mut pipeline).is_empty());
    }

    #[test]
    fn dispose_empties_the_pipeline() {
        let mut pipeline = Pipeline::standard(viewport(10, 10, 1.0));
        pipeline.dispose();
        assert!(pipeline.is_empty());
    }
}
