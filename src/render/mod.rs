//! Contracts between the runtime and the graphics library that draws frames.

pub mod pipeline;

use anyhow::Result;
use glam::{Mat4, Vec3};

use crate::camera::PerspectiveCamera;
use crate::object::{GpuResourceId, Object3D};
use crate::registry::ObjectRegistry;
use crate::scene::{NodeRef, Scene};

pub use pipeline::{Pass, Pipeline, RenderPass, Shader, ShaderPass};

/// Output surface dimensions in logical pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    /// Size of the drawing buffer in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round() as u32,
            (self.height as f32 * self.pixel_ratio).round() as u32,
        )
    }
}

/// Where a scene draw ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Straight to the visible surface.
    Screen,
    /// Into the pipeline's read buffer, to be processed by later passes.
    Composer,
}

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Everything a renderer needs to draw one frame.
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub objects: &'a ObjectRegistry,
    pub camera: &'a PerspectiveCamera,
}

impl<'a> FrameView<'a> {
    pub fn camera_params(&self) -> CameraParams {
        CameraParams {
            view_proj: self.camera.view_projection(),
            position: self.camera.position,
        }
    }

    /// Registered objects currently attached to the scene graph, in draw order.
    pub fn drawables(&self) -> impl Iterator<Item = (&'a str, &'a Object3D)> + 'a {
        let objects = self.objects;
        self.scene.nodes().iter().filter_map(move |node| match node {
            NodeRef::Object(id) => objects.get(id).map(|object| (id.as_str(), object)),
            NodeRef::PositionalAudio(_) => None,
        })
    }
}

/// The graphics library's renderer.
pub trait Renderer: Send {
    fn set_size(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn pixel_ratio(&self) -> f32;

    /// Draws the scene from the camera into `target`.
    fn draw_scene(&mut self, view: &FrameView<'_>, target: RenderTarget) -> Result<()>;

    /// Runs a full-screen shader over the pipeline's current frame.
    fn draw_pass(&mut self, pass: &ShaderPass, to_screen: bool) -> Result<()>;

    /// Frees GPU buffers backing a geometry or material.
    fn release(&mut self, resource: GpuResourceId);

    /// Releases the rendering context itself.
    fn dispose(&mut self) {}
}
