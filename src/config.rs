use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::controls::ControlKind;
use crate::frame_loop::FrameErrorPolicy;
use crate::xml::{optional_text, parse_bool, parse_f32, parse_u32, parse_vec3};

/// Start-up parameters of a [`SceneRuntime`](crate::SceneRuntime).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio reported by the host.
    pub pixel_ratio: f32,
    /// Upper bound applied to `pixel_ratio` before it reaches the renderer.
    pub max_pixel_ratio: f32,
    pub camera: CameraConfig,
    pub controls: Option<ControlKind>,
    pub post_processing: bool,
    pub error_policy: FrameErrorPolicy,
    pub asset_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            pixel_ratio: 1.0,
            max_pixel_ratio: 2.0,
            camera: CameraConfig::default(),
            controls: Some(ControlKind::Orbit),
            post_processing: true,
            error_policy: FrameErrorPolicy::Continue,
            asset_root: None,
        }
    }
}

impl RuntimeConfig {
    /// Reads the first `<runtime>` element of the document. Missing elements keep
    /// their defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid runtime XML")?;
        match document
            .descendants()
            .find(|node| node.has_tag_name("runtime"))
        {
            Some(node) => Self::from_node(&node),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn from_node(node: &Node<'_, '_>) -> Result<Self> {
        let defaults = Self::default();
        let camera = node
            .children()
            .find(|child| child.has_tag_name("camera"))
            .map(|camera| CameraConfig::from_node(&camera))
            .transpose()?
            .unwrap_or_default();

        let controls = match optional_text(node, "controls") {
            None => defaults.controls,
            Some(name) if name.eq_ignore_ascii_case("none") => None,
            Some(name) => Some(
                ControlKind::from_name(&name)
                    .with_context(|| format!("unknown control kind `{name}`"))?,
            ),
        };
        let error_policy = match optional_text(node, "error-policy") {
            None => defaults.error_policy,
            Some(name) => FrameErrorPolicy::from_name(&name)
                .with_context(|| format!("unknown frame error policy `{name}`"))?,
        };

        Ok(Self {
            width: parse_u32(optional_text(node, "width"), defaults.width).context("<width>")?,
            height: parse_u32(optional_text(node, "height"), defaults.height)
                .context("<height>")?,
            pixel_ratio: parse_f32(optional_text(node, "pixel-ratio"), defaults.pixel_ratio)
                .context("<pixel-ratio>")?,
            max_pixel_ratio: parse_f32(
                optional_text(node, "max-pixel-ratio"),
                defaults.max_pixel_ratio,
            )
            .context("<max-pixel-ratio>")?,
            camera,
            controls,
            post_processing: parse_bool(
                optional_text(node, "post-processing"),
                defaults.post_processing,
            )
            .context("<post-processing>")?,
            error_policy,
            asset_root: optional_text(node, "asset-root").map(PathBuf::from),
        })
    }

    /// Pixel ratio handed to the renderer: the host's ratio capped at `max_pixel_ratio`.
    pub fn effective_pixel_ratio(&self) -> f32 {
        self.pixel_ratio.min(self.max_pixel_ratio).max(f32::MIN_POSITIVE)
    }
}

impl CameraConfig {
    fn from_node(node: &Node<'_, '_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            fov: parse_f32(optional_text(node, "fov"), defaults.fov).context("<fov>")?,
            near: parse_f32(optional_text(node, "near"), defaults.near).context("<near>")?,
            far: parse_f32(optional_text(node, "far"), defaults.far).context("<far>")?,
            position: parse_vec3(optional_text(node, "position"), defaults.position)
                .context("<position>")?,
            target: parse_vec3(optional_text(node, "target"), defaults.target)
                .context("<target>")?,
        })
    }
}
