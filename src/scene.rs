use std::sync::Arc;

use glam::Vec3;

use crate::loader::Texture;
use crate::object::Color;

/// Exponential squared fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub density: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half extent of the orthographic shadow camera.
    pub extent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
        shadow: Option<ShadowSettings>,
    },
    Hemisphere {
        sky: Color,
        ground: Color,
        intensity: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Helper {
    Grid { size: f32, divisions: u32 },
    Axes { size: f32 },
}

/// Entry of the draw list. The registries own the resources; the scene graph
/// only refers to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Object(String),
    PositionalAudio(String),
}

/// Scene graph as seen by the renderer.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub background: Option<Color>,
    pub fog: Option<Fog>,
    pub environment: Option<Arc<Texture>>,
    pub lights: Vec<Light>,
    pub helpers: Vec<Helper>,
    nodes: Vec<NodeRef>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the draw list; attaching a node twice keeps one entry.
    pub fn attach(&mut self, node: NodeRef) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    pub fn detach(&mut self, node: &NodeRef) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|existing| existing != node);
        self.nodes.len() != before
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.nodes.contains(node)
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lights.clear();
        self.helpers.clear();
        self.environment = None;
    }

    /// Sky background, distance fog, a three light rig and debug helpers.
    pub fn configure_basic_environment(&mut self) {
        let sky = Color(0x87ceeb);
        self.background = Some(sky);
        self.fog = Some(Fog {
            color: sky,
            density: 0.01,
        });
        self.lights.push(Light::Ambient {
            color: Color::WHITE,
            intensity: 0.3,
        });
        self.lights.push(Light::Directional {
            color: Color::WHITE,
            intensity: 1.0,
            position: Vec3::new(5.0, 10.0, 5.0),
            shadow: Some(ShadowSettings {
                map_size: 2048,
                near: 0.5,
                far: 50.0,
                extent: 20.0,
            }),
        });
        self.lights.push(Light::Hemisphere {
            sky: Color::WHITE,
            ground: Color(0x444444),
            intensity: 0.5,
        });
        self.helpers.push(Helper::Grid {
            size: 100.0,
            divisions: 100,
        });
        self.helpers.push(Helper::Axes { size: 5.0 });
    }
}
