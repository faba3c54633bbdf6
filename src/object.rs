use std::sync::atomic::{AtomicU64, Ordering};

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

static NEXT_GPU_RESOURCE: AtomicU64 = AtomicU64::new(1);

/// Handle for a buffer the renderer keeps on the GPU side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GpuResourceId(u64);

impl GpuResourceId {
    pub fn next() -> Self {
        Self(NEXT_GPU_RESOURCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// 24-bit RGB colour in the `0xRRGGBB` notation used by scene descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Self = Self(0xffffff);

    /// Parses `0x00ff00`, `#00ff00` or `00ff00`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X")
            .trim_start_matches('#');
        if digits.is_empty() || digits.len() > 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self)
    }

    pub fn hex(self) -> u32 {
        self.0
    }

    /// Normalised linear channels in `[0, 1]`.
    pub fn to_rgb(self) -> Vec3 {
        Vec3::new(
            ((self.0 >> 16) & 0xff) as f32 / 255.0,
            ((self.0 >> 8) & 0xff) as f32 / 255.0,
            (self.0 & 0xff) as f32 / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Position, Euler rotation (radians, XYZ order) and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Shape parameters handed to the graphics library when it builds vertex buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryShape {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
    },
    Plane {
        width: f32,
        height: f32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    /// Interleaved `position.xyz normal.xyz` vertices from an imported model.
    Indexed { vertices: Vec<f32>, indices: Vec<u32> },
    /// Closed glyph contours in the XY plane, extruded from `z = 0` to `z = depth`.
    Text {
        contours: Vec<Vec<Vec2>>,
        depth: f32,
        bevel_enabled: bool,
    },
}

impl GeometryShape {
    /// Radius of a sphere centred on the local origin that encloses the shape.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Box {
                width,
                height,
                depth,
            } => Vec3::new(*width, *height, *depth).length() / 2.0,
            Self::Sphere { radius, .. } => *radius,
            Self::Cylinder {
                radius_top,
                radius_bottom,
                height,
                ..
            } => Vec3::new(radius_top.max(*radius_bottom), height / 2.0, 0.0).length(),
            Self::Plane { width, height } => Vec3::new(*width, *height, 0.0).length() / 2.0,
            Self::Torus { radius, tube, .. } => radius + tube,
            Self::Indexed { vertices, .. } => vertices
                .chunks_exact(6)
                .map(|chunk| Vec3::new(chunk[0], chunk[1], chunk[2]).length())
                .fold(0.0, f32::max),
            Self::Text {
                contours, depth, ..
            } => contours
                .iter()
                .flatten()
                .map(|point| point.extend(*depth).length())
                .fold(0.0, f32::max),
        }
    }

    /// Axis aligned bounds of an extruded text shape; `None` for other shapes and
    /// for text without any outline.
    pub fn text_bounds(&self) -> Option<(Vec3, Vec3)> {
        let Self::Text {
            contours, depth, ..
        } = self
        else {
            return None;
        };
        let mut points = contours.iter().flatten();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), point| {
            (min.min(*point), max.max(*point))
        });
        Some((min.extend(0.0), max.extend(*depth)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    id: GpuResourceId,
    pub shape: GeometryShape,
}

impl Geometry {
    pub fn new(shape: GeometryShape) -> Self {
        Self {
            id: GpuResourceId::next(),
            shape,
        }
    }

    pub fn id(&self) -> GpuResourceId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Front,
    Double,
}

/// Physically based material parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    id: GpuResourceId,
    pub color: Color,
    pub wireframe: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub side: Side,
}

impl Material {
    pub fn standard(color: Color) -> Self {
        Self {
            id: GpuResourceId::next(),
            color,
            wireframe: false,
            metalness: 0.0,
            roughness: 1.0,
            side: Side::Front,
        }
    }

    pub fn id(&self) -> GpuResourceId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Group,
    Mesh(Mesh),
}

/// Node of the scene graph owned by the object registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub kind: ObjectKind,
    pub children: Vec<Object3D>,
}

impl Object3D {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            cast_shadow: false,
            receive_shadow: false,
            kind: ObjectKind::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(geometry: Geometry, material: Material) -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            cast_shadow: false,
            receive_shadow: false,
            kind: ObjectKind::Mesh(Mesh {
                geometry,
                materials: vec![material],
            }),
            children: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            ObjectKind::Group => None,
        }
    }

    pub fn add(&mut self, child: Object3D) {
        self.children.push(child);
    }

    /// Visits this node and every descendant, parents first.
    pub fn traverse<F: FnMut(&Object3D)>(&self, visit: &mut F) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    pub fn traverse_mut<F: FnMut(&mut Object3D)>(&mut self, visit: &mut F) {
        visit(self);
        for child in &mut self.children {
            child.traverse_mut(visit);
        }
    }

    /// Marks every mesh of the subtree as a shadow caster and receiver.
    pub fn enable_shadows(&mut self) {
        self.traverse_mut(&mut |node| {
            if node.as_mesh().is_some() {
                node.cast_shadow = true;
                node.receive_shadow = true;
            }
        });
    }

    /// Geometry and material buffers owned by the subtree.
    pub fn gpu_resources(&self) -> Vec<GpuResourceId> {
        let mut resources = Vec::new();
        self.traverse(&mut |node| {
            if let Some(mesh) = node.as_mesh() {
                resources.push(mesh.geometry.id());
                resources.extend(mesh.materials.iter().map(Material::id));
            }
        });
        resources
    }
}
