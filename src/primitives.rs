//! Factories for the stock meshes hosts add to a scene.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::loader::Font;
use crate::object::{Color, Geometry, GeometryShape, Material, Object3D, Side};

/// Font loaded by [`TextOptions::default`].
pub const DEFAULT_FONT: &str = "assets/fonts/helvetiker_regular.typeface.json";

/// Options shared by every primitive factory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveOptions {
    pub wireframe: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub segments: u32,
}

impl Default for PrimitiveOptions {
    fn default() -> Self {
        Self {
            wireframe: false,
            metalness: 0.3,
            roughness: 0.4,
            segments: 32,
        }
    }
}

impl PrimitiveOptions {
    fn material(&self, color: Color) -> Material {
        let mut material = Material::standard(color);
        material.wireframe = self.wireframe;
        material.metalness = self.metalness;
        material.roughness = self.roughness;
        material
    }
}

fn shadowed_mesh(shape: GeometryShape, material: Material) -> Object3D {
    let mut mesh = Object3D::mesh(Geometry::new(shape), material);
    mesh.cast_shadow = true;
    mesh.receive_shadow = true;
    mesh
}

pub fn create_cube(size: f32, color: Color, options: &PrimitiveOptions) -> Object3D {
    shadowed_mesh(
        GeometryShape::Box {
            width: size,
            height: size,
            depth: size,
        },
        options.material(color),
    )
}

pub fn create_sphere(radius: f32, color: Color, options: &PrimitiveOptions) -> Object3D {
    shadowed_mesh(
        GeometryShape::Sphere {
            radius,
            width_segments: options.segments,
            height_segments: options.segments,
        },
        options.material(color),
    )
}

pub fn create_cylinder(
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
    color: Color,
    options: &PrimitiveOptions,
) -> Object3D {
    shadowed_mesh(
        GeometryShape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments: options.segments,
        },
        options.material(color),
    )
}

/// Double sided plane that only receives shadows.
pub fn create_plane(width: f32, height: f32, color: Color, options: &PrimitiveOptions) -> Object3D {
    let mut material = options.material(color);
    material.side = Side::Double;
    let mut mesh = Object3D::mesh(Geometry::new(GeometryShape::Plane { width, height }), material);
    mesh.receive_shadow = true;
    mesh
}

pub fn create_torus(radius: f32, tube: f32, color: Color, options: &PrimitiveOptions) -> Object3D {
    shadowed_mesh(
        GeometryShape::Torus {
            radius,
            tube,
            radial_segments: 16,
            tubular_segments: 100,
        },
        options.material(color),
    )
}

/// Options for extruded 3D text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub font: String,
    pub size: f32,
    /// Extrusion depth.
    pub height: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub color: Color,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            size: 0.5,
            height: 0.2,
            curve_segments: 4,
            bevel_enabled: false,
            color: Color::WHITE,
        }
    }
}

/// Shadow casting text mesh named after `text`, shifted left by half its width
/// so it sits centred on its parent.
pub fn create_text(text: &str, font: &Font, options: &TextOptions) -> Result<Object3D> {
    let contours = font.contours(text, options.size, options.curve_segments)?;
    let shape = GeometryShape::Text {
        contours,
        depth: options.height,
        bevel_enabled: options.bevel_enabled,
    };
    let width = shape.text_bounds().map_or(0.0, |(min, max)| max.x - min.x);
    let mut mesh = Object3D::mesh(Geometry::new(shape), Material::standard(options.color));
    mesh.name = text.to_string();
    mesh.transform.position.x = -width / 2.0;
    mesh.cast_shadow = true;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let options = PrimitiveOptions::default();
        assert!(!options.wireframe);
        assert_eq!(options.metalness, 0.3);
        assert_eq!(options.roughness, 0.4);
        assert_eq!(options.segments, 32);
    }

    #[test]
    fn missing_option_fields_fall_back_to_defaults() {
        let options: PrimitiveOptions =
            serde_json::from_str(r#"{ "wireframe": true }"#).unwrap();
        assert!(options.wireframe);
        assert_eq!(options.segments, 32);
        assert_eq!(options.roughness, 0.4);
    }

    #[test]
    fn cube_carries_color_and_material_options() {
        let cube = create_cube(1.0, Color(0x00ff00), &PrimitiveOptions::default());
        let mesh = cube.as_mesh().unwrap();
        assert_eq!(mesh.materials[0].color, Color(0x00ff00));
        assert_eq!(mesh.materials[0].metalness, 0.3);
        assert!(cube.cast_shadow && cube.receive_shadow);
        assert_eq!(
            mesh.geometry.shape,
            GeometryShape::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0
            }
        );
    }

    #[test]
    fn sphere_uses_segment_option() {
        let options = PrimitiveOptions {
            segments: 12,
            ..PrimitiveOptions::default()
        };
        let sphere = create_sphere(0.5, Color(0x0000ff), &options);
        match &sphere.as_mesh().unwrap().geometry.shape {
            GeometryShape::Sphere {
                width_segments,
                height_segments,
                ..
            } => assert_eq!((*width_segments, *height_segments), (12, 12)),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn text_is_centred_and_extruded() {
        let font = Font::from_json(
            "mono.json",
            br#"{
                "resolution": 100,
                "boundingBox": {"xMin": 0, "xMax": 100, "yMin": 0, "yMax": 100},
                "glyphs": {"H": {"ha": 100, "o": "m 0 0 l 80 0 l 80 100 l 0 100 l 0 0"}}
            }"#,
        )
        .unwrap();
        let options = TextOptions::default();
        let text = create_text("HH", &font, &options).unwrap();
        assert_eq!(text.name, "HH");
        assert!(text.cast_shadow && !text.receive_shadow);

        let mesh = text.as_mesh().unwrap();
        let (min, max) = mesh.geometry.shape.text_bounds().unwrap();
        // Two glyphs 0.4 wide, the second starting at 0.5.
        assert!((max.x - min.x - 0.9).abs() < 1e-6);
        assert_eq!((min.z, max.z), (0.0, 0.2));
        assert!((text.transform.position.x + 0.45).abs() < 1e-6);
        assert_eq!(mesh.materials[0].color, Color::WHITE);
    }

    #[test]
    fn text_defaults_match_the_documented_values() {
        let options = TextOptions::default();
        assert_eq!(options.font, DEFAULT_FONT);
        assert_eq!((options.size, options.height), (0.5, 0.2));
        assert_eq!(options.curve_segments, 4);
        assert!(!options.bevel_enabled);
        assert_eq!(options.color, Color(0xffffff));
    }

    #[test]
    fn plane_is_double_sided_and_does_not_cast() {
        let plane = create_plane(10.0, 10.0, Color::WHITE, &PrimitiveOptions::default());
        assert!(!plane.cast_shadow);
        assert!(plane.receive_shadow);
        assert_eq!(plane.as_mesh().unwrap().materials[0].side, Side::Double);
    }
}
