use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::object::{Color, Object3D};
use crate::primitives::{
    create_cube, create_cylinder, create_plane, create_sphere, create_torus, PrimitiveOptions,
};
use crate::registry::{FrameContext, ObjectUpdate};
use crate::xml::{
    has_child, optional_text, parse_bool, parse_color, parse_f32, parse_u32, parse_vec3,
    required_text,
};

/// Shape of a manifest object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ObjectShape {
    Cube { size: f32 },
    Sphere { radius: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32 },
    Plane { width: f32, height: f32 },
    Torus { radius: f32, tube: f32 },
    /// glTF or OBJ file loaded asynchronously.
    Model { path: String },
}

impl ObjectShape {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Cube { .. } => "cube",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Plane { .. } => "plane",
            Self::Torus { .. } => "torus",
            Self::Model { .. } => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub name: String,
    pub shape: ObjectShape,
    pub color: Option<Color>,
    pub options: PrimitiveOptions,
    pub position: Vec3,
    pub rotation: Vec3,
    /// Radians per second around each axis, applied every frame.
    pub spin: Option<Vec3>,
}

impl ObjectSpec {
    /// Builds the object for primitive shapes; models return `None` and are loaded
    /// by the runtime instead.
    pub fn build(&self) -> Option<Object3D> {
        let options = &self.options;
        let mut object = match self.shape {
            ObjectShape::Cube { size } => {
                create_cube(size, self.color.unwrap_or(Color(0x00ff00)), options)
            }
            ObjectShape::Sphere { radius } => {
                create_sphere(radius, self.color.unwrap_or(Color(0x0000ff)), options)
            }
            ObjectShape::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => create_cylinder(
                radius_top,
                radius_bottom,
                height,
                self.color.unwrap_or(Color(0xffff00)),
                options,
            ),
            ObjectShape::Plane { width, height } => {
                create_plane(width, height, self.color.unwrap_or(Color::WHITE), options)
            }
            ObjectShape::Torus { radius, tube } => {
                create_torus(radius, tube, self.color.unwrap_or(Color(0xff00ff)), options)
            }
            ObjectShape::Model { .. } => return None,
        };
        object.name = self.name.clone();
        object.transform.position = self.position;
        object.transform.rotation = self.rotation;
        Some(object)
    }

    /// Per-frame callback for objects with a `spin`.
    pub fn update_fn(&self) -> Option<ObjectUpdate> {
        let spin = self.spin?;
        Some(Box::new(
            move |object: &mut Object3D, _frame: &FrameContext<'_>, delta: f32| {
                object.transform.rotation += spin * delta;
            },
        ))
    }

    fn from_node(node: &Node<'_, '_>) -> Result<Self> {
        let name = required_text(node, "name")?;
        let kind = optional_text(node, "type").unwrap_or_else(|| "cube".to_string());
        let number = |tag: &str, default: f32| {
            parse_f32(optional_text(node, tag), default).with_context(|| format!("<{tag}>"))
        };

        let shape = match kind.as_str() {
            "cube" => ObjectShape::Cube {
                size: number("size", 1.0)?,
            },
            "sphere" => ObjectShape::Sphere {
                radius: number("radius", 1.0)?,
            },
            "cylinder" => ObjectShape::Cylinder {
                radius_top: number("radius-top", 1.0)?,
                radius_bottom: number("radius-bottom", 1.0)?,
                height: number("height", 2.0)?,
            },
            "plane" => ObjectShape::Plane {
                width: number("width", 10.0)?,
                height: number("height", 10.0)?,
            },
            "torus" => ObjectShape::Torus {
                radius: number("radius", 1.0)?,
                tube: number("tube", 0.4)?,
            },
            "model" => ObjectShape::Model {
                path: required_text(node, "path")?,
            },
            other => bail!("unknown object type `{other}`"),
        };

        let defaults = PrimitiveOptions::default();
        let options = PrimitiveOptions {
            wireframe: parse_bool(optional_text(node, "wireframe"), defaults.wireframe)?,
            metalness: number("metalness", defaults.metalness)?,
            roughness: number("roughness", defaults.roughness)?,
            segments: parse_u32(optional_text(node, "segments"), defaults.segments)?,
        };
        let color = optional_text(node, "color")
            .map(|value| parse_color(Some(value), Color::WHITE))
            .transpose()?;
        let spin = optional_text(node, "spin")
            .map(|value| parse_vec3(Some(value), Vec3::ZERO))
            .transpose()
            .context("<spin>")?;

        Ok(Self {
            name,
            shape,
            color,
            options,
            position: parse_vec3(optional_text(node, "position"), Vec3::ZERO)
                .context("<position>")?,
            rotation: parse_vec3(optional_text(node, "rotation"), Vec3::ZERO)
                .context("<rotation>")?,
            spin,
        })
    }
}

/// Scene description read by the command line runner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    pub config: RuntimeConfig,
    /// Whether to set up the sky, fog, lights and default objects first.
    pub basic_scene: bool,
    pub objects: Vec<ObjectSpec>,
}

impl SceneManifest {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            return Err(anyhow!(
                "expected <scene> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let config = match root.children().find(|child| child.has_tag_name("runtime")) {
            Some(node) => RuntimeConfig::from_node(&node).context("invalid <runtime> section")?,
            None => RuntimeConfig::default(),
        };
        let basic_scene = has_child(&root, "basic-scene");

        let mut objects: Vec<ObjectSpec> = Vec::new();
        for (index, node) in root
            .children()
            .filter(|child| child.has_tag_name("object"))
            .enumerate()
        {
            let spec = ObjectSpec::from_node(&node)
                .with_context(|| format!("invalid <object> #{}", index + 1))?;
            if objects.iter().any(|existing| existing.name == spec.name) {
                bail!("object `{}` is declared twice", spec.name);
            }
            objects.push(spec);
        }

        Ok(Self {
            config,
            basic_scene,
            objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::input::InputState;

    const SAMPLE: &str = r#"
    <scene>
        <runtime><width>800</width><height>600</height></runtime>
        <basic-scene/>
        <object>
            <name>spinner</name>
            <type>cube</type>
            <size>2</size>
            <color>0xff0000</color>
            <position>0 1 0</position>
            <spin>0 1 0</spin>
        </object>
        <object>
            <name>ring</name>
            <type>torus</type>
            <wireframe>true</wireframe>
        </object>
        <object>
            <name>robot</name>
            <type>model</type>
            <path>assets/robot.glb</path>
        </object>
    </scene>
    "#;

    #[test]
    fn parses_objects_and_runtime_section() {
        let manifest = SceneManifest::from_xml(SAMPLE).unwrap();
        assert_eq!(manifest.config.width, 800);
        assert!(manifest.basic_scene);
        let names: Vec<_> = manifest.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["spinner", "ring", "robot"]);
        assert_eq!(manifest.objects[0].shape, ObjectShape::Cube { size: 2.0 });
        assert_eq!(manifest.objects[0].color, Some(Color(0xff0000)));
        assert!(manifest.objects[1].options.wireframe);
        assert_eq!(
            manifest.objects[2].shape,
            ObjectShape::Model {
                path: "assets/robot.glb".into()
            }
        );
    }

    #[test]
    fn built_objects_carry_transform_and_spin() {
        let manifest = SceneManifest::from_xml(SAMPLE).unwrap();
        let spinner = &manifest.objects[0];
        let mut object = spinner.build().unwrap();
        assert_eq!(object.transform.position, Vec3::Y);
        assert_eq!(object.name, "spinner");

        let camera = PerspectiveCamera::default();
        let input = InputState::new();
        let frame = FrameContext {
            camera: &camera,
            control: None,
            input: &input,
        };
        let mut update = spinner.update_fn().unwrap();
        update(&mut object, &frame, 0.5);
        assert_eq!(object.transform.rotation, Vec3::new(0.0, 0.5, 0.0));

        assert!(manifest.objects[1].update_fn().is_none());
        assert!(manifest.objects[2].build().is_none());
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(SceneManifest::from_xml("<world/>").is_err());
        assert!(SceneManifest::from_xml(
            "<scene><object><name>a</name><type>teapot</type></object></scene>"
        )
        .is_err());
        assert!(SceneManifest::from_xml(
            "<scene><object><name>a</name></object><object><name>a</name></object></scene>"
        )
        .is_err());
        assert!(SceneManifest::from_xml("<scene><object><type>cube</type></object></scene>").is_err());
    }
}
