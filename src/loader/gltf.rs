use anyhow::{Context, Result};
use glam::{EulerRot, Quat, Vec3};
use log::debug;

use super::Model;
use crate::animation::{AnimationClip, Track, TrackProperty};
use crate::error::LoadError;
use crate::object::{Color, Geometry, GeometryShape, Material, Object3D, Transform};

/// Decodes a self-contained glTF (binary, or JSON with embedded buffers).
///
/// Every mesh in the resulting tree casts and receives shadows.
pub fn decode_gltf(path: &str, bytes: &[u8]) -> Result<Model, LoadError> {
    let (document, buffers, _images) =
        ::gltf::import_slice(bytes).map_err(|err| LoadError::decode_failed(path, err))?;
    debug!(
        "{path}: {} nodes, {} meshes, {} animations",
        document.nodes().count(),
        document.meshes().count(),
        document.animations().count()
    );

    let mut root = Object3D::group(path);
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            root.add(
                convert_node(&node, &buffers)
                    .map_err(|err| LoadError::decode_failed(path, err))?,
            );
        }
    }
    root.enable_shadows();

    let animations = document
        .animations()
        .map(|animation| convert_animation(&animation, &buffers))
        .collect();

    Ok(Model { root, animations })
}

fn node_name(node: &::gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

fn convert_node(node: &::gltf::Node, buffers: &[::gltf::buffer::Data]) -> Result<Object3D> {
    let mut object = Object3D::group(node_name(node));
    let (translation, rotation, scale) = node.transform().decomposed();
    let (rx, ry, rz) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);
    object.transform = Transform {
        position: Vec3::from_array(translation),
        rotation: Vec3::new(rx, ry, rz),
        scale: Vec3::from_array(scale),
    };

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            object.add(convert_primitive(&primitive, buffers).with_context(|| {
                format!("mesh {:?} of node {}", mesh.name(), node_name(node))
            })?);
        }
    }
    for child in node.children() {
        object.add(convert_node(&child, buffers)?);
    }
    Ok(object)
}

fn convert_primitive(
    primitive: &::gltf::Primitive,
    buffers: &[::gltf::buffer::Data],
) -> Result<Object3D> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("primitive has no positions")?
        .collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let mut vertices = Vec::with_capacity(positions.len() * 6);
    for (i, position) in positions.iter().enumerate() {
        vertices.extend_from_slice(position);
        vertices.extend_from_slice(&normals.get(i).copied().unwrap_or([0.0; 3]));
    }

    let pbr = primitive.material().pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;
    let mut material = Material::standard(Color(channel(r) << 16 | channel(g) << 8 | channel(b)));
    material.metalness = pbr.metallic_factor();
    material.roughness = pbr.roughness_factor();

    Ok(Object3D::mesh(
        Geometry::new(GeometryShape::Indexed { vertices, indices }),
        material,
    ))
}

fn convert_animation(
    animation: &::gltf::Animation,
    buffers: &[::gltf::buffer::Data],
) -> AnimationClip {
    use ::gltf::animation::util::ReadOutputs;

    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(times) = reader.read_inputs() else {
            continue;
        };
        let (property, values): (TrackProperty, Vec<f32>) = match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                (TrackProperty::Translation, values.flatten().collect())
            }
            Some(ReadOutputs::Rotations(values)) => {
                (TrackProperty::Rotation, values.into_f32().flatten().collect())
            }
            Some(ReadOutputs::Scales(values)) => (TrackProperty::Scale, values.flatten().collect()),
            // Morph target weights have no counterpart on plain meshes.
            Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
        };
        tracks.push(Track {
            node: node_name(&channel.target().node()),
            property,
            times: times.collect(),
            values,
        });
    }

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation{}", animation.index()));
    AnimationClip::new(name, tracks)
}
