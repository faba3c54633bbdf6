use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Model;
use crate::error::LoadError;
use crate::object::{Color, Geometry, GeometryShape, Material, Object3D};

/// One `o`/`g` group of an OBJ file as interleaved `position.xyz normal.xyz` vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    pub name: String,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: i32,
    normal: i32,
}

#[derive(Debug, Default)]
struct Group {
    name: String,
    triangles: Vec<[Corner; 3]>,
}

/// Parses OBJ text into one mesh per named group. Faces that appear before any
/// `o` or `g` statement land in a group called `default`.
pub fn parse_obj(data: &str) -> Result<Vec<ObjMesh>> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut groups = vec![Group {
        name: "default".into(),
        ..Group::default()
    }];

    for (line_no, line) in data.lines().enumerate() {
        let line_no = line_no + 1;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(
                parse_vec3(parts).with_context(|| format!("invalid vertex on line {line_no}"))?,
            ),
            Some("vn") => normals.push(
                parse_vec3(parts).with_context(|| format!("invalid normal on line {line_no}"))?,
            ),
            Some("o") | Some("g") => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let current = groups.last_mut().ok_or_else(|| anyhow!("no active group"))?;
                if current.triangles.is_empty() {
                    current.name = name;
                } else {
                    groups.push(Group {
                        name,
                        ..Group::default()
                    });
                }
            }
            Some("f") => {
                let polygon =
                    parse_face(parts).with_context(|| format!("invalid face on line {line_no}"))?;
                let group = groups.last_mut().ok_or_else(|| anyhow!("no active group"))?;
                for i in 1..polygon.len() - 1 {
                    group.triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    groups
        .into_iter()
        .filter(|group| !group.triangles.is_empty())
        .map(|group| {
            let mut mesh = build_mesh(group, &positions, &normals)?;
            if has_missing_normals(&mesh.vertices) {
                compute_normals(&mut mesh);
            }
            Ok(mesh)
        })
        .collect()
}

/// Builds a model whose children are the file's groups, each a shadow casting mesh.
pub fn decode_obj(path: &str, bytes: &[u8]) -> Result<Model, LoadError> {
    let text = std::str::from_utf8(bytes).map_err(|err| LoadError::decode_failed(path, err))?;
    let meshes = parse_obj(text).map_err(|err| LoadError::decode_failed(path, err))?;

    let mut root = Object3D::group(path);
    for mesh in meshes {
        let geometry = Geometry::new(GeometryShape::Indexed {
            vertices: mesh.vertices,
            indices: mesh.indices,
        });
        let mut child = Object3D::mesh(geometry, Material::standard(Color::WHITE));
        child.name = mesh.name;
        root.add(child);
    }
    root.enable_shadows();
    Ok(Model {
        root,
        animations: Vec::new(),
    })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<Corner>> {
    let mut corners = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let position = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let normal = segments
            .nth(1)
            .filter(|s| !s.is_empty())
            .map(str::parse::<i32>)
            .transpose()?
            .unwrap_or(0);
        corners.push(Corner { position, normal });
    }
    if corners.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(corners)
}

fn build_mesh(group: Group, positions: &[Vec3], normals: &[Vec3]) -> Result<ObjMesh> {
    let mut lookup: HashMap<(usize, Option<usize>), u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(group.triangles.len() * 3);

    for corner in group.triangles.iter().flatten() {
        let position = resolve_index(corner.position, positions.len())
            .ok_or_else(|| anyhow!("vertex index {} out of range", corner.position))?;
        let normal = resolve_index(corner.normal, normals.len());
        let next = (vertices.len() / 6) as u32;
        let index = *lookup.entry((position, normal)).or_insert_with(|| {
            let p = positions[position];
            let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
            vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z]);
            next
        });
        indices.push(index);
    }

    Ok(ObjMesh {
        name: group.name,
        vertices,
        indices,
    })
}

/// OBJ indices are one based; negative values count back from the end.
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    match index {
        0 => None,
        i if i > 0 => Some(i as usize - 1).filter(|&i| i < len),
        i => len.checked_sub(i.unsigned_abs() as usize),
    }
}

fn has_missing_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(6)
        .any(|chunk| chunk[3..].iter().all(|&c| c == 0.0))
}

fn compute_normals(mesh: &mut ObjMesh) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len() / 6];
    let position = |vertices: &[f32], i: usize| Vec3::from_slice(&vertices[i * 6..i * 6 + 3]);

    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let p0 = position(&mesh.vertices, a);
        let face = (position(&mesh.vertices, b) - p0).cross(position(&mesh.vertices, c) - p0);
        if face.length_squared() > f32::EPSILON {
            let face = face.normalize();
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * 6 + 3..i * 6 + 6].copy_from_slice(&normal.to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn parses_triangle_and_fills_normals() {
        let meshes = parse_obj(TRIANGLE).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "default");
        assert_eq!(meshes[0].indices, vec![0, 1, 2]);
        for chunk in meshes[0].vertices.chunks_exact(6) {
            assert_eq!(Vec3::from_slice(&chunk[3..]), Vec3::Z);
        }
    }

    #[test]
    fn groups_become_separate_meshes() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                   o left\nf 1 2 3\n\
                   g right\nf 2 4 3\n";
        let names: Vec<_> = parse_obj(obj).unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["left", "right"]);
    }

    #[test]
    fn quads_are_triangulated_and_negative_indices_resolve() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4 -3 -2 -1\n";
        let mesh = &parse_obj(obj).unwrap()[0];
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 9\n").is_err());
        assert!(parse_obj("# nothing here\n").is_err());
    }

    #[test]
    fn decoded_model_casts_shadows() {
        let model = decode_obj("tri.obj", TRIANGLE.as_bytes()).unwrap();
        assert_eq!(model.root.children.len(), 1);
        let mut shadowed = 0;
        model.root.traverse(&mut |object| {
            if object.as_mesh().is_some() && object.cast_shadow && object.receive_shadow {
                shadowed += 1;
            }
        });
        assert_eq!(shadowed, 1);
        assert!(matches!(
            decode_obj("bad.obj", b"f 1 2"),
            Err(LoadError::Decode { .. })
        ));
    }
}
