use glam::{Mat4, Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::object::{GeometryShape, Object3D};
use crate::registry::ObjectRegistry;

const EPSILON: f32 = 1e-6;
const MARCH_STEPS: usize = 128;

/// Hit against a registered object.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub id: String,
    pub distance: f32,
    pub point: Vec3,
}

/// Picks registered objects under a screen position.
///
/// Every mesh in an object's subtree is first tested against its bounding
/// sphere, then against its actual shape in the mesh's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raycaster {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Raycaster {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a point in normalised device coordinates.
    pub fn from_camera(ndc: Vec2, camera: &PerspectiveCamera) -> Self {
        let (origin, direction) = camera.ray_through(ndc);
        Self::new(origin, direction)
    }

    /// Distance along the ray to the first crossing of the sphere, if any.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let closest_sq = to_center.length_squared() - along * along;
        let radius_sq = radius * radius;
        if closest_sq > radius_sq {
            return None;
        }
        let half_chord = (radius_sq - closest_sq).sqrt();
        nearest_non_negative(along - half_chord, along + half_chord)
    }

    /// Nearest hit on any mesh of `object`'s subtree, placed by `parent`.
    pub fn intersect_object(&self, object: &Object3D, parent: Mat4) -> Option<f32> {
        let world = parent * object.transform.matrix();
        let own = object
            .as_mesh()
            .and_then(|mesh| self.intersect_shape(&mesh.geometry.shape, world));
        object
            .children
            .iter()
            .filter_map(|child| self.intersect_object(child, world))
            .chain(own)
            .min_by(f32::total_cmp)
    }

    fn intersect_shape(&self, shape: &GeometryShape, world: Mat4) -> Option<f32> {
        let scale = world
            .x_axis
            .truncate()
            .length()
            .max(world.y_axis.truncate().length())
            .max(world.z_axis.truncate().length());
        let center = world.transform_point3(Vec3::ZERO);
        self.intersect_sphere(center, shape.bounding_radius() * scale)?;

        if world.determinant().abs() < EPSILON {
            return None;
        }
        let inverse = world.inverse();
        // The local direction keeps the world parameterisation, so `t` is a
        // world distance.
        let origin = inverse.transform_point3(self.origin);
        let direction = inverse.transform_vector3(self.direction);
        local_hit(shape, origin, direction).filter(|t| *t >= 0.0)
    }

    /// Tests the given ids, or every registered object when `targets` is `None`.
    /// Hits are sorted nearest first.
    pub fn intersect_objects(
        &self,
        objects: &ObjectRegistry,
        targets: Option<&[String]>,
    ) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = objects
            .iter()
            .filter(|(id, _)| targets.map_or(true, |targets| targets.iter().any(|t| t == id)))
            .filter_map(|(id, object)| {
                let distance = self.intersect_object(object, Mat4::IDENTITY)?;
                Some(Intersection {
                    id: id.to_string(),
                    distance,
                    point: self.origin + self.direction * distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

/// First non-negative ray parameter where `origin + t * direction` meets the
/// shape, in the shape's own frame.
fn local_hit(shape: &GeometryShape, origin: Vec3, direction: Vec3) -> Option<f32> {
    match shape {
        GeometryShape::Box {
            width,
            height,
            depth,
        } => {
            let half = Vec3::new(*width, *height, *depth) / 2.0;
            ray_box(origin, direction, -half, half)
        }
        GeometryShape::Sphere { radius, .. } => ray_sphere(origin, direction, *radius),
        GeometryShape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            ..
        } => ray_frustum(origin, direction, *radius_top, *radius_bottom, *height),
        GeometryShape::Plane { width, height } => {
            if direction.z.abs() < EPSILON {
                return None;
            }
            let t = -origin.z / direction.z;
            let point = origin + direction * t;
            (t >= 0.0 && point.x.abs() <= width / 2.0 && point.y.abs() <= height / 2.0)
                .then_some(t)
        }
        GeometryShape::Torus { radius, tube, .. } => {
            ray_torus(origin, direction, *radius, *tube)
        }
        GeometryShape::Indexed { vertices, indices } => {
            let corner = |index: u32| {
                let start = index as usize * 6;
                vertices
                    .get(start..start + 3)
                    .map(Vec3::from_slice)
            };
            indices
                .chunks_exact(3)
                .filter_map(|triangle| {
                    let a = corner(triangle[0])?;
                    let b = corner(triangle[1])?;
                    let c = corner(triangle[2])?;
                    ray_triangle(origin, direction, a, b, c)
                })
                .min_by(f32::total_cmp)
        }
        GeometryShape::Text { .. } => {
            let (min, max) = shape.text_bounds()?;
            ray_box(origin, direction, min, max)
        }
    }
}

fn nearest_non_negative(near: f32, far: f32) -> Option<f32> {
    if far < 0.0 {
        None
    } else if near >= 0.0 {
        Some(near)
    } else {
        Some(far)
    }
}

/// Slab test against an axis aligned box.
fn ray_box(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut near = f32::NEG_INFINITY;
    let mut far = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (origin[axis], direction[axis]);
        if d.abs() < EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let (a, b) = ((min[axis] - o) / d, (max[axis] - o) / d);
        near = near.max(a.min(b));
        far = far.min(a.max(b));
    }
    if near > far {
        return None;
    }
    nearest_non_negative(near, far)
}

fn ray_sphere(origin: Vec3, direction: Vec3, radius: f32) -> Option<f32> {
    let a = direction.length_squared();
    let half_b = origin.dot(direction);
    let c = origin.length_squared() - radius * radius;
    let discriminant = half_b * half_b - a * c;
    if a < EPSILON || discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    nearest_non_negative((-half_b - root) / a, (-half_b + root) / a)
}

/// Capped cylinder or cone frustum around the local y axis, centred on the origin.
fn ray_frustum(
    origin: Vec3,
    direction: Vec3,
    radius_top: f32,
    radius_bottom: f32,
    height: f32,
) -> Option<f32> {
    let half = height / 2.0;
    let slope = if height > EPSILON {
        (radius_top - radius_bottom) / height
    } else {
        0.0
    };
    let middle = (radius_top + radius_bottom) / 2.0;
    let radius_at = |y: f32| slope * y + middle;

    // Side: x^2 + z^2 = radius_at(y)^2 along the ray.
    let mut candidates = Vec::with_capacity(4);
    let m = radius_at(origin.y);
    let k = slope * direction.y;
    let a = direction.x * direction.x + direction.z * direction.z - k * k;
    let b = 2.0 * (origin.x * direction.x + origin.z * direction.z - k * m);
    let c = origin.x * origin.x + origin.z * origin.z - m * m;
    if a.abs() > EPSILON {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            candidates.push((-b - root) / (2.0 * a));
            candidates.push((-b + root) / (2.0 * a));
        }
    } else if b.abs() > EPSILON {
        candidates.push(-c / b);
    }
    candidates.retain(|t| {
        let y = origin.y + direction.y * t;
        y.abs() <= half && radius_at(y) >= 0.0
    });

    if direction.y.abs() > EPSILON {
        for (cap_y, cap_radius) in [(half, radius_top), (-half, radius_bottom)] {
            let t = (cap_y - origin.y) / direction.y;
            let point = origin + direction * t;
            if point.x * point.x + point.z * point.z <= cap_radius * cap_radius {
                candidates.push(t);
            }
        }
    }
    candidates
        .into_iter()
        .filter(|t| *t >= 0.0)
        .min_by(f32::total_cmp)
}

/// Sphere tracing against the torus distance field. The ring lies in the local
/// XY plane, like the generated geometry.
fn ray_torus(origin: Vec3, direction: Vec3, radius: f32, tube: f32) -> Option<f32> {
    let length = direction.length();
    if length < EPSILON {
        return None;
    }
    let unit = direction / length;
    let distance = |p: Vec3| Vec2::new(p.truncate().length() - radius, p.z).length() - tube;
    let limit = origin.length() + radius + tube;
    let mut travelled = 0.0;
    for _ in 0..MARCH_STEPS {
        let step = distance(origin + unit * travelled);
        if step < 1e-4 {
            return Some(travelled / length);
        }
        travelled += step;
        if travelled > 2.0 * limit {
            break;
        }
    }
    None
}

/// Double sided Möller-Trumbore.
fn ray_triangle(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON * EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}
