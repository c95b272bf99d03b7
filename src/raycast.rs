use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::scene::{Model, PartId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a point given in normalized device coordinates.
    pub fn from_camera(camera: &PerspectiveCamera, ndc: Vec2) -> Self {
        let (near, far) = camera.unproject(ndc);
        Self::new(camera.position, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A part hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub part: PartId,
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
}

/// Every part with geometry the ray hits, nearest first. Each part appears
/// once, at its closest triangle.
pub fn intersect_model(model: &Model, ray: &Ray) -> Vec<Intersection> {
    if ray.direction.length_squared() <= f32::EPSILON {
        return Vec::new();
    }
    let mut hits = Vec::new();
    for id in model.traverse() {
        let Some(mesh) = model.part(id).and_then(|part| part.mesh.as_ref()) else {
            continue;
        };
        let world = model.world_matrix(id);
        let inverse = world.inverse();
        if !inverse.is_finite() {
            continue;
        }
        // Local direction keeps the world scale, so `t` stays comparable.
        let origin = inverse.transform_point3(ray.origin);
        let direction = inverse.transform_vector3(ray.direction);

        if let Some((min, max)) = mesh.bounds() {
            if intersect_aabb(origin, direction, min, max).is_none() {
                continue;
            }
        }

        let closest = mesh
            .triangles()
            .filter_map(|triangle| intersect_triangle(origin, direction, triangle))
            .min_by(|a, b| a.total_cmp(b));
        if let Some(t) = closest {
            let point = world.transform_point3(origin + direction * t);
            hits.push(Intersection {
                part: id,
                distance: point.distance(ray.origin),
                point,
            });
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

pub fn nearest(model: &Model, ray: &Ray) -> Option<Intersection> {
    intersect_model(model, ray).into_iter().next()
}

/// Möller-Trumbore, double sided. Returns the ray parameter of the hit.
pub fn intersect_triangle(origin: Vec3, direction: Vec3, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
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
    (t > EPSILON).then_some(t)
}

/// Slab test; returns the entry parameter (zero when starting inside).
pub fn intersect_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (min[axis] - o) / d;
        let t2 = (max[axis] - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}
