use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Floats per interleaved vertex: `position.xyz` followed by `normal.xyz`.
pub const VERTEX_STRIDE: usize = 6;

/// GPU ready triangle mesh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Interleaves positions with normals. Missing or mismatched normals are
    /// recomputed from the faces.
    pub fn from_attributes(positions: &[Vec3], normals: Option<&[Vec3]>, indices: Vec<u32>) -> Self {
        let normals = normals.filter(|normals| normals.len() == positions.len());
        let mut vertices = Vec::with_capacity(positions.len() * VERTEX_STRIDE);
        for (i, position) in positions.iter().enumerate() {
            let normal = normals.map(|normals| normals[i]).unwrap_or(Vec3::ZERO);
            vertices.extend_from_slice(&[
                position.x, position.y, position.z, normal.x, normal.y, normal.z,
            ]);
        }
        let mut mesh = Self { vertices, indices };
        if needs_normals(&mesh.vertices) {
            compute_normals(&mut mesh);
        }
        mesh
    }

    /// Square plane of edge `size` lying in XZ, facing +Y.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let positions = [
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(-h, 0.0, -h),
        ];
        let normals = [Vec3::Y; 4];
        Self::from_attributes(&positions, Some(&normals), vec![0, 1, 2, 0, 2, 3])
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let start = index * VERTEX_STRIDE;
        Vec3::from_slice(&self.vertices[start..start + 3])
    }

    /// Iterates triangles as vertex positions, skipping out-of-range indices.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let count = self.vertex_count() as u32;
        self.indices
            .chunks_exact(3)
            .filter(move |tri| tri.iter().all(|&i| i < count))
            .map(|tri| {
                [
                    self.position(tri[0] as usize),
                    self.position(tri[1] as usize),
                    self.position(tri[2] as usize),
                ]
            })
    }

    /// Axis-aligned bounds in mesh space, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        (0..self.vertex_count())
            .map(|i| self.position(i))
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(VERTEX_STRIDE)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

fn compute_normals(mesh: &mut MeshData) {
    let vertex_count = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        let p0 = mesh.position(i0);
        let p1 = mesh.position(i1);
        let p2 = mesh.position(i2);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * VERTEX_STRIDE + 3] = normal.x;
        mesh.vertices[i * VERTEX_STRIDE + 4] = normal.y;
        mesh.vertices[i * VERTEX_STRIDE + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vec3> {
        vec![Vec3::ZERO, Vec3::X, Vec3::Y]
    }

    #[test]
    fn computes_missing_normals() {
        let mesh = MeshData::from_attributes(&triangle(), None, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 18);
        for chunk in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn mismatched_normals_are_recomputed() {
        let normals = [Vec3::X];
        let mesh = MeshData::from_attributes(&triangle(), Some(&normals), vec![0, 1, 2]);
        assert!((Vec3::from_slice(&mesh.vertices[3..6]) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn plane_faces_up() {
        let plane = MeshData::plane(20.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.triangles().count(), 2);
        for tri in plane.triangles() {
            let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            assert!(normal.y > 0.0);
        }
        let (min, max) = plane.bounds().unwrap();
        assert_eq!(min, Vec3::new(-10.0, 0.0, -10.0));
        assert_eq!(max, Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mesh = MeshData::from_attributes(&triangle(), None, vec![0, 1, 2, 0, 1, 9]);
        assert_eq!(mesh.triangles().count(), 1);
    }
}
