//! CPU-side mesh representation used by loaders.

use corelib::{CoreError, CoreResult, Vec3};

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    /// Check the mesh is a non-empty triangle list with in-range indices.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.is_valid() {
            return Err(CoreError::InvalidMesh("mesh has no triangles".into()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(CoreError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let len = self.vertices.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= len) {
            return Err(CoreError::InvalidMesh(format!(
                "index {bad} out of bounds (vertices={len})"
            )));
        }
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = Vec3::from(self.vertices.first()?.position);
        let (min, max) = self
            .vertices
            .iter()
            .map(|v| Vec3::from(v.position))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some((min.to_array(), max.to_array()))
    }

    /// Replace normals with area-weighted vertex normals.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) = (
                self.vertices.get(a),
                self.vertices.get(b),
                self.vertices.get(c),
            ) else {
                continue;
            };
            let pa = Vec3::from(pa.position);
            let face = (Vec3::from(pb.position) - pa).cross(Vec3::from(pc.position) - pa);
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(acc) {
            vertex.normal = n.try_normalize().unwrap_or(Vec3::Z).to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
                MeshVertex::new([2.0, 0.0, 0.0], [0.0; 3], [1.0, 0.0]),
                MeshVertex::new([0.0, 1.0, -1.0], [0.0; 3], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
        assert!(data.validate().is_err());
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut mesh = triangle();
        mesh.indices[2] = 7;
        assert!(matches!(mesh.validate(), Err(CoreError::InvalidMesh(_))));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let (min, max) = triangle().bounds().unwrap();
        assert_eq!(min, [0.0, 0.0, -1.0]);
        assert_eq!(max, [2.0, 1.0, 0.0]);
        assert!(MeshData::default().bounds().is_none());
    }

    #[test]
    fn computed_normals_face_ccw_side() {
        let mut mesh = MeshData::new(
            vec![
                MeshVertex::new([0.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
                MeshVertex::new([1.0, 0.0, 0.0], [0.0; 3], [0.0; 2]),
                MeshVertex::new([0.0, 1.0, 0.0], [0.0; 3], [0.0; 2]),
            ],
            vec![0, 1, 2],
        );
        mesh.compute_normals();
        for v in &mesh.vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-6);
        }
    }
}
