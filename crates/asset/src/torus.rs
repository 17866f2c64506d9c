//! Procedural torus, used when the model file is unavailable.

use std::f32::consts::TAU;

use crate::mesh::{MeshData, MeshVertex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorusShape {
    /// Distance from the torus centre to the tube centre.
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusShape {
    fn default() -> Self {
        Self {
            radius: 0.7,
            tube: 0.2,
            radial_segments: 16,
            tubular_segments: 100,
        }
    }
}

impl TorusShape {
    /// Build a torus in the XY plane with the ring seam duplicated for UVs.
    pub fn build(&self) -> MeshData {
        let radial = self.radial_segments.max(3);
        let tubular = self.tubular_segments.max(3);
        let row = tubular + 1;

        let mut vertices = Vec::with_capacity(((radial + 1) * row) as usize);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let ring = self.radius + self.tube * v.cos();
                let position = [ring * u.cos(), ring * u.sin(), self.tube * v.sin()];
                let centre = [self.radius * u.cos(), self.radius * u.sin(), 0.0];
                let n = [
                    position[0] - centre[0],
                    position[1] - centre[1],
                    position[2] - centre[2],
                ];
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt().max(1e-6);
                vertices.push(MeshVertex::new(
                    position,
                    [n[0] / len, n[1] / len, n[2] / len],
                    [i as f32 / tubular as f32, j as f32 / radial as f32],
                ));
            }
        }

        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        MeshData::new(vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_torus_topology() {
        let mesh = TorusShape::default().build();
        assert_eq!(mesh.vertices.len(), 17 * 101);
        assert_eq!(mesh.indices.len(), 16 * 100 * 6);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn vertices_lie_on_tube_surface() {
        let shape = TorusShape::default();
        let mesh = shape.build();
        for v in mesh.vertices.iter().step_by(37) {
            let [x, y, z] = v.position;
            let ring = (x * x + y * y).sqrt() - shape.radius;
            let dist = (ring * ring + z * z).sqrt();
            assert!((dist - shape.tube).abs() < 1e-4);
        }
    }

    #[test]
    fn bounds_match_radii() {
        let mesh = TorusShape::default().build();
        let (min, max) = mesh.bounds().unwrap();
        assert!((max[0] - 0.9).abs() < 1e-4);
        assert!((min[2] + 0.2).abs() < 1e-3);
    }
}
