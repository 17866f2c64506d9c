//! CPU prefiltering of the environment into a roughness mip chain.
//!
//! The equirectangular source is resampled into a cubemap, then each mip is
//! convolved with importance-sampled GGX. Mip `m` of `n` stands for
//! roughness `m / (n - 1)`; mip 0 is a mirror.

use std::f32::consts::PI;

use asset::EnvironmentImage;
use glam::Vec3;
use half::f16;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrefilterSettings {
    /// Edge length of a mip-0 face.
    pub face_size: u32,
    pub mip_levels: u32,
    /// GGX samples per output texel.
    pub sample_count: u32,
}

impl Default for PrefilterSettings {
    fn default() -> Self {
        Self {
            face_size: 128,
            mip_levels: 6,
            sample_count: 64,
        }
    }
}

impl PrefilterSettings {
    /// Clamp the mip count so the smallest face is at least 1 texel.
    pub fn effective_mip_levels(&self) -> u32 {
        let size = self.face_size.max(1);
        let full_chain = 32 - size.leading_zeros();
        self.mip_levels.clamp(1, full_chain)
    }
}

/// Six linear-light faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Clone, Debug)]
pub struct CubeFaces {
    pub size: u32,
    pub faces: [Vec<[f32; 3]>; 6],
}

impl CubeFaces {
    fn from_fn(size: u32, mut f: impl FnMut(usize, u32, u32) -> [f32; 3]) -> Self {
        let faces = std::array::from_fn(|face| {
            let mut data = Vec::with_capacity((size * size) as usize);
            for y in 0..size {
                for x in 0..size {
                    data.push(f(face, x, y));
                }
            }
            data
        });
        Self { size, faces }
    }

    /// Resample an equirectangular image into a cubemap.
    pub fn from_equirect(image: &EnvironmentImage, size: u32) -> Self {
        let size = size.max(1);
        Self::from_fn(size, |face, x, y| {
            image.sample_direction(texel_to_direction(face, x, y, size).to_array())
        })
    }

    /// 2x2 box downsample (one level).
    pub fn downsample(&self) -> Self {
        if self.size <= 1 {
            return self.clone();
        }
        let size = self.size / 2;
        let src = self.size;
        Self::from_fn(size, |face, x, y| {
            let data = &self.faces[face];
            let mut acc = [0.0f32; 3];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let t = data[((2 * y + dy) * src + 2 * x + dx) as usize];
                acc[0] += t[0];
                acc[1] += t[1];
                acc[2] += t[2];
            }
            acc.map(|c| c * 0.25)
        })
    }

    /// Nearest-texel lookup along `dir`.
    pub fn sample(&self, dir: Vec3) -> [f32; 3] {
        let (face, u, v) = direction_to_face_uv(dir);
        let size = self.size as f32;
        let x = ((u * 0.5 + 0.5) * size).clamp(0.0, size - 1.0) as u32;
        let y = ((v * 0.5 + 0.5) * size).clamp(0.0, size - 1.0) as u32;
        self.faces[face][(y * self.size + x) as usize]
    }

    /// Half-float RGBA texels of one face in linear light. Values above 1.0
    /// are kept so bright sky regions still feed the bloom.
    pub fn face_rgba16f(&self, face: usize) -> Vec<f16> {
        self.faces[face]
            .iter()
            .flat_map(|&[r, g, b]| [r, g, b, 1.0])
            .map(|c| f16::from_f32(c.clamp(0.0, f16::MAX.to_f32())))
            .collect()
    }
}

pub struct PrefilterGenerator {
    sample_count: u32,
}

impl PrefilterGenerator {
    pub fn new(sample_count: u32) -> Self {
        Self {
            sample_count: sample_count.max(1),
        }
    }

    /// Build the whole prefiltered chain, largest mip first.
    pub fn generate(&self, image: &EnvironmentImage, settings: &PrefilterSettings) -> Vec<CubeFaces> {
        let mip_levels = settings.effective_mip_levels();
        let base = CubeFaces::from_equirect(image, settings.face_size);

        // Rough mips sample a source whose resolution matches their own.
        let mut sources = Vec::with_capacity(mip_levels as usize);
        sources.push(base);
        for m in 1..mip_levels as usize {
            let next = sources[m - 1].downsample();
            sources.push(next);
        }

        let mut chain = Vec::with_capacity(mip_levels as usize);
        chain.push(sources[0].clone());
        for mip in 1..mip_levels {
            let roughness = roughness_for_mip(mip, mip_levels);
            let size = (settings.face_size >> mip).max(1);
            let source = &sources[(mip - 1) as usize];
            chain.push(CubeFaces::from_fn(size, |face, x, y| {
                let n = texel_to_direction(face, x, y, size);
                self.convolve(source, n, roughness)
            }));
        }
        chain
    }

    /// GGX-weighted average around `n`, assuming view = reflection = normal.
    fn convolve(&self, source: &CubeFaces, n: Vec3, roughness: f32) -> [f32; 3] {
        let alpha = roughness * roughness;
        let mut total = Vec3::ZERO;
        let mut weight = 0.0f32;

        for i in 0..self.sample_count {
            let xi = hammersley(i, self.sample_count);
            let h = importance_sample_ggx(xi, n, alpha);
            let l = (2.0 * n.dot(h) * h - n).normalize_or_zero();
            let n_dot_l = n.dot(l);
            if n_dot_l > 0.0 {
                total += Vec3::from(source.sample(l)) * n_dot_l;
                weight += n_dot_l;
            }
        }

        if weight > 0.0 {
            (total / weight).to_array()
        } else {
            source.sample(n)
        }
    }
}

/// Roughness represented by `mip` in a chain of `mip_levels`.
pub fn roughness_for_mip(mip: u32, mip_levels: u32) -> f32 {
    if mip_levels <= 1 {
        return 0.0;
    }
    mip.min(mip_levels - 1) as f32 / (mip_levels - 1) as f32
}

/// Centre of texel `(x, y)` on `face` as a unit direction.
pub fn texel_to_direction(face: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Inverse of [`texel_to_direction`]: face index and `u, v` in [-1, 1].
pub fn direction_to_face_uv(dir: Vec3) -> (usize, f32, f32) {
    let a = dir.abs();
    if a.x >= a.y && a.x >= a.z {
        if dir.x > 0.0 {
            (0, -dir.z / a.x, -dir.y / a.x)
        } else {
            (1, dir.z / a.x, -dir.y / a.x)
        }
    } else if a.y >= a.z {
        if dir.y > 0.0 {
            (2, dir.x / a.y, dir.z / a.y)
        } else {
            (3, dir.x / a.y, -dir.z / a.y)
        }
    } else if dir.z > 0.0 {
        (4, dir.x / a.z, -dir.y / a.z)
    } else {
        (5, -dir.x / a.z, -dir.y / a.z)
    }
}

/// Hammersley point `i` of `n`.
pub fn hammersley(i: u32, n: u32) -> [f32; 2] {
    [i as f32 / n as f32, radical_inverse_vdc(i)]
}

fn radical_inverse_vdc(bits: u32) -> f32 {
    bits.reverse_bits() as f32 * 2.328_306_4e-10
}

/// GGX half vector around `n` for the quasi-random point `xi`.
fn importance_sample_ggx(xi: [f32; 2], n: Vec3, alpha: f32) -> Vec3 {
    let a2 = alpha * alpha;
    let phi = 2.0 * PI * xi[0];
    let cos_theta = ((1.0 - xi[1]) / (1.0 + (a2 - 1.0) * xi[1])).max(0.0).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let h = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);

    let up = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent * h.x + bitangent * h.y + n * h.z).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_mapping_round_trips() {
        let size = 8;
        for face in 0..6 {
            for (x, y) in [(0, 0), (3, 5), (7, 7)] {
                let dir = texel_to_direction(face, x, y, size);
                let (f, u, v) = direction_to_face_uv(dir);
                assert_eq!(f, face);
                let px = ((u * 0.5 + 0.5) * size as f32) as u32;
                let py = ((v * 0.5 + 0.5) * size as f32) as u32;
                assert_eq!((px, py), (x, y), "face {face}");
            }
        }
    }

    #[test]
    fn face_centres_point_along_axes() {
        let c = |f| texel_to_direction(f, 0, 0, 1);
        assert!((c(0) - Vec3::X).length() < 1e-6);
        assert!((c(3) + Vec3::Y).length() < 1e-6);
        assert!((c(5) + Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn hammersley_stays_in_unit_square() {
        assert_eq!(hammersley(0, 16), [0.0, 0.0]);
        assert!((hammersley(1, 16)[1] - 0.5).abs() < 1e-6);
        assert!((hammersley(2, 16)[1] - 0.25).abs() < 1e-6);
        for i in 0..64 {
            let [a, b] = hammersley(i, 64);
            assert!((0.0..1.0).contains(&a) && (0.0..1.0).contains(&b));
        }
    }

    #[test]
    fn roughness_spans_chain() {
        assert_eq!(roughness_for_mip(0, 6), 0.0);
        assert_eq!(roughness_for_mip(5, 6), 1.0);
        assert!((roughness_for_mip(2, 6) - 0.4).abs() < 1e-6);
        assert_eq!(roughness_for_mip(0, 1), 0.0);
    }

    #[test]
    fn mip_count_is_bounded_by_face_size() {
        let s = PrefilterSettings {
            face_size: 8,
            mip_levels: 10,
            sample_count: 4,
        };
        assert_eq!(s.effective_mip_levels(), 4);
    }

    #[test]
    fn uniform_environment_stays_uniform() {
        let image = EnvironmentImage::gradient(16, 8, [0.5, 0.25, 0.1], [0.5, 0.25, 0.1]);
        let settings = PrefilterSettings {
            face_size: 8,
            mip_levels: 3,
            sample_count: 16,
        };
        let chain = PrefilterGenerator::new(settings.sample_count).generate(&image, &settings);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2].size, 2);
        for mip in &chain {
            for face in &mip.faces {
                for t in face {
                    assert!((t[0] - 0.5).abs() < 1e-3 && (t[1] - 0.25).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn rough_mips_blur_the_horizon() {
        let image = EnvironmentImage::gradient(32, 32, [1.0; 3], [0.0; 3]);
        let settings = PrefilterSettings {
            face_size: 16,
            mip_levels: 4,
            sample_count: 64,
        };
        let chain = PrefilterGenerator::new(settings.sample_count).generate(&image, &settings);
        let up = Vec3::new(0.1, 1.0, 0.0).normalize();
        let sharp = chain[0].sample(up)[0];
        let blurred = chain[3].sample(up)[0];
        assert!(blurred < sharp);
    }

    #[test]
    fn half_float_faces_keep_highlights() {
        let cube = CubeFaces::from_fn(2, |_, _, _| [4.0, -1.0, 0.5]);
        let texels = cube.face_rgba16f(0);
        assert_eq!(texels.len(), 16);
        let first: Vec<f32> = texels[..4].iter().map(|h| h.to_f32()).collect();
        assert_eq!(first, vec![4.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn out_of_range_radiance_saturates_instead_of_overflowing() {
        let cube = CubeFaces::from_fn(1, |_, _, _| [1.0e6, 1.0, 1.0]);
        let texels = cube.face_rgba16f(0);
        assert!(texels[0].is_finite());
        assert_eq!(texels[0], f16::MAX);
    }
}
