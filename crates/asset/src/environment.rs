//! Equirectangular environment image, decoded to linear RGB.

use std::f32::consts::{FRAC_1_PI, PI};
use std::path::Path;

use anyhow::Context;
use image::{ColorType, DynamicImage};

/// Linear-light RGB texels in row-major order, row 0 at the top (zenith).
#[derive(Clone, Debug)]
pub struct EnvironmentImage {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[f32; 3]>,
}

impl EnvironmentImage {
    pub fn new(width: u32, height: u32, texels: Vec<[f32; 3]>) -> anyhow::Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "Environment image is empty");
        anyhow::ensure!(
            texels.len() == (width as usize) * (height as usize),
            "Texel count {} doesn't match {}x{}",
            texels.len(),
            width,
            height
        );
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Load an equirectangular image (JPEG/PNG are sRGB, HDR is linear).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading environment from {:?}", path);

        let img = image::open(path)
            .with_context(|| format!("Failed to open environment image {:?}", path))?;
        let env = Self::from_dynamic(img)?;

        log::info!("Loaded environment {}x{}", env.width, env.height);
        Ok(env)
    }

    pub fn from_dynamic(img: DynamicImage) -> anyhow::Result<Self> {
        let is_linear = matches!(img.color(), ColorType::Rgb32F | ColorType::Rgba32F);
        let rgb = img.into_rgb32f();
        let (width, height) = rgb.dimensions();
        let texels = rgb
            .pixels()
            .map(|p| {
                if is_linear {
                    p.0
                } else {
                    p.0.map(srgb_to_linear)
                }
            })
            .collect();
        Self::new(width, height, texels)
    }

    /// Vertical two-tone gradient used when no environment file is available.
    pub fn gradient(width: u32, height: u32, top: [f32; 3], bottom: [f32; 3]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            let t = (y as f32 + 0.5) / height as f32;
            let c = lerp3(top, bottom, t);
            texels.extend(std::iter::repeat_n(c, width as usize));
        }
        Self {
            width,
            height,
            texels,
        }
    }

    /// Fallback gradient: cool cyan zenith fading to deep violet below.
    pub fn default_gradient() -> Self {
        Self::gradient(256, 128, [0.05, 0.55, 0.9], [0.12, 0.0, 0.25])
    }

    /// Bilinear lookup in the direction `dir` (need not be normalised).
    pub fn sample_direction(&self, dir: [f32; 3]) -> [f32; 3] {
        let (u, v) = direction_to_equirect_uv(dir);
        self.sample_uv(u, v)
    }

    /// Bilinear lookup with `u` wrapping around and `v` clamped.
    pub fn sample_uv(&self, u: f32, v: f32) -> [f32; 3] {
        let x = u.rem_euclid(1.0) * self.width as f32 - 0.5;
        let y = (v.clamp(0.0, 1.0) * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let xi0 = (x0 as i64).rem_euclid(self.width as i64) as u32;
        let xi1 = (xi0 + 1) % self.width;
        let yi0 = y0 as u32;
        let yi1 = (yi0 + 1).min(self.height - 1);

        let top = lerp3(self.texel(xi0, yi0), self.texel(xi1, yi0), fx);
        let bottom = lerp3(self.texel(xi0, yi1), self.texel(xi1, yi1), fx);
        lerp3(top, bottom, fy)
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        self.texels[(y * self.width + x) as usize]
    }
}

/// Map a direction to equirectangular coordinates, `v = 0` at +Y.
pub fn direction_to_equirect_uv(dir: [f32; 3]) -> (f32, f32) {
    let len = (dir[0] * dir[0] + dir[1] * dir[1] + dir[2] * dir[2]).sqrt();
    let [x, y, z] = if len > 1e-6 {
        [dir[0] / len, dir[1] / len, dir[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    };
    let u = z.atan2(x) * (0.5 * FRAC_1_PI) + 0.5;
    let v = 0.5 - y.clamp(-1.0, 1.0).asin() / PI;
    (u, v)
}

#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn srgb_decode_hits_reference_points() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.04045) - 0.04045 / 12.92).abs() < 1e-7);
        assert!((srgb_to_linear(0.5) - 0.214_041).abs() < 1e-5);
    }

    #[test]
    fn poles_map_to_image_edges() {
        assert!(direction_to_equirect_uv([0.0, 1.0, 0.0]).1.abs() < 1e-6);
        assert!((direction_to_equirect_uv([0.0, -1.0, 0.0]).1 - 1.0).abs() < 1e-6);
        let (u, v) = direction_to_equirect_uv([1.0, 0.0, 0.0]);
        assert!((u - 0.5).abs() < 1e-6 && (v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gradient_sampling_follows_elevation() {
        let env = EnvironmentImage::gradient(8, 64, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        let up = env.sample_direction([0.0, 1.0, 0.0]);
        let horizon = env.sample_direction([1.0, 0.0, 0.0]);
        let down = env.sample_direction([0.0, -1.0, 0.0]);
        assert!(up[0] > horizon[0] && horizon[0] > down[0]);
        assert!((horizon[1] - 0.5).abs() < 0.05);
    }

    #[test]
    fn u_wraps_across_seam() {
        let mut texels = vec![[0.0; 3]; 4];
        texels[0] = [1.0, 1.0, 1.0];
        let env = EnvironmentImage::new(4, 1, texels).unwrap();
        let a = env.sample_uv(0.0, 0.5);
        let b = env.sample_uv(1.0, 0.5);
        assert_eq!(a, b);
        assert!((a[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn eight_bit_images_are_linearised() {
        let img = RgbImage::from_pixel(2, 2, Rgb([128, 0, 255]));
        let env = EnvironmentImage::from_dynamic(DynamicImage::ImageRgb8(img)).unwrap();
        assert!((env.texels[0][0] - srgb_to_linear(128.0 / 255.0)).abs() < 1e-5);
        assert_eq!(env.texels[0][2], 1.0);
    }

    #[test]
    fn mismatched_texel_count_is_rejected() {
        assert!(EnvironmentImage::new(2, 2, vec![[0.0; 3]; 3]).is_err());
    }
}
