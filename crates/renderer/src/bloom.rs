//! Unreal-style bloom: luminosity high-pass, a chain of separable Gaussian
//! blurs at halving resolutions, then a weighted composite onto the scene.

use bytemuck::{Pod, Zeroable};
use corelib::{PanelParams, Param};
use wgpu::{
    util::DeviceExt, BindGroup, BindGroupLayout, Buffer, BufferUsages, CommandEncoder, Device,
    Queue, RenderPipeline, Sampler, ShaderStages, TextureView,
};

use crate::target::{
    self, HDR_FORMAT, RenderTarget, sampler_entry, texture_entry, uniform_entry,
};

pub const MIP_COUNT: usize = 5;
pub const KERNEL_RADII: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];
pub const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const MAX_KERNEL: usize = 12;
const SMOOTH_WIDTH: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

impl BloomSettings {
    pub fn from_params(params: &PanelParams) -> Self {
        Self {
            threshold: params.get(Param::BloomThreshold),
            strength: params.get(Param::BloomStrength),
            radius: params.get(Param::BloomRadius),
        }
    }
}

/// Normalised-Gaussian weights for taps `0..radius`, sigma = radius.
pub fn gaussian_coefficients(radius: u32) -> Vec<f32> {
    let sigma = radius.max(1) as f32;
    (0..radius)
        .map(|i| {
            let x = i as f32;
            0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma
        })
        .collect()
}

pub fn lerp_bloom_factor(factor: f32, radius: f32) -> f32 {
    let mirror = 1.2 - factor;
    factor + (mirror - factor) * radius
}

pub fn composite_weights(settings: &BloomSettings) -> [f32; MIP_COUNT] {
    BLOOM_FACTORS.map(|f| settings.strength * lerp_bloom_factor(f, settings.radius))
}

/// Level sizes: half the viewport first, then halving (rounding up).
pub fn mip_sizes(width: u32, height: u32) -> [(u32, u32); MIP_COUNT] {
    let mut w = width.max(1);
    let mut h = height.max(1);
    std::array::from_fn(|_| {
        w = w.div_ceil(2).max(1);
        h = h.div_ceil(2).max(1);
        (w, h)
    })
}

const HIGH_PASS_WGSL: &str = include_str!("shaders/bloom_high_pass.wgsl");
const BLUR_WGSL: &str = include_str!("shaders/bloom_blur.wgsl");
const COMPOSITE_WGSL: &str = include_str!("shaders/bloom_composite.wgsl");

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct HighPassUniform {
    threshold: f32,
    smooth_width: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BlurUniform {
    direction: [f32; 2],
    inv_size: [f32; 2],
    kernel_radius: u32,
    _pad: [u32; 3],
    coefficients: [[f32; 4]; 3],
}

impl BlurUniform {
    fn new(direction: [f32; 2], size: (u32, u32), radius: u32) -> Self {
        let mut flat = [0.0f32; MAX_KERNEL];
        for (slot, c) in flat.iter_mut().zip(gaussian_coefficients(radius)) {
            *slot = c;
        }
        let mut coefficients = [[0.0; 4]; 3];
        for (i, c) in flat.iter().enumerate() {
            coefficients[i / 4][i % 4] = *c;
        }
        Self {
            direction,
            inv_size: [1.0 / size.0 as f32, 1.0 / size.1 as f32],
            kernel_radius: radius.min(MAX_KERNEL as u32),
            _pad: [0; 3],
            coefficients,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CompositeUniform {
    weights: [[f32; 4]; 2],
}

impl CompositeUniform {
    fn new(settings: &BloomSettings) -> Self {
        let w = composite_weights(settings);
        Self {
            weights: [[w[0], w[1], w[2], w[3]], [w[4], 0.0, 0.0, 0.0]],
        }
    }
}

/// Size-dependent targets and the bind groups that reference them.
struct BloomTargets {
    bright: RenderTarget,
    horizontal: Vec<RenderTarget>,
    vertical: Vec<RenderTarget>,
    output: RenderTarget,
    high_pass_bg: BindGroup,
    // (horizontal, vertical) per level
    blur_bgs: Vec<(BindGroup, BindGroup)>,
    #[allow(dead_code)]
    blur_bufs: Vec<(Buffer, Buffer)>,
    composite_bg: BindGroup,
}

pub struct BloomPass {
    single_layout: BindGroupLayout,
    composite_layout: BindGroupLayout,
    high_pass_pipeline: RenderPipeline,
    blur_pipeline: RenderPipeline,
    composite_pipeline: RenderPipeline,
    sampler: Sampler,
    high_pass_buf: Buffer,
    composite_buf: Buffer,
    targets: BloomTargets,
}

impl BloomPass {
    pub fn new(device: &Device, width: u32, height: u32, scene_view: &TextureView) -> Self {
        let single_layout = target::single_input_layout(device, "Bloom Single BGL");
        let mut composite_entries: Vec<_> = (0..=MIP_COUNT as u32).map(texture_entry).collect();
        composite_entries.push(sampler_entry(MIP_COUNT as u32 + 1));
        composite_entries.push(uniform_entry(MIP_COUNT as u32 + 2, ShaderStages::FRAGMENT));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Composite BGL"),
            entries: &composite_entries,
        });

        let high_pass_pipeline = target::fullscreen_pipeline(
            device,
            "Bloom HighPass",
            HIGH_PASS_WGSL,
            &[&single_layout],
            HDR_FORMAT,
        );
        let blur_pipeline = target::fullscreen_pipeline(
            device,
            "Bloom Blur",
            BLUR_WGSL,
            &[&single_layout],
            HDR_FORMAT,
        );
        let composite_pipeline = target::fullscreen_pipeline(
            device,
            "Bloom Composite",
            COMPOSITE_WGSL,
            &[&composite_layout],
            HDR_FORMAT,
        );

        let sampler = target::linear_clamp_sampler(device, "Bloom Sampler");
        let defaults = BloomSettings::from_params(&PanelParams::default());
        let high_pass_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom HighPass UBO"),
            contents: bytemuck::bytes_of(&HighPassUniform {
                threshold: defaults.threshold,
                smooth_width: SMOOTH_WIDTH,
                _pad: [0.0; 2],
            }),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let composite_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Composite UBO"),
            contents: bytemuck::bytes_of(&CompositeUniform::new(&defaults)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let targets = Self::build_targets(
            device,
            &single_layout,
            &composite_layout,
            &sampler,
            &high_pass_buf,
            &composite_buf,
            width,
            height,
            scene_view,
        );

        Self {
            single_layout,
            composite_layout,
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            sampler,
            high_pass_buf,
            composite_buf,
            targets,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_targets(
        device: &Device,
        single_layout: &BindGroupLayout,
        composite_layout: &BindGroupLayout,
        sampler: &Sampler,
        high_pass_buf: &Buffer,
        composite_buf: &Buffer,
        width: u32,
        height: u32,
        scene_view: &TextureView,
    ) -> BloomTargets {
        let sizes = mip_sizes(width, height);
        let (bw, bh) = sizes[0];
        let bright = RenderTarget::new(device, "Bloom Bright", bw, bh, HDR_FORMAT);
        let horizontal: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                RenderTarget::new(device, &format!("Bloom H{i}"), w, h, HDR_FORMAT)
            })
            .collect();
        let vertical: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                RenderTarget::new(device, &format!("Bloom V{i}"), w, h, HDR_FORMAT)
            })
            .collect();
        let output = RenderTarget::new(device, "Bloom Output", width, height, HDR_FORMAT);

        let high_pass_bg = target::single_input_bind_group(
            device,
            "Bloom HighPass BG",
            single_layout,
            scene_view,
            sampler,
            high_pass_buf,
        );

        let mut blur_bgs = Vec::with_capacity(MIP_COUNT);
        let mut blur_bufs = Vec::with_capacity(MIP_COUNT);
        for (i, &size) in sizes.iter().enumerate() {
            let radius = KERNEL_RADII[i];
            let make_buf = |label: &str, dir: [f32; 2]| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::bytes_of(&BlurUniform::new(dir, size, radius)),
                    usage: BufferUsages::UNIFORM,
                })
            };
            let h_buf = make_buf("Bloom Blur H UBO", [1.0, 0.0]);
            let v_buf = make_buf("Bloom Blur V UBO", [0.0, 1.0]);
            let input = if i == 0 {
                &bright.view
            } else {
                &vertical[i - 1].view
            };
            let h_bg = target::single_input_bind_group(
                device,
                "Bloom Blur H BG",
                single_layout,
                input,
                sampler,
                &h_buf,
            );
            let v_bg = target::single_input_bind_group(
                device,
                "Bloom Blur V BG",
                single_layout,
                &horizontal[i].view,
                sampler,
                &v_buf,
            );
            blur_bgs.push((h_bg, v_bg));
            blur_bufs.push((h_buf, v_buf));
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(scene_view),
        }];
        for (i, level) in vertical.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::TextureView(&level.view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: MIP_COUNT as u32 + 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: MIP_COUNT as u32 + 2,
            resource: composite_buf.as_entire_binding(),
        });
        let composite_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Composite BG"),
            layout: composite_layout,
            entries: &entries,
        });

        BloomTargets {
            bright,
            horizontal,
            vertical,
            output,
            high_pass_bg,
            blur_bgs,
            blur_bufs,
            composite_bg,
        }
    }

    /// Recreate every target for the new viewport; `scene_view` is the
    /// freshly recreated scene colour.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32, scene_view: &TextureView) {
        self.targets = Self::build_targets(
            device,
            &self.single_layout,
            &self.composite_layout,
            &self.sampler,
            &self.high_pass_buf,
            &self.composite_buf,
            width,
            height,
            scene_view,
        );
        log::debug!("bloom targets resized to {width}x{height}");
    }

    pub fn update(&self, queue: &Queue, settings: &BloomSettings) {
        queue.write_buffer(
            &self.high_pass_buf,
            0,
            bytemuck::bytes_of(&HighPassUniform {
                threshold: settings.threshold,
                smooth_width: SMOOTH_WIDTH,
                _pad: [0.0; 2],
            }),
        );
        queue.write_buffer(
            &self.composite_buf,
            0,
            bytemuck::bytes_of(&CompositeUniform::new(settings)),
        );
    }

    pub fn render(&self, encoder: &mut CommandEncoder) {
        let t = &self.targets;
        target::draw_fullscreen(
            encoder,
            "Bloom HighPass",
            &t.bright.view,
            &self.high_pass_pipeline,
            &t.high_pass_bg,
        );
        for (i, (h_bg, v_bg)) in t.blur_bgs.iter().enumerate() {
            target::draw_fullscreen(
                encoder,
                "Bloom Blur H",
                &t.horizontal[i].view,
                &self.blur_pipeline,
                h_bg,
            );
            target::draw_fullscreen(
                encoder,
                "Bloom Blur V",
                &t.vertical[i].view,
                &self.blur_pipeline,
                v_bg,
            );
        }
        target::draw_fullscreen(
            encoder,
            "Bloom Composite",
            &t.output.view,
            &self.composite_pipeline,
            &t.composite_bg,
        );
    }

    /// Scene colour with bloom added.
    pub fn output_view(&self) -> &TextureView {
        &self.targets.output.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{fullscreen_source, wgsl};

    #[test]
    fn shaders_validate_with_matching_uniforms() {
        let cases = [
            ("high pass", HIGH_PASS_WGSL, std::mem::size_of::<HighPassUniform>()),
            ("blur", BLUR_WGSL, std::mem::size_of::<BlurUniform>()),
            ("composite", COMPOSITE_WGSL, std::mem::size_of::<CompositeUniform>()),
        ];
        for (label, fragment, rust_size) in cases {
            let module = wgsl::validate(label, &fullscreen_source(fragment));
            assert_eq!(wgsl::entry_points(&module), vec!["fs_main", "vs_fullscreen"], "{label}");
            assert_eq!(wgsl::uniform_size(&module) as usize, rust_size, "{label}");
        }
    }

    #[test]
    fn coefficients_peak_at_centre_and_decay() {
        let c = gaussian_coefficients(3);
        assert_eq!(c.len(), 3);
        assert!((c[0] - 0.39894 / 3.0).abs() < 1e-6);
        assert!(c[0] > c[1] && c[1] > c[2]);
    }

    #[test]
    fn largest_kernel_fits_uniform() {
        let u = BlurUniform::new([1.0, 0.0], (10, 10), 11);
        assert_eq!(u.kernel_radius, 11);
        assert!(u.coefficients[2][2] > 0.0);
        assert_eq!(u.coefficients[2][3], 0.0);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 80);
    }

    #[test]
    fn radius_mirrors_factors() {
        assert_eq!(lerp_bloom_factor(1.0, 0.0), 1.0);
        assert!((lerp_bloom_factor(1.0, 1.0) - 0.2).abs() < 1e-6);
        assert!((lerp_bloom_factor(0.2, 1.0) - 1.0).abs() < 1e-6);
        assert!((lerp_bloom_factor(0.6, 0.5) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn default_weights() {
        let s = BloomSettings::from_params(&PanelParams::default());
        assert_eq!(
            s,
            BloomSettings {
                threshold: 0.05,
                strength: 1.0,
                radius: 0.8
            }
        );
        let w = composite_weights(&s);
        // f + (1.2 - 2f) * 0.8
        assert!((w[0] - 0.36).abs() < 1e-5);
        assert!((w[4] - 0.84).abs() < 1e-5);
    }

    #[test]
    fn zero_strength_disables_bloom() {
        let s = BloomSettings {
            threshold: 0.0,
            strength: 0.0,
            radius: 0.5,
        };
        assert!(composite_weights(&s).iter().all(|w| *w == 0.0));
    }

    #[test]
    fn mips_halve_and_never_vanish() {
        let sizes = mip_sizes(1920, 1080);
        assert_eq!(sizes[0], (960, 540));
        assert_eq!(sizes[1], (480, 270));
        assert_eq!(sizes[2], (240, 135));
        assert_eq!(sizes[3], (120, 68));
        assert_eq!(sizes[4], (60, 34));
        assert!(mip_sizes(1, 1).iter().all(|&s| s == (1, 1)));
        assert_eq!(mip_sizes(3, 3)[0], (2, 2));
    }
}
