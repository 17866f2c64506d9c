//! Holographic full-screen pass: reads the bloomed scene, writes the surface.

use bytemuck::{Pod, Zeroable};
use corelib::{PanelParams, Param};
use wgpu::{
    util::DeviceExt, BindGroup, BindGroupLayout, Buffer, BufferUsages, CommandEncoder, Device,
    Queue, RenderPipeline, Sampler, TextureFormat, TextureView,
};

use crate::target;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoloSettings {
    pub time: f32,
    pub progress: f32,
    pub intensity: f32,
}

impl HoloSettings {
    pub fn from_params(params: &PanelParams, time: f32) -> Self {
        Self {
            time,
            progress: params.get(Param::Progress),
            intensity: params.get(Param::HoloIntensity),
        }
    }

    /// Horizontal UV offset of the red and blue channels.
    pub fn chroma_shift(&self) -> f32 {
        self.intensity * 0.002
    }

    /// Depth of the scanline darkening.
    pub fn scan_strength(&self) -> f32 {
        (self.intensity * 0.1).min(0.6)
    }

    /// Weight of grain and flicker.
    pub fn noise(&self) -> f32 {
        self.intensity.min(1.0)
    }

    /// Height of the reveal band above the bottom edge (0..1.1), or `None`
    /// while progress is zero.
    pub fn sweep(&self) -> Option<f32> {
        (self.progress > SWEEP_EPSILON).then(|| self.progress / 3.0 * 1.1)
    }

    /// Whether the pass leaves its input unchanged.
    pub fn is_passthrough(&self) -> bool {
        self.chroma_shift() == 0.0
            && self.scan_strength() == 0.0
            && self.noise() == 0.0
            && self.sweep().is_none()
    }
}

const SWEEP_EPSILON: f32 = 1e-4;

const HOLO_WGSL: &str = include_str!("shaders/holo.wgsl");

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct HoloUniform {
    resolution: [f32; 4],
    time: f32,
    chroma_shift: f32,
    scan_strength: f32,
    noise: f32,
    /// x: band on (0 or 1), y: sweep height
    band: [f32; 4],
}

impl HoloUniform {
    fn new(settings: &HoloSettings, width: u32, height: u32) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let band = match settings.sweep() {
            Some(height) => [1.0, height, 0.0, 0.0],
            None => [0.0; 4],
        };
        Self {
            resolution: [w, h, 1.0 / w, 1.0 / h],
            time: settings.time,
            chroma_shift: settings.chroma_shift(),
            scan_strength: settings.scan_strength(),
            noise: settings.noise(),
            band,
        }
    }
}

pub struct HoloPass {
    layout: BindGroupLayout,
    pipeline: RenderPipeline,
    sampler: Sampler,
    uniform_buf: Buffer,
    bind_group: BindGroup,
    width: u32,
    height: u32,
}

impl HoloPass {
    pub fn new(
        device: &Device,
        output_format: TextureFormat,
        width: u32,
        height: u32,
        input: &TextureView,
    ) -> Self {
        let layout = target::single_input_layout(device, "Holo BGL");
        let pipeline = target::fullscreen_pipeline(
            device,
            "Holo",
            HOLO_WGSL,
            &[&layout],
            output_format,
        );
        let sampler = target::linear_clamp_sampler(device, "Holo Sampler");
        let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Holo UBO"),
            contents: bytemuck::bytes_of(&HoloUniform::new(&HoloSettings::default(), width, height)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let bind_group =
            target::single_input_bind_group(device, "Holo BG", &layout, input, &sampler, &uniform_buf);
        Self {
            layout,
            pipeline,
            sampler,
            uniform_buf,
            bind_group,
            width,
            height,
        }
    }

    /// Rebind to the recreated input texture.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32, input: &TextureView) {
        self.width = width;
        self.height = height;
        self.bind_group = target::single_input_bind_group(
            device,
            "Holo BG",
            &self.layout,
            input,
            &self.sampler,
            &self.uniform_buf,
        );
    }

    pub fn update(&self, queue: &Queue, settings: &HoloSettings) {
        let uniform = HoloUniform::new(settings, self.width, self.height);
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn render(&self, encoder: &mut CommandEncoder, output: &TextureView) {
        target::draw_fullscreen(encoder, "Holo", output, &self.pipeline, &self.bind_group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{fullscreen_source, wgsl};

    #[test]
    fn defaults_are_not_passthrough() {
        let s = HoloSettings::from_params(&PanelParams::default(), 2.0);
        assert_eq!(s.time, 2.0);
        assert_eq!(s.progress, 0.0);
        assert_eq!(s.intensity, 0.5);
        assert!(s.sweep().is_none());
        assert!(!s.is_passthrough());
    }

    #[test]
    fn zeroed_settings_upload_identity_coefficients() {
        let mut params = PanelParams::default();
        params.set(Param::HoloIntensity, 0.0);
        let s = HoloSettings::from_params(&params, 10.0);
        assert!(s.is_passthrough());

        let u = HoloUniform::new(&s, 800, 600);
        assert_eq!(u.chroma_shift, 0.0);
        assert_eq!(u.scan_strength, 0.0);
        assert_eq!(u.noise, 0.0);
        assert_eq!(u.band, [0.0; 4]);
    }

    #[test]
    fn coefficients_saturate_at_high_intensity() {
        let s = HoloSettings {
            time: 0.0,
            progress: 3.0,
            intensity: 40.0,
        };
        assert!((s.chroma_shift() - 0.08).abs() < 1e-6);
        assert_eq!(s.scan_strength(), 0.6);
        assert_eq!(s.noise(), 1.0);
        assert!((s.sweep().unwrap() - 1.1).abs() < 1e-6);
        assert_eq!(HoloUniform::new(&s, 1, 1).band[0], 1.0);
    }

    #[test]
    fn uniform_layout_and_resolution() {
        assert_eq!(std::mem::size_of::<HoloUniform>(), 48);
        let u = HoloUniform::new(&HoloSettings::default(), 0, 400);
        assert_eq!(u.resolution, [1.0, 400.0, 1.0, 0.0025]);
    }

    #[test]
    fn shader_validates_with_matching_uniform() {
        let module = wgsl::validate("holo", &fullscreen_source(HOLO_WGSL));
        assert_eq!(wgsl::entry_points(&module), vec!["fs_main", "vs_fullscreen"]);
        assert_eq!(
            wgsl::uniform_size(&module) as usize,
            std::mem::size_of::<HoloUniform>()
        );
    }
}
