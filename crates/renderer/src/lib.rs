//! Renderer: wgpu init, the environment-lit model, bloom and the holographic
//! composite. wgpu = 23.x, winit = 0.30.x

pub mod bloom;
pub mod environment;
pub mod error;
pub mod framegraph;
pub mod holo;
pub mod ibl;
pub mod material;
pub mod target;

use std::sync::Arc;
use std::time::Instant;

use asset::{EnvironmentImage, ModelAsset};
use corelib::camera::Camera;
use corelib::transform::Transform;
use corelib::PanelParams;
use wgpu::{
    CommandBuffer, CommandEncoder, CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d,
    Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::bloom::{BloomPass, BloomSettings};
use crate::environment::EnvironmentMap;
use crate::framegraph::{FrameGraph, FrameGraphError};
use crate::holo::{HoloPass, HoloSettings};
use crate::ibl::PrefilterSettings;
use crate::material::{DEPTH_FORMAT, GpuMesh, StandardMaterial};
use crate::target::{HDR_FORMAT, RenderTarget};

pub use error::RendererError;

/// `0x050505` in linear light.
pub fn clear_color() -> wgpu::Color {
    let c = asset::environment::srgb_to_linear(5.0 / 255.0) as f64;
    wgpu::Color {
        r: c,
        g: c,
        b: c,
        a: 1.0,
    }
}

/// Upper bound on render pixels per logical pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Size of the offscreen chain for a `width`x`height` physical surface.
/// On displays denser than [`MAX_PIXEL_RATIO`] the chain renders at the
/// capped density and the holographic pass scales it up to the surface.
pub fn render_extent(width: u32, height: u32, scale_factor: f64) -> (u32, u32) {
    let ratio = if scale_factor > MAX_PIXEL_RATIO {
        MAX_PIXEL_RATIO / scale_factor
    } else {
        1.0
    };
    let fit = |v: u32| ((f64::from(v) * ratio).round() as u32).max(1);
    (fit(width), fit(height))
}

/// What the renderer needs once at startup. Both assets are consumed.
pub struct SceneSetup {
    pub model: ModelAsset,
    pub environment: EnvironmentImage,
    pub prefilter: PrefilterSettings,
}

/// Per-frame state handed in by the event loop.
pub struct FrameInputs<'a> {
    pub time: f32,
    pub camera: &'a Camera,
    pub params: &'a PanelParams,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Scene,
    Bloom,
    Holo,
}

/// Order of the post chain, validated by the frame graph.
pub fn build_schedule() -> Result<Vec<Stage>, FrameGraphError> {
    let mut graph = FrameGraph::new();
    let scene_color = graph.add_resource("scene_color");
    let bloom_color = graph.add_resource("bloom_color");
    let surface = graph.import_resource("surface");

    let stages = [
        (graph.add_pass("scene", &[], &[scene_color]), Stage::Scene),
        (graph.add_pass("bloom", &[scene_color], &[bloom_color]), Stage::Bloom),
        (graph.add_pass("holo", &[bloom_color], &[surface]), Stage::Holo),
    ];

    let order = graph.compile()?;
    Ok(order
        .into_iter()
        .filter_map(|id| stages.iter().find(|(p, _)| *p == id).map(|(_, s)| *s))
        .collect())
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Scene
    mesh: GpuMesh,
    model_transform: Transform,
    material: StandardMaterial,
    scene_target: RenderTarget,
    depth_view: TextureView,

    // Post
    bloom: BloomPass,
    holo: HoloPass,
    schedule: Vec<Stage>,

    // Size cache: surface in physical pixels, offscreen chain after the
    // pixel-ratio cap.
    width: u32,
    height: u32,
    render_width: u32,
    render_height: u32,
    scale_factor: f64,
}

impl GpuState {
    /// Create GPU state bound to an `Arc<Window>` and upload the scene.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        setup: SceneSetup,
    ) -> Result<Self, RendererError> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);
        let scale_factor = window.scale_factor();
        let (render_width, render_height) = render_extent(width, height, scale_factor);

        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter(backends))?;
        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Holoreflect Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RendererError::NoSurfaceFormat)?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // Environment first: the material binds its cube.
        let started = Instant::now();
        let environment =
            EnvironmentMap::from_equirect(&device, &queue, setup.environment, &setup.prefilter);
        let mesh = GpuMesh::from_mesh(&device, &setup.model.mesh)?;
        let material = StandardMaterial::new(&device, &environment, HDR_FORMAT);

        let scene_target =
            RenderTarget::new(&device, "Scene Color", render_width, render_height, HDR_FORMAT);
        let depth_view = create_depth_view(&device, render_width, render_height);
        let bloom = BloomPass::new(&device, render_width, render_height, &scene_target.view);
        let holo = HoloPass::new(
            &device,
            surface_format,
            render_width,
            render_height,
            bloom.output_view(),
        );
        let schedule = build_schedule()?;

        log::info!(
            "Scene ready in {:.1} ms: {:?} model, {} triangles, surface {:?} {}x{}, render {}x{}",
            started.elapsed().as_secs_f64() * 1000.0,
            setup.model.source,
            setup.model.mesh.triangle_count(),
            surface_format,
            width,
            height,
            render_width,
            render_height
        );

        Ok(Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            mesh,
            model_transform: setup.model.transform,
            material,
            scene_target,
            depth_view,
            bloom,
            holo,
            schedule,
            width,
            height,
            render_width,
            render_height,
            scale_factor,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.surface_format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize: reconfigure the surface and rebuild every size-dependent
    /// target at the capped render resolution.
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        let max = self.device.limits().max_texture_dimension_2d;
        self.width = width.clamp(1, max);
        self.height = height.clamp(1, max);
        self.scale_factor = scale_factor;
        (self.render_width, self.render_height) =
            render_extent(self.width, self.height, scale_factor);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);

        let (rw, rh) = (self.render_width, self.render_height);
        self.depth_view = create_depth_view(&self.device, rw, rh);
        self.scene_target = RenderTarget::new(&self.device, "Scene Color", rw, rh, HDR_FORMAT);
        self.bloom
            .resize(&self.device, rw, rh, &self.scene_target.view);
        self.holo
            .resize(&self.device, rw, rh, self.bloom.output_view());
        log::debug!(
            "Renderer resized: surface {}x{}, render {rw}x{rh} (scale {scale_factor:.2})",
            self.width,
            self.height
        );
    }

    /// Render one frame through the pass chain. `overlay` records extra
    /// drawing onto the surface view (the panel) and may return command
    /// buffers that must be submitted ahead of the main encoder.
    pub fn render<F>(&mut self, frame: &FrameInputs<'_>, overlay: F) -> Result<(), SurfaceError>
    where
        F: FnOnce(&Device, &Queue, &mut CommandEncoder, &TextureView) -> Vec<CommandBuffer>,
    {
        let aspect = self.render_width as f32 / self.render_height as f32;
        let camera = frame.camera.with_aspect(aspect);
        self.material
            .update(&camera, &self.model_transform, frame.params, frame.time);
        self.material.flush(&self.queue);
        self.bloom
            .update(&self.queue, &BloomSettings::from_params(frame.params));
        self.holo
            .update(&self.queue, &HoloSettings::from_params(frame.params, frame.time));

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        for stage in &self.schedule {
            match stage {
                Stage::Scene => self.draw_scene(&mut encoder),
                Stage::Bloom => self.bloom.render(&mut encoder),
                Stage::Holo => self.holo.render(&mut encoder, &view),
            }
        }

        let extra = overlay(&self.device, &self.queue, &mut encoder, &view);
        self.queue
            .submit(extra.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }

    fn draw_scene(&self, encoder: &mut CommandEncoder) {
        let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("ScenePass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &self.scene_target.view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(clear_color()),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.material.draw(&mut rpass, &self.mesh);
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height, self.scale_factor);
    }
}

/// Create a depth texture view of the given size.
fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_runs_scene_bloom_holo() {
        assert_eq!(
            build_schedule().unwrap(),
            vec![Stage::Scene, Stage::Bloom, Stage::Holo]
        );
    }

    #[test]
    fn clear_color_is_dark_grey_in_linear() {
        let c = clear_color();
        assert!((c.r - 0.001_517_6).abs() < 1e-5);
        assert_eq!(c.r, c.g);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn render_extent_caps_pixel_ratio_at_two() {
        assert_eq!(render_extent(1280, 720, 1.0), (1280, 720));
        assert_eq!(render_extent(2560, 1440, 2.0), (2560, 1440));
        // 3x display: logical 1280x720 renders at 2560x1440
        assert_eq!(render_extent(3840, 2160, 3.0), (2560, 1440));
        assert_eq!(render_extent(1, 1, 4.0), (1, 1));
    }

    #[test]
    fn render_extent_ignores_bogus_scale_factors() {
        assert_eq!(render_extent(800, 600, 0.0), (800, 600));
        assert_eq!(render_extent(800, 600, f64::NAN), (800, 600));
    }

    #[test]
    fn surface_errors_that_need_reconfigure() {
        assert!(GpuState::is_surface_lost(&SurfaceError::Lost));
        assert!(GpuState::is_surface_lost(&SurfaceError::Outdated));
        assert!(!GpuState::is_surface_lost(&SurfaceError::Timeout));
        assert!(!GpuState::is_surface_lost(&SurfaceError::OutOfMemory));
    }
}
