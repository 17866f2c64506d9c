//! egui parameter panel drawn over the final image.

use corelib::{PanelParams, Param};
use egui_wgpu::ScreenDescriptor;
use winit::{event::WindowEvent, window::Window};

pub const PANEL_WIDTH: f32 = 270.0;

/// Sliders for every parameter plus a Reset button. Returns `true` when any
/// value changed. Edits go through [`PanelParams::set`] so clamping and the
/// exposure side effects apply.
pub fn draw_controls(ui: &mut egui::Ui, params: &mut PanelParams) -> bool {
    let mut changed = false;
    for param in Param::ALL {
        let range = param.range();
        let mut value = params.get(param);
        let response = ui.add(
            egui::Slider::new(&mut value, range.min..=range.max)
                .step_by(range.step as f64)
                .text(param.label()),
        );
        if response.changed() {
            let stored = params.set(param, value);
            log::debug!("{} = {stored}", param.key());
            changed = true;
        }
    }
    ui.separator();
    if ui.button("Reset").clicked() {
        *params = PanelParams::default();
        log::info!("Parameters reset to defaults");
        changed = true;
    }
    changed
}

/// Receiver of egui texture changes.
pub trait TextureSink {
    fn set_texture(&mut self, id: egui::TextureId, delta: &egui::epaint::ImageDelta);
    fn free_texture(&mut self, id: egui::TextureId);
}

struct GpuTextures<'a> {
    renderer: &'a mut egui_wgpu::Renderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl TextureSink for GpuTextures<'_> {
    fn set_texture(&mut self, id: egui::TextureId, delta: &egui::epaint::ImageDelta) {
        self.renderer.update_texture(self.device, self.queue, id, delta);
    }

    fn free_texture(&mut self, id: egui::TextureId) {
        self.renderer.free_texture(&id);
    }
}

/// Tessellated panel output for one frame.
pub struct PanelFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

impl PanelFrame {
    fn from_output(ctx: &egui::Context, output: egui::FullOutput) -> Self {
        Self {
            paint_jobs: ctx.tessellate(output.shapes, output.pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }

    /// Apply new and changed textures. Runs every frame, painted or not:
    /// egui sends each full texture once and only patches it afterwards.
    pub fn upload_textures(&self, sink: &mut impl TextureSink) {
        for (id, delta) in &self.textures_delta.set {
            sink.set_texture(*id, delta);
        }
    }

    pub fn free_textures(&self, sink: &mut impl TextureSink) {
        for id in &self.textures_delta.free {
            sink.free_texture(*id);
        }
    }
}

pub struct ParamPanel {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl ParamPanel {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Feed a window event to egui. Returns `true` if the panel consumed it
    /// and the camera should ignore it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the UI for this frame.
    pub fn build(
        &mut self,
        window: &Window,
        params: &mut PanelParams,
        fps: Option<f32>,
    ) -> PanelFrame {
        let raw_input = self.state.take_egui_input(window);
        let mut full_output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("Controls")
                .default_width(PANEL_WIDTH)
                .resizable(false)
                .show(ctx, |ui| {
                    if let Some(fps) = fps {
                        ui.label(format!("{fps:.1} fps"));
                    }
                    draw_controls(ui, params);
                });
        });
        let platform_output = std::mem::take(&mut full_output.platform_output);
        self.state.handle_platform_output(window, platform_output);
        PanelFrame::from_output(&self.ctx, full_output)
    }

    /// Send this frame's texture changes to the GPU, before the surface
    /// is acquired.
    pub fn upload_textures(
        &mut self,
        frame: &PanelFrame,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) {
        frame.upload_textures(&mut GpuTextures {
            renderer: &mut self.renderer,
            device,
            queue,
        });
    }

    /// Release textures egui dropped this frame, whether or not it was painted.
    pub fn free_textures(
        &mut self,
        frame: &PanelFrame,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) {
        frame.free_textures(&mut GpuTextures {
            renderer: &mut self.renderer,
            device,
            queue,
        });
    }

    /// Record the panel onto `view` (loaded, not cleared). Textures must
    /// already be uploaded. Returns command buffers that must be submitted
    /// before `encoder`.
    pub fn paint(
        &mut self,
        frame: &PanelFrame,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let screen = ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };
        let extra = self
            .renderer
            .update_buffers(device, queue, encoder, &frame.paint_jobs, &screen);
        {
            let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer
                .render(&mut rpass.forget_lifetime(), &frame.paint_jobs, &screen);
        }
        extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Mirrors egui-wgpu: patching a texture that was never fully uploaded
    /// is an error.
    #[derive(Default)]
    struct RecordingSink {
        allocated: HashSet<egui::TextureId>,
    }

    impl TextureSink for RecordingSink {
        fn set_texture(&mut self, id: egui::TextureId, delta: &egui::epaint::ImageDelta) {
            if delta.pos.is_none() {
                self.allocated.insert(id);
            } else {
                assert!(self.allocated.contains(&id), "patch for unallocated {id:?}");
            }
        }

        fn free_texture(&mut self, id: egui::TextureId) {
            self.allocated.remove(&id);
        }
    }

    fn headless_frame(ctx: &egui::Context, params: &mut PanelParams) -> PanelFrame {
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                draw_controls(ui, params);
            });
        });
        PanelFrame::from_output(ctx, output)
    }

    #[test]
    fn font_atlas_is_kept_when_first_frame_is_not_painted() {
        let ctx = egui::Context::default();
        let mut params = PanelParams::default();
        let mut sink = RecordingSink::default();

        // Surface unavailable: the frame is built and its textures applied,
        // but nothing is painted.
        let dropped = headless_frame(&ctx, &mut params);
        dropped.upload_textures(&mut sink);
        dropped.free_textures(&mut sink);
        assert!(sink.allocated.contains(&egui::TextureId::default()));

        for _ in 0..3 {
            let frame = headless_frame(&ctx, &mut params);
            frame.upload_textures(&mut sink);
            frame.free_textures(&mut sink);
            assert!(!frame.paint_jobs.is_empty());
        }
        assert!(sink.allocated.contains(&egui::TextureId::default()));
    }

    fn run_headless(params: &mut PanelParams) -> bool {
        let ctx = egui::Context::default();
        let mut changed = false;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                changed |= draw_controls(ui, params);
            });
        });
        changed
    }

    #[test]
    fn idle_frame_changes_nothing() {
        let mut params = PanelParams::default();
        assert!(!run_headless(&mut params));
        assert_eq!(params, PanelParams::default());
    }

    #[test]
    fn idle_frame_keeps_custom_values() {
        let mut params = PanelParams::default();
        params.set(Param::BloomExposure, 1.5);
        let before = params.clone();
        assert!(!run_headless(&mut params));
        assert_eq!(params, before);
    }
}
