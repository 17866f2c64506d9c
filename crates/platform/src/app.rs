//! Viewer state and the winit event handler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use asset::{EnvironmentImage, ModelAsset};
use corelib::camera::Camera;
use corelib::clock::Clock;
use corelib::orbit::OrbitControls;
use corelib::PanelParams;
use renderer::ibl::PrefilterSettings;
use renderer::{FrameInputs, GpuState, SceneSetup};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::fps::FpsCounter;
use crate::panel::ParamPanel;
use crate::LaunchOptions;

/// Pixels of trackpad scroll treated as one wheel notch.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

pub(crate) struct ViewerApp {
    options: LaunchOptions,
    params: PanelParams,
    camera: Camera,
    orbit: OrbitControls,
    clock: Clock,
    fps: FpsCounter,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    panel: Option<ParamPanel>,

    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub(crate) fn new(options: LaunchOptions, params: PanelParams) -> Self {
        Self {
            options,
            params,
            camera: Camera::default(),
            orbit: OrbitControls::default(),
            clock: Clock::start_new(),
            fps: FpsCounter::new(),
            window: None,
            gpu: None,
            panel: None,
            dragging: false,
            cursor: None,
            error: None,
        }
    }

    /// First fatal error hit inside the loop, if any.
    pub(crate) fn into_result(self) -> anyhow::Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Holoreflect")
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let setup = SceneSetup {
            model: ModelAsset::load_or_fallback(&self.options.model_path),
            environment: load_environment(&self.options.env_path),
            prefilter: PrefilterSettings::default(),
        };
        let gpu = pollster::block_on(GpuState::new(window.clone(), self.options.backends, setup))
            .context("failed to initialise renderer")?;
        let panel = ParamPanel::new(&window, gpu.device(), gpu.surface_format());

        self.clock = Clock::start_new();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.panel = Some(panel);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu), Some(panel)) =
            (self.window.as_ref(), self.gpu.as_mut(), self.panel.as_mut())
        else {
            return;
        };

        let frame_time = self.clock.tick();
        log::trace!("frame dt = {:.4}s", frame_time.delta);
        self.orbit.update(&mut self.camera);

        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }

        let fps = if self.options.show_fps {
            if let Some(avg) = self.fps.tick(Instant::now()) {
                log::info!("FPS: {avg:.1}");
            }
            self.fps.last()
        } else {
            None
        };
        let panel_frame = panel.build(window, &mut self.params, fps);
        panel.upload_textures(&panel_frame, gpu.device(), gpu.queue());

        let inputs = FrameInputs {
            time: frame_time.elapsed,
            camera: &self.camera,
            params: &self.params,
        };
        let (w, h) = gpu.size();
        let result = gpu.render(&inputs, |device, queue, encoder, view| {
            panel.paint(&panel_frame, device, queue, encoder, view, [w, h])
        });
        panel.free_textures(&panel_frame, gpu.device(), gpu.queue());

        match result {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::info!("Surface {e:?}; reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::Timeout) => log::warn!("Surface timeout; skipping frame"),
            Err(e) => {
                let err = anyhow::anyhow!("render failed: {e:?}");
                self.fail(event_loop, err);
            }
        }
    }

    /// Skips zero-sized (minimised) windows; the scale factor defaults to
    /// the window's current one.
    fn resize_renderer(&mut self, size: PhysicalSize<u32>, scale_factor: Option<f64>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_mut()) else {
            return;
        };
        let scale_factor = scale_factor.unwrap_or_else(|| window.scale_factor());
        gpu.resize(size.width, size.height, scale_factor);
    }

    fn on_pointer(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(prev), Some(window)) =
                    (self.dragging, self.cursor, self.window.as_ref())
                {
                    let height = window.inner_size().height.max(1) as f32;
                    self.orbit.rotate_by_pixels(
                        (position.x - prev.x) as f32,
                        (position.y - prev.y) as f32,
                        height,
                    );
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
                };
                self.orbit.zoom(steps);
            }
            _ => {}
        }
    }
}

fn load_environment(path: &std::path::Path) -> EnvironmentImage {
    match EnvironmentImage::load(path) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("Environment unavailable ({err:#}); using gradient");
            EnvironmentImage::default_gradient()
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let consumed = match (self.panel.as_mut(), self.window.as_ref()) {
            (Some(panel), Some(window)) => panel.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::info!("Resized: {}x{}", size.width, size.height);
                self.resize_renderer(size, None);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {scale_factor:.3}");
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize_renderer(size, Some(scale_factor));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::MouseInput { .. }
            | WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseWheel { .. } => {
                // Releasing the button must always end a drag.
                let release = matches!(
                    event,
                    WindowEvent::MouseInput {
                        state: ElementState::Released,
                        ..
                    }
                );
                if !consumed || release {
                    self.on_pointer(&event);
                } else if let WindowEvent::CursorMoved { position, .. } = event {
                    self.cursor = Some(position);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
