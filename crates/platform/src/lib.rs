//! Platform layer: window, event loop, orbit input and the parameter panel.
//!
//! The loop redraws continuously; every frame advances the clock, applies
//! orbit damping, runs the panel and renders the pass chain.

mod app;
pub mod fps;
pub mod panel;

use std::path::{Path, PathBuf};

use anyhow::Result;
use asset::preset::ParamsPreset;
use corelib::PanelParams;
use winit::event_loop::{ControlFlow, EventLoop};

use crate::app::ViewerApp;

pub const DEFAULT_ENV_PATH: &str = "assets/grad.jpg";
pub const DEFAULT_MODEL_PATH: &str = "assets/human-nocompress.glb";

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub env_path: PathBuf,
    pub model_path: PathBuf,
    /// Optional TOML preset applied over the defaults.
    pub params_path: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            show_fps: false,
            width: 1280,
            height: 720,
            env_path: PathBuf::from(DEFAULT_ENV_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            params_path: None,
        }
    }
}

/// Starting parameters: defaults, overlaid with the preset when one loads.
pub fn initial_params(preset: Option<&Path>) -> PanelParams {
    let mut params = PanelParams::default();
    let Some(path) = preset else {
        return params;
    };
    match ParamsPreset::load(path) {
        Ok(preset) => {
            let clamped = preset.apply(&mut params);
            log::info!("Applied preset {} ({clamped} value(s) clamped)", path.display());
        }
        Err(err) => log::warn!("Ignoring preset ({err:#})"),
    }
    params
}

/// Open the viewer window and run until it is closed.
pub fn run_with_renderer(options: LaunchOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let params = initial_params(options.params_path.as_deref());
    let mut app = ViewerApp::new(options, params);
    event_loop.run_app(&mut app)?;
    app.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::Param;

    #[test]
    fn defaults_point_at_bundled_assets() {
        let o = LaunchOptions::default();
        assert_eq!(o.env_path, PathBuf::from("assets/grad.jpg"));
        assert_eq!(o.model_path, PathBuf::from("assets/human-nocompress.glb"));
        assert_eq!((o.width, o.height), (1280, 720));
        assert!(o.params_path.is_none());
    }

    #[test]
    fn missing_preset_keeps_defaults() {
        let params = initial_params(Some(Path::new("no/such/preset.toml")));
        assert_eq!(params, PanelParams::default());
        assert_eq!(initial_params(None).get(Param::Speed), 2.0);
    }
}
