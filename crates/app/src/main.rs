//! Entry point for Holoreflect: logging + command-line flags.

use std::path::PathBuf;

use anyhow::Result;
use platform::LaunchOptions;

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{other}', falling back to auto.");
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_show_fps_arg(args: &[String]) -> bool {
    // --show-fps[=on|off], off by default
    for arg in args {
        if arg == "--show-fps" {
            return true;
        }
        if let Some(val) = arg.strip_prefix("--show-fps=") {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    (w.unwrap_or(1280).max(1), h.unwrap_or(720).max(1))
}

/// Last `--<name>=PATH`, ignoring empty values.
fn parse_path_arg(args: &[String], name: &str) -> Option<PathBuf> {
    let prefix = format!("--{name}=");
    args.iter()
        .filter_map(|arg| arg.strip_prefix(prefix.as_str()))
        .filter(|v| !v.is_empty())
        .last()
        .map(PathBuf::from)
}

fn parse_options(args: &[String]) -> LaunchOptions {
    let defaults = LaunchOptions::default();
    let (width, height) = parse_size_args(args);
    LaunchOptions {
        backends: parse_backend_arg(args),
        show_fps: parse_show_fps_arg(args),
        width,
        height,
        env_path: parse_path_arg(args, "env").unwrap_or(defaults.env_path),
        model_path: parse_path_arg(args, "model").unwrap_or(defaults.model_path),
        params_path: parse_path_arg(args, "params"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_options(&args);
    log::info!(
        "Starting Holoreflect. Backend: {:?}, show_fps={}, window_size={}x{}, env={}, model={}",
        options.backends,
        options.show_fps,
        options.width,
        options.height,
        options.env_path.display(),
        options.model_path.display()
    );

    platform::run_with_renderer(options)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_flags_gives_defaults() {
        let o = parse_options(&[]);
        assert_eq!(o.backends, wgpu::Backends::all());
        assert!(!o.show_fps);
        assert_eq!((o.width, o.height), (1280, 720));
        assert_eq!(o.env_path, PathBuf::from("assets/grad.jpg"));
        assert_eq!(o.model_path, PathBuf::from("assets/human-nocompress.glb"));
        assert!(o.params_path.is_none());
    }

    #[test]
    fn backend_aliases() {
        assert_eq!(parse_backend_arg(&args(&["--gpu-backend=VK"])), wgpu::Backends::VULKAN);
        assert_eq!(parse_backend_arg(&args(&["--gpu-backend=gles"])), wgpu::Backends::GL);
        assert_eq!(parse_backend_arg(&args(&["--gpu-backend=nope"])), wgpu::Backends::all());
    }

    #[test]
    fn size_forms() {
        assert_eq!(parse_size_args(&args(&["--size=800X600"])), (800, 600));
        assert_eq!(parse_size_args(&args(&["--width=640"])), (640, 720));
        assert_eq!(parse_size_args(&args(&["--size=0x0"])), (1, 1));
        assert_eq!(parse_size_args(&args(&["--size=abc"])), (1280, 720));
    }

    #[test]
    fn show_fps_forms() {
        assert!(parse_show_fps_arg(&args(&["--show-fps"])));
        assert!(parse_show_fps_arg(&args(&["--show-fps=on"])));
        assert!(!parse_show_fps_arg(&args(&["--show-fps=off"])));
    }

    #[test]
    fn asset_paths() {
        let o = parse_options(&args(&[
            "--env=sky.hdr",
            "--model=",
            "--params=look.toml",
            "--params=final.toml",
        ]));
        assert_eq!(o.env_path, PathBuf::from("sky.hdr"));
        assert_eq!(o.model_path, PathBuf::from("assets/human-nocompress.glb"));
        assert_eq!(o.params_path, Some(PathBuf::from("final.toml")));
    }
}
