//! Errors raised while bringing up or feeding the GPU.

use thiserror::Error;

use crate::framegraph::FrameGraphError;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no GPU adapter for backends {0:?}")]
    NoAdapter(wgpu::Backends),
    #[error("failed to open device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error(transparent)]
    Mesh(#[from] corelib::CoreError),
    #[error("frame graph: {0}")]
    FrameGraph(#[from] FrameGraphError),
}
