//! Asset loading (CPU side): the model mesh, the equirectangular environment
//! image and parameter presets. Missing assets degrade to procedural
//! stand-ins so the viewer always has something to show.

pub mod environment;
pub mod glb;
pub mod mesh;
pub mod model;
pub mod preset;
pub mod torus;

pub use environment::EnvironmentImage;
pub use mesh::{MeshData, MeshVertex};
pub use model::{ModelAsset, ModelSource};
