//! The single model the viewer shows, with its placement in the scene.

use std::path::{Path, PathBuf};

use corelib::transform::Transform;
use corelib::vec3;

use crate::glb;
use crate::mesh::MeshData;
use crate::torus::TorusShape;

/// Where the mesh came from.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelSource {
    Gltf(PathBuf),
    Torus,
}

#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub mesh: MeshData,
    pub transform: Transform,
    pub source: ModelSource,
}

impl ModelAsset {
    /// Imported models are dropped two units and scaled down to fit the view.
    pub fn from_gltf(path: PathBuf, mesh: MeshData) -> Self {
        Self {
            mesh,
            transform: Transform::from_translation_scale(vec3(0.0, -2.0, 0.0), 0.3),
            source: ModelSource::Gltf(path),
        }
    }

    pub fn torus() -> Self {
        Self {
            mesh: TorusShape::default().build(),
            transform: Transform::identity(),
            source: ModelSource::Torus,
        }
    }

    /// Load the model at `path`, or fall back to the torus if it cannot be read.
    pub fn load_or_fallback(path: &Path) -> Self {
        match glb::load_glb_from_path(path) {
            Ok(mesh) => {
                log::info!(
                    "Loaded model {}: {} vertices, {} triangles, bounds={:?}",
                    path.display(),
                    mesh.vertices.len(),
                    mesh.triangle_count(),
                    mesh.bounds()
                );
                Self::from_gltf(path.to_path_buf(), mesh)
            }
            Err(err) => {
                log::warn!("Model unavailable ({err:#}); using procedural torus");
                Self::torus()
            }
        }
    }
}
