//! glTF / GLB import flattened into a single [`MeshData`].
//!
//! Every triangle primitive reachable from the default scene is baked into
//! world space with its node transform. The viewer renders the whole model
//! with one shared material, so per-primitive materials and textures are
//! ignored.

use std::path::Path;

use anyhow::{Context, Result, bail};
use corelib::{Mat3, Mat4, Vec3};

use crate::mesh::{MeshData, MeshVertex};

/// Load a `.glb` / `.gltf` file from disk.
pub fn load_glb_from_path(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("Failed to import glTF: {}", path.display()))?;
    flatten_document(&document, &buffers)
}

/// Parse an in-memory GLB (or embedded glTF JSON) blob.
pub fn load_glb_from_slice(bytes: &[u8]) -> Result<MeshData> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).context("Failed to parse glTF data")?;
    flatten_document(&document, &buffers)
}

fn flatten_document(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<MeshData> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF has no scenes")?;

    let mut mesh = MeshData::default();
    for node in scene.nodes() {
        append_node(&node, Mat4::IDENTITY, buffers, &mut mesh)?;
    }

    if !mesh.is_valid() {
        bail!("glTF scene contained no triangles");
    }
    Ok(mesh)
}

fn append_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping non-triangle primitive {} of mesh {:?}",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            let part = read_primitive(&primitive, buffers)?;
            append_transformed(out, part, world);
        }
    }

    for child in node.children() {
        append_node(&child, world, buffers, out)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .context("Primitive has no POSITION attribute")?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let uvs: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let has_normals = normals.is_some();
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0, 0.0, 1.0]);
            let uv = uvs.as_ref().and_then(|t| t.get(i).copied()).unwrap_or([0.0, 0.0]);
            MeshVertex::new(position, normal, uv)
        })
        .collect();

    let mut part = MeshData::new(vertices, indices);
    part.validate()
        .with_context(|| format!("Primitive {} is malformed", primitive.index()))?;
    if !has_normals {
        part.compute_normals();
    }
    Ok(part)
}

/// Append `part` to `out`, moving it into world space with `world`.
pub(crate) fn append_transformed(out: &mut MeshData, part: MeshData, world: Mat4) {
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let base = out.vertices.len() as u32;

    out.vertices.extend(part.vertices.into_iter().map(|v| {
        let position = world.transform_point3(Vec3::from(v.position));
        let normal = (normal_matrix * Vec3::from(v.normal))
            .try_normalize()
            .unwrap_or(Vec3::Z);
        MeshVertex::new(position.to_array(), normal.to_array(), v.uv)
    }));
    out.indices.extend(part.indices.into_iter().map(|i| i + base));
}
