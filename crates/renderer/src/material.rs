//! The one standard material every mesh of the model shares.

use asset::MeshData;
use bytemuck::{Pod, Zeroable};
use corelib::camera::Camera;
use corelib::transform::Transform;
use corelib::{CoreResult, PanelParams, Param};
use wgpu::{
    util::DeviceExt, BindGroup, Buffer, BufferUsages, Device, Queue, RenderPass, RenderPipeline,
    ShaderStages, TextureFormat, VertexBufferLayout, VertexStepMode,
};

use crate::environment::EnvironmentMap;
use crate::target::{sampler_entry, uniform_entry};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

pub struct GpuMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
}

impl GpuMesh {
    pub fn from_mesh(device: &Device, mesh: &MeshData) -> CoreResult<Self> {
        mesh.validate()?;
        let vertices: Vec<GpuVertex> = mesh
            .vertices
            .iter()
            .map(|v| GpuVertex {
                position: v.position,
                normal: v.normal,
                uv: v.uv,
            })
            .collect();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model IB"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });
        log::debug!(
            "uploaded mesh: {} vertices, {} triangles",
            vertices.len(),
            mesh.triangle_count()
        );
        Ok(Self {
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
        })
    }
}

/// Cube LOD for a roughness; mirrors `specular_mip` in `standard.wgsl`.
pub fn specular_mip_level(roughness: f32, max_mip: f32) -> f32 {
    let sigma = std::f32::consts::PI * roughness * roughness / (1.0 + roughness);
    (max_mip + sigma.max(1e-6).log2()).clamp(0.0, max_mip)
}

const STANDARD_WGSL: &str = include_str!("shaders/standard.wgsl");

/// Material UBO (std140-compatible, 240 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// time, speed, metalness, roughness
    pub params: [f32; 4],
    /// exposure, max_mip, env_intensity, unused
    pub shading: [f32; 4],
}

impl MaterialUniform {
    pub fn new(
        camera: &Camera,
        transform: &Transform,
        params: &PanelParams,
        time: f32,
        max_mip: f32,
    ) -> Self {
        Self {
            view_proj: camera.proj_view().to_cols_array_2d(),
            model: transform.matrix().to_cols_array_2d(),
            normal_matrix: transform.normal_matrix().to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            params: [
                time,
                params.get(Param::Speed),
                params.get(Param::Metalness),
                params.get(Param::Roughness),
            ],
            shading: [params.tone_mapping_exposure(), max_mip, 1.0, 0.0],
        }
    }
}

pub struct StandardMaterial {
    pipeline: RenderPipeline,
    bind_group: BindGroup,
    uniform_buf: Buffer,
    uniform: MaterialUniform,
    max_mip: f32,
}

impl StandardMaterial {
    pub fn new(device: &Device, env: &EnvironmentMap, color_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Standard Material"),
            source: wgpu::ShaderSource::Wgsl(STANDARD_WGSL.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                sampler_entry(2),
            ],
        });

        let uniform = MaterialUniform::new(
            &Camera::default(),
            &Transform::identity(),
            &PanelParams::default(),
            0.0,
            env.max_mip(),
        );
        let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material UBO"),
            contents: bytemuck::bytes_of(&uniform),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material BG"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&env.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&env.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Material PipelineLayout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Material Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buf,
            uniform,
            max_mip: env.max_mip(),
        }
    }

    /// Refresh uniforms for this frame; written to the GPU by [`Self::flush`].
    pub fn update(
        &mut self,
        camera: &Camera,
        transform: &Transform,
        params: &PanelParams,
        time: f32,
    ) {
        self.uniform = MaterialUniform::new(camera, transform, params, time, self.max_mip);
    }

    pub fn flush(&self, queue: &Queue) {
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&self.uniform));
    }

    pub fn draw(&self, rpass: &mut RenderPass<'_>, mesh: &GpuMesh) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
        rpass.set_index_buffer(mesh.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}
