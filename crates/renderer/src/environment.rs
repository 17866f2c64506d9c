//! GPU-side prefiltered environment cubemap.

use std::time::Instant;

use asset::EnvironmentImage;
use wgpu::{Device, Queue, Sampler, Texture, TextureView};

use crate::ibl::{CubeFaces, PrefilterGenerator, PrefilterSettings};

const ENV_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Four half floats per texel.
const ENV_TEXEL_BYTES: u32 = 8;

pub struct EnvironmentMap {
    #[allow(dead_code)]
    texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    mip_levels: u32,
}

impl EnvironmentMap {
    /// Prefilter `image` and upload the chain. The source image is consumed
    /// and freed once the cube exists.
    pub fn from_equirect(
        device: &Device,
        queue: &Queue,
        image: EnvironmentImage,
        settings: &PrefilterSettings,
    ) -> Self {
        let started = Instant::now();
        let chain = PrefilterGenerator::new(settings.sample_count).generate(&image, settings);
        drop(image);
        log::info!(
            "prefiltered environment: {} mips of {}px faces in {:.1} ms",
            chain.len(),
            settings.face_size,
            started.elapsed().as_secs_f64() * 1000.0
        );
        Self::upload(device, queue, &chain)
    }

    fn upload(device: &Device, queue: &Queue, chain: &[CubeFaces]) -> Self {
        let size = chain.first().map_or(1, |c| c.size);
        let mip_levels = chain.len().max(1) as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Cube"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ENV_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in chain.iter().enumerate() {
            for face in 0..6 {
                let texels = level.face_rgba16f(face);
                queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &texture,
                        mip_level: mip as u32,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: face as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    bytemuck::cast_slice(&texels),
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(ENV_TEXEL_BYTES * level.size),
                        rows_per_image: Some(level.size),
                    },
                    wgpu::Extent3d {
                        width: level.size,
                        height: level.size,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Environment Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            mip_levels,
        }
    }

    /// Index of the roughest mip.
    pub fn max_mip(&self) -> f32 {
        (self.mip_levels - 1) as f32
    }
}
