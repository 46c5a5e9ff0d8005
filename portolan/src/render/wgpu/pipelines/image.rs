use std::sync::Arc;

use portolan_types::cartesian::Rect;
use wgpu::util::{DeviceExt, TextureDataOrder};
use wgpu::{BindGroup, BindGroupLayout, Device, Queue, RenderPass, RenderPipeline, TextureFormat};

use crate::decoded_image::DecodedImage;
use crate::render::wgpu::pipelines::{default_pipeline_descriptor, default_targets};

const INDICES: &[u16] = &[0, 1, 2, 1, 3, 2];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ImageVertex {
    position: [f32; 2],
    tex_coords: [f32; 2],
    opacity: f32,
}

/// One recorded tile blit: the texture plus a quad covering the
/// destination rectangle.
pub(crate) struct ImageCommand {
    pub texture: Arc<BindGroup>,
    pub vertices: wgpu::Buffer,
}

pub(crate) struct ImagePipeline {
    wgpu_pipeline: RenderPipeline,
    index_buffer: wgpu::Buffer,
    texture_bind_group_layout: BindGroupLayout,
}

impl ImagePipeline {
    pub fn create(device: &Device, format: TextureFormat, view_layout: &BindGroupLayout) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("../shaders/image.wgsl"));

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("tile_texture_bind_group_layout"),
            });

        let buffers = [ImageVertex::wgpu_desc()];
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[view_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let targets = default_targets(format);
        let wgpu_pipeline = device.create_render_pipeline(&default_pipeline_descriptor(
            &layout, &shader, &targets, &buffers,
        ));

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Image index buffer"),
            contents: bytemuck::cast_slice(INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            wgpu_pipeline,
            index_buffer,
            texture_bind_group_layout,
        }
    }

    /// Uploads the image into a texture and wraps it into a bind group.
    pub fn create_texture(
        &self,
        device: &Device,
        queue: &Queue,
        image: &DecodedImage,
    ) -> Arc<BindGroup> {
        let texture_size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                size: texture_size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                label: None,
                view_formats: &[],
            },
            TextureDataOrder::default(),
            image.bytes(),
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("tile_texture_bind_group"),
        });

        Arc::new(texture_bind_group)
    }

    /// Builds the quad covering `dest` (physical pixels), sampling `source`
    /// (image pixels) of an image with the given dimensions.
    pub fn create_command(
        &self,
        device: &Device,
        texture: Arc<BindGroup>,
        image: &DecodedImage,
        source: Rect,
        dest: Rect,
        opacity: f32,
    ) -> ImageCommand {
        let (width, height) = (image.width() as f64, image.height() as f64);
        let (u0, v0) = (source.x_min() / width, source.y_min() / height);
        let (u1, v1) = (source.x_max() / width, source.y_max() / height);

        let vertices = [
            ImageVertex {
                position: [dest.x_min() as f32, dest.y_min() as f32],
                tex_coords: [u0 as f32, v0 as f32],
                opacity,
            },
            ImageVertex {
                position: [dest.x_max() as f32, dest.y_min() as f32],
                tex_coords: [u1 as f32, v0 as f32],
                opacity,
            },
            ImageVertex {
                position: [dest.x_min() as f32, dest.y_max() as f32],
                tex_coords: [u0 as f32, v1 as f32],
                opacity,
            },
            ImageVertex {
                position: [dest.x_max() as f32, dest.y_max() as f32],
                tex_coords: [u1 as f32, v1 as f32],
                opacity,
            },
        ];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Image vertex buffer"),
            usage: wgpu::BufferUsages::VERTEX,
            contents: bytemuck::cast_slice(&vertices),
        });

        ImageCommand {
            texture,
            vertices: vertex_buffer,
        }
    }

    pub fn render<'a>(&'a self, command: &'a ImageCommand, render_pass: &mut RenderPass<'a>) {
        render_pass.set_pipeline(&self.wgpu_pipeline);
        render_pass.set_bind_group(1, &command.texture, &[]);
        render_pass.set_vertex_buffer(0, command.vertices.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..INDICES.len() as u32, 0, 0..1);
    }
}

impl ImageVertex {
    fn wgpu_desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ImageVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: (2 * std::mem::size_of::<[f32; 2]>()) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
