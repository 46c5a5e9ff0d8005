use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Device, RenderPass, RenderPipeline, TextureFormat};

use crate::render::wgpu::pipelines::{default_pipeline_descriptor, default_targets};
use crate::render::{PointPaint, PointSet};

/// A unit quad; each point sprite is one instance of it.
const CORNERS: &[[f32; 2]] = &[[-0.5, -0.5], [0.5, -0.5], [-0.5, 0.5], [0.5, 0.5]];
const INDICES: &[u16] = &[0, 1, 2, 2, 1, 3];

/// Style uniform of one points draw; layout must match the `PointStyle`
/// struct of the shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PointStyleUniform {
    color: [f32; 4],
    size: f32,
    _padding: [f32; 3],
}

/// Uploaded vertex data of one [`PointSet`] generation.
pub(crate) struct PointInstances {
    buffer: wgpu::Buffer,
    count: u32,
}

/// One recorded points draw.
pub(crate) struct PointCommand {
    pub instances: Arc<PointInstances>,
    style: BindGroup,
}

pub(crate) struct PointPipeline {
    wgpu_pipeline: RenderPipeline,
    corner_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    style_bind_group_layout: BindGroupLayout,
}

impl PointPipeline {
    pub fn create(device: &Device, format: TextureFormat, view_layout: &BindGroupLayout) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("../shaders/point.wgsl"));

        let style_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("point_style_bind_group_layout"),
            });

        let corner_desc = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        };
        let instance_desc = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            }],
        };
        let buffers = [corner_desc, instance_desc];

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[view_layout, &style_bind_group_layout],
            push_constant_ranges: &[],
        });

        let targets = default_targets(format);
        let wgpu_pipeline = device.create_render_pipeline(&default_pipeline_descriptor(
            &layout, &shader, &targets, &buffers,
        ));

        let corner_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point corner buffer"),
            contents: bytemuck::cast_slice(CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point index buffer"),
            contents: bytemuck::cast_slice(INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            wgpu_pipeline,
            corner_buffer,
            index_buffer,
            style_bind_group_layout,
        }
    }

    /// Uploads the positions of a point set. Called once per data
    /// generation; the buffer is reused for every following frame.
    pub fn create_instances(&self, device: &Device, set: &PointSet) -> Arc<PointInstances> {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point instance buffer"),
            contents: bytemuck::cast_slice(set.positions()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Arc::new(PointInstances {
            buffer,
            count: set.len() as u32,
        })
    }

    /// Builds the per-draw command with the given paint.
    pub fn create_command(
        &self,
        device: &Device,
        instances: Arc<PointInstances>,
        paint: PointPaint,
    ) -> PointCommand {
        let uniform = PointStyleUniform {
            color: paint.color.to_f32_array(),
            size: paint.size,
            _padding: [0.0; 3],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point style buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let style = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.style_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("point_style_bind_group"),
        });

        PointCommand { instances, style }
    }

    pub fn render<'a>(&'a self, command: &'a PointCommand, render_pass: &mut RenderPass<'a>) {
        if command.instances.count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.wgpu_pipeline);
        render_pass.set_bind_group(1, &command.style, &[]);
        render_pass.set_vertex_buffer(0, self.corner_buffer.slice(..));
        render_pass.set_vertex_buffer(1, command.instances.buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..INDICES.len() as u32, 0, 0..command.instances.count);
    }
}
