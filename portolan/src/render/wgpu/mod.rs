//! `wgpu` implementation of the [`Canvas`] abstraction.
//!
//! The canvas records draw commands while the layers run and encodes them
//! into a single render pass in [`WgpuCanvas::present`]. Tile textures and
//! point vertex buffers are cached GPU-side, keyed by the ids of the
//! [`DecodedImage`]s and [`PointSet`]s, so a repaint of an unchanged scene
//! uploads nothing but the view uniform.
//!
//! The canvas renders into a texture view provided by the host; surface and
//! device management stay outside of the engine. Badges are not rasterized:
//! the host takes them with [`WgpuCanvas::take_badges`] after the frame and
//! presents them with its own label machinery.

use std::sync::Arc;

use portolan_types::cartesian::{Rect, Size};
use quick_cache::sync::Cache;
use wgpu::{Device, Queue, TextureFormat, TextureView};

use crate::decoded_image::DecodedImage;
use crate::error::PortolanError;
use crate::render::{Badge, Canvas, Color, PointPaint, PointSet};
use crate::view::MapView;

mod pipelines;

use pipelines::image::ImageCommand;
use pipelines::point::{PointCommand, PointInstances};
use pipelines::{Pipelines, ViewUniform};

/// GPU-side stores are bounded; with the tile cache living in the tile
/// layer this only limits how many decoded images stay uploaded.
const TEXTURE_CACHE_SIZE: usize = 512;
const POINT_BUFFER_CACHE_SIZE: usize = 8;

enum DrawCommand {
    Image(ImageCommand),
    Points(PointCommand),
}

/// [`Canvas`] backend rendering with `wgpu`.
pub struct WgpuCanvas {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipelines: Pipelines,

    textures: Cache<u64, Arc<wgpu::BindGroup>>,
    point_buffers: Cache<u64, Arc<PointInstances>>,

    size: Size,
    background: Color,
    view_uniform: ViewUniform,
    commands: Vec<DrawCommand>,
    badges: Vec<Badge>,
}

impl WgpuCanvas {
    /// Creates a canvas rendering with the given device into textures of
    /// the given format.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, format: TextureFormat) -> Self {
        let pipelines = Pipelines::create(&device, format);
        Self {
            device,
            queue,
            pipelines,
            textures: Cache::new(TEXTURE_CACHE_SIZE),
            point_buffers: Cache::new(POINT_BUFFER_CACHE_SIZE),
            size: Size::default(),
            background: Color::rgba(244, 243, 240, 255),
            view_uniform: ViewUniform::default(),
            commands: vec![],
            badges: vec![],
        }
    }

    /// Sets the size of the target texture in physical pixels. Must be kept
    /// in sync with the texture passed to [`WgpuCanvas::present`].
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = Size::new(width as f64, height as f64);
    }

    /// Sets the color the frame is cleared with.
    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    /// Badges recorded during the last frame, for the host to present.
    pub fn take_badges(&mut self) -> Vec<Badge> {
        std::mem::take(&mut self.badges)
    }

    /// Encodes and submits everything recorded since
    /// [`Canvas::begin_frame`] into the given target.
    pub fn present(&mut self, target: &TextureView) {
        self.pipelines.write_view(&self.queue, &self.view_uniform);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Map render encoder"),
            });

        {
            let background = self.background.to_f32_array();
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Map render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background[0] as f64,
                            g: background[1] as f64,
                            b: background[2] as f64,
                            a: background[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.pipelines.set_bindings(&mut render_pass);
            for command in &self.commands {
                match command {
                    DrawCommand::Image(image) => {
                        self.pipelines.image.render(image, &mut render_pass)
                    }
                    DrawCommand::Points(points) => {
                        self.pipelines.point.render(points, &mut render_pass)
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.commands.clear();
    }
}

impl Canvas for WgpuCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn begin_frame(&mut self, view: &MapView) {
        self.view_uniform = ViewUniform {
            view_proj: view.unit_to_clip_mtx(),
            viewport: [self.size.width() as f32, self.size.height() as f32],
            _padding: [0.0, 0.0],
        };
        self.commands.clear();
        self.badges.clear();
    }

    fn draw_image(&mut self, image: &DecodedImage, source: Rect, dest: Rect, opacity: f32) {
        let texture = match self.textures.get(&image.id()) {
            Some(texture) => texture,
            None => {
                let texture = self
                    .pipelines
                    .image
                    .create_texture(&self.device, &self.queue, image);
                self.textures.insert(image.id(), texture.clone());
                texture
            }
        };

        let command = self.pipelines.image.create_command(
            &self.device,
            texture,
            image,
            source,
            dest,
            opacity,
        );
        self.commands.push(DrawCommand::Image(command));
    }

    fn draw_points(&mut self, set: &PointSet, paint: PointPaint) -> Result<(), PortolanError> {
        if set.is_empty() {
            return Ok(());
        }

        let instances = match self.point_buffers.get(&set.id()) {
            Some(instances) => instances,
            None => {
                let instances = self.pipelines.point.create_instances(&self.device, set);
                self.point_buffers.insert(set.id(), instances.clone());
                instances
            }
        };

        let command = self
            .pipelines
            .point
            .create_command(&self.device, instances, paint);
        self.commands.push(DrawCommand::Points(command));
        Ok(())
    }

    fn draw_badge(&mut self, badge: Badge) {
        self.badges.push(badge);
    }
}
