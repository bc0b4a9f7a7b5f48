use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use wgpu::util::{BufferInitDescriptor, DeviceExt, TextureDataOrder};

use crate::backend::{Backend, RenderStats};
use crate::effects::{EffectStage, StageKind};
use crate::error::RenderError;
use crate::texture::{RenderTexture, TextureId};
use crate::types::ViewportSize;

use super::pipeline::{PipelineLayouts, StagePipeline};

/// Intermediate targets are plain 8-bit RGBA; every pass samples one and
/// renders into a fresh one.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Clone)]
pub struct GpuTexture {
    id: TextureId,
    size: ViewportSize,
    inner: Arc<TextureSlot>,
}

struct TextureSlot {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTexture for GpuTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn size(&self) -> ViewportSize {
        self.size
    }
}

impl fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTexture")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: PipelineLayouts,
    base: StagePipeline,
    lines: StagePipeline,
    present: StagePipeline,
    present_uniforms: wgpu::Buffer,
    stats: RenderStats,
}

impl GpuBackend {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let layouts = PipelineLayouts::new(device);
        let base = StagePipeline::for_stage(device, &layouts, StageKind::Base, TARGET_FORMAT);
        let lines = StagePipeline::for_stage(device, &layouts, StageKind::Lines, TARGET_FORMAT);
        let present = StagePipeline::present(device, &layouts, surface_format);
        let present_uniforms = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("present uniforms"),
            contents: &[0u8; 16],
            usage: wgpu::BufferUsages::UNIFORM,
        });
        tracing::debug!(?surface_format, "GPU effect pipelines ready");
        Self {
            device: device.clone(),
            queue: queue.clone(),
            layouts,
            base,
            lines,
            present,
            present_uniforms,
            stats: RenderStats::default(),
        }
    }

    fn create_target(&self, size: ViewportSize, label: &str) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    fn wrap(&self, texture: wgpu::Texture, size: ViewportSize) -> GpuTexture {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture {
            id: TextureId::next(),
            size,
            inner: Arc::new(TextureSlot { texture, view }),
        }
    }

    fn pipeline_for(&self, kind: StageKind) -> &wgpu::RenderPipeline {
        match kind {
            StageKind::Base => &self.base.pipeline,
            StageKind::Lines => &self.lines.pipeline,
        }
    }

    fn draw_pass(
        &self,
        pipeline: &wgpu::RenderPipeline,
        uniforms: &wgpu::BindGroup,
        child: &GpuTexture,
        target: &wgpu::TextureView,
        label: &str,
    ) {
        let child_group = self
            .layouts
            .texture_bind_group(&self.device, &child.inner.view);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, uniforms, &[]);
            pass.set_bind_group(1, &child_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    /// Draws `texture` onto a swapchain view.
    pub(crate) fn present(&self, texture: &GpuTexture, target: &wgpu::TextureView) {
        let uniforms = self
            .layouts
            .uniform_bind_group(&self.device, &self.present_uniforms);
        self.draw_pass(&self.present.pipeline, &uniforms, texture, target, "present");
    }
}

impl Backend for GpuBackend {
    type Texture = GpuTexture;

    fn upload(&mut self, raster: &RgbaImage) -> Result<GpuTexture, RenderError> {
        let (width, height) = raster.dimensions();
        let size = ViewportSize::new(width, height);
        if size.is_empty() {
            return Err(RenderError::EmptyViewport(size));
        }
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some("text raster"),
                size: extent(size),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            raster.as_raw(),
        );
        self.stats.uploads += 1;
        Ok(self.wrap(texture, size))
    }

    fn apply(
        &mut self,
        stage: &EffectStage,
        child: &GpuTexture,
        size: ViewportSize,
    ) -> Result<GpuTexture, RenderError> {
        if size.is_empty() {
            return Err(RenderError::EmptyViewport(size));
        }
        let kind = stage.kind();
        let buffer = self.device.create_buffer_init(&BufferInitDescriptor {
            label: Some(kind.label()),
            contents: stage.as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniforms = self.layouts.uniform_bind_group(&self.device, &buffer);
        let target = self.wrap(self.create_target(size, kind.label()), size);
        self.draw_pass(
            self.pipeline_for(kind),
            &uniforms,
            child,
            &target.inner.view,
            kind.label(),
        );
        self.stats.effect_passes += 1;
        tracing::trace!(stage = kind.label(), id = %target.id, "applied effect");
        Ok(target)
    }

    fn copy(&mut self, source: &GpuTexture) -> Result<GpuTexture, RenderError> {
        let texture = self.create_target(source.size, "cache snapshot");
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cache snapshot"),
            });
        encoder.copy_texture_to_texture(
            source.inner.texture.as_image_copy(),
            texture.as_image_copy(),
            extent(source.size),
        );
        self.queue.submit(Some(encoder.finish()));
        self.stats.copies += 1;
        Ok(self.wrap(texture, source.size))
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }
}

fn extent(size: ViewportSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}
