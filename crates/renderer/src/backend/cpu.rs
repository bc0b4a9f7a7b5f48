use std::fmt;
use std::sync::Arc;

use image::{Rgba, Rgba32FImage, RgbaImage};
use tracing::trace;

use crate::effects::EffectStage;
use crate::error::RenderError;
use crate::texture::{RenderTexture, TextureId};
use crate::types::ViewportSize;

use super::{Backend, RenderStats};

/// Immutable float texture shared between the node that produced it and any
/// node that reads it.
#[derive(Clone)]
pub struct CpuTexture {
    id: TextureId,
    image: Arc<Rgba32FImage>,
}

impl CpuTexture {
    fn new(image: Rgba32FImage) -> Self {
        Self {
            id: TextureId::next(),
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &Rgba32FImage {
        &self.image
    }

    /// Texel at column `x`, row `y` (row 0 is the top).
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Bilinear, clamp-to-edge sample at a UV with a bottom-left origin.
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return [0.0; 4];
        }
        let px = uv[0] * width as f32 - 0.5;
        let py = (1.0 - uv[1]) * height as f32 - 0.5;
        let x0f = px.floor();
        let y0f = py.floor();
        let fx = px - x0f;
        let fy = py - y0f;

        let clamp_x = |x: f32| (x.max(0.0) as u32).min(width - 1);
        let clamp_y = |y: f32| (y.max(0.0) as u32).min(height - 1);
        let (x0, x1) = (clamp_x(x0f), clamp_x(x0f + 1.0));
        let (y0, y1) = (clamp_y(y0f), clamp_y(y0f + 1.0));

        let a = self.pixel(x0, y0);
        let b = self.pixel(x1, y0);
        let c = self.pixel(x0, y1);
        let d = self.pixel(x1, y1);
        let mut out = [0.0; 4];
        for channel in 0..4 {
            let top = a[channel] + (b[channel] - a[channel]) * fx;
            let bottom = c[channel] + (d[channel] - c[channel]) * fx;
            out[channel] = top + (bottom - top) * fy;
        }
        out
    }

    /// Quantizes to 8-bit RGBA for export.
    pub fn to_rgba8(&self) -> RgbaImage {
        let (width, height) = self.image.dimensions();
        RgbaImage::from_fn(width, height, |x, y| {
            let texel = self.pixel(x, y);
            Rgba(texel.map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8))
        })
    }
}

impl RenderTexture for CpuTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn size(&self) -> ViewportSize {
        let (width, height) = self.image.dimensions();
        ViewportSize::new(width, height)
    }
}

impl fmt::Debug for CpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuTexture")
            .field("id", &self.id)
            .field("size", &self.size())
            .finish()
    }
}

/// Evaluates effect stages per pixel on the calling thread.
#[derive(Debug, Default)]
pub struct CpuBackend {
    stats: RenderStats,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for CpuBackend {
    type Texture = CpuTexture;

    fn upload(&mut self, raster: &RgbaImage) -> Result<CpuTexture, RenderError> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport(ViewportSize::new(width, height)));
        }
        let image = Rgba32FImage::from_fn(width, height, |x, y| {
            Rgba(raster.get_pixel(x, y).0.map(|value| value as f32 / 255.0))
        });
        self.stats.uploads += 1;
        let texture = CpuTexture::new(image);
        trace!(id = %texture.id(), width, height, "uploaded raster");
        Ok(texture)
    }

    fn apply(
        &mut self,
        stage: &EffectStage,
        child: &CpuTexture,
        size: ViewportSize,
    ) -> Result<CpuTexture, RenderError> {
        if size.is_empty() {
            return Err(RenderError::EmptyViewport(size));
        }
        let (width, height) = (size.width as f32, size.height as f32);
        let image = Rgba32FImage::from_fn(size.width, size.height, |x, y| {
            let uv = [(x as f32 + 0.5) / width, 1.0 - (y as f32 + 0.5) / height];
            Rgba(stage.shade(uv, |at| child.sample(at)))
        });
        self.stats.effect_passes += 1;
        let texture = CpuTexture::new(image);
        trace!(stage = stage.kind().label(), id = %texture.id(), "applied effect");
        Ok(texture)
    }

    fn copy(&mut self, source: &CpuTexture) -> Result<CpuTexture, RenderError> {
        self.stats.copies += 1;
        Ok(CpuTexture::new(source.image().clone()))
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }
}
