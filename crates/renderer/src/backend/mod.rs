//! Render targets the graph can draw into.
//!
//! The graph only needs three operations: upload a raster, run an effect
//! stage over a child texture, and snapshot a texture. `cpu` evaluates stages
//! per pixel in Rust (tests and still export); `crate::gpu` runs the same
//! stages as GLSL through `wgpu`.

pub mod cpu;

use image::RgbaImage;

use crate::effects::EffectStage;
use crate::error::RenderError;
use crate::texture::RenderTexture;
use crate::types::ViewportSize;

pub use cpu::{CpuBackend, CpuTexture};

/// Per-backend work counters, used to verify that cached subtrees are not
/// re-evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub uploads: u64,
    pub effect_passes: u64,
    pub copies: u64,
}

impl RenderStats {
    pub fn total(&self) -> u64 {
        self.uploads + self.effect_passes + self.copies
    }
}

pub trait Backend {
    type Texture: RenderTexture;

    /// Uploads a CPU raster (top row first) as a new texture.
    fn upload(&mut self, raster: &RgbaImage) -> Result<Self::Texture, RenderError>;

    /// Runs `stage` over `child`, producing a texture of `size`.
    fn apply(
        &mut self,
        stage: &EffectStage,
        child: &Self::Texture,
        size: ViewportSize,
    ) -> Result<Self::Texture, RenderError>;

    /// Produces an independent snapshot of `source`.
    fn copy(&mut self, source: &Self::Texture) -> Result<Self::Texture, RenderError>;

    fn stats(&self) -> RenderStats;
}
