//! Renderer crate for the animated title card.
//!
//! A text layer is rasterised once, snapshotted by a cache node and pushed
//! through two fragment-shader stages every frame:
//!
//! ```text
//!   CLI / titlecard
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ Compositor ──▶ base ─▶ lines ─▶ cache ─▶ text
//!          │                │
//!          │                └─▶ Backend (GpuBackend in a window,
//!          │                             CpuBackend for still export)
//!          └─▶ winit event loop ──▶ InputEvent
//! ```
//!
//! `Compositor` owns the viewport and the animated parameters and rebuilds
//! typed uniforms from them each tick; the render graph only re-evaluates
//! nodes whose uniforms, size or children changed.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fontload::{FontJoin, FontLoader};
use tracing::info;

mod anim;
mod backend;
mod color;
mod compile;
mod compositor;
mod effects;
mod error;
mod export;
mod gpu;
mod graph;
mod runtime;
mod text;
mod texture;
mod types;
mod window;

pub use anim::{AnimationState, LEN_MAX, LEN_MIN};
pub use backend::{Backend, CpuBackend, CpuTexture, RenderStats};
pub use color::{parse_color, Color, ColorError};
pub use compositor::{
    Compositor, Frame, InputEvent, BASE_NODE, CACHE_NODE, LINES_NODE, TEXT_NODE,
};
pub use effects::{base, lines, BaseUniforms, EffectStage, LinesUniforms, StageKind};
pub use error::RenderError;
pub use export::{export_png, render_still, DEFAULT_FONT_WAIT};
pub use gpu::{GpuBackend, GpuTexture};
pub use graph::{NodeKind, RenderNode};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FrameScheduler, RenderPolicy,
    SystemTimeSource, TimeSample, TimeSource,
};
pub use text::{TextContent, TextDraw, TextLayer, TextState, SUBTITLE_OFFSET};
pub use texture::{RenderTexture, TextureId};
pub use types::{
    EffectSettings, FontPlan, RenderMode, RendererConfig, Responsive, ResponsiveProfile,
    SceneSettings, TextSettings, ViewportSize,
};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the interactive window or writes a still frame, depending on
    /// the configured mode.
    pub fn run(&mut self) -> Result<()> {
        match (&self.config.mode, &self.config.policy) {
            (RenderMode::Windowed, _) => window::run(&self.config),
            (RenderMode::Export, RenderPolicy::Export { path, .. }) => {
                export::export_png(&self.config, path)
            }
            (RenderMode::Export, RenderPolicy::Animate { .. }) => {
                bail!("export mode requires an export render policy")
            }
        }
    }
}

/// Builds the text layer and starts loading its fonts in the background.
pub(crate) fn build_text_layer(config: &RendererConfig) -> Result<TextLayer> {
    let plan = &config.fonts;
    let loader = FontLoader::new(plan.cache_dir.clone(), plan.cache_only)
        .context("failed to prepare font cache")?;
    let join = FontJoin::spawn(plan.descriptors(), Arc::new(loader), plan.timeout);
    let profile = config.scene.responsive.profile(config.surface_size.0);
    let scene = &config.scene;
    let content = TextContent {
        text: scene.text.clone(),
        background: scene.background,
        text_color: scene.text_color,
    };
    Ok(
        TextLayer::new(content, profile.title_size, profile.subtitle_size)
            .with_fonts(join)
            .on_ready(|| info!("title text revealed")),
    )
}
