//! Headless still-frame export through the CPU backend.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbaImage};
use tracing::{info, warn};

use crate::backend::CpuBackend;
use crate::compositor::Compositor;
use crate::runtime::time_source_for_policy;
use crate::text::TextState;
use crate::types::{RendererConfig, ViewportSize};

/// How long an export waits for fonts when no timeout is configured.
pub const DEFAULT_FONT_WAIT: Duration = Duration::from_secs(10);

/// Renders one frame at the policy's timestamp.
///
/// Fonts get up to the configured timeout to arrive; if they do not, the
/// frame is rendered without text.
pub fn render_still(config: &RendererConfig) -> Result<RgbaImage> {
    let (width, height) = config.surface_size;
    let size = ViewportSize::new(width, height);
    if size.is_empty() {
        return Err(anyhow!("export size {size} has no area"));
    }

    let text = crate::build_text_layer(config)?;
    let mut compositor = Compositor::new(CpuBackend::new(), config.scene.clone(), text)
        .with_animation(config.amplitude, config.len);
    compositor.mount(size);

    let limit = config.fonts.timeout.unwrap_or(DEFAULT_FONT_WAIT);
    match compositor.wait_for_fonts(limit) {
        TextState::Ready => info!("fonts ready for export"),
        state => warn!(?state, "exporting without title text"),
    }

    let time = time_source_for_policy(&config.policy).sample().seconds;
    let frame = compositor
        .tick(time)
        .context("failed to render still frame")?
        .ok_or_else(|| anyhow!("compositor produced no frame for {size}"))?;
    compositor.unmount();
    Ok(frame.texture.to_rgba8())
}

/// Renders a still frame and writes it to `path` as PNG.
pub fn export_png(config: &RendererConfig, path: &Path) -> Result<()> {
    let image = render_still(config)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "still frame written"
    );
    Ok(())
}
