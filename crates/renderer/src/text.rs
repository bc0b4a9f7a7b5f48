//! Raster text layer: a background fill plus a centered title and subtitle.
//!
//! The layer starts in [`TextState::Loading`] and draws only the background
//! until its font join resolves. On the first successful poll it registers
//! the fonts, marks itself dirty and runs the ready callback. A failed or
//! timed out join moves it to [`TextState::Failed`], which keeps rendering
//! the background.

use std::fmt;
use std::time::{Duration, Instant};

use fontload::{registry, FontJoin, JoinStatus};
use image::{Rgba, RgbaImage};
use swash::scale::{Render, ScaleContext, Source};
use swash::shape::ShapeContext;
use swash::zeno::Format;
use swash::FontRef;
use tracing::{debug, info, warn};

use crate::color::Color;
use crate::error::RenderError;
use crate::types::{TextSettings, ViewportSize};

/// Subtitle baseline sits this fraction of the title size below the title.
pub const SUBTITLE_OFFSET: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextState {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub text: TextSettings,
    pub background: Color,
    pub text_color: Color,
}

/// One line of text as laid out for a given viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub text: String,
    pub family: String,
    pub font_size: f32,
    /// Horizontal center of the line.
    pub x: f32,
    /// Baseline, measured from the top edge.
    pub baseline: f32,
}

type ReadyCallback = Box<dyn FnOnce()>;

pub struct TextLayer {
    content: TextContent,
    title_size: f32,
    subtitle_size: f32,
    state: TextState,
    fonts: Option<FontJoin>,
    on_ready: Option<ReadyCallback>,
    dirty: bool,
    shape_context: ShapeContext,
    scale_context: ScaleContext,
}

impl TextLayer {
    pub fn new(content: TextContent, title_size: f32, subtitle_size: f32) -> Self {
        Self {
            content,
            title_size,
            subtitle_size,
            state: TextState::Loading,
            fonts: None,
            on_ready: None,
            dirty: true,
            shape_context: ShapeContext::new(),
            scale_context: ScaleContext::new(),
        }
    }

    /// Attaches the join whose resolution gates the text.
    pub fn with_fonts(mut self, fonts: FontJoin) -> Self {
        self.fonts = Some(fonts);
        self
    }

    /// Callback run once, on the transition to [`TextState::Ready`].
    pub fn on_ready(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> TextState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == TextState::Ready
    }

    pub fn content(&self) -> &TextContent {
        &self.content
    }

    pub fn font_sizes(&self) -> (f32, f32) {
        (self.title_size, self.subtitle_size)
    }

    /// Checks the font join without blocking. Returns true when the state
    /// changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.state != TextState::Loading {
            return false;
        }
        let Some(fonts) = self.fonts.as_mut() else {
            return false;
        };
        let status = fonts.poll(now);
        self.resolve(status)
    }

    /// Blocks for up to `limit` waiting on the font join.
    pub fn wait(&mut self, limit: Duration) -> TextState {
        if self.state == TextState::Loading {
            if let Some(fonts) = self.fonts.as_mut() {
                let status = fonts.wait(limit);
                self.resolve(status);
            }
        }
        self.state
    }

    /// Abandons a pending font join. A loading layer moves to
    /// [`TextState::Failed`] and its ready callback is dropped unrun.
    pub fn detach(&mut self) {
        if self.fonts.take().is_some() {
            debug!("font join abandoned");
        }
        self.on_ready = None;
        if self.state == TextState::Loading {
            self.state = TextState::Failed;
        }
    }

    fn resolve(&mut self, status: JoinStatus) -> bool {
        match status {
            JoinStatus::Pending => false,
            JoinStatus::Ready(fonts) => {
                for font in &fonts {
                    if registry().register(font) {
                        debug!(family = font.family(), "font available to text layer");
                    }
                }
                self.fonts = None;
                self.state = TextState::Ready;
                self.dirty = true;
                info!(count = fonts.len(), "fonts ready; drawing title text");
                if let Some(callback) = self.on_ready.take() {
                    callback();
                }
                true
            }
            JoinStatus::Failed(err) => {
                warn!(error = %err, "font loading failed; title text stays hidden");
                self.fonts = None;
                self.on_ready = None;
                self.state = TextState::Failed;
                true
            }
        }
    }

    /// Updates the responsive font sizes. Only a ready layer is redrawn.
    pub fn set_font_sizes(&mut self, title_size: f32, subtitle_size: f32) {
        if self.title_size == title_size && self.subtitle_size == subtitle_size {
            return;
        }
        self.title_size = title_size;
        self.subtitle_size = subtitle_size;
        if self.is_ready() {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Lines to draw for `size`; empty until the fonts are ready.
    pub fn draw_list(&self, size: ViewportSize) -> Vec<TextDraw> {
        if !self.is_ready() {
            return Vec::new();
        }
        let center_x = size.width as f32 / 2.0;
        let title_baseline = size.height as f32 / 2.0;
        let text = &self.content.text;
        let lines = [
            (&text.title, &text.title_family, self.title_size, title_baseline),
            (
                &text.subtitle,
                &text.subtitle_family,
                self.subtitle_size,
                title_baseline + SUBTITLE_OFFSET * self.title_size,
            ),
        ];
        lines
            .into_iter()
            .filter(|(line, ..)| !line.is_empty())
            .map(|(line, family, font_size, baseline)| TextDraw {
                text: line.clone(),
                family: family.clone(),
                font_size,
                x: center_x,
                baseline,
            })
            .collect()
    }

    /// Draws the background and any text into a fresh raster.
    pub fn rasterize(&mut self, size: ViewportSize) -> Result<RgbaImage, RenderError> {
        if size.is_empty() {
            return Err(RenderError::EmptyViewport(size));
        }
        let fill = Rgba(self.content.background.to_rgba8());
        let mut image = RgbaImage::from_pixel(size.width, size.height, fill);
        let color = self.content.text_color;
        for draw in self.draw_list(size) {
            draw_line(
                &mut self.shape_context,
                &mut self.scale_context,
                &mut image,
                &draw,
                color,
            );
        }
        Ok(image)
    }
}

impl fmt::Debug for TextLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLayer")
            .field("state", &self.state)
            .field("title_size", &self.title_size)
            .field("subtitle_size", &self.subtitle_size)
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// A positioned glyph from the shaper, in pixels relative to the pen.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShapedGlyph {
    id: u16,
    x: f32,
    y: f32,
    advance: f32,
}

/// Shapes `text` at `font_size`; kerning, ligatures and contextual forms are
/// applied by the font's layout tables.
fn shape_line(
    context: &mut ShapeContext,
    face: FontRef<'_>,
    text: &str,
    font_size: f32,
) -> Vec<ShapedGlyph> {
    let mut shaper = context.builder(face).size(font_size).build();
    shaper.add_str(text);
    let mut glyphs = Vec::with_capacity(text.len());
    shaper.shape_with(|cluster| {
        glyphs.extend(cluster.glyphs.iter().map(|glyph| ShapedGlyph {
            id: glyph.id,
            x: glyph.x,
            y: glyph.y,
            advance: glyph.advance,
        }));
    });
    glyphs
}

fn draw_line(
    shape_context: &mut ShapeContext,
    scale_context: &mut ScaleContext,
    image: &mut RgbaImage,
    draw: &TextDraw,
    color: Color,
) {
    let Some(font) = registry().get(&draw.family) else {
        warn!(family = %draw.family, "font family is not registered; skipping line");
        return;
    };
    let Some(face) = FontRef::from_index(font.data(), 0) else {
        warn!(family = %draw.family, "registered font data is unreadable; skipping line");
        return;
    };

    let glyphs = shape_line(shape_context, face, &draw.text, draw.font_size);
    let line_width: f32 = glyphs.iter().map(|glyph| glyph.advance).sum();

    let mut scaler = scale_context.builder(face).size(draw.font_size).build();
    let mut render = Render::new(&[Source::Outline]);
    render.format(Format::Alpha);

    let mut pen_x = draw.x - line_width / 2.0;
    for glyph in glyphs {
        if let Some(mask) = render.render(&mut scaler, glyph.id) {
            let left = (pen_x + glyph.x).round() as i32 + mask.placement.left;
            let top = (draw.baseline - glyph.y).round() as i32 - mask.placement.top;
            blend_coverage(
                image,
                (left, top),
                (mask.placement.width, mask.placement.height),
                &mask.data,
                color,
            );
        }
        pen_x += glyph.advance;
    }
}

/// Blends an 8-bit coverage mask in `color` over `image` at `origin`.
fn blend_coverage(
    image: &mut RgbaImage,
    origin: (i32, i32),
    extent: (u32, u32),
    coverage: &[u8],
    color: Color,
) {
    let ink = color.to_rgba8();
    let (width, height) = image.dimensions();
    for row in 0..extent.1 {
        let y = origin.1 + row as i32;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for column in 0..extent.0 {
            let x = origin.0 + column as i32;
            if x < 0 || x >= width as i32 {
                continue;
            }
            let index = (row * extent.0 + column) as usize;
            let Some(&alpha) = coverage.get(index) else {
                continue;
            };
            if alpha == 0 {
                continue;
            }
            let a = alpha as f32 / 255.0;
            let pixel = image.get_pixel_mut(x as u32, y as u32);
            for channel in 0..3 {
                let dst = pixel.0[channel] as f32;
                let src = ink[channel] as f32;
                pixel.0[channel] = (dst + (src - dst) * a).round() as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontload::LoadedFont;
    use std::cell::Cell;
    use std::rc::Rc;

    fn content() -> TextContent {
        TextContent {
            text: TextSettings {
                title: "LINES".into(),
                subtitle: "and a little grain".into(),
                title_family: "text-test-title".into(),
                subtitle_family: "text-test-subtitle".into(),
            },
            background: Color::from_rgb8(0x9c, 0xbf, 0xa1),
            text_color: Color::from_rgb8(0xe9, 0xe9, 0xe9),
        }
    }

    fn ready_join() -> FontJoin {
        FontJoin::resolved(vec![
            LoadedFont::new("text-test-title", vec![1]),
            LoadedFont::new("text-test-subtitle", vec![2]),
        ])
    }

    const CANTARELL: &[u8] = include_bytes!("../tests/fonts/Cantarell-Regular.ttf");

    fn cantarell_content(prefix: &str) -> TextContent {
        let mut content = content();
        content.text.title_family = format!("{prefix}-title");
        content.text.subtitle_family = format!("{prefix}-subtitle");
        content
    }

    fn cantarell_join(prefix: &str) -> FontJoin {
        FontJoin::resolved(vec![
            LoadedFont::new(format!("{prefix}-title"), CANTARELL.to_vec()),
            LoadedFont::new(format!("{prefix}-subtitle"), CANTARELL.to_vec()),
        ])
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of non-background pixels.
    fn ink_bounds(raster: &RgbaImage, background: [u8; 4]) -> Option<(u32, u32, u32, u32)> {
        raster
            .enumerate_pixels()
            .filter(|(_, _, pixel)| pixel.0 != background)
            .fold(None, |bounds, (x, y, _)| match bounds {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }

    #[test]
    fn loading_layer_draws_nothing_but_background() {
        let mut layer = TextLayer::new(content(), 28.0, 30.0);
        let size = ViewportSize::new(60, 80);
        assert_eq!(layer.state(), TextState::Loading);
        assert!(layer.draw_list(size).is_empty());
        let raster = layer.rasterize(size).unwrap();
        assert_eq!(raster.dimensions(), (60, 80));
        assert!(raster.pixels().all(|p| p.0 == [0x9c, 0xbf, 0xa1, 255]));
    }

    #[test]
    fn ready_fires_callback_exactly_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut layer = TextLayer::new(content(), 64.0, 62.0)
            .with_fonts(ready_join())
            .on_ready(move || counter.set(counter.get() + 1));
        layer.mark_clean();

        assert!(layer.poll(Instant::now()));
        assert!(layer.is_ready());
        assert!(layer.is_dirty());
        assert!(!layer.poll(Instant::now()));
        assert_eq!(calls.get(), 1);
        assert!(registry().contains("text-test-title"));
    }

    #[test]
    fn layout_centers_lines_with_subtitle_offset() {
        let mut layer = TextLayer::new(content(), 64.0, 62.0).with_fonts(ready_join());
        layer.poll(Instant::now());
        let draws = layer.draw_list(ViewportSize::new(1024, 768));
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].text, "LINES");
        assert_eq!(draws[0].x, 512.0);
        assert_eq!(draws[0].baseline, 384.0);
        assert_eq!(draws[0].font_size, 64.0);
        assert_eq!(draws[1].family, "text-test-subtitle");
        assert!((draws[1].baseline - (384.0 + 0.9 * 64.0)).abs() < 1e-4);
    }

    #[test]
    fn unreadable_fonts_leave_background_only() {
        let mut layer = TextLayer::new(content(), 28.0, 30.0).with_fonts(ready_join());
        layer.poll(Instant::now());
        let raster = layer.rasterize(ViewportSize::new(40, 40)).unwrap();
        assert!(raster.pixels().all(|p| p.0 == [0x9c, 0xbf, 0xa1, 255]));
    }

    #[test]
    fn ready_layer_inks_text_centered_on_the_viewport() {
        let mut layer = TextLayer::new(cantarell_content("text-test-cantarell"), 64.0, 62.0)
            .with_fonts(cantarell_join("text-test-cantarell"));
        assert!(layer.poll(Instant::now()));

        let raster = layer.rasterize(ViewportSize::new(1024, 768)).unwrap();
        let (min_x, min_y, max_x, max_y) =
            ink_bounds(&raster, [0x9c, 0xbf, 0xa1, 255]).expect("text should be drawn");
        let center = (min_x + max_x) as f32 / 2.0;
        assert!((center - 512.0).abs() <= 8.0, "ink centered at {center}");
        // Title glyphs rise above the title baseline; the subtitle sits below it.
        assert!(min_y < 384 && max_y > 384, "ink rows {min_y}..={max_y}");
        assert!(max_x - min_x < 1024);
    }

    #[test]
    fn shaped_line_width_tracks_font_size() {
        let face = FontRef::from_index(CANTARELL, 0).unwrap();
        let mut context = ShapeContext::new();
        let small = shape_line(&mut context, face, "LINES", 32.0);
        let large = shape_line(&mut context, face, "LINES", 64.0);
        assert_eq!(small.len(), 5);
        assert!(small.iter().all(|glyph| glyph.id != 0 && glyph.advance > 0.0));

        let width = |glyphs: &[ShapedGlyph]| glyphs.iter().map(|g| g.advance).sum::<f32>();
        assert!((width(&large[..]) - 2.0 * width(&small[..])).abs() < 1.0);
        assert!(shape_line(&mut context, face, "", 32.0).is_empty());
    }

    #[test]
    fn font_size_change_redraws_only_when_ready() {
        let mut layer = TextLayer::new(content(), 28.0, 30.0);
        layer.mark_clean();
        layer.set_font_sizes(64.0, 62.0);
        assert!(!layer.is_dirty());
        assert_eq!(layer.font_sizes(), (64.0, 62.0));
    }

    #[test]
    fn coverage_blends_toward_ink() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        blend_coverage(
            &mut image,
            (1, 1),
            (2, 1),
            &[255, 0],
            Color::WHITE,
        );
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(2, 1).0, [0, 0, 0, 255]);
        blend_coverage(&mut image, (-5, -5), (2, 2), &[255; 4], Color::WHITE);
    }

    #[test]
    fn detach_drops_pending_callback() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut layer = TextLayer::new(content(), 28.0, 30.0)
            .with_fonts(ready_join())
            .on_ready(move || counter.set(counter.get() + 1));
        layer.detach();
        assert!(!layer.poll(Instant::now()));
        assert_eq!(layer.state(), TextState::Failed);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn empty_viewport_is_an_error() {
        let mut layer = TextLayer::new(content(), 28.0, 30.0);
        assert!(matches!(
            layer.rasterize(ViewportSize::new(10, 0)),
            Err(RenderError::EmptyViewport(_))
        ));
    }
}
