//! Owns the viewport, the animated parameters and the render tree.
//!
//! ```text
//!   InputEvent ──▶ Compositor ──▶ BaseUniforms / LinesUniforms
//!                      │                 │
//!                      │                 ▼
//!                      └──────▶ base ─▶ lines ─▶ cache ─▶ text
//! ```
//!
//! The compositor rebuilds the typed uniforms from its state every frame and
//! hands them to the tree; nodes whose uniform bytes did not change keep
//! their cached output.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::anim::AnimationState;
use crate::backend::Backend;
use crate::effects::{BaseUniforms, EffectStage, LinesUniforms, StageKind};
use crate::error::RenderError;
use crate::graph::RenderNode;
use crate::text::{TextLayer, TextState};
use crate::types::{ResponsiveProfile, SceneSettings, ViewportSize};

pub const BASE_NODE: &str = "base";
pub const LINES_NODE: &str = "lines";
pub const CACHE_NODE: &str = "cache";
pub const TEXT_NODE: &str = "text";

/// Signals delivered by the host event loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Resize { width: u32, height: u32 },
    KeyDown,
    KeyUp,
    /// Absolute slider position for `len`.
    Slider(f32),
    /// Animation-loop timestamp in seconds.
    Tick(f32),
}

/// Output of one successful tick.
#[derive(Debug, Clone)]
pub struct Frame<T> {
    pub texture: T,
    pub size: ViewportSize,
    pub index: u64,
}

pub struct Compositor<B: Backend> {
    backend: B,
    root: RenderNode<B::Texture>,
    scene: SceneSettings,
    viewport: ViewportSize,
    animation: AnimationState,
    mounted: bool,
    frames: u64,
}

impl<B: Backend> Compositor<B> {
    /// Builds the base → lines → cache → text tree for `scene`.
    pub fn new(backend: B, scene: SceneSettings, text: TextLayer) -> Self {
        let animation = AnimationState::default();
        let viewport = ViewportSize::default();
        let profile = scene.responsive.profile(viewport.width);
        let (base, lines) = stages(&scene, &animation, profile, 1.0);
        let root = RenderNode::effect(
            BASE_NODE,
            EffectStage::Base(base),
            RenderNode::effect(
                LINES_NODE,
                EffectStage::Lines(lines),
                RenderNode::cache(CACHE_NODE, RenderNode::text(TEXT_NODE, text)),
            ),
        );
        Self {
            backend,
            root,
            scene,
            viewport,
            animation,
            mounted: false,
            frames: 0,
        }
    }

    /// Sets the starting amplitude and slider position.
    pub fn with_animation(mut self, amplitude: f32, len: f32) -> Self {
        self.animation = AnimationState::new(amplitude, len);
        self
    }

    /// Starts accepting events and adopts the initial viewport size.
    pub fn mount(&mut self, size: ViewportSize) {
        self.mounted = true;
        self.viewport = size;
        self.sync();
        info!(%size, wide = self.is_wide(), "compositor mounted");
    }

    /// Stops accepting events, drops cached textures and abandons any
    /// in-flight font load.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.root.release();
        if let Some(layer) = self.root.text_layer_mut() {
            layer.detach();
        }
        info!(frames = self.frames, "compositor unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Applies one input event. Returns false when the event was ignored
    /// because the compositor is not mounted.
    pub fn handle(&mut self, event: InputEvent) -> bool {
        if !self.mounted {
            debug!(?event, "ignoring event while unmounted");
            return false;
        }
        match event {
            InputEvent::Resize { width, height } => {
                self.viewport = ViewportSize::new(width, height);
                debug!(size = %self.viewport, "viewport resized");
            }
            InputEvent::KeyDown => {
                self.animation.set_amplitude(self.scene.active_amplitude);
            }
            InputEvent::KeyUp => self.animation.set_amplitude(0.0),
            InputEvent::Slider(len) => self.animation.set_len(len),
            InputEvent::Tick(time) => {
                self.animation.advance(time);
            }
        }
        self.sync();
        true
    }

    /// Advances time, polls the text layer's fonts and renders the tree.
    ///
    /// Returns `Ok(None)` when unmounted or when the viewport has no area.
    pub fn tick(&mut self, time: f32) -> Result<Option<Frame<B::Texture>>, RenderError> {
        if !self.handle(InputEvent::Tick(time)) {
            return Ok(None);
        }
        if let Some(layer) = self.root.text_layer_mut() {
            layer.poll(Instant::now());
        }
        self.render()
    }

    /// Renders the tree with the current state without advancing time.
    pub fn render(&mut self) -> Result<Option<Frame<B::Texture>>, RenderError> {
        if !self.mounted {
            return Ok(None);
        }
        if self.viewport.is_empty() {
            trace!(size = %self.viewport, "skipping frame for empty viewport");
            return Ok(None);
        }
        self.sync();
        let texture = self.root.render(&mut self.backend, self.viewport)?;
        let frame = Frame {
            texture,
            size: self.viewport,
            index: self.frames,
        };
        self.frames += 1;
        Ok(Some(frame))
    }

    /// Blocks for up to `limit` waiting for the text layer's fonts.
    pub fn wait_for_fonts(&mut self, limit: Duration) -> TextState {
        match self.root.text_layer_mut() {
            Some(layer) => layer.wait(limit),
            None => TextState::Failed,
        }
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn scene(&self) -> &SceneSettings {
        &self.scene
    }

    pub fn root(&self) -> &RenderNode<B::Texture> {
        &self.root
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn text_layer(&self) -> Option<&TextLayer> {
        self.root.text_layer()
    }

    pub fn is_wide(&self) -> bool {
        self.scene.responsive.is_wide(self.viewport.width)
    }

    pub fn profile(&self) -> ResponsiveProfile {
        self.scene.responsive.profile(self.viewport.width)
    }

    pub fn base_uniforms(&self) -> Option<BaseUniforms> {
        match self.root.stage_of(StageKind::Base) {
            Some(EffectStage::Base(uniforms)) => Some(*uniforms),
            _ => None,
        }
    }

    pub fn lines_uniforms(&self) -> Option<LinesUniforms> {
        match self.root.stage_of(StageKind::Lines) {
            Some(EffectStage::Lines(uniforms)) => Some(*uniforms),
            _ => None,
        }
    }

    /// Pushes the current state into the tree. Skipped while the viewport
    /// has no area so a zero height never reaches the uniforms.
    fn sync(&mut self) {
        let Some(aspect) = self.viewport.aspect() else {
            return;
        };
        let profile = self.profile();
        let (base, lines) = stages(&self.scene, &self.animation, profile, aspect);
        self.root.update_stage(EffectStage::Base(base));
        self.root.update_stage(EffectStage::Lines(lines));
        if let Some(layer) = self.root.text_layer_mut() {
            layer.set_font_sizes(profile.title_size, profile.subtitle_size);
        }
    }
}

fn stages(
    scene: &SceneSettings,
    animation: &AnimationState,
    profile: ResponsiveProfile,
    aspect: f32,
) -> (BaseUniforms, LinesUniforms) {
    let base = BaseUniforms::new(
        scene.background,
        aspect,
        animation.amplitude(),
        &scene.effects,
    );
    let radius = scene.effects.aperture.then_some(profile.radius);
    let lines = LinesUniforms::new(
        scene.background,
        animation.len(),
        aspect,
        radius,
        &scene.effects,
    );
    (base, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::text::TextContent;

    fn compositor() -> Compositor<CpuBackend> {
        let scene = SceneSettings::default();
        let layer = TextLayer::new(
            TextContent {
                text: scene.text.clone(),
                background: scene.background,
                text_color: scene.text_color,
            },
            28.0,
            30.0,
        );
        Compositor::new(CpuBackend::new(), scene, layer)
    }

    #[test]
    fn events_before_mount_are_ignored() {
        let mut compositor = compositor();
        assert!(!compositor.handle(InputEvent::KeyDown));
        assert_eq!(compositor.animation().amplitude(), 0.0);
        assert!(compositor.tick(1.0).unwrap().is_none());
    }

    #[test]
    fn key_edges_toggle_amplitude() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(64, 48));
        compositor.handle(InputEvent::KeyDown);
        assert_eq!(compositor.base_uniforms().unwrap().amplitude, 1.0);
        compositor.handle(InputEvent::KeyDown);
        compositor.handle(InputEvent::KeyUp);
        assert_eq!(compositor.base_uniforms().unwrap().amplitude, 0.0);
    }

    #[test]
    fn slider_is_clamped_before_reaching_uniforms() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(64, 48));
        compositor.handle(InputEvent::Slider(0.2));
        assert_eq!(compositor.lines_uniforms().unwrap().len, 0.45);
        compositor.handle(InputEvent::Slider(0.8));
        assert_eq!(compositor.lines_uniforms().unwrap().len, 0.8);
    }

    #[test]
    fn both_stages_share_one_aspect() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(300, 200));
        let base = compositor.base_uniforms().unwrap();
        let lines = compositor.lines_uniforms().unwrap();
        assert_eq!(base.aspect, 1.5);
        assert_eq!(base.aspect, lines.aspect);
        assert!(base.aspect.is_finite());
    }

    #[test]
    fn zero_height_skips_frames_and_keeps_uniforms_finite() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(640, 0));
        assert!(compositor.tick(0.5).unwrap().is_none());
        assert!(compositor.base_uniforms().unwrap().aspect.is_finite());
        assert_eq!(compositor.backend().stats().total(), 0);

        compositor.handle(InputEvent::Resize {
            width: 32,
            height: 16,
        });
        let frame = compositor.tick(0.6).unwrap().unwrap();
        assert_eq!(frame.size, ViewportSize::new(32, 16));
        assert_eq!(compositor.base_uniforms().unwrap().aspect, 2.0);
    }

    #[test]
    fn resize_across_breakpoint_switches_profile() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(1024, 768));
        assert_eq!(compositor.lines_uniforms().unwrap().radius, 0.315);
        assert_eq!(
            compositor.text_layer().unwrap().font_sizes(),
            (64.0, 62.0)
        );
        compositor.handle(InputEvent::Resize {
            width: 768,
            height: 768,
        });
        assert_eq!(compositor.lines_uniforms().unwrap().radius, 0.42);
        assert_eq!(
            compositor.text_layer().unwrap().font_sizes(),
            (28.0, 30.0)
        );
    }

    #[test]
    fn time_never_moves_backwards() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(8, 8));
        compositor.tick(2.0).unwrap();
        compositor.tick(1.0).unwrap();
        assert_eq!(compositor.animation().time(), 2.0);
    }

    #[test]
    fn unmount_stops_rendering() {
        let mut compositor = compositor();
        compositor.mount(ViewportSize::new(8, 8));
        assert!(compositor.tick(0.0).unwrap().is_some());
        compositor.unmount();
        assert!(!compositor.is_mounted());
        assert!(compositor.tick(1.0).unwrap().is_none());
        assert!(!compositor.handle(InputEvent::Resize {
            width: 4,
            height: 4
        }));
        assert_eq!(compositor.viewport(), ViewportSize::new(8, 8));
    }
}
