//! The render tree: a chain of effect nodes over a cached text layer.
//!
//! Every node keeps its last output texture, the viewport it was rendered
//! for and a dirty flag. A node is re-evaluated when it is dirty, the viewport
//! changed, or anything below it needs rendering; otherwise it hands back the
//! same texture (same [`TextureId`]) without touching the backend.

use tracing::debug;

use crate::backend::Backend;
use crate::effects::{EffectStage, StageKind};
use crate::error::RenderError;
use crate::text::TextLayer;
use crate::texture::{RenderTexture, TextureId};
use crate::types::ViewportSize;

#[derive(Debug)]
pub enum NodeKind<T> {
    /// Leaf: uploads the text raster.
    Text(TextLayer),
    /// Snapshot of the child, re-copied only when the child changes.
    Cache { child: Box<RenderNode<T>> },
    /// Shader stage applied to the child's output.
    Effect {
        stage: EffectStage,
        child: Box<RenderNode<T>>,
    },
}

#[derive(Debug)]
pub struct RenderNode<T> {
    label: String,
    kind: NodeKind<T>,
    dirty: bool,
    output: Option<T>,
    rendered_size: Option<ViewportSize>,
    renders: u64,
}

impl<T: RenderTexture> RenderNode<T> {
    fn with_kind(label: impl Into<String>, kind: NodeKind<T>) -> Self {
        Self {
            label: label.into(),
            kind,
            dirty: true,
            output: None,
            rendered_size: None,
            renders: 0,
        }
    }

    pub fn text(label: impl Into<String>, layer: TextLayer) -> Self {
        Self::with_kind(label, NodeKind::Text(layer))
    }

    pub fn cache(label: impl Into<String>, child: RenderNode<T>) -> Self {
        Self::with_kind(
            label,
            NodeKind::Cache {
                child: Box::new(child),
            },
        )
    }

    pub fn effect(label: impl Into<String>, stage: EffectStage, child: RenderNode<T>) -> Self {
        Self::with_kind(
            label,
            NodeKind::Effect {
                stage,
                child: Box::new(child),
            },
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    /// Number of times this node has been re-evaluated.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn output(&self) -> Option<&T> {
        self.output.as_ref()
    }

    pub fn output_id(&self) -> Option<TextureId> {
        self.output.as_ref().map(RenderTexture::id)
    }

    pub fn child(&self) -> Option<&RenderNode<T>> {
        match &self.kind {
            NodeKind::Text(_) => None,
            NodeKind::Cache { child } | NodeKind::Effect { child, .. } => Some(child),
        }
    }

    fn child_mut(&mut self) -> Option<&mut RenderNode<T>> {
        match &mut self.kind {
            NodeKind::Text(_) => None,
            NodeKind::Cache { child } | NodeKind::Effect { child, .. } => Some(child),
        }
    }

    pub fn stage(&self) -> Option<&EffectStage> {
        match &self.kind {
            NodeKind::Effect { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Finds a node by label anywhere in this subtree.
    pub fn find(&self, label: &str) -> Option<&RenderNode<T>> {
        if self.label == label {
            return Some(self);
        }
        self.child().and_then(|child| child.find(label))
    }

    /// Whether rendering at `size` would do any backend work.
    pub fn needs_render(&self, size: ViewportSize) -> bool {
        if self.dirty || self.output.is_none() || self.rendered_size != Some(size) {
            return true;
        }
        match &self.kind {
            NodeKind::Text(layer) => layer.is_dirty(),
            NodeKind::Cache { child } | NodeKind::Effect { child, .. } => {
                child.needs_render(size)
            }
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Evaluates this subtree bottom-up, reusing every clean node's output.
    pub fn render<B>(&mut self, backend: &mut B, size: ViewportSize) -> Result<T, RenderError>
    where
        B: Backend<Texture = T>,
    {
        if !self.needs_render(size) {
            if let Some(output) = &self.output {
                return Ok(output.clone());
            }
        }
        if size.is_empty() {
            return Err(RenderError::EmptyViewport(size));
        }

        let output = match &mut self.kind {
            NodeKind::Text(layer) => {
                let raster = layer.rasterize(size)?;
                let texture = backend.upload(&raster)?;
                layer.mark_clean();
                texture
            }
            NodeKind::Cache { child } => {
                let source = child.render(backend, size)?;
                backend.copy(&source)?
            }
            NodeKind::Effect { stage, child } => {
                let input = child.render(backend, size)?;
                backend.apply(stage, &input, size)?
            }
        };

        self.renders += 1;
        self.dirty = false;
        self.rendered_size = Some(size);
        debug!(
            node = %self.label,
            texture = %output.id(),
            %size,
            renders = self.renders,
            "node re-rendered"
        );
        self.output = Some(output.clone());
        Ok(output)
    }

    /// Replaces the uniforms of the first effect running the same shader as
    /// `stage`. The node is marked dirty only when the uniform bytes differ.
    /// Returns true when a node changed.
    pub fn update_stage(&mut self, stage: EffectStage) -> bool {
        if let NodeKind::Effect { stage: current, .. } = &mut self.kind {
            if current.kind() == stage.kind() {
                if current.same_inputs(&stage) {
                    return false;
                }
                *current = stage;
                self.dirty = true;
                return true;
            }
        }
        self.child_mut()
            .map(|child| child.update_stage(stage))
            .unwrap_or(false)
    }

    pub fn stage_of(&self, kind: StageKind) -> Option<&EffectStage> {
        match self.stage() {
            Some(stage) if stage.kind() == kind => Some(stage),
            _ => self.child().and_then(|child| child.stage_of(kind)),
        }
    }

    pub fn text_layer(&self) -> Option<&TextLayer> {
        match &self.kind {
            NodeKind::Text(layer) => Some(layer),
            _ => self.child().and_then(RenderNode::text_layer),
        }
    }

    pub fn text_layer_mut(&mut self) -> Option<&mut TextLayer> {
        match &mut self.kind {
            NodeKind::Text(layer) => Some(layer),
            NodeKind::Cache { child } | NodeKind::Effect { child, .. } => child.text_layer_mut(),
        }
    }

    /// Drops every cached output in the subtree.
    pub fn release(&mut self) {
        self.output = None;
        self.rendered_size = None;
        self.dirty = true;
        if let Some(child) = self.child_mut() {
            child.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::color::Color;
    use crate::effects::{BaseUniforms, LinesUniforms};
    use crate::text::TextContent;
    use crate::types::{EffectSettings, TextSettings};

    fn tree() -> RenderNode<crate::backend::CpuTexture> {
        let settings = EffectSettings::default();
        let bg = Color::from_rgb8(0x9c, 0xbf, 0xa1);
        let layer = TextLayer::new(
            TextContent {
                text: TextSettings::default(),
                background: bg,
                text_color: Color::WHITE,
            },
            64.0,
            62.0,
        );
        RenderNode::effect(
            "base",
            EffectStage::Base(BaseUniforms::new(bg, 2.0, 0.0, &settings)),
            RenderNode::effect(
                "lines",
                EffectStage::Lines(LinesUniforms::new(bg, 1.0, 2.0, Some(0.315), &settings)),
                RenderNode::cache("cache", RenderNode::text("text", layer)),
            ),
        )
    }

    #[test]
    fn clean_tree_reuses_every_output() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        let size = ViewportSize::new(32, 16);
        let first = root.render(&mut backend, size).unwrap();
        let stats = backend.stats();
        assert_eq!(stats.uploads, 1);
        assert_eq!(stats.copies, 1);
        assert_eq!(stats.effect_passes, 2);

        let second = root.render(&mut backend, size).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(backend.stats(), stats);
        assert!(!root.needs_render(size));
    }

    #[test]
    fn uniform_change_skips_cached_subtree() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        let size = ViewportSize::new(32, 16);
        root.render(&mut backend, size).unwrap();
        let cache_id = root.find("cache").and_then(RenderNode::output_id);

        let settings = EffectSettings::default();
        let bg = Color::from_rgb8(0x9c, 0xbf, 0xa1);
        let changed = root.update_stage(EffectStage::Lines(LinesUniforms::new(
            bg,
            0.7,
            2.0,
            Some(0.315),
            &settings,
        )));
        assert!(changed);
        root.render(&mut backend, size).unwrap();

        let cache = root.find("cache").unwrap();
        assert_eq!(cache.renders(), 1);
        assert_eq!(cache.output_id(), cache_id);
        assert_eq!(root.find("text").unwrap().renders(), 1);
        assert_eq!(root.find("lines").unwrap().renders(), 2);
        assert_eq!(root.renders(), 2);
    }

    #[test]
    fn identical_uniforms_do_not_dirty() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        let size = ViewportSize::new(8, 8);
        root.render(&mut backend, size).unwrap();
        let same = *root.stage().unwrap();
        assert!(!root.update_stage(same));
        assert!(!root.needs_render(size));
    }

    #[test]
    fn resize_rerenders_everything() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        root.render(&mut backend, ViewportSize::new(8, 8)).unwrap();
        let out = root.render(&mut backend, ViewportSize::new(16, 8)).unwrap();
        assert_eq!(out.size(), ViewportSize::new(16, 8));
        assert_eq!(root.find("text").unwrap().renders(), 2);
        assert_eq!(backend.stats().uploads, 2);
    }

    #[test]
    fn dirty_text_recopies_cache() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        let size = ViewportSize::new(8, 8);
        root.render(&mut backend, size).unwrap();
        root.text_layer_mut().unwrap().mark_dirty();
        assert!(root.needs_render(size));
        root.render(&mut backend, size).unwrap();
        assert_eq!(root.find("cache").unwrap().renders(), 2);
        assert_eq!(backend.stats().copies, 2);
    }

    #[test]
    fn empty_viewport_is_rejected() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        assert!(root.render(&mut backend, ViewportSize::new(8, 0)).is_err());
        assert_eq!(backend.stats().total(), 0);
    }

    #[test]
    fn release_forces_full_render() {
        let mut backend = CpuBackend::new();
        let mut root = tree();
        let size = ViewportSize::new(8, 8);
        root.render(&mut backend, size).unwrap();
        root.release();
        assert!(root.output().is_none());
        root.render(&mut backend, size).unwrap();
        assert_eq!(backend.stats().uploads, 2);
    }
}
