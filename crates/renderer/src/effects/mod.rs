//! Fragment stages applied on top of a child texture.
//!
//! Each stage exists twice: as a GLSL body compiled for the GPU backend and as
//! a per-pixel Rust function used by the CPU backend. Both read the same
//! `#[repr(C)]` uniform struct, whose bytes also serve as the cache key for
//! change detection.

pub mod base;
pub mod lines;

pub use base::BaseUniforms;
pub use lines::LinesUniforms;

/// Which shader a stage runs, independent of its uniform values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Base,
    Lines,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Base => "base",
            StageKind::Lines => "lines",
        }
    }

    pub(crate) fn fragment_body(&self) -> &'static str {
        match self {
            StageKind::Base => base::FRAGMENT_BODY,
            StageKind::Lines => lines::FRAGMENT_BODY,
        }
    }
}

/// A shader stage together with the uniforms for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectStage {
    Base(BaseUniforms),
    Lines(LinesUniforms),
}

impl EffectStage {
    pub fn kind(&self) -> StageKind {
        match self {
            EffectStage::Base(_) => StageKind::Base,
            EffectStage::Lines(_) => StageKind::Lines,
        }
    }

    /// Raw uniform bytes, laid out as the GLSL std140 block expects.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EffectStage::Base(uniforms) => bytemuck::bytes_of(uniforms),
            EffectStage::Lines(uniforms) => bytemuck::bytes_of(uniforms),
        }
    }

    /// True when both stages run the same shader with byte-identical uniforms.
    pub fn same_inputs(&self, other: &EffectStage) -> bool {
        self.kind() == other.kind() && self.as_bytes() == other.as_bytes()
    }

    /// Evaluates the stage for one fragment. `sample` reads the child texture
    /// at a UV coordinate with a bottom-left origin.
    pub fn shade<F>(&self, uv: [f32; 2], sample: F) -> [f32; 4]
    where
        F: Fn([f32; 2]) -> [f32; 4],
    {
        match self {
            EffectStage::Base(uniforms) => base::shade(uniforms, uv, sample),
            EffectStage::Lines(uniforms) => lines::shade(uniforms, uv, sample),
        }
    }
}

pub(crate) fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return step(edge1, x);
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub(crate) fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub(crate) fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
