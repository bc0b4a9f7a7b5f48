//! Margin mask, sinusoidal vertical distortion and grain.

use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::types::EffectSettings;

use super::{mix3, step};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BaseUniforms {
    pub color: [f32; 3],
    pub aspect: f32,
    pub amplitude: f32,
    pub margin: f32,
    pub grain: f32,
    pub _pad: f32,
}

impl BaseUniforms {
    pub fn new(color: Color, aspect: f32, amplitude: f32, settings: &EffectSettings) -> Self {
        Self {
            color: color.to_array(),
            aspect,
            amplitude,
            margin: settings.margin,
            grain: settings.grain,
            _pad: 0.0,
        }
    }
}

/// Vertical sampling offset at horizontal coordinate `x`.
///
/// Zero everywhere when `amplitude` is zero; `cos((x - 0.5) * 100) / 30` at
/// full amplitude.
pub fn displacement(amplitude: f32, x: f32) -> f32 {
    amplitude * (amplitude * (x - 0.5) * 100.0).cos() / 30.0
}

/// 1 on the border band of width `margin`, 0 inside the inset rectangle.
pub fn margin_mask(margin: f32, uv: [f32; 2]) -> f32 {
    let inside_x = step(margin, uv[0]) * step(margin, 1.0 - uv[0]);
    let inside_y = step(margin, uv[1]) * step(margin, 1.0 - uv[1]);
    1.0 - inside_x * inside_y
}

pub fn hash(p: [f32; 2]) -> f32 {
    let dot = p[0] * 12.9898 + p[1] * 78.233;
    super::fract(dot.sin() * 43758.5453)
}

/// Signed grain in `[-grain, grain]`, seeded by the aspect-corrected
/// position relative to the center.
pub fn grain_noise(aspect: f32, grain: f32, uv: [f32; 2]) -> f32 {
    let centered = [(uv[0] - 0.5) * aspect, uv[1] - 0.5];
    (hash(centered) * 2.0 - 1.0) * grain
}

pub(crate) fn shade<F>(uniforms: &BaseUniforms, uv: [f32; 2], sample: F) -> [f32; 4]
where
    F: Fn([f32; 2]) -> [f32; 4],
{
    let mask = margin_mask(uniforms.margin, uv);
    let dy = displacement(uniforms.amplitude, uv[0]);
    let child = sample([uv[0], uv[1] + dy]);
    let rgb = mix3([child[0], child[1], child[2]], uniforms.color, mask);
    let noise = grain_noise(uniforms.aspect, uniforms.grain, uv);
    [
        (rgb[0] + noise).clamp(0.0, 1.0),
        (rgb[1] + noise).clamp(0.0, 1.0),
        (rgb[2] + noise).clamp(0.0, 1.0),
        1.0,
    ]
}

pub(crate) const FRAGMENT_BODY: &str = r"layout(std140, set = 0, binding = 0) uniform BaseParams {
    vec3 color;
    float aspect;
    float amplitude;
    float margin;
    float grain;
    float _pad;
} params;

void main() {
    vec2 uv = v_uv;
    vec2 inside = step(vec2(params.margin), uv) * step(vec2(params.margin), 1.0 - uv);
    float margin_mask = 1.0 - inside.x * inside.y;

    float dy = params.amplitude * cos(params.amplitude * (uv.x - 0.5) * 100.0) / 30.0;
    vec4 child = sample_child(vec2(uv.x, uv.y + dy));
    vec3 rgb = mix(child.rgb, params.color, margin_mask);

    vec2 centered = (uv - 0.5) * vec2(params.aspect, 1.0);
    rgb += (titlecard_hash(centered) * 2.0 - 1.0) * params.grain;
    outColor = vec4(clamp(rgb, 0.0, 1.0), 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn uniforms(amplitude: f32, grain: f32) -> BaseUniforms {
        let settings = EffectSettings {
            grain,
            ..EffectSettings::default()
        };
        BaseUniforms::new(Color::from_rgb8(0x9c, 0xbf, 0xa1), 4.0 / 3.0, amplitude, &settings)
    }

    #[test]
    fn uniform_block_matches_std140_size() {
        assert_eq!(std::mem::size_of::<BaseUniforms>(), 32);
    }

    #[test]
    fn zero_amplitude_does_not_displace() {
        for step in 0..=100 {
            let x = step as f32 / 100.0;
            assert_eq!(displacement(0.0, x), 0.0);
        }

        let requested = Cell::new([0.0f32; 2]);
        let uv = [0.37, 0.61];
        shade(&uniforms(0.0, 0.0), uv, |at| {
            requested.set(at);
            [0.0, 0.0, 0.0, 1.0]
        });
        assert_eq!(requested.get(), uv);
    }

    #[test]
    fn full_amplitude_uses_cosine_wave() {
        for step in 0..=20 {
            let x = step as f32 / 20.0;
            let expected = ((x - 0.5) * 100.0).cos() / 30.0;
            assert!((displacement(1.0, x) - expected).abs() < 1e-6);
        }
        assert!((displacement(1.0, 0.5) - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn margin_mask_classifies_border() {
        let margin = 0.1;
        assert_eq!(margin_mask(margin, [0.5, 0.5]), 0.0);
        assert_eq!(margin_mask(margin, [0.1, 0.9]), 0.0);
        assert_eq!(margin_mask(margin, [0.05, 0.5]), 1.0);
        assert_eq!(margin_mask(margin, [0.5, 0.95]), 1.0);
        assert_eq!(margin_mask(margin, [0.99, 0.01]), 1.0);
    }

    #[test]
    fn border_shows_background_and_interior_shows_child() {
        let base = uniforms(0.0, 0.0);
        let child = |_: [f32; 2]| [0.2, 0.3, 0.4, 1.0];
        let border = shade(&base, [0.02, 0.5], child);
        let interior = shade(&base, [0.5, 0.5], child);
        for channel in 0..3 {
            assert!((border[channel] - base.color[channel]).abs() < 1e-6);
        }
        assert_eq!(interior, [0.2, 0.3, 0.4, 1.0]);
    }

    #[test]
    fn grain_is_bounded_and_depends_on_aspect() {
        let uv = [0.8, 0.3];
        for step in 0..50 {
            let p = [step as f32 / 50.0, 1.0 - step as f32 / 50.0];
            assert!(grain_noise(1.0, 0.06, p).abs() <= 0.06 + 1e-6);
        }
        assert_eq!(grain_noise(1.5, 0.06, uv), grain_noise(1.5, 0.06, uv));
        assert_ne!(grain_noise(1.0, 0.06, uv), grain_noise(2.0, 0.06, uv));
    }
}
