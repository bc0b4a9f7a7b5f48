//! Striped gradient clipped to a centered span, with an optional circular
//! window onto the child.

use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::types::EffectSettings;

use super::{fract, mix3, smoothstep, step};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LinesUniforms {
    pub bg_color: [f32; 3],
    pub len: f32,
    pub aspect: f32,
    pub radius: f32,
    pub has_aperture: f32,
    pub stripes: f32,
    pub stripe_duty: f32,
    pub _pad: [f32; 3],
}

impl LinesUniforms {
    pub fn new(
        bg_color: Color,
        len: f32,
        aspect: f32,
        radius: Option<f32>,
        settings: &EffectSettings,
    ) -> Self {
        Self {
            bg_color: bg_color.to_array(),
            len,
            aspect,
            radius: radius.unwrap_or(0.0),
            has_aperture: if radius.is_some() { 1.0 } else { 0.0 },
            stripes: settings.stripes,
            stripe_duty: settings.stripe_duty,
            _pad: [0.0; 3],
        }
    }

    pub fn radius(&self) -> Option<f32> {
        (self.has_aperture > 0.0).then_some(self.radius)
    }
}

/// Gradient from white at the top to `bg` at the bottom, with stripes of
/// `bg` covering `duty` of each period.
pub fn stripe_pattern(bg: [f32; 3], stripes: f32, duty: f32, y: f32) -> [f32; 3] {
    let gradient = mix3([1.0, 1.0, 1.0], bg, 1.0 - y);
    let stripe = step(fract(y * stripes), duty);
    mix3(gradient, bg, stripe)
}

/// True inside the centered span `(1 - len, len)`. Empty for `len <= 0.5`.
pub fn within_span(len: f32, x: f32) -> bool {
    x > 1.0 - len && x < len
}

/// Blend weight of the aperture at `uv`; 1 well inside the circle.
pub fn aperture_mask(aspect: f32, radius: f32, has_aperture: f32, uv: [f32; 2]) -> f32 {
    let dx = (uv[0] - 0.5) * aspect;
    let dy = uv[1] - 0.5;
    let distance = (dx * dx + dy * dy).sqrt();
    has_aperture * (1.0 - smoothstep(0.999 * radius, radius, distance))
}

pub(crate) fn shade<F>(uniforms: &LinesUniforms, uv: [f32; 2], sample: F) -> [f32; 4]
where
    F: Fn([f32; 2]) -> [f32; 4],
{
    let child = sample(uv);
    let child_rgb = [child[0], child[1], child[2]];
    let bg = uniforms.bg_color;

    let pattern = stripe_pattern(bg, uniforms.stripes, uniforms.stripe_duty, uv[1]);
    let revealed = mix3(bg, child_rgb, child[3]);
    let clipped = if within_span(uniforms.len, uv[0]) {
        pattern
    } else {
        revealed
    };

    let aperture = aperture_mask(
        uniforms.aspect,
        uniforms.radius,
        uniforms.has_aperture,
        uv,
    );
    let rgb = mix3(clipped, child_rgb, aperture);
    [rgb[0], rgb[1], rgb[2], 1.0]
}

pub(crate) const FRAGMENT_BODY: &str = r"layout(std140, set = 0, binding = 0) uniform LinesParams {
    vec3 bg_color;
    float len;
    float aspect;
    float radius;
    float has_aperture;
    float stripes;
    float stripe_duty;
    float _pad0;
    float _pad1;
    float _pad2;
} params;

void main() {
    vec2 uv = v_uv;
    vec4 child = sample_child(uv);

    vec3 gradient = mix(vec3(1.0), params.bg_color, 1.0 - uv.y);
    float stripe = step(fract(uv.y * params.stripes), params.stripe_duty);
    vec3 pattern = mix(gradient, params.bg_color, stripe);

    vec3 revealed = mix(params.bg_color, child.rgb, child.a);
    float clip = (uv.x > 1.0 - params.len && uv.x < params.len) ? 1.0 : 0.0;
    vec3 clipped = mix(revealed, pattern, clip);

    float d = length((uv - 0.5) * vec2(params.aspect, 1.0));
    float aperture = params.has_aperture * (1.0 - smoothstep(0.999 * params.radius, params.radius, d));
    outColor = vec4(mix(clipped, child.rgb, aperture), 1.0);
}
";
