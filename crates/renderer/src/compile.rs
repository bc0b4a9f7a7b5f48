use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::effects::StageKind;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps an effect body with the shared prelude and compiles it as GLSL.
pub(crate) fn compile_stage_shader(device: &wgpu::Device, kind: StageKind) -> wgpu::ShaderModule {
    compile_fragment(device, kind.label(), kind.fragment_body())
}

/// Fragment shader that copies the final texture onto the swapchain.
pub(crate) fn compile_present_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    compile_fragment(device, "present", PRESENT_BODY)
}

fn compile_fragment(device: &wgpu::Device, label: &str, body: &str) -> wgpu::ShaderModule {
    let wrapped = wrap_fragment(body);
    tracing::debug!(stage = label, bytes = wrapped.len(), "compiling fragment stage");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Produces a self-contained GLSL fragment shader from an effect body.
///
/// The body declares its own uniform block at `set = 0`; [`HEADER`] supplies
/// the varyings, the child texture at `set = 1` and the shared helpers.
fn wrap_fragment(body: &str) -> String {
    format!("{HEADER}\n{body}")
}

/// GLSL prologue injected ahead of every effect body.
///
/// `v_uv` has its origin at the bottom-left. Textures are stored top row
/// first, so `sample_child` flips the vertical coordinate before sampling.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 1, binding = 0) uniform texture2D titlecard_child_texture;
layout(set = 1, binding = 1) uniform sampler titlecard_child_sampler;

vec4 sample_child(vec2 uv) {
    vec2 flipped = vec2(uv.x, 1.0 - uv.y);
    return texture(sampler2D(titlecard_child_texture, titlecard_child_sampler), flipped);
}

float titlecard_hash(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}
";

const PRESENT_BODY: &str = r"layout(std140, set = 0, binding = 0) uniform PresentParams {
    vec4 _unused;
} params;

void main() {
    outColor = vec4(sample_child(v_uv).rgb, 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
