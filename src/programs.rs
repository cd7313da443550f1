//! Built-in transition blend programs and the shader parameter contract.
//!
//! Every blend program sees the same bind group:
//!
//! | binding | name                   | contents                                   |
//! |---------|------------------------|--------------------------------------------|
//! | 0       | `u`                    | `resolution: vec2f`, `transition_progress` |
//! | 1       | `origin_cam_tex`       | image of the outgoing (source) camera      |
//! | 2       | `scene_tex`            | image of the incoming (destination) camera |
//! | 3       | `transition_mask_tex`  | mask texture, white when unbound           |
//! | 4       | `tex_sampler`          | linear clamp sampler                       |
//!
//! Custom programs registered with [`WgpuBackend::register_program`] supply only the
//! fragment entry point `fs`; [`BLEND_PRELUDE`] is prepended for them.
//!
//! [`WgpuBackend::register_program`]: crate::WgpuBackend::register_program

/// Shader parameter carrying the outgoing camera's image.
pub const ORIGIN_CAM_TEXTURE: &str = "origin_cam_tex";
/// Shader parameter carrying the blend progress in `[0, 1]`.
pub const TRANSITION_PROGRESS: &str = "transition_progress";
/// Shader parameter carrying the mask. Only used by the mask program.
pub const TRANSITION_MASK_TEXTURE: &str = "transition_mask_tex";

pub const ALPHA_FADE: &str = "camswap/alpha_fade";
pub const DIAMOND: &str = "camswap/diamond";
pub const VERTICAL_LINES: &str = "camswap/vertical_lines";
pub const FADE_MASK: &str = "camswap/fade_mask";

/// Name and fragment source of every built-in program.
pub const BUILTIN_PROGRAMS: [(&str, &str); 4] = [
    (ALPHA_FADE, ALPHA_FADE_SHADER),
    (DIAMOND, DIAMOND_SHADER),
    (VERTICAL_LINES, VERTICAL_LINES_SHADER),
    (FADE_MASK, FADE_MASK_SHADER),
];

/// Bindings and fullscreen vertex stage shared by all blend programs.
pub const BLEND_PRELUDE: &str = r#"
struct Uniforms {
    resolution: vec2f,
    transition_progress: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var origin_cam_tex: texture_2d<f32>;
@group(0) @binding(2) var scene_tex: texture_2d<f32>;
@group(0) @binding(3) var transition_mask_tex: texture_2d<f32>;
@group(0) @binding(4) var tex_sampler: sampler;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
    // Fullscreen triangle
    let corner = vec2f(f32((vi << 1u) & 2u), f32(vi & 2u));
    return vec4f(corner * 2.0 - 1.0, 0.0, 1.0);
}
"#;

/// Assemble a complete WGSL module from a fragment-stage body.
pub fn program_source(fragment: &str) -> String {
    format!("{BLEND_PRELUDE}\n{fragment}")
}

/// Plain crossfade from the origin image to the scene.
const ALPHA_FADE_SHADER: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let origin = textureSample(origin_cam_tex, tex_sampler, uv);
    let scene = textureSample(scene_tex, tex_sampler, uv);
    return mix(origin, scene, u.transition_progress);
}
"#;

/// Diamond opening from the screen center.
const DIAMOND_SHADER: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let origin = textureSample(origin_cam_tex, tex_sampler, uv);
    let scene = textureSample(scene_tex, tex_sampler, uv);

    let d = abs(uv.x - 0.5) + abs(uv.y - 0.5);
    let reveal = step(d, u.transition_progress);
    return mix(origin, scene, reveal);
}
"#;

/// Vertical stripes that fill in, alternating direction per stripe.
const VERTICAL_LINES_SHADER: &str = r#"
const LINE_COUNT: f32 = 12.0;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let origin = textureSample(origin_cam_tex, tex_sampler, uv);
    let scene = textureSample(scene_tex, tex_sampler, uv);

    let stripe = floor(uv.x * LINE_COUNT);
    let flip = f32(i32(stripe) % 2);
    let along = mix(uv.y, 1.0 - uv.y, flip);
    let reveal = step(along, u.transition_progress);
    return mix(origin, scene, reveal);
}
"#;

/// Mask driven blend: dark mask texels switch first, bright ones last.
const FADE_MASK_SHADER: &str = r#"
const EDGE: f32 = 0.05;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let origin = textureSample(origin_cam_tex, tex_sampler, uv);
    let scene = textureSample(scene_tex, tex_sampler, uv);
    let mask = textureSample(transition_mask_tex, tex_sampler, uv).r;

    let threshold = u.transition_progress * (1.0 + EDGE);
    let reveal = smoothstep(mask, mask + EDGE, threshold);
    return mix(origin, scene, reveal);
}
"#;
