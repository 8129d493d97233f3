//! Built-in WGSL shaders
//!
//! Binding conventions shared by every shader:
//!
//! - `@group(0) @binding(0)`: the uniform block
//! - `@group(1) @binding(2n)`: texture unit `n`, with its sampler at `2n + 1`

/// Textured screen-space quads for GUI elements
///
/// Vertex: `position: vec2` (clip space), `tex_coord: vec2`.
pub const UI_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(1) @binding(0) var element_tex: texture_2d<f32>;
@group(1) @binding(1) var element_sampler: sampler;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.tex_coord;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(element_tex, element_sampler, in.uv);
}
"#;

/// Lit geometry pass writing the G-buffer (color, view position, normal)
///
/// Vertex: `position: vec3`, `tex_coord: vec2`, `normal: vec3`.
pub const LIT_SHADER: &str = r#"
const MAX_POINT_LIGHTS: u32 = 8u;

struct Material {
    ambient: f32,
    diffuse: f32,
    specular: f32,
    shininess: f32,
};

struct DirLight {
    direction: vec3<f32>,
    strength: f32,
    color: vec3<f32>,
};

struct PointLight {
    position: vec3<f32>,
    strength: f32,
    color: vec3<f32>,
    constant: f32,
    linear: f32,
    quadratic: f32,
};

struct Uniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view_pos: vec3<f32>,
    num_lights: u32,
    material: Material,
    dir_light: DirLight,
    point_lights: array<PointLight, 8>,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var albedo_tex: texture_2d<f32>;
@group(1) @binding(1) var albedo_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
};

struct GBuffer {
    @location(0) color: vec4<f32>,
    @location(1) position: vec4<f32>,
    @location(2) normal: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.world_pos = in.position;
    out.clip = u.projection * u.view * vec4<f32>(in.position, 1.0);
    out.uv = in.tex_coord;
    out.normal = in.normal;
    return out;
}

fn shade(light_dir: vec3<f32>, color: vec3<f32>, n: vec3<f32>, view_dir: vec3<f32>) -> vec3<f32> {
    let diffuse = max(dot(n, light_dir), 0.0) * u.material.diffuse;
    let halfway = normalize(light_dir + view_dir);
    let specular = pow(max(dot(n, halfway), 0.0), u.material.shininess) * u.material.specular;
    return color * (diffuse + specular);
}

@fragment
fn fs_main(in: VertexOutput) -> GBuffer {
    let base = textureSample(albedo_tex, albedo_sampler, in.uv);
    let n = normalize(in.normal);
    let view_dir = normalize(u.view_pos - in.world_pos);

    var light = vec3<f32>(u.material.ambient);
    light += shade(normalize(-u.dir_light.direction), u.dir_light.color * u.dir_light.strength, n, view_dir);

    let count = min(u.num_lights, MAX_POINT_LIGHTS);
    for (var i = 0u; i < count; i = i + 1u) {
        let p = u.point_lights[i];
        let offset = p.position - in.world_pos;
        let dist = length(offset);
        let attenuation = 1.0 / (p.constant + p.linear * dist + p.quadratic * dist * dist);
        light += shade(normalize(offset), p.color * p.strength * attenuation, n, view_dir);
    }

    var out: GBuffer;
    out.color = vec4<f32>(base.rgb * light, base.a);
    out.position = u.view * vec4<f32>(in.world_pos, 1.0);
    out.normal = vec4<f32>(n, 1.0);
    return out;
}
"#;

/// Full-screen composite of the G-buffer
///
/// Vertex: `position: vec2`, `tex_coord: vec2`. Attachments are read with
/// `textureLoad`, so no samplers are declared.
pub const POST_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(1) @binding(0) var color_tex: texture_2d<f32>;
@group(1) @binding(2) var pos_tex: texture_2d<f32>;
@group(1) @binding(4) var depth_tex: texture_depth_2d;
@group(1) @binding(6) var norm_tex: texture_2d<f32>;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.tex_coord;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let coords = vec2<i32>(floor(in.clip.xy));
    let color = textureLoad(color_tex, coords, 0);
    let depth = textureLoad(depth_tex, coords, 0);
    // Background pixels keep the cleared color
    if (depth >= 1.0) {
        return vec4<f32>(color.rgb, 1.0);
    }
    let normal = textureLoad(norm_tex, coords, 0).xyz;
    let view_pos = textureLoad(pos_tex, coords, 0).xyz;
    let rim = 1.0 - max(dot(normalize(normal), normalize(-view_pos)), 0.0);
    return vec4<f32>(color.rgb + vec3<f32>(0.05 * rim), 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shaders_declare_entry_points() {
        for src in [UI_SHADER, LIT_SHADER, POST_SHADER] {
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
        }
    }
}
