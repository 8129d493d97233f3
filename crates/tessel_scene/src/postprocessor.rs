//! Full-screen G-buffer composite

use tessel_core::{BlendMode, ClearValue, GpuBackend, PassTarget, ShaderSource};
use tessel_render::{Mesh, ShaderProgram};

use crate::error::{Result, SceneError};
use crate::render_pass::RenderPass;

/// Sampler names in attachment order, each expected on the unit of its index
pub const SAMPLERS: [&str; 4] = ["color_tex", "pos_tex", "depth_tex", "norm_tex"];

#[rustfmt::skip]
const QUAD_VERTICES: [f64; 16] = [
    // position    tex_coord
    -1.0, -1.0,    0.0, 1.0,
     1.0, -1.0,    1.0, 1.0,
     1.0,  1.0,    1.0, 0.0,
    -1.0,  1.0,    0.0, 0.0,
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Draws the geometry pass onto the screen through a post shader
pub struct Postprocessor {
    shader: ShaderProgram,
    quad: Mesh,
}

impl std::fmt::Debug for Postprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Postprocessor")
            .field("shader", &self.shader.label())
            .finish()
    }
}

impl Postprocessor {
    /// Use the stock composite shader
    pub fn new(backend: &mut dyn GpuBackend) -> Result<Self> {
        Self::from_program(ShaderProgram::post(backend)?)
    }

    /// Compile a custom composite shader
    ///
    /// It must take `position: vec2` and `tex_coord: vec2` and sample the four
    /// attachments on units 0 to 3 in [`SAMPLERS`] order.
    pub fn with_shader(backend: &mut dyn GpuBackend, source: &ShaderSource) -> Result<Self> {
        Self::from_program(ShaderProgram::compile(backend, source)?)
    }

    fn from_program(shader: ShaderProgram) -> Result<Self> {
        for (expected, name) in SAMPLERS.into_iter().enumerate() {
            let actual = shader
                .texture_unit(name)
                .ok_or(SceneError::MissingSampler(name))?;
            if actual != expected as u32 {
                return Err(SceneError::SamplerUnit {
                    name,
                    expected: expected as u32,
                    actual,
                });
            }
        }
        let quad = shader
            .mesh(QUAD_VERTICES.to_vec(), QUAD_INDICES.to_vec())?
            .with_label("post quad");
        Ok(Self { shader, quad })
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    /// Sample every attachment of `pass` onto the screen with depth testing off
    pub fn composite(&mut self, backend: &mut dyn GpuBackend, pass: &RenderPass) -> Result<()> {
        let (width, height) = backend.surface_size();
        backend.set_viewport(width, height);
        backend.begin_pass(PassTarget::Screen, Some(ClearValue::color([0.0; 4])))?;
        backend.set_depth_test(false);
        backend.set_blend(BlendMode::Replace);
        for (unit, texture) in pass.attachments().into_iter().enumerate() {
            backend.bind_texture(unit as u32, texture)?;
        }
        self.quad.draw(backend, self.shader.id())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_gpu::HeadlessBackend;

    const SWAPPED: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coord: vec2<f32>,
};

@group(1) @binding(0) var pos_tex: texture_2d<f32>;
@group(1) @binding(2) var color_tex: texture_2d<f32>;
@group(1) @binding(4) var depth_tex: texture_depth_2d;
@group(1) @binding(6) var norm_tex: texture_2d<f32>;

@vertex
fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
    return vec4<f32>(in.position, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

    #[test]
    fn test_stock_shader_has_expected_units() {
        let mut backend = HeadlessBackend::new(8, 8);
        let post = Postprocessor::new(&mut backend).unwrap();
        assert_eq!(post.shader().layout().stride(), 4);
        assert_eq!(post.quad.vertex_count(), 4);
    }

    #[test]
    fn test_sampler_units_are_checked() {
        let mut backend = HeadlessBackend::new(8, 8);
        let err = Postprocessor::with_shader(&mut backend, &ShaderSource::new("swapped", SWAPPED)).unwrap_err();
        assert!(matches!(
            err,
            SceneError::SamplerUnit {
                name: "color_tex",
                expected: 0,
                actual: 1
            }
        ));
    }
}
