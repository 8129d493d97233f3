//! Compiled shader programs
//!
//! Compiling a shader reflects its vertex inputs into an [`AttributeLayout`] and keeps
//! the uniform and texture reflection around so lookups by name fail with a typed
//! error instead of silently writing nowhere.

use tessel_core::{
    CoreError, GpuBackend, GpuResource, Mat4, ReflectedUniform, ReleaseQueue, ShaderId,
    ShaderReflection, ShaderSource, UniformValue, Vec2, Vec3, Vec4,
};
use tessel_gpu::shaders;

use crate::attributes::{AttributeLayout, AttributeSlot};
use crate::error::{RenderError, Result};
use crate::mesh::Mesh;

/// A shader compiled on a backend, with its reflected layout
pub struct ShaderProgram {
    id: ShaderId,
    label: String,
    layout: AttributeLayout,
    reflection: ShaderReflection,
    release: ReleaseQueue,
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("label", &self.label)
            .field("stride", &self.layout.stride())
            .field("uniforms", &self.reflection.uniforms.len())
            .field("textures", &self.reflection.textures.len())
            .finish()
    }
}

impl ShaderProgram {
    pub fn compile(backend: &mut dyn GpuBackend, source: &ShaderSource) -> Result<Self> {
        let (id, reflection) = backend.create_shader(source)?;
        let layout = AttributeLayout::from_reflection(&reflection.attributes);
        tracing::debug!(
            "shader `{}` linked: stride {}, {} attributes",
            source.label,
            layout.stride(),
            layout.len()
        );
        Ok(Self {
            id,
            label: source.label.to_string(),
            layout,
            reflection,
            release: backend.release_queue(),
        })
    }

    /// Screen-space textured quads
    pub fn ui(backend: &mut dyn GpuBackend) -> Result<Self> {
        Self::compile(backend, &ShaderSource::new("ui", shaders::UI_SHADER))
    }

    /// Lit geometry writing the G-buffer
    pub fn lit(backend: &mut dyn GpuBackend) -> Result<Self> {
        Self::compile(backend, &ShaderSource::new("lit", shaders::LIT_SHADER))
    }

    /// G-buffer composite
    pub fn post(backend: &mut dyn GpuBackend) -> Result<Self> {
        Self::compile(backend, &ShaderSource::new("post", shaders::POST_SHADER))
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    pub fn require_attribute(&self, name: &str) -> Result<&AttributeSlot> {
        self.layout.require(name)
    }

    pub fn require_uniform(&self, name: &str) -> Result<&ReflectedUniform> {
        self.reflection
            .uniform(name)
            .ok_or_else(|| CoreError::UnknownUniform(name.to_string()).into())
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.reflection.uniform(name).is_some()
    }

    /// Texture unit of a named texture binding
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.reflection
            .textures
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.unit)
    }

    /// Create a mesh laid out for this shader
    pub fn mesh(&self, vertices: Vec<f64>, indices: Vec<u32>) -> Result<Mesh> {
        Mesh::new(self.layout.clone(), vertices, indices)
    }

    fn check_mesh(&self, mesh: &Mesh) -> Result<()> {
        if mesh.layout() != &self.layout {
            return Err(RenderError::invalid(format!(
                "mesh layout does not match shader `{}`",
                self.label
            )));
        }
        Ok(())
    }

    /// Write one attribute for every vertex of `mesh`
    pub fn fill_attribute(&self, mesh: &mut Mesh, name: &str, data: &[f64]) -> Result<()> {
        self.check_mesh(mesh)?;
        mesh.fill_attribute(name, data)
    }

    /// Write one attribute of one vertex of `mesh`
    pub fn write_attribute(&self, mesh: &mut Mesh, vertex: usize, name: &str, values: &[f64]) -> Result<()> {
        self.check_mesh(mesh)?;
        mesh.write_attribute(vertex, name, values)
    }

    pub fn set_uniform(&self, backend: &mut dyn GpuBackend, name: &str, value: UniformValue) -> Result<()> {
        backend.set_uniform(self.id, name, value)?;
        Ok(())
    }

    pub fn set_int(&self, backend: &mut dyn GpuBackend, name: &str, value: i32) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Int(value))
    }

    pub fn set_uint(&self, backend: &mut dyn GpuBackend, name: &str, value: u32) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::UInt(value))
    }

    pub fn set_float(&self, backend: &mut dyn GpuBackend, name: &str, value: f32) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Float(value))
    }

    pub fn set_vec2(&self, backend: &mut dyn GpuBackend, name: &str, value: Vec2) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Vec2(value.to_array()))
    }

    pub fn set_vec3(&self, backend: &mut dyn GpuBackend, name: &str, value: Vec3) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Vec3(value.to_array()))
    }

    pub fn set_vec4(&self, backend: &mut dyn GpuBackend, name: &str, value: Vec4) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Vec4(value.to_array()))
    }

    pub fn set_mat4(&self, backend: &mut dyn GpuBackend, name: &str, value: Mat4) -> Result<()> {
        self.set_uniform(backend, name, UniformValue::Mat4(value.to_cols_array_2d()))
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.release.push(GpuResource::Shader(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_gpu::HeadlessBackend;

    #[test]
    fn test_builtin_layouts() {
        let mut backend = HeadlessBackend::new(10, 10);
        let ui = ShaderProgram::ui(&mut backend).unwrap();
        let lit = ShaderProgram::lit(&mut backend).unwrap();
        assert_eq!(ui.layout().stride(), 4);
        assert_eq!(lit.layout().stride(), 8);
        assert_eq!(lit.require_attribute("normal").unwrap().offset, 5);
        assert!(ui.require_attribute("normal").is_err());
    }

    #[test]
    fn test_typed_uniform_setters() {
        let mut backend = HeadlessBackend::new(10, 10);
        let lit = ShaderProgram::lit(&mut backend).unwrap();
        lit.set_vec3(&mut backend, "point_lights[1].color", Vec3::new(0.5, 0.25, 1.0))
            .unwrap();
        assert_eq!(
            backend.uniform_f32(lit.id(), "point_lights[1].color").unwrap(),
            vec![0.5, 0.25, 1.0]
        );
        assert!(lit.set_float(&mut backend, "view_pos", 1.0).is_err());
        assert!(matches!(
            lit.require_uniform("missing"),
            Err(RenderError::Core(CoreError::UnknownUniform(_)))
        ));
    }

    #[test]
    fn test_fill_attribute_checks_layout() {
        let mut backend = HeadlessBackend::new(10, 10);
        let ui = ShaderProgram::ui(&mut backend).unwrap();
        let lit = ShaderProgram::lit(&mut backend).unwrap();
        let mut quad = ui.mesh(vec![0.0; 16], vec![0, 1, 2, 0, 2, 3]).unwrap();
        ui.fill_attribute(&mut quad, "tex_coord", &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
            .unwrap();
        assert_eq!(quad.attribute(2, "tex_coord").unwrap(), &[1.0, 1.0]);
        assert!(lit.fill_attribute(&mut quad, "tex_coord", &[0.0; 8]).is_err());
    }

    #[test]
    fn test_post_texture_units() {
        let mut backend = HeadlessBackend::new(10, 10);
        let post = ShaderProgram::post(&mut backend).unwrap();
        assert_eq!(post.texture_unit("depth_tex"), Some(2));
        assert_eq!(post.texture_unit("norm_tex"), Some(3));
    }
}
