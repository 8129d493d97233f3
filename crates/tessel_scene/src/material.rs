//! Surface parameters for the lit shader

use tessel_core::{GpuBackend, Rgba8};
use tessel_render::{ShaderProgram, Texture};

use crate::error::Result;

const DEFAULT_SIZE: u32 = 512;
const DEFAULT_ALBEDO: Rgba8 = Rgba8::new(50, 100, 100, 255);

/// Albedo texture plus Phong coefficients
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub texture: Texture,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self::with_texture(Texture::solid_box(
            DEFAULT_SIZE,
            DEFAULT_SIZE,
            DEFAULT_ALBEDO,
            0,
            DEFAULT_ALBEDO,
        ))
    }
}

impl Material {
    /// Stock coefficients around a custom albedo
    pub fn with_texture(texture: Texture) -> Self {
        Self {
            texture,
            ambient: 0.5,
            diffuse: 1.0,
            specular: 2.0,
            shininess: 64.0,
        }
    }

    /// Bind the albedo to unit 0 and upload `material.*`
    pub fn apply(&self, backend: &mut dyn GpuBackend, shader: &ShaderProgram) -> Result<()> {
        let unit = shader.texture_unit("albedo_tex").unwrap_or(0);
        self.texture.bind(backend, unit)?;
        shader.set_float(backend, "material.ambient", self.ambient)?;
        shader.set_float(backend, "material.diffuse", self.diffuse)?;
        shader.set_float(backend, "material.specular", self.specular)?;
        shader.set_float(backend, "material.shininess", self.shininess)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_gpu::HeadlessBackend;

    #[test]
    fn test_apply_uploads_coefficients_and_binds_albedo() {
        let mut backend = HeadlessBackend::new(8, 8);
        let lit = ShaderProgram::lit(&mut backend).unwrap();
        let material = Material {
            shininess: 32.0,
            ..Default::default()
        };
        material.apply(&mut backend, &lit).unwrap();

        assert!(material.texture.is_uploaded());
        assert_eq!(material.texture.pixel(0, 0), Some(DEFAULT_ALBEDO));
        assert_eq!(backend.uniform_f32(lit.id(), "material.ambient").unwrap(), vec![0.5]);
        assert_eq!(backend.uniform_f32(lit.id(), "material.specular").unwrap(), vec![2.0]);
        assert_eq!(backend.uniform_f32(lit.id(), "material.shininess").unwrap(), vec![32.0]);
    }
}
