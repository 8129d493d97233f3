//! Point and directional lights

use tessel_core::{DVec3, GpuBackend, Vec3};
use tessel_render::ShaderProgram;

use crate::error::Result;
use crate::object::SceneAttribute;

/// Point lights the lit shader can take in one draw
pub const MAX_POINT_LIGHTS: usize = 8;

/// Omni light placed at its owning object
///
/// Attenuation is `1 / (constant + linear * d + quadratic * d²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub strength: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            strength: 5.0,
            constant: 1.0,
            linear: 0.0,
            quadratic: 1.0,
        }
    }
}

impl PointLight {
    pub fn new(color: Vec3, strength: f32) -> Self {
        Self {
            color,
            strength,
            ..Default::default()
        }
    }

    pub fn with_attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.constant = constant;
        self.linear = linear;
        self.quadratic = quadratic;
        self
    }

    /// Upload into `point_lights[index]`
    pub fn apply(
        &self,
        backend: &mut dyn GpuBackend,
        shader: &ShaderProgram,
        index: usize,
        position: Vec3,
    ) -> Result<()> {
        let field = |name: &str| format!("point_lights[{}].{}", index, name);
        shader.set_vec3(backend, &field("position"), position)?;
        shader.set_float(backend, &field("strength"), self.strength)?;
        shader.set_vec3(backend, &field("color"), self.color)?;
        shader.set_float(backend, &field("constant"), self.constant)?;
        shader.set_float(backend, &field("linear"), self.linear)?;
        shader.set_float(backend, &field("quadratic"), self.quadratic)?;
        Ok(())
    }
}

impl SceneAttribute for PointLight {
    fn point_light(&self) -> Option<&PointLight> {
        Some(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Scene-wide light with parallel rays
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub strength: f32,
    /// Direction the light travels in
    pub direction: Vec3,
}

impl DirectionalLight {
    pub fn new(color: Vec3, strength: f32, direction: Vec3) -> Self {
        Self {
            color,
            strength,
            direction,
        }
    }

    /// Upload into `dir_light`
    pub fn apply(&self, backend: &mut dyn GpuBackend, shader: &ShaderProgram) -> Result<()> {
        shader.set_vec3(backend, "dir_light.direction", self.direction)?;
        shader.set_float(backend, "dir_light.strength", self.strength)?;
        shader.set_vec3(backend, "dir_light.color", self.color)?;
        Ok(())
    }

    /// Upload a light that contributes nothing
    pub fn apply_none(backend: &mut dyn GpuBackend, shader: &ShaderProgram) -> Result<()> {
        Self::new(Vec3::ZERO, 0.0, Vec3::NEG_Y).apply(backend, shader)
    }
}

/// A point light together with where it sits this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedLight {
    pub position: Vec3,
    pub light: PointLight,
}

impl PlacedLight {
    pub fn new(position: DVec3, light: PointLight) -> Self {
        Self {
            position: position.as_vec3(),
            light,
        }
    }
}
