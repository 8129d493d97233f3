//! Lit mesh attribute

use std::any::Any;
use std::rc::Rc;

use tessel_core::{DVec3, GpuBackend};
use tessel_render::{Mesh, MeshBuilder, ShaderProgram};

use crate::error::{Result, SceneError};
use crate::light::{DirectionalLight, MAX_POINT_LIGHTS};
use crate::material::Material;
use crate::object::{SceneAttribute, SceneView};

/// A mesh drawn with a shared lit shader
///
/// Vertices are kept in world space. Each update shifts them by however far the owner
/// moved since the previous update.
pub struct RenderMesh {
    mesh: Mesh,
    shader: Rc<ShaderProgram>,
    pub material: Material,
    last_position: Option<DVec3>,
}

impl std::fmt::Debug for RenderMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderMesh")
            .field("mesh", &self.mesh)
            .field("shader", &self.shader.label())
            .field("last_position", &self.last_position)
            .finish()
    }
}

impl RenderMesh {
    /// Wrap a mesh built for `shader`
    ///
    /// The mesh's vertices are taken to be relative to the owner.
    pub fn new(mesh: Mesh, shader: Rc<ShaderProgram>, material: Material) -> Result<Self> {
        if mesh.layout() != shader.layout() {
            return Err(SceneError::LayoutMismatch(shader.label().to_string()));
        }
        Ok(Self {
            mesh,
            shader,
            material,
            last_position: None,
        })
    }

    /// Unit cube around the owner
    pub fn cube(shader: Rc<ShaderProgram>, material: Material) -> Result<Self> {
        let mesh = MeshBuilder::new(shader.layout())?.cube()?.with_label("cube");
        Self::new(mesh, shader, material)
    }

    /// Sphere of radius 1 around the owner
    pub fn sphere(shader: Rc<ShaderProgram>, material: Material, resolution: u32) -> Result<Self> {
        let mesh = MeshBuilder::new(shader.layout())?
            .sphere(resolution)?
            .with_label("sphere");
        Self::new(mesh, shader, material)
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    fn upload_view(&self, backend: &mut dyn GpuBackend, view: &SceneView) -> Result<()> {
        let shader = &*self.shader;
        shader.set_mat4(backend, "view", view.view)?;
        shader.set_mat4(backend, "projection", view.projection)?;
        shader.set_vec3(backend, "view_pos", view.view_pos)?;

        match &view.dir_light {
            Some(light) => light.apply(backend, shader)?,
            None => DirectionalLight::apply_none(backend, shader)?,
        }

        if view.lights.len() > MAX_POINT_LIGHTS {
            tracing::warn!(
                "{} point lights in view, only the first {} are used",
                view.lights.len(),
                MAX_POINT_LIGHTS
            );
        }
        let count = view.lights.len().min(MAX_POINT_LIGHTS);
        shader.set_uint(backend, "num_lights", count as u32)?;
        for (index, placed) in view.lights.iter().take(count).enumerate() {
            placed.light.apply(backend, shader, index, placed.position)?;
        }
        Ok(())
    }
}

impl SceneAttribute for RenderMesh {
    fn update(&mut self, position: DVec3, _dt: f32) -> Result<()> {
        let delta = position - self.last_position.unwrap_or(DVec3::ZERO);
        if delta != DVec3::ZERO {
            self.mesh.translate(delta)?;
        }
        self.last_position = Some(position);
        Ok(())
    }

    fn render(&mut self, backend: &mut dyn GpuBackend, view: &SceneView) -> Result<()> {
        self.upload_view(backend, view)?;
        self.material.apply(backend, &self.shader)?;
        self.mesh.draw(backend, self.shader.id())?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
