//! The scene context
//!
//! A [`Scene`] owns the camera, every game object, the global light and both render
//! passes. The window glue feeds it input and calls [`Scene::frame`] once per frame,
//! before the GUI draws on top and the frame is ended.

use std::rc::Rc;

use slotmap::SlotMap;
use smallvec::SmallVec;
use tessel_core::{GpuBackend, InputEvent, KeyCode, Vec2};
use tessel_render::ShaderProgram;

use crate::camera::{Camera, CameraMovement};
use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::light::DirectionalLight;
use crate::object::{GameObject, ObjectId, SceneView};
use crate::postprocessor::Postprocessor;
use crate::render_pass::RenderPass;

pub struct Scene {
    pub camera: Camera,
    pub dir_light: Option<DirectionalLight>,
    objects: SlotMap<ObjectId, GameObject>,
    render_pass: RenderPass,
    postprocessor: Postprocessor,
    lit: Rc<ShaderProgram>,
    movement: CameraMovement,
    paused: bool,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("camera", &self.camera)
            .field("objects", &self.objects.len())
            .field("render_pass", &self.render_pass)
            .field("paused", &self.paused)
            .finish()
    }
}

impl Scene {
    pub fn new(backend: &mut dyn GpuBackend, config: &SceneConfig) -> Result<Self> {
        let mut camera = Camera::new(&config.camera);
        let render_pass = RenderPass::new(backend, &config.render_pass)?;
        let (width, height) = render_pass.size();
        camera.set_viewport(width, height);

        Ok(Self {
            camera,
            dir_light: None,
            objects: SlotMap::with_key(),
            render_pass,
            postprocessor: Postprocessor::new(backend)?,
            lit: Rc::new(ShaderProgram::lit(backend)?),
            movement: CameraMovement::default(),
            paused: false,
        })
    }

    /// Shared lit shader for [`RenderMesh`](crate::RenderMesh)es in this scene
    pub fn lit_shader(&self) -> Rc<ShaderProgram> {
        Rc::clone(&self.lit)
    }

    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    pub fn postprocessor(&self) -> &Postprocessor {
        &self.postprocessor
    }

    pub fn spawn(&mut self, object: GameObject) -> ObjectId {
        self.objects.insert(object)
    }

    pub fn object(&self, id: ObjectId) -> Result<&GameObject> {
        self.objects.get(id).ok_or(SceneError::StaleObject(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut GameObject> {
        self.objects.get_mut(id).ok_or(SceneError::StaleObject(id))
    }

    pub fn despawn(&mut self, id: ObjectId) -> Result<GameObject> {
        self.objects.remove(id).ok_or(SceneError::StaleObject(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> {
        self.objects.iter()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            tracing::debug!("scene {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Directions currently held; applied on every frame until changed
    pub fn set_movement(&mut self, movement: CameraMovement) {
        self.movement = movement;
    }

    /// React to window input
    ///
    /// Escape toggles pause. Pointer motion turns the camera unless paused.
    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Key(key) if key.key == KeyCode::ESCAPE && !key.repeat => {
                self.set_paused(!self.paused);
            }
            InputEvent::MouseMove { delta, .. } if !self.paused => {
                self.camera.mouse_move(Vec2::new(delta.x as f32, delta.y as f32));
            }
            InputEvent::Resize { width, height } => self.resize(*width, *height),
            _ => {}
        }
    }

    /// Follow a new surface size; attachments regenerate on the next frame
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.render_pass.resize(width, height);
    }

    /// Update every object, draw the geometry pass and composite it to the screen
    ///
    /// The frame is left open for the GUI to draw over.
    pub fn frame(&mut self, backend: &mut dyn GpuBackend, dt: f32) -> Result<()> {
        if !self.paused {
            self.camera.translate(self.movement, dt);
        }
        for object in self.objects.values_mut() {
            object.update(dt)?;
        }

        let view = SceneView {
            view: self.camera.view(),
            projection: self.camera.projection(),
            view_pos: self.camera.position(),
            dir_light: self.dir_light,
            lights: self.objects.values().flat_map(GameObject::lights).collect::<SmallVec<_>>(),
        };

        self.render_pass.begin(backend)?;
        for object in self.objects.values_mut() {
            object.render(backend, &view)?;
        }
        self.postprocessor.composite(backend, &self.render_pass)?;
        Ok(())
    }
}
