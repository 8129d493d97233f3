//! Game objects and their attributes
//!
//! A [`GameObject`] is just a position and a list of [`SceneAttribute`]s. Attributes
//! are updated every frame with the owner's current position, and rendered during the
//! geometry pass with a [`SceneView`] describing the camera and lights.

use std::any::Any;

use slotmap::new_key_type;
use smallvec::SmallVec;
use tessel_core::{DVec3, GpuBackend, Mat4, Vec3};

use crate::error::Result;
use crate::light::{DirectionalLight, PlacedLight, PointLight, MAX_POINT_LIGHTS};

new_key_type! {
    /// Handle to an object owned by a [`Scene`](crate::Scene)
    pub struct ObjectId;
}

/// Per-frame camera and lighting state shared by every draw
#[derive(Clone, Debug, PartialEq)]
pub struct SceneView {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_pos: Vec3,
    pub dir_light: Option<DirectionalLight>,
    pub lights: SmallVec<[PlacedLight; MAX_POINT_LIGHTS]>,
}

/// Behaviour attached to a [`GameObject`]
pub trait SceneAttribute: Any {
    /// Called once per frame with the owner's position
    fn update(&mut self, _position: DVec3, _dt: f32) -> Result<()> {
        Ok(())
    }

    /// Draw into the geometry pass
    fn render(&mut self, _backend: &mut dyn GpuBackend, _view: &SceneView) -> Result<()> {
        Ok(())
    }

    /// Light emitted from the owner's position, if any
    fn point_light(&self) -> Option<&PointLight> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Default)]
pub struct GameObject {
    pub position: DVec3,
    attributes: Vec<Box<dyn SceneAttribute>>,
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("position", &self.position)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

impl GameObject {
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            attributes: Vec::new(),
        }
    }

    /// Builder form of [`attach`](Self::attach)
    pub fn with(mut self, attribute: impl SceneAttribute) -> Self {
        self.attach(attribute);
        self
    }

    pub fn attach(&mut self, attribute: impl SceneAttribute) {
        self.attributes.push(Box::new(attribute));
    }

    pub fn translate(&mut self, delta: DVec3) {
        self.position += delta;
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// First attached attribute of type `T`
    pub fn attribute<T: SceneAttribute>(&self) -> Option<&T> {
        self.attributes.iter().find_map(|a| a.as_any().downcast_ref::<T>())
    }

    pub fn attribute_mut<T: SceneAttribute>(&mut self) -> Option<&mut T> {
        self.attributes
            .iter_mut()
            .find_map(|a| a.as_any_mut().downcast_mut::<T>())
    }

    pub fn update(&mut self, dt: f32) -> Result<()> {
        let position = self.position;
        for attribute in &mut self.attributes {
            attribute.update(position, dt)?;
        }
        Ok(())
    }

    pub fn render(&mut self, backend: &mut dyn GpuBackend, view: &SceneView) -> Result<()> {
        for attribute in &mut self.attributes {
            attribute.render(backend, view)?;
        }
        Ok(())
    }

    /// Point lights carried by this object, placed at its position
    pub fn lights(&self) -> impl Iterator<Item = PlacedLight> + '_ {
        self.attributes
            .iter()
            .filter_map(|a| a.point_light())
            .map(|light| PlacedLight::new(self.position, *light))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(DVec3, f32)>,
    }

    impl SceneAttribute for Recorder {
        fn update(&mut self, position: DVec3, dt: f32) -> Result<()> {
            self.seen.push((position, dt));
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_update_passes_current_position() {
        let mut object = GameObject::new(DVec3::ZERO).with(Recorder::default());
        object.update(0.5).unwrap();
        object.translate(DVec3::X);
        object.update(0.25).unwrap();

        let recorder = object.attribute::<Recorder>().unwrap();
        assert_eq!(recorder.seen, vec![(DVec3::ZERO, 0.5), (DVec3::X, 0.25)]);
        assert!(object.attribute::<PointLight>().is_none());
    }

    #[test]
    fn test_lights_follow_the_owner() {
        let mut object = GameObject::new(DVec3::new(1.0, 2.0, 3.0))
            .with(PointLight::default())
            .with(Recorder::default());
        assert_eq!(object.attribute_count(), 2);

        let lights: Vec<_> = object.lights().collect();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].position, Vec3::new(1.0, 2.0, 3.0));

        object.attribute_mut::<PointLight>().unwrap().strength = 1.0;
        object.position = DVec3::ZERO;
        let light = object.lights().next().unwrap();
        assert_eq!(light.position, Vec3::ZERO);
        assert_eq!(light.light.strength, 1.0);
    }
}
