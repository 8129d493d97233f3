//! Tessel Scene
//!
//! A small deferred 3D layer drawn under the GUI:
//!
//! - [`Camera`]: free-flying first-person camera
//! - [`GameObject`]: a position with attached [`SceneAttribute`]s such as [`RenderMesh`]
//!   and [`PointLight`]
//! - [`RenderPass`]: the offscreen G-buffer (color, position, depth, normal)
//! - [`Postprocessor`]: full-screen composite of the G-buffer onto the screen
//! - [`Scene`]: the context tying them together
//!
//! A combined frame with the GUI runs in this order:
//!
//! ```ignore
//! gui.begin_frame()?;            // reap deferred tree mutations
//! scene.frame(&mut backend, dt)?; // update, geometry pass, composite
//! gui.draw(&mut backend)?;        // screen-space elements on top
//! backend.end_frame()?;
//! backend.collect_garbage();
//! ```

pub mod camera;
pub mod config;
pub mod error;
pub mod light;
pub mod material;
pub mod object;
pub mod postprocessor;
pub mod render_mesh;
pub mod render_pass;
pub mod scene;

pub use camera::{Camera, CameraMovement};
pub use config::{CameraConfig, RenderPassConfig, SceneConfig};
pub use error::{Result, SceneError};
pub use light::{DirectionalLight, PlacedLight, PointLight, MAX_POINT_LIGHTS};
pub use material::Material;
pub use object::{GameObject, ObjectId, SceneAttribute, SceneView};
pub use postprocessor::{Postprocessor, SAMPLERS};
pub use render_mesh::RenderMesh;
pub use render_pass::RenderPass;
pub use scene::Scene;
