//! Tessel Render
//!
//! CPU-side render primitives drawn through any [`tessel_core::GpuBackend`]:
//!
//! - [`AttributeLayout`]: packed vertex layout reflected from a shader
//! - [`Mesh`]: `f64` vertex data with incremental GPU re-upload
//! - [`MeshBuilder`]: cube, plane and normalized-cube sphere
//! - [`ShaderProgram`]: compiled shader with typed uniform setters
//! - [`Texture`]: immutable RGBA8 pixels with box, circle and cross generators

pub mod attributes;
pub mod buffer;
pub mod error;
pub mod mesh;
pub mod mesh_builder;
pub mod shader;
pub mod texture;

pub use attributes::{names, AttributeLayout, AttributeSlot};
pub use buffer::{IndexBuffer, VertexBuffer};
pub use error::{RenderError, Result};
pub use mesh::{Mesh, NormalMode};
pub use mesh_builder::MeshBuilder;
pub use shader::ShaderProgram;
pub use texture::{AlphaMode, Texture};
