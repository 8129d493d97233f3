//! Tessel Core
//!
//! Foundational types shared by every Tessel crate:
//!
//! - **Geometry**: integer rectangles in window pixel space and 8-bit colors
//! - **Input**: platform-agnostic pointer and keyboard events
//! - **Backend contract**: the [`GpuBackend`] trait the GUI and scene layers draw through
//!
//! The backend is deliberately immediate-mode: callers bind state, issue draws, and the
//! implementation decides how to batch them into GPU submissions at [`GpuBackend::end_frame`].

pub mod backend;
pub mod error;
pub mod events;
pub mod geometry;

pub use backend::{
    BlendMode, BufferDesc, BufferId, BufferKind, ClearValue, DrawCall, FramebufferId,
    GpuBackend, GpuResource, PassTarget, ReflectedAttribute, ReflectedTexture, ReflectedUniform,
    ReleaseQueue, ShaderId, ShaderReflection, ShaderSource, TextureDesc, TextureFormat,
    TextureId, UniformKind, UniformValue, VertexAttributeDesc, VertexLayoutDesc,
};
pub use error::{CoreError, Result};
pub use events::{InputEvent, KeyCode, KeyEvent, Modifiers, MouseButton, PointerState};
pub use geometry::{IRect, Rgba8};

pub use glam::{DMat4, DQuat, DVec2, DVec3, IVec2, Mat4, Vec2, Vec3, Vec4};
