//! Tessel GPU
//!
//! Implementations of [`tessel_core::GpuBackend`]:
//!
//! - [`WgpuBackend`]: records draws and submits them to a wgpu device once per frame
//! - [`HeadlessBackend`]: keeps buffer and texture contents in memory and logs every
//!   call, for tests and tooling that run without a GPU
//!
//! Both reflect WGSL through naga ([`reflect_wgsl`]), so attribute layouts and uniform
//! offsets are identical regardless of which backend compiled the shader.

pub mod error;
pub mod headless;
pub mod reflect;
pub mod shaders;
pub mod wgpu_backend;

pub use error::{GpuError, Result};
pub use headless::{Command, DrawRecord, HeadlessBackend};
pub use reflect::reflect_wgsl;
pub use wgpu_backend::{BackendConfig, WgpuBackend};
