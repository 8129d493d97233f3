//! GPU backend errors

use tessel_core::CoreError;
use thiserror::Error;

/// Errors raised while creating or driving a GPU backend
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to acquire surface texture: {0}")]
    SurfaceTexture(#[from] wgpu::SurfaceError),

    #[error("shader `{label}` failed to parse:\n{message}")]
    ShaderParse { label: String, message: String },

    #[error("shader reflection failed: {0}")]
    Reflection(String),

    #[error("unsupported vertex attribute with {0} components")]
    UnsupportedAttribute(u32),
}

impl From<GpuError> for CoreError {
    fn from(err: GpuError) -> Self {
        CoreError::Backend(err.to_string())
    }
}

/// Result type for GPU backend operations
pub type Result<T> = std::result::Result<T, GpuError>;
