//! Render errors

use tessel_core::CoreError;
use thiserror::Error;

/// Errors raised while building or syncing meshes, shaders and textures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("attribute `{name}` expects {expected} values, got {actual}")]
    AttributeSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("vertex data length {len} is not a multiple of stride {stride}")]
    Stride { len: usize, stride: u32 },

    #[cfg(feature = "png")]
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RenderError::Core(CoreError::InvalidArgument(message.into()))
    }

    pub(crate) fn out_of_bounds(index: usize, len: usize) -> Self {
        RenderError::Core(CoreError::OutOfBounds { index, len })
    }
}

/// Result type for render operations
pub type Result<T> = std::result::Result<T, RenderError>;
