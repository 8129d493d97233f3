//! Core error types

use thiserror::Error;

/// Errors raised by core types and backend implementations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("unknown uniform: {0}")]
    UnknownUniform(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("stale {0} handle")]
    StaleHandle(&'static str),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
