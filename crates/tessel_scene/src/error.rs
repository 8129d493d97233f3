//! Scene error types

use thiserror::Error;

use crate::object::ObjectId;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Render(#[from] tessel_render::RenderError),

    #[error(transparent)]
    Core(#[from] tessel_core::CoreError),

    #[error("game object {0:?} no longer exists")]
    StaleObject(ObjectId),

    #[error("post shader has no texture named `{0}`")]
    MissingSampler(&'static str),

    #[error("post shader samples `{name}` from unit {actual}, expected {expected}")]
    SamplerUnit {
        name: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("mesh layout does not match shader `{0}`")]
    LayoutMismatch(String),

    #[error("invalid camera or render pass config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
