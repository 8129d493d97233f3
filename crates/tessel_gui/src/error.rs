//! GUI error types

use thiserror::Error;

use crate::tree::ElementId;

#[derive(Error, Debug)]
pub enum GuiError {
    #[error(transparent)]
    Render(#[from] tessel_render::RenderError),

    #[error(transparent)]
    Text(#[from] tessel_text::TextError),

    #[error(transparent)]
    Core(#[from] tessel_core::CoreError),

    #[error("element {0:?} no longer exists")]
    StaleElement(ElementId),

    #[error("element {parent:?} has no child named `{name}`")]
    MissingChild { parent: ElementId, name: String },

    #[error("element {0:?} already has a parent")]
    AlreadyAttached(ElementId),

    #[error("element {0:?} is not a {1}")]
    WrongBehaviour(ElementId, &'static str),

    #[error("unknown align `{0}`")]
    UnknownAlign(String),

    #[error("invalid theme or config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GuiError>;
