//! Tessel Text
//!
//! Turns strings into premultiplied RGBA rasters for GUI textures.
//!
//! - [`GlyphRasterizer`]: one character into a fixed-height coverage cell
//! - [`SwashRasterizer`]: the swash-backed rasterizer, with fontdb lookup of system fonts
//! - [`FixedRasterizer`]: font-free block glyphs for headless use
//! - [`GlyphCache`]: unbounded cache keyed by (character, size, font)
//! - [`TextGenerator`]: string rasters with per-character advances, and wrapped text blocks

pub mod cache;
pub mod generator;
pub mod rasterizer;

pub use cache::{GlyphCache, GlyphKey};
pub use generator::{line_height, StringRaster, TextBlock, TextGenerator};
pub use rasterizer::{FixedRasterizer, GlyphCell, GlyphRasterizer, SwashRasterizer};

use thiserror::Error;

/// Text rasterization errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("failed to load font: {0}")]
    FontLoad(String),

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("invalid font data")]
    InvalidFontData,
}

pub type Result<T> = std::result::Result<T, TextError>;
