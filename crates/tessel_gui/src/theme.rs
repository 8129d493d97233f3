//! Widget color palette
//!
//! A [`Theme`] is an explicit value owned by the GUI context. Files only need to name
//! the colors they change; everything else keeps the stock value.
//!
//! ```toml
//! accent = [200, 80, 80, 255]
//! title = [60, 30, 30, 255]
//! ```

use serde::{Deserialize, Serialize};
use tessel_core::Rgba8;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Panel and button fill
    pub base: Rgba8,
    /// Filled part of sliders
    pub accent: Rgba8,
    /// Text box and slider track fill
    pub background: Rgba8,
    /// Hovered buttons
    pub highlight: Rgba8,
    /// Pressed buttons and checkbox outlines
    pub highlight_strong: Rgba8,
    /// Panel title bars
    pub title: Rgba8,
    pub text: Rgba8,
    /// Text selection overlay
    pub selection: Rgba8,
    /// Close button hover
    pub danger: Rgba8,
    /// Debug outlines
    pub debug: Rgba8,
    /// Window clear color
    pub window: Rgba8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            base: Rgba8::rgb(40, 40, 40),
            accent: Rgba8::rgb(80, 80, 255),
            background: Rgba8::rgb(30, 30, 30),
            highlight: Rgba8::rgb(60, 60, 60),
            highlight_strong: Rgba8::rgb(80, 80, 80),
            title: Rgba8::rgb(30, 30, 60),
            text: Rgba8::WHITE,
            selection: Rgba8::new(50, 50, 255, 100),
            danger: Rgba8::RED,
            debug: Rgba8::RED,
            window: Rgba8::BLACK,
        }
    }
}

impl Theme {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuiError;

    #[test]
    fn test_partial_theme_keeps_defaults() {
        let theme = Theme::from_toml_str("accent = [200, 80, 80, 255]\n").unwrap();
        assert_eq!(theme.accent, Rgba8::rgb(200, 80, 80));
        assert_eq!(theme.base, Theme::default().base);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let err = Theme::from_toml_str("text = [1, 2, 3]\n").unwrap_err();
        assert!(matches!(err, GuiError::Parse(_)));
    }
}
