//! Widget sizing
//!
//! Sizes are in window pixels. Like [`Theme`](crate::Theme), a config file only needs
//! the fields it changes.

use serde::{Deserialize, Serialize};

use crate::align::Align;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Label text size
    pub font_size: u32,
    pub title_bar_height: i32,
    /// Height of one panel row, padding included
    pub slot_size: i32,
    pub padding: i32,
    pub label_align: Align,
    /// Frames per text cursor blink cycle
    pub cursor_blink_frames: u32,
    /// Text box undo depth
    pub undo_limit: usize,
    /// Text box capacity in characters
    pub text_capacity: usize,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            font_size: 14,
            title_bar_height: 24,
            slot_size: 24,
            padding: 5,
            label_align: Align::CenterLeft,
            cursor_blink_frames: 60,
            undo_limit: 100,
            text_capacity: 1000,
        }
    }
}

impl GuiConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}
