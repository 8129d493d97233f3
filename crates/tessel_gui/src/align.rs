//! Alignment of an element's box around its anchor point
//!
//! Pixel space has its origin at the top-left corner of the window, x to the right
//! and y down. An element's absolute position is the point named by its [`Align`]:
//! `UpperLeft` puts the box below and to the right of it, `Center` centers the box
//! on it, and so on. Halving uses integer division, so odd sizes lose a pixel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessel_core::{IRect, IVec2};

use crate::error::GuiError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Align {
    #[default]
    UpperLeft,
    CenterLeft,
    LowerLeft,
    UpperCenter,
    Center,
    LowerCenter,
    UpperRight,
    CenterRight,
    LowerRight,
}

impl Align {
    pub const ALL: [Align; 9] = [
        Align::UpperLeft,
        Align::CenterLeft,
        Align::LowerLeft,
        Align::UpperCenter,
        Align::Center,
        Align::LowerCenter,
        Align::UpperRight,
        Align::CenterRight,
        Align::LowerRight,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Align::UpperLeft => "upper_left",
            Align::CenterLeft => "center_left",
            Align::LowerLeft => "lower_left",
            Align::UpperCenter => "upper_center",
            Align::Center => "center",
            Align::LowerCenter => "lower_center",
            Align::UpperRight => "upper_right",
            Align::CenterRight => "center_right",
            Align::LowerRight => "lower_right",
        }
    }

    /// Horizontal extent relative to the anchor x
    fn x_range(self, x: i32, w: i32) -> (i32, i32) {
        match self {
            Align::UpperLeft | Align::CenterLeft | Align::LowerLeft => (x, x + w),
            Align::UpperCenter | Align::Center | Align::LowerCenter => (x - w / 2, x + w / 2),
            Align::UpperRight | Align::CenterRight | Align::LowerRight => (x - w, x),
        }
    }

    /// Vertical extent relative to the anchor y
    fn y_range(self, y: i32, h: i32) -> (i32, i32) {
        match self {
            Align::UpperLeft | Align::UpperCenter | Align::UpperRight => (y, y + h),
            Align::CenterLeft | Align::Center | Align::CenterRight => (y - h / 2, y + h / 2),
            Align::LowerLeft | Align::LowerCenter | Align::LowerRight => (y - h, y),
        }
    }

    /// Box of `size` placed around the absolute anchor `pos`
    pub fn place(self, pos: IVec2, size: IVec2) -> IRect {
        let (x0, x1) = self.x_range(pos.x, size.x);
        let (y0, y1) = self.y_range(pos.y, size.y);
        IRect::from_corners(IVec2::new(x0, y0), IVec2::new(x1, y1))
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Align {
    type Err = GuiError;

    /// Accepts `snake_case` and `PascalCase` names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Align::ALL
            .into_iter()
            .find(|a| a.name().replace('_', "") == normalized)
            .ok_or_else(|| GuiError::UnknownAlign(s.to_string()))
    }
}

impl TryFrom<String> for Align {
    type Error = GuiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Align> for &'static str {
    fn from(align: Align) -> Self {
        align.name()
    }
}
