//! Geometry and color primitives
//!
//! GUI layout works in integer window pixels with a top-left origin. Rectangles are
//! stored as normalized `(min, max)` corner pairs so that `min <= max` holds on both
//! axes no matter which corners they were built from.

use glam::IVec2;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Rectangles
// ─────────────────────────────────────────────────────────────────────────────

/// Axis-aligned integer rectangle in window pixel space
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl IRect {
    pub const ZERO: IRect = IRect {
        min: IVec2::ZERO,
        max: IVec2::ZERO,
    };

    /// Build a rectangle from any two opposite corners
    pub fn from_corners(a: IVec2, b: IVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Build a rectangle from its top-left corner and size
    pub fn from_origin_size(origin: IVec2, size: IVec2) -> Self {
        Self::from_corners(origin, origin + size)
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> IVec2 {
        self.max - self.min
    }

    /// Integer center point (rounds toward `min`)
    pub fn center(&self) -> IVec2 {
        self.min + self.size() / 2
    }

    /// Point containment including the edges
    pub fn contains_inclusive(&self, point: IVec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Translate by `delta`
    pub fn offset(&self, delta: IVec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// True when `min <= max` on both axes
    pub fn is_normalized(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// 8-bit RGBA color, straight (non-premultiplied) alpha
///
/// Serializes as a `[r, g, b, a]` array so theme files stay compact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
    pub const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);
    pub const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Normalized `[0, 1]` components
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Rgba8> for [u8; 4] {
    fn from(c: Rgba8) -> Self {
        c.to_array()
    }
}
