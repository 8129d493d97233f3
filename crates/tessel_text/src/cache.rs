//! Glyph cache
//!
//! Rasterized cells are kept for the lifetime of the generator. The cache is never
//! evicted: GUI text uses a handful of sizes over a small character set.

use rustc_hash::FxHashMap;

use crate::rasterizer::{GlyphCell, GlyphRasterizer};
use crate::Result;

/// (character, pixel size, font key)
pub type GlyphKey = (char, u32, u64);

#[derive(Default)]
pub struct GlyphCache {
    cells: FxHashMap<GlyphKey, GlyphCell>,
    misses: u64,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached cell for `ch`, rasterizing it on a miss
    pub fn get_or_rasterize(
        &mut self,
        rasterizer: &mut dyn GlyphRasterizer,
        ch: char,
        size: u32,
    ) -> Result<&GlyphCell> {
        let key = (ch, size, rasterizer.font_key());
        if !self.cells.contains_key(&key) {
            let cell = rasterizer.rasterize(ch, size)?;
            self.misses += 1;
            tracing::trace!("rasterized {:?} at {}px ({}x{})", ch, size, cell.width, cell.height);
            self.cells.insert(key, cell);
        }
        // Just inserted on a miss
        Ok(&self.cells[&key])
    }

    pub fn get(&self, key: &GlyphKey) -> Option<&GlyphCell> {
        self.cells.get(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of rasterizer calls made so far
    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
