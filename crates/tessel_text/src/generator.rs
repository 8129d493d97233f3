//! String and text-block rasters
//!
//! Cells from the cache are laid out left to right, tinted with a single color and
//! written as premultiplied RGBA8, rows top-down.

use tessel_core::Rgba8;

use crate::cache::GlyphCache;
use crate::rasterizer::{GlyphCell, GlyphRasterizer};
use crate::Result;

/// Pixel height of one line of text at `size`
pub fn line_height(size: u32) -> u32 {
    (size as f64 * 1.2) as u32
}

/// A single line of text rendered to pixels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringRaster {
    /// Advance of each character in pixels, one per `char`
    pub advances: Vec<u32>,
    /// Premultiplied RGBA8, `width * height * 4` bytes
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl StringRaster {
    fn placeholder(advances: Vec<u32>) -> Self {
        Self {
            advances,
            pixels: vec![0; 4],
            width: 1,
            height: 1,
        }
    }

    /// True for the 1x1 stand-in produced by empty or zero-width text
    pub fn is_placeholder(&self) -> bool {
        self.width == 1 && self.height == 1 && self.pixels == [0; 4]
    }
}

/// Wrapped multi-line text rendered to pixels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    pub advances: Vec<u32>,
    /// Char index where each line starts, followed by the char count
    pub line_starts: Vec<usize>,
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextBlock {
    pub fn line_count(&self) -> usize {
        self.line_starts.len().saturating_sub(1)
    }

    /// Char range of line `n`
    pub fn line(&self, n: usize) -> Option<std::ops::Range<usize>> {
        Some(*self.line_starts.get(n)?..*self.line_starts.get(n + 1)?)
    }
}

fn premultiply(color: Rgba8, coverage: u8) -> [u8; 4] {
    let a = color.a as u32 * coverage as u32 / 255;
    let scale = |c: u8| (c as u32 * a / 255) as u8;
    [scale(color.r), scale(color.g), scale(color.b), a as u8]
}

/// Copy `cell` into an RGBA8 canvas at (`x`, `y`)
fn blit(canvas: &mut [u8], canvas_width: u32, x: u32, y: u32, cell: &GlyphCell, color: Rgba8) {
    for row in 0..cell.height {
        let start = ((y + row) * canvas_width + x) as usize * 4;
        for col in 0..cell.width.min(canvas_width.saturating_sub(x)) {
            let coverage = cell.coverage_at(col, row);
            if coverage == 0 {
                continue;
            }
            let i = start + col as usize * 4;
            canvas[i..i + 4].copy_from_slice(&premultiply(color, coverage));
        }
    }
}

/// Rasterizes strings through a glyph cache
pub struct TextGenerator {
    rasterizer: Box<dyn GlyphRasterizer>,
    cache: GlyphCache,
}

impl TextGenerator {
    pub fn new(rasterizer: Box<dyn GlyphRasterizer>) -> Self {
        Self {
            rasterizer,
            cache: GlyphCache::new(),
        }
    }

    /// Generator over the default system sans-serif font
    pub fn system() -> Result<Self> {
        Ok(Self::new(Box::new(crate::SwashRasterizer::system(None)?)))
    }

    /// System font if one is installed, block glyphs otherwise
    pub fn system_or_fixed() -> Self {
        match Self::system() {
            Ok(generator) => generator,
            Err(e) => {
                tracing::warn!("no usable system font ({}), falling back to block glyphs", e);
                Self::new(Box::new(crate::FixedRasterizer))
            }
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn cell(&mut self, ch: char, size: u32) -> Result<GlyphCell> {
        self.cache
            .get_or_rasterize(self.rasterizer.as_mut(), ch, size)
            .cloned()
    }

    /// Advance of every character of `text`
    pub fn char_advances(&mut self, text: &str, size: u32) -> Result<Vec<u32>> {
        text.chars()
            .map(|ch| Ok(self.cell(ch, size)?.width))
            .collect()
    }

    /// Render `text` on one line
    ///
    /// Empty text, or text whose glyphs are all zero-width, yields a 1x1 transparent
    /// raster so callers always get an uploadable texture.
    pub fn string_raster(&mut self, text: &str, size: u32, color: Rgba8) -> Result<StringRaster> {
        let cells = text
            .chars()
            .map(|ch| self.cell(ch, size))
            .collect::<Result<Vec<_>>>()?;
        let advances: Vec<u32> = cells.iter().map(|c| c.width).collect();
        let width: u32 = advances.iter().sum();
        let height = line_height(size);
        if width == 0 || height == 0 {
            return Ok(StringRaster::placeholder(advances));
        }

        let mut pixels = vec![0; (width * height) as usize * 4];
        let mut x = 0;
        for cell in &cells {
            blit(&mut pixels, width, x, 0, cell, color);
            x += cell.width;
        }
        Ok(StringRaster {
            advances,
            pixels,
            width,
            height,
        })
    }

    /// Render `text` wrapped to `max_width` pixels
    ///
    /// Lines break before the character that would overflow, and at `\n`.
    pub fn text_block(&mut self, text: &str, size: u32, color: Rgba8, max_width: u32) -> Result<TextBlock> {
        let cells = text
            .chars()
            .map(|ch| self.cell(ch, size))
            .collect::<Result<Vec<_>>>()?;
        let advances: Vec<u32> = cells.iter().map(|c| c.width).collect();
        let lh = line_height(size);

        let mut line_starts = vec![0];
        let mut line_width = 0;
        for (i, (ch, advance)) in text.chars().zip(&advances).enumerate() {
            if ch == '\n' {
                line_starts.push(i + 1);
                line_width = 0;
                continue;
            }
            line_width += advance;
            if line_width > max_width && i > *line_starts.last().unwrap_or(&0) {
                line_starts.push(i);
                line_width = *advance;
            }
        }
        line_starts.push(cells.len());

        let lines = line_starts.len() - 1;
        let width = max_width.max(1);
        let height = (lh * lines as u32).max(1);
        let mut pixels = vec![0; (width * height) as usize * 4];
        for (line, bounds) in line_starts.windows(2).enumerate() {
            let mut x = 0;
            for (cell, ch) in cells[bounds[0]..bounds[1]]
                .iter()
                .zip(text.chars().skip(bounds[0]))
            {
                if ch != '\n' {
                    blit(&mut pixels, width, x, line as u32 * lh, cell, color);
                    x += cell.width;
                }
            }
        }
        tracing::trace!("text block: {} chars, {} lines", cells.len(), lines);

        Ok(TextBlock {
            advances,
            line_starts,
            pixels,
            width,
            height,
        })
    }
}
