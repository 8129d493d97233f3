//! Glyph rasterization
//!
//! A rasterizer renders one character into a [`GlyphCell`]: an 8-bit coverage mask as
//! wide as the character's advance and as tall as the line, with the glyph placed on a
//! shared baseline. Cells can then be laid side by side to form a string.

use std::path::Path;

use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use swash::{CacheKey, FontRef};

use crate::generator::line_height;
use crate::{Result, TextError};

/// One rasterized character, rows top-down
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphCell {
    /// Advance width in pixels
    pub width: u32,
    pub height: u32,
    /// `width * height` coverage values
    pub coverage: Vec<u8>,
}

impl GlyphCell {
    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }
}

/// Text-to-bitmap service behind the glyph cache
pub trait GlyphRasterizer {
    /// Stable identifier of the font, part of every cache key
    fn font_key(&self) -> u64;

    /// Rasterize `ch` at `size` pixels into a line-height cell
    fn rasterize(&mut self, ch: char, size: u32) -> Result<GlyphCell>;
}

/// swash-backed rasterizer over one font face
pub struct SwashRasterizer {
    data: Vec<u8>,
    offset: u32,
    key: CacheKey,
    context: ScaleContext,
}

impl SwashRasterizer {
    /// Load a face from raw TTF/OTF bytes
    pub fn from_bytes(data: Vec<u8>, index: usize) -> Result<Self> {
        let font = FontRef::from_index(&data, index).ok_or(TextError::InvalidFontData)?;
        let (offset, key) = (font.offset, font.key);
        Ok(Self {
            data,
            offset,
            key,
            context: ScaleContext::new(),
        })
    }

    /// Load a face from a font file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| TextError::FontLoad(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_bytes(data, 0)
    }

    /// Find an installed font by family name, or the default sans-serif face
    pub fn system(family: Option<&str>) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let families = match family {
            Some(name) => [fontdb::Family::Name(name), fontdb::Family::SansSerif],
            None => [fontdb::Family::SansSerif, fontdb::Family::Serif],
        };
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::NORMAL,
            style: fontdb::Style::Normal,
            stretch: fontdb::Stretch::Normal,
        };
        let name = family.unwrap_or("sans-serif").to_string();
        let id = db.query(&query).ok_or_else(|| TextError::FontNotFound(name.clone()))?;
        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or(TextError::FontLoad(name))?;
        tracing::debug!("loaded system font ({} bytes, face {})", data.len(), index);
        Self::from_bytes(data, index as usize)
    }
}

impl GlyphRasterizer for SwashRasterizer {
    fn font_key(&self) -> u64 {
        self.key.value()
    }

    fn rasterize(&mut self, ch: char, size: u32) -> Result<GlyphCell> {
        // Field-level borrow so the scale context can be borrowed mutably alongside
        let font = FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };
        let glyph_id = font.charmap().map(ch);
        let metrics = font.metrics(&[]);
        let scale = size as f32 / metrics.units_per_em as f32;
        let advance = (font.glyph_metrics(&[]).advance_width(glyph_id) * scale).round().max(0.0) as u32;
        let height = line_height(size);
        let baseline = (metrics.ascent * scale).round() as i32;

        let mut cell = GlyphCell {
            width: advance,
            height,
            coverage: vec![0; (advance * height) as usize],
        };
        if advance == 0 {
            return Ok(cell);
        }

        let mut scaler = self.context.builder(font).size(size as f32).hint(true).build();
        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);
        let Some(image) = render.render(&mut scaler, glyph_id) else {
            // Whitespace has an advance but no outline
            return Ok(cell);
        };

        let placement = image.placement;
        for row in 0..placement.height as i32 {
            let y = baseline - placement.top + row;
            if y < 0 || y >= height as i32 {
                continue;
            }
            for col in 0..placement.width as i32 {
                let x = placement.left + col;
                if x < 0 || x >= advance as i32 {
                    continue;
                }
                let src = (row * placement.width as i32 + col) as usize;
                let dst = (y as u32 * advance + x as u32) as usize;
                cell.coverage[dst] = cell.coverage[dst].max(image.data[src]);
            }
        }
        Ok(cell)
    }
}

/// Font-free rasterizer drawing each visible character as a solid block
///
/// Used when no system font can be found, and by headless tests that need
/// deterministic advances.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedRasterizer;

impl FixedRasterizer {
    /// Advance of every non-control character at `size`
    pub const fn advance(size: u32) -> u32 {
        size / 2
    }
}

impl GlyphRasterizer for FixedRasterizer {
    fn font_key(&self) -> u64 {
        0
    }

    fn rasterize(&mut self, ch: char, size: u32) -> Result<GlyphCell> {
        let height = line_height(size);
        if ch.is_control() {
            return Ok(GlyphCell {
                width: 0,
                height,
                coverage: Vec::new(),
            });
        }
        let width = Self::advance(size);
        let mut coverage = vec![0; (width * height) as usize];
        if !ch.is_whitespace() {
            // Block spans the em box, leaving one pixel of spacing on the right
            let top = (height - size.min(height)) / 2;
            for y in top..(top + size).min(height) {
                for x in 0..width.saturating_sub(1) {
                    coverage[(y * width + x) as usize] = 255;
                }
            }
        }
        Ok(GlyphCell {
            width,
            height,
            coverage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage_font_data() {
        assert!(matches!(
            SwashRasterizer::from_bytes(vec![0; 16], 0),
            Err(TextError::InvalidFontData)
        ));
    }

    #[test]
    fn test_missing_font_file() {
        assert!(matches!(
            SwashRasterizer::from_file("/definitely/not/a/font.ttf"),
            Err(TextError::FontLoad(_))
        ));
    }

    #[test]
    fn test_fixed_blocks() {
        let mut fixed = FixedRasterizer;
        let a = fixed.rasterize('a', 10).unwrap();
        assert_eq!((a.width, a.height), (5, 12));
        assert_eq!(a.coverage_at(0, 6), 255);
        assert_eq!(a.coverage_at(4, 6), 0);
        assert!(fixed.rasterize(' ', 10).unwrap().coverage.iter().all(|&c| c == 0));
        assert_eq!(fixed.rasterize('\n', 10).unwrap().width, 0);
    }

    #[test]
    #[ignore = "requires an installed sans-serif font"]
    fn test_system_font_rasterizes_letters() {
        let mut rasterizer = SwashRasterizer::system(None).unwrap();
        let cell = rasterizer.rasterize('W', 24).unwrap();
        assert!(cell.width > 0);
        assert_eq!(cell.height, 28);
        assert!(cell.coverage.iter().any(|&c| c > 0));

        let space = rasterizer.rasterize(' ', 24).unwrap();
        assert!(space.coverage.iter().all(|&c| c == 0));
    }
}
