//! Immutable 2D textures
//!
//! Pixels are tightly packed RGBA8 rows stored top-down. A [`Texture`] is a cheap,
//! shared handle: cloning it never copies pixels, and two handles are equal only when
//! they point at the same texture. Changing a texture means building a new one.
//!
//! The GPU copy is created on first bind and released when the last handle drops.

use std::cell::OnceCell;
use std::rc::Rc;

use tessel_core::{GpuBackend, GpuResource, IVec2, ReleaseQueue, Rgba8, TextureDesc, TextureId};

use crate::error::{RenderError, Result};

/// How color channels relate to alpha
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Straight,
    /// Color already multiplied by alpha, as produced by the text rasterizer
    Premultiplied,
}

struct GpuTexture {
    id: TextureId,
    release: ReleaseQueue,
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.release.push(GpuResource::Texture(self.id));
    }
}

struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    alpha: AlphaMode,
    gpu: OnceCell<GpuTexture>,
}

/// Shared handle to immutable RGBA8 pixels
#[derive(Clone)]
pub struct Texture {
    inner: Rc<TextureData>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("alpha", &self.inner.alpha)
            .field("uploaded", &self.inner.gpu.get().is_some())
            .finish()
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Texture {}

impl Texture {
    fn build(width: u32, height: u32, pixels: Vec<u8>, alpha: AlphaMode) -> Self {
        Self {
            inner: Rc::new(TextureData {
                width,
                height,
                pixels,
                alpha,
                gpu: OnceCell::new(),
            }),
        }
    }

    /// Wrap straight-alpha RGBA8 pixels
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::checked(width, height, pixels, AlphaMode::Straight)
    }

    /// Wrap premultiplied RGBA8 pixels from a glyph or string raster
    pub fn from_glyph(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::checked(width, height, pixels, AlphaMode::Premultiplied)
    }

    fn checked(width: u32, height: u32, pixels: Vec<u8>, alpha: AlphaMode) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::invalid(format!("texture size {width}x{height}")));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::invalid(format!(
                "expected {expected} bytes for {width}x{height} texture, got {}",
                pixels.len()
            )));
        }
        Ok(Self::build(width, height, pixels, alpha))
    }

    /// One transparent pixel
    pub fn blank() -> Self {
        Self::build(1, 1, vec![0; 4], AlphaMode::Straight)
    }

    /// Filled rectangle with an optional outline `outline_width` pixels thick
    ///
    /// Zero-sized boxes fall back to [`Texture::blank`].
    pub fn solid_box(width: u32, height: u32, fill: Rgba8, outline_width: u32, outline: Rgba8) -> Self {
        if width == 0 || height == 0 {
            return Self::blank();
        }
        let (w, h) = (width as usize, height as usize);
        let ow = (outline_width as usize).min(w).min(h);
        let mut pixels = fill.to_array().repeat(w * h);

        let mut paint = |x: usize, y: usize| {
            let i = (y * w + x) * 4;
            pixels[i..i + 4].copy_from_slice(&outline.to_array());
        };
        for y in (0..ow).chain(h - ow..h) {
            for x in 0..w {
                paint(x, y);
            }
        }
        for y in 0..h {
            for x in (0..ow).chain(w - ow..w) {
                paint(x, y);
            }
        }
        Self::build(width, height, pixels, AlphaMode::Straight)
    }

    /// Disc of the given radius, `2 * radius` pixels across
    ///
    /// With an outline, the outer `outline_width` band (measured in squared distance)
    /// takes the outline color. Pixels outside the disc stay transparent.
    pub fn circle(radius: u32, fill: Rgba8, outline: Option<Rgba8>, outline_width: u32) -> Self {
        if radius == 0 {
            return Self::blank();
        }
        let diameter = radius as usize * 2;
        let r = radius as i64;
        let r_sqr = r * r;
        let mut pixels = vec![0u8; diameter * diameter * 4];

        for row in 0..diameter {
            let dy = row as i64 - r;
            for col in 0..diameter {
                let dx = col as i64 - r;
                let dist_sqr = dx * dx + dy * dy;
                let color = match outline {
                    Some(_) if dist_sqr < r_sqr - outline_width as i64 => Some(fill),
                    Some(outline) if dist_sqr < r_sqr => Some(outline),
                    None if dist_sqr < r_sqr => Some(fill),
                    _ => None,
                };
                if let Some(color) = color {
                    let i = (row * diameter + col) * 4;
                    pixels[i..i + 4].copy_from_slice(&color.to_array());
                }
            }
        }
        Self::build(diameter as u32, diameter as u32, pixels, AlphaMode::Straight)
    }

    /// Square "x" glyph drawn along both diagonals
    ///
    /// Pixels exactly `line_width` away from a diagonal get the color at half alpha.
    pub fn cross(size: u32, line_width: u32, color: Rgba8) -> Self {
        if size == 0 {
            return Self::blank();
        }
        let n = size as usize;
        let lw = line_width as i64;
        let edge = color.with_alpha(color.a / 2);
        let mut pixels = vec![0u8; n * n * 4];

        for row in 0..n {
            for col in 0..n {
                let main = (row as i64 - col as i64).abs();
                let anti = (row as i64 - (n - col) as i64).abs();
                let value = if main < lw || anti < lw {
                    color
                } else if main == lw || anti == lw {
                    edge
                } else {
                    continue;
                };
                let i = (row * n + col) * 4;
                pixels[i..i + 4].copy_from_slice(&value.to_array());
            }
        }
        Self::build(size, size, pixels, AlphaMode::Straight)
    }

    /// Decode a PNG file's bytes
    #[cfg(feature = "png")]
    pub fn decode_png(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.inner.width as i32, self.inner.height as i32)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.inner.alpha
    }

    /// Pixel at column `x`, row `y` (row 0 is the top)
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.inner.width || y >= self.inner.height {
            return None;
        }
        let i = ((y * self.inner.width + x) * 4) as usize;
        let p = &self.inner.pixels[i..i + 4];
        Some(Rgba8::new(p[0], p[1], p[2], p[3]))
    }

    /// Whether the GPU copy exists yet
    pub fn is_uploaded(&self) -> bool {
        self.inner.gpu.get().is_some()
    }

    /// GPU handle, uploading the pixels on first use
    pub fn gpu_id(&self, backend: &mut dyn GpuBackend) -> Result<TextureId> {
        if let Some(gpu) = self.inner.gpu.get() {
            return Ok(gpu.id);
        }
        let desc = TextureDesc::image(self.inner.width, self.inner.height);
        let id = backend.create_texture(&desc, Some(&self.inner.pixels))?;
        let gpu = GpuTexture {
            id,
            release: backend.release_queue(),
        };
        let _ = self.inner.gpu.set(gpu);
        Ok(id)
    }

    /// Upload if needed and bind to a texture unit
    pub fn bind(&self, backend: &mut dyn GpuBackend, unit: u32) -> Result<()> {
        let id = self.gpu_id(backend)?;
        backend.bind_texture(unit, id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_gpu::HeadlessBackend;

    const FILL: Rgba8 = Rgba8::new(10, 20, 30, 255);
    const LINE: Rgba8 = Rgba8::new(200, 200, 200, 255);

    #[test]
    fn test_box_outline() {
        let tex = Texture::solid_box(6, 4, FILL, 1, LINE);
        assert_eq!(tex.pixel(0, 0), Some(LINE));
        assert_eq!(tex.pixel(3, 3), Some(LINE));
        assert_eq!(tex.pixel(5, 2), Some(LINE));
        assert_eq!(tex.pixel(2, 1), Some(FILL));
        assert_eq!(tex.pixel(4, 2), Some(FILL));
    }

    #[test]
    fn test_circle_fill_and_ring() {
        let tex = Texture::circle(10, FILL, Some(LINE), 30);
        assert_eq!(tex.size(), IVec2::new(20, 20));
        assert_eq!(tex.pixel(10, 10), Some(FILL));
        // dist² = 81, inside r² but within the outline band
        assert_eq!(tex.pixel(19, 10), Some(LINE));
        assert_eq!(tex.pixel(0, 0), Some(Rgba8::TRANSPARENT));

        let plain = Texture::circle(10, FILL, None, 30);
        assert_eq!(plain.pixel(19, 10), Some(FILL));
    }

    #[test]
    fn test_cross_diagonals() {
        let tex = Texture::cross(8, 1, LINE);
        assert_eq!(tex.pixel(3, 3), Some(LINE));
        assert_eq!(tex.pixel(4, 3), Some(LINE.with_alpha(127)));
        assert_eq!(tex.pixel(0, 4), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn test_identity_equality() {
        let a = Texture::blank();
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Texture::blank());
    }

    #[test]
    fn test_rejects_bad_pixel_length() {
        assert!(Texture::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Texture::from_rgba(0, 2, Vec::new()).is_err());
        assert_eq!(
            Texture::from_glyph(1, 1, vec![1, 2, 3, 4]).unwrap().alpha_mode(),
            AlphaMode::Premultiplied
        );
    }

    #[test]
    fn test_lazy_upload_and_release() {
        let mut backend = HeadlessBackend::new(10, 10);
        let tex = Texture::solid_box(4, 4, FILL, 0, LINE);
        assert!(!tex.is_uploaded());
        let id = tex.gpu_id(&mut backend).unwrap();
        assert_eq!(tex.gpu_id(&mut backend).unwrap(), id);
        assert_eq!(backend.texture_pixels(id).unwrap(), tex.pixels());

        drop(tex);
        backend.collect_garbage();
        assert_eq!(backend.live_textures(), 0);
    }
}
