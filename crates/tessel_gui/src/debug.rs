//! Debug outlines
//!
//! Draws a one-pixel box in the theme's debug color around selected elements or
//! arbitrary rectangles, on top of the tree. Elements keep their own textures; the
//! overlay owns its quads and caches one outline texture per size.

use rustc_hash::FxHashMap;
use tessel_core::{BlendMode, DVec2, GpuBackend, IRect, IVec2, Rgba8, ShaderId};
use tessel_render::{Mesh, Texture};

use crate::element::{new_quad, quad_vertices, write_quad};
use crate::error::Result;
use crate::tree::{ElementId, ElementTree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugEntry {
    /// Follows the element's box every frame
    Outline(ElementId),
    Rect(IRect),
}

#[derive(Default)]
pub struct DebugOverlay {
    entries: Vec<DebugEntry>,
    quads: Vec<Mesh>,
    textures: FxHashMap<(IVec2, Rgba8), Texture>,
}

impl std::fmt::Debug for DebugOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugOverlay")
            .field("entries", &self.entries)
            .field("cached_textures", &self.textures.len())
            .finish()
    }
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outline(&mut self, id: ElementId) {
        if !self.entries.contains(&DebugEntry::Outline(id)) {
            self.entries.push(DebugEntry::Outline(id));
        }
    }

    pub fn rect(&mut self, rect: IRect) {
        self.entries.push(DebugEntry::Rect(rect));
    }

    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Draw all outlines; entries for removed elements are dropped
    pub(crate) fn draw(
        &mut self,
        tree: &ElementTree,
        color: Rgba8,
        backend: &mut dyn GpuBackend,
        shader: ShaderId,
    ) -> Result<()> {
        self.entries.retain(|entry| match entry {
            DebugEntry::Outline(id) => tree.contains(*id),
            DebugEntry::Rect(_) => true,
        });

        for (i, entry) in self.entries.iter().enumerate() {
            let rect = match entry {
                DebugEntry::Outline(id) => tree.get(*id)?.bounding_box(),
                DebugEntry::Rect(rect) => *rect,
            };
            if rect.width() <= 0 || rect.height() <= 0 {
                continue;
            }

            let texture = self.textures.entry((rect.size(), color)).or_insert_with(|| {
                Texture::solid_box(rect.width() as u32, rect.height() as u32, Rgba8::TRANSPARENT, 1, color)
            });
            if self.quads.len() <= i {
                self.quads.push(new_quad(tree.layout())?);
            }
            let quad = &mut self.quads[i];
            write_quad(quad, &quad_vertices(rect, tree.window(), DVec2::ZERO, DVec2::ONE))?;

            texture.bind(backend, 0)?;
            backend.set_blend(BlendMode::Alpha);
            quad.draw(backend, shader)?;
        }
        Ok(())
    }
}
