//! GUI elements
//!
//! An element is a textured rectangle placed by its [`Align`] around an anchor point.
//! Its screen geometry lives in a four-vertex quad mesh laid out for the UI shader;
//! the tree keeps that mesh in sync whenever position, size, texture or texture
//! coordinates change.

use indexmap::IndexMap;
use tessel_core::{DVec2, IRect, IVec2};
use tessel_render::{names, AttributeLayout, Mesh, Texture};

use crate::align::Align;
use crate::error::Result;
use crate::router::Interactive;
use crate::tree::ElementId;

/// Two triangles: bottom-left, bottom-right, top-right, then bottom-left, top-right, top-left
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Initial state of a new element
#[derive(Clone, Debug)]
pub struct ElementDesc {
    pub position: IVec2,
    pub texture: Option<Texture>,
    pub align: Align,
    /// Fixed size; `None` follows the texture dimensions
    pub size: Option<IVec2>,
    /// Normalized window point a root element is offset from
    pub anchor: DVec2,
    pub visible: bool,
}

impl Default for ElementDesc {
    fn default() -> Self {
        Self {
            position: IVec2::ZERO,
            texture: None,
            align: Align::UpperLeft,
            size: None,
            anchor: DVec2::ZERO,
            visible: true,
        }
    }
}

impl ElementDesc {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture: Some(texture),
            ..Default::default()
        }
    }

    pub fn at(mut self, position: IVec2) -> Self {
        self.position = position;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn size(mut self, size: IVec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn anchor(mut self, anchor: DVec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// `[clip_x, clip_y, u, v]` for each corner of `rect`, bottom-left first, counter-clockwise
///
/// Pixel y grows downwards while clip y grows upwards. Texture rows are stored
/// top-down, so the top edge samples `tex_min.y`.
pub fn quad_vertices(rect: IRect, window: IVec2, tex_min: DVec2, tex_max: DVec2) -> [[f64; 4]; 4] {
    let half = window.max(IVec2::ONE).as_dvec2() / 2.0;
    let clip = |p: IVec2| DVec2::new(p.x as f64 / half.x - 1.0, 1.0 - p.y as f64 / half.y);
    let corners = [
        (IVec2::new(rect.min.x, rect.max.y), DVec2::new(tex_min.x, tex_max.y)),
        (rect.max, tex_max),
        (IVec2::new(rect.max.x, rect.min.y), DVec2::new(tex_max.x, tex_min.y)),
        (rect.min, tex_min),
    ];
    corners.map(|(p, uv)| {
        let c = clip(p);
        [c.x, c.y, uv.x, uv.y]
    })
}

/// Build an unplaced quad for `layout`
pub(crate) fn new_quad(layout: &AttributeLayout) -> Result<Mesh> {
    let stride = layout.stride() as usize;
    Ok(Mesh::new(layout.clone(), vec![0.0; stride * 4], QUAD_INDICES.to_vec())?.with_label("gui quad"))
}

/// Write `vertices` into `quad`, touching only the vertices that changed
pub(crate) fn write_quad(quad: &mut Mesh, vertices: &[[f64; 4]; 4]) -> Result<()> {
    for (i, v) in vertices.iter().enumerate() {
        if quad.attribute(i, names::POSITION)? != &v[0..2] {
            quad.write_attribute(i, names::POSITION, &v[0..2])?;
        }
        if quad.attribute(i, names::TEX_COORD)? != &v[2..4] {
            quad.write_attribute(i, names::TEX_COORD, &v[2..4])?;
        }
    }
    Ok(())
}

/// A node of the [`ElementTree`](crate::ElementTree)
pub struct Element {
    pub(crate) position: IVec2,
    pub(crate) size: IVec2,
    pub(crate) align: Align,
    pub(crate) anchor: DVec2,
    pub(crate) bbox: IRect,
    pub(crate) texture: Texture,
    pub(crate) tex_min: DVec2,
    pub(crate) tex_max: DVec2,
    pub(crate) visible: bool,
    pub(crate) fixed_size: bool,
    pub(crate) parent: Option<ElementId>,
    pub(crate) root: bool,
    pub(crate) children: IndexMap<String, ElementId>,
    pub(crate) quad: Mesh,
    pub(crate) behaviour: Option<Box<dyn Interactive>>,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("bbox", &self.bbox)
            .field("children", &self.children.len())
            .field("interactive", &self.behaviour.is_some())
            .finish()
    }
}

impl Element {
    pub(crate) fn new(desc: ElementDesc, layout: &AttributeLayout) -> Result<Self> {
        let texture = desc.texture.unwrap_or_else(Texture::blank);
        Ok(Self {
            position: desc.position,
            size: desc.size.unwrap_or_else(|| texture.size()),
            align: desc.align,
            anchor: desc.anchor,
            bbox: IRect::ZERO,
            texture,
            tex_min: DVec2::ZERO,
            tex_max: DVec2::ONE,
            visible: desc.visible,
            fixed_size: desc.size.is_some(),
            parent: None,
            root: false,
            children: IndexMap::new(),
            quad: new_quad(layout)?,
            behaviour: None,
        })
    }

    /// Offset from the parent's anchor point, or from the window anchor for roots
    pub fn position(&self) -> IVec2 {
        self.position
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn anchor(&self) -> DVec2 {
        self.anchor
    }

    /// Box in absolute window pixels
    pub fn bounding_box(&self) -> IRect {
        self.bbox
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// `(min, max)` texture coordinates
    pub fn tex_coords(&self) -> (DVec2, DVec2) {
        (self.tex_min, self.tex_max)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = (&str, ElementId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn child(&self, name: &str) -> Option<ElementId> {
        self.children.get(name).copied()
    }

    pub fn has_behaviour(&self) -> bool {
        self.behaviour.is_some()
    }

    /// The GPU-bound quad
    pub fn quad(&self) -> &Mesh {
        &self.quad
    }

    /// Distance from the top of the box to its vertical center
    pub fn center_y_offset(&self) -> i32 {
        self.bbox.center().y - self.bbox.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_quad_corners_and_flip() {
        let rect = IRect::from_corners(IVec2::new(100, 100), IVec2::new(400, 140));
        let v = quad_vertices(rect, IVec2::new(1000, 1000), DVec2::ZERO, DVec2::ONE);
        // bottom-left
        assert!(close(&v[0], &[-0.8, 0.72, 0.0, 1.0]));
        // top-right
        assert!(close(&v[2], &[-0.2, 0.8, 1.0, 0.0]));
        // top-left samples the first texture row
        assert!(close(&v[3], &[-0.8, 0.8, 0.0, 0.0]));
    }

    #[test]
    fn test_write_quad_dirties_only_changes() {
        let layout = AttributeLayout::new([("position", 2), ("tex_coord", 2)]);
        let mut backend = tessel_gpu::HeadlessBackend::new(20, 20);
        let rect = IRect::from_corners(IVec2::ZERO, IVec2::new(10, 10));
        let v = quad_vertices(rect, IVec2::new(20, 20), DVec2::ZERO, DVec2::ONE);

        let mut quad = new_quad(&layout).unwrap();
        write_quad(&mut quad, &v).unwrap();
        quad.sync(&mut backend).unwrap();
        write_quad(&mut quad, &v).unwrap();
        assert!(!quad.is_dirty());

        let mut moved = v;
        moved[1][0] += 0.5;
        write_quad(&mut quad, &moved).unwrap();
        assert_eq!(quad.dirty_range(), Some(4..6));
    }
}
