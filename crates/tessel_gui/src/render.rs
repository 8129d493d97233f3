//! Screen-space drawing of the element tree
//!
//! Roots are drawn in insertion order, each subtree depth first with parents before
//! children, so later siblings paint over earlier ones. An element's draw hook runs
//! before its quad; hidden elements skip the quad but their children still draw.

use smallvec::SmallVec;
use tessel_core::{BlendMode, GpuBackend, PointerState, ShaderId};
use tessel_render::{AlphaMode, Texture};

use crate::context::GuiResources;
use crate::error::Result;
use crate::router;
use crate::tree::{ElementId, ElementTree};

/// Blend state matching how a texture stores alpha
pub fn blend_for(texture: &Texture) -> BlendMode {
    match texture.alpha_mode() {
        AlphaMode::Premultiplied => BlendMode::Premultiplied,
        _ => BlendMode::Alpha,
    }
}

/// Draw every root and its subtree with the UI shader
///
/// Tree mutations requested by draw hooks are deferred until the next flush.
pub(crate) fn draw_tree(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    backend: &mut dyn GpuBackend,
    shader: ShaderId,
) -> Result<()> {
    tree.begin_traversal();
    let roots = tree.roots().to_vec();
    let result = roots
        .into_iter()
        .try_for_each(|root| draw_element(tree, resources, pointer, backend, shader, root));
    tree.end_traversal();
    result
}

fn draw_element(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    backend: &mut dyn GpuBackend,
    shader: ShaderId,
    id: ElementId,
) -> Result<()> {
    router::draw_hook(tree, resources, pointer, id)?;

    let element = tree.get_mut(id)?;
    if element.visible {
        draw_quad(element, backend, shader)?;
    }

    let children: SmallVec<[ElementId; 8]> = element.children.values().copied().collect();
    for child in children {
        draw_element(tree, resources, pointer, backend, shader, child)?;
    }
    Ok(())
}

/// Bind the element's texture and draw its quad
pub(crate) fn draw_quad(
    element: &mut crate::element::Element,
    backend: &mut dyn GpuBackend,
    shader: ShaderId,
) -> Result<()> {
    element.texture.bind(backend, 0)?;
    backend.set_blend(blend_for(&element.texture));
    element.quad.draw(backend, shader)?;
    Ok(())
}
