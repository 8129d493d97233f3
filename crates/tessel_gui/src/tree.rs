//! The element arena
//!
//! Every element lives in one [`SlotMap`]; parents list their children by id in
//! insertion order and children keep a plain id back to their parent, so there are
//! no ownership cycles. Removing an element drops its whole subtree, which in turn
//! queues the GPU buffers of their quads for release.
//!
//! Structural changes requested while a traversal (event dispatch or draw) is running
//! are queued and applied by [`ElementTree::flush`] at the next frame boundary.
//! Disposing a root is always queued.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tessel_core::{CoreError, DVec2, IVec2};
use tessel_render::{names, AttributeLayout, RenderError, Texture};

use crate::align::Align;
use crate::element::{quad_vertices, write_quad, Element, ElementDesc};
use crate::error::{GuiError, Result};
use crate::router::Interactive;

new_key_type! {
    /// Handle to an element in an [`ElementTree`]
    pub struct ElementId;
}

/// A structural change waiting for the frame boundary
#[derive(Debug)]
enum TreeOp {
    AddRoot(ElementId),
    AddChild {
        parent: ElementId,
        name: String,
        child: ElementId,
    },
    Remove(ElementId),
}

pub struct ElementTree {
    elements: SlotMap<ElementId, Element>,
    roots: Vec<ElementId>,
    layout: AttributeLayout,
    window: IVec2,
    traversal: u32,
    pending: Vec<TreeOp>,
}

impl std::fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementTree")
            .field("elements", &self.elements.len())
            .field("roots", &self.roots.len())
            .field("window", &self.window)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ElementTree {
    /// Empty tree whose quads use `layout`, which must hold a 2D `position` and a `tex_coord`
    pub fn new(layout: AttributeLayout, window: IVec2) -> Result<Self> {
        for name in [names::POSITION, names::TEX_COORD] {
            let slot = layout.require(name)?;
            if slot.components != 2 {
                return Err(RenderError::AttributeSize {
                    name: name.to_string(),
                    expected: 2,
                    actual: slot.components as usize,
                }
                .into());
            }
        }
        Ok(Self {
            elements: SlotMap::with_key(),
            roots: Vec::new(),
            layout,
            window: window.max(IVec2::ONE),
            traversal: 0,
            pending: Vec::new(),
        })
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    pub fn window(&self) -> IVec2 {
        self.window
    }

    /// Resize the window and re-place every root
    pub fn set_window(&mut self, window: IVec2) -> Result<()> {
        self.window = window.max(IVec2::ONE);
        for root in self.roots.clone() {
            self.update_vertices(root)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Roots in draw and dispatch order
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn get(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or(GuiError::StaleElement(id))
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements.get_mut(id).ok_or(GuiError::StaleElement(id))
    }

    /// Named child of `parent`
    pub fn child(&self, parent: ElementId, name: &str) -> Result<ElementId> {
        self.get(parent)?.child(name).ok_or_else(|| GuiError::MissingChild {
            parent,
            name: name.to_string(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structure
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a detached element, placed as if it were a root
    pub fn create(&mut self, desc: ElementDesc) -> Result<ElementId> {
        let element = Element::new(desc, &self.layout)?;
        let id = self.elements.insert(element);
        self.update_vertices(id)?;
        Ok(id)
    }

    /// Create an element and add it as a root
    pub fn spawn_root(&mut self, desc: ElementDesc) -> Result<ElementId> {
        let id = self.create(desc)?;
        self.add_root(id)?;
        Ok(id)
    }

    /// Create an element and add it as a named child
    pub fn spawn_child(&mut self, parent: ElementId, name: &str, desc: ElementDesc) -> Result<ElementId> {
        let id = self.create(desc)?;
        self.add_child(parent, name, id)?;
        Ok(id)
    }

    fn check_detached(&self, id: ElementId) -> Result<()> {
        let element = self.get(id)?;
        if element.root || element.parent.is_some() {
            return Err(GuiError::AlreadyAttached(id));
        }
        Ok(())
    }

    pub fn add_root(&mut self, id: ElementId) -> Result<()> {
        self.check_detached(id)?;
        if self.is_traversing() {
            self.pending.push(TreeOp::AddRoot(id));
            return Ok(());
        }
        self.apply_add_root(id)
    }

    fn apply_add_root(&mut self, id: ElementId) -> Result<()> {
        self.check_detached(id)?;
        self.get_mut(id)?.root = true;
        self.roots.push(id);
        self.update_vertices(id)
    }

    /// Attach a detached element under `parent`
    ///
    /// A child already registered under `name` is removed along with its subtree.
    pub fn add_child(&mut self, parent: ElementId, name: &str, child: ElementId) -> Result<()> {
        self.check_detached(child)?;
        self.get(parent)?;
        if self.is_traversing() {
            self.pending.push(TreeOp::AddChild {
                parent,
                name: name.to_string(),
                child,
            });
            return Ok(());
        }
        self.apply_add_child(parent, name, child)
    }

    fn apply_add_child(&mut self, parent: ElementId, name: &str, child: ElementId) -> Result<()> {
        self.check_detached(child)?;
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(CoreError::InvalidArgument(format!(
                    "cannot attach {child:?} below its own descendant {parent:?}"
                ))
                .into());
            }
            ancestor = self.get(id)?.parent;
        }

        let previous = self.get_mut(parent)?.children.insert(name.to_string(), child);
        if let Some(previous) = previous {
            self.destroy(previous);
        }
        self.get_mut(child)?.parent = Some(parent);
        self.update_vertices(child)
    }

    /// Remove an element and its subtree
    ///
    /// Roots are disposed at the next [`flush`](Self::flush). Other elements are detached
    /// at once, unless a traversal is running.
    pub fn remove(&mut self, id: ElementId) -> Result<()> {
        let root = self.get(id)?.root;
        if root || self.is_traversing() {
            self.pending.push(TreeOp::Remove(id));
            return Ok(());
        }
        self.apply_remove(id);
        Ok(())
    }

    fn apply_remove(&mut self, id: ElementId) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        if element.root {
            self.roots.retain(|r| *r != id);
        } else if let Some(parent) = element.parent.and_then(|p| self.elements.get_mut(p)) {
            parent.children.retain(|_, child| *child != id);
        }
        self.destroy(id);
    }

    /// Drop `id` and every descendant
    fn destroy(&mut self, id: ElementId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(element) = self.elements.remove(next) {
                stack.extend(element.children.values().copied());
            }
        }
    }

    /// Number of queued structural changes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply queued structural changes, returning how many were applied
    ///
    /// Changes that refer to elements removed in the meantime are dropped. A change that
    /// fails is logged and skipped; the rest of the queue is still applied.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let ops = std::mem::take(&mut self.pending);
        let total = ops.len();
        let mut applied = 0;
        for op in ops {
            let result = match op {
                TreeOp::AddRoot(id) => self.apply_add_root(id),
                TreeOp::AddChild { parent, name, child } => self.apply_add_child(parent, &name, child),
                TreeOp::Remove(id) => {
                    self.apply_remove(id);
                    Ok(())
                }
            };
            match result {
                Ok(()) => applied += 1,
                Err(GuiError::StaleElement(id)) => {
                    tracing::debug!("dropping deferred change for removed element {:?}", id)
                }
                Err(e) => tracing::warn!("skipping deferred tree change: {}", e),
            }
        }
        tracing::debug!("applied {} of {} deferred tree changes", applied, total);
        Ok(applied)
    }

    pub fn is_traversing(&self) -> bool {
        self.traversal > 0
    }

    pub(crate) fn begin_traversal(&mut self) {
        self.traversal += 1;
    }

    pub(crate) fn end_traversal(&mut self) {
        self.traversal = self.traversal.saturating_sub(1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Geometry
    // ─────────────────────────────────────────────────────────────────────────

    /// Window-space point the element's align is resolved around
    pub fn absolute_position(&self, id: ElementId) -> Result<IVec2> {
        let mut element = self.get(id)?;
        let mut position = element.position;
        while let Some(parent) = element.parent {
            element = self.get(parent)?;
            position += element.position;
        }
        let anchor = (element.anchor * self.window.as_dvec2()).as_ivec2();
        Ok(position + anchor)
    }

    /// Recompute the box and quad of `id` and all of its descendants
    pub fn update_vertices(&mut self, id: ElementId) -> Result<()> {
        let origin = self.absolute_position(id)?;
        self.place_subtree(id, origin)
    }

    fn place_subtree(&mut self, id: ElementId, origin: IVec2) -> Result<()> {
        let window = self.window;
        let element = self.get_mut(id)?;
        element.bbox = element.align.place(origin, element.size);
        debug_assert!(element.bbox.is_normalized());
        let vertices = quad_vertices(element.bbox, window, element.tex_min, element.tex_max);
        write_quad(&mut element.quad, &vertices)?;

        let children: SmallVec<[ElementId; 8]> = element.children.values().copied().collect();
        for child in children {
            let offset = self.get(child)?.position;
            self.place_subtree(child, origin + offset)?;
        }
        Ok(())
    }

    pub fn set_pos(&mut self, id: ElementId, position: IVec2) -> Result<()> {
        self.get_mut(id)?.position = position;
        self.update_vertices(id)
    }

    pub fn move_by(&mut self, id: ElementId, delta: IVec2) -> Result<()> {
        self.get_mut(id)?.position += delta;
        self.update_vertices(id)
    }

    pub fn resize(&mut self, id: ElementId, size: IVec2) -> Result<()> {
        self.get_mut(id)?.size = size;
        self.update_vertices(id)
    }

    /// Section of the texture drawn on the element, as fractions of its size
    pub fn set_tex_coords(&mut self, id: ElementId, min: DVec2, max: DVec2) -> Result<()> {
        let element = self.get_mut(id)?;
        element.tex_min = min;
        element.tex_max = max;
        self.update_vertices(id)
    }

    pub fn set_align(&mut self, id: ElementId, align: Align) -> Result<()> {
        self.get_mut(id)?.align = align;
        self.update_vertices(id)
    }

    pub fn set_anchor(&mut self, id: ElementId, anchor: DVec2) -> Result<()> {
        self.get_mut(id)?.anchor = anchor;
        self.update_vertices(id)
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> Result<()> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    /// Swap the texture; unless the size is fixed, the element takes the texture's size
    ///
    /// Passing the current texture does nothing.
    pub fn update_texture(&mut self, id: ElementId, texture: &Texture) -> Result<()> {
        let element = self.get_mut(id)?;
        if element.texture == *texture {
            return Ok(());
        }
        element.texture = texture.clone();
        if element.fixed_size {
            return Ok(());
        }
        element.size = texture.size();
        self.update_vertices(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Vertical distance from the top of the box to its center
    pub fn center_y_offset(&self, id: ElementId) -> Result<i32> {
        Ok(self.get(id)?.center_y_offset())
    }

    /// Vector from the top-left of the box to the element's absolute position
    pub fn pos_offset(&self, id: ElementId) -> Result<IVec2> {
        Ok(self.absolute_position(id)? - self.get(id)?.bbox.min)
    }

    /// `id` and its descendants matching `predicate`, depth first
    pub fn children_where(&self, id: ElementId, predicate: impl Fn(&Element) -> bool) -> Result<Vec<ElementId>> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let element = self.get(next)?;
            if predicate(element) {
                found.push(next);
            }
            stack.extend(element.children.values().rev().copied());
        }
        Ok(found)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Behaviour
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_behaviour(&mut self, id: ElementId, behaviour: Box<dyn Interactive>) -> Result<()> {
        self.get_mut(id)?.behaviour = Some(behaviour);
        Ok(())
    }

    /// Widget state of `id`, if it is a `T`
    pub fn behaviour<T: Interactive>(&self, id: ElementId) -> Result<&T> {
        self.get(id)?
            .behaviour
            .as_ref()
            .and_then(|b| b.as_any().downcast_ref::<T>())
            .ok_or(GuiError::WrongBehaviour(id, std::any::type_name::<T>()))
    }

    pub fn behaviour_mut<T: Interactive>(&mut self, id: ElementId) -> Result<&mut T> {
        self.get_mut(id)?
            .behaviour
            .as_mut()
            .and_then(|b| b.as_any_mut().downcast_mut::<T>())
            .ok_or(GuiError::WrongBehaviour(id, std::any::type_name::<T>()))
    }

    pub(crate) fn take_behaviour(&mut self, id: ElementId) -> Option<Box<dyn Interactive>> {
        self.elements.get_mut(id).and_then(|e| e.behaviour.take())
    }

    pub(crate) fn restore_behaviour(&mut self, id: ElementId, behaviour: Box<dyn Interactive>) {
        if let Some(element) = self.elements.get_mut(id) {
            element.behaviour = Some(behaviour);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Rgba8;

    fn tree() -> ElementTree {
        let layout = AttributeLayout::new([("position", 2), ("tex_coord", 2)]);
        ElementTree::new(layout, IVec2::new(1000, 1000)).unwrap()
    }

    fn boxed(w: u32, h: u32) -> Texture {
        Texture::solid_box(w, h, Rgba8::WHITE, 0, Rgba8::WHITE)
    }

    #[test]
    fn test_rejects_3d_layout() {
        let layout = AttributeLayout::new([("position", 3), ("tex_coord", 2)]);
        assert!(ElementTree::new(layout, IVec2::ONE).is_err());
        let layout = AttributeLayout::new([("position", 2)]);
        assert!(ElementTree::new(layout, IVec2::ONE).is_err());
    }

    #[test]
    fn test_root_box_and_clip_space() {
        let mut tree = tree();
        let id = tree
            .spawn_root(ElementDesc::new(boxed(300, 40)).at(IVec2::new(100, 100)))
            .unwrap();
        let element = tree.get(id).unwrap();
        assert_eq!(element.bounding_box().min, IVec2::new(100, 100));
        assert_eq!(element.bounding_box().max, IVec2::new(400, 140));
        let left = element.quad().attribute(0, "position").unwrap()[0];
        assert!((left + 0.8).abs() < 1e-12);
        assert_eq!(tree.pos_offset(id).unwrap(), IVec2::ZERO);
    }

    #[test]
    fn test_anchor_offsets_roots() {
        let mut tree = tree();
        let id = tree
            .spawn_root(
                ElementDesc::new(boxed(10, 10))
                    .at(IVec2::new(-5, 0))
                    .anchor(DVec2::new(0.5, 0.25))
                    .align(Align::Center),
            )
            .unwrap();
        assert_eq!(tree.absolute_position(id).unwrap(), IVec2::new(495, 250));
        assert_eq!(tree.get(id).unwrap().bounding_box().min, IVec2::new(490, 245));

        tree.set_window(IVec2::new(2000, 1000)).unwrap();
        assert_eq!(tree.absolute_position(id).unwrap(), IVec2::new(995, 250));
    }

    #[test]
    fn test_parent_move_cascades() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::new(boxed(100, 100))).unwrap();
        let child = tree
            .spawn_child(root, "child", ElementDesc::new(boxed(10, 10)).at(IVec2::new(20, 30)))
            .unwrap();
        let grandchild = tree
            .spawn_child(child, "grandchild", ElementDesc::new(boxed(4, 4)).at(IVec2::new(1, 2)))
            .unwrap();
        let before: Vec<_> = [child, grandchild]
            .iter()
            .map(|id| tree.get(*id).unwrap().bounding_box())
            .collect();

        let delta = IVec2::new(7, -3);
        tree.move_by(root, delta).unwrap();
        for (id, old) in [child, grandchild].iter().zip(before) {
            let element = tree.get(*id).unwrap();
            assert_eq!(element.bounding_box(), old.offset(delta));
            assert!(element.bounding_box().is_normalized());
        }
        assert_eq!(tree.get(grandchild).unwrap().position(), IVec2::new(1, 2));
    }

    #[test]
    fn test_update_texture_same_handle_is_noop() {
        let mut tree = tree();
        let texture = boxed(30, 20);
        let id = tree.spawn_root(ElementDesc::new(texture.clone())).unwrap();
        let mut backend = tessel_gpu::HeadlessBackend::new(1000, 1000);
        tree.get_mut(id).unwrap().quad.sync(&mut backend).unwrap();

        let before = tree.get(id).unwrap().quad().vertices().to_vec();
        tree.update_texture(id, &texture).unwrap();
        let element = tree.get(id).unwrap();
        assert_eq!(element.size(), IVec2::new(30, 20));
        assert_eq!(element.quad().vertices(), &before[..]);
        assert!(!element.quad().is_dirty());

        tree.update_texture(id, &boxed(50, 10)).unwrap();
        assert_eq!(tree.get(id).unwrap().size(), IVec2::new(50, 10));
        assert!(tree.get(id).unwrap().quad().is_dirty());
    }

    #[test]
    fn test_fixed_size_ignores_texture_size() {
        let mut tree = tree();
        let id = tree
            .spawn_root(ElementDesc::new(boxed(30, 20)).size(IVec2::new(5, 5)))
            .unwrap();
        tree.update_texture(id, &boxed(50, 10)).unwrap();
        assert_eq!(tree.get(id).unwrap().size(), IVec2::new(5, 5));
    }

    #[test]
    fn test_resize_and_set_pos_keep_box_normalized() {
        let mut tree = tree();
        let id = tree
            .spawn_root(ElementDesc::new(boxed(10, 10)).align(Align::LowerRight))
            .unwrap();
        tree.set_pos(id, IVec2::new(50, 50)).unwrap();
        tree.resize(id, IVec2::new(20, 8)).unwrap();
        let bbox = tree.get(id).unwrap().bounding_box();
        assert_eq!(bbox.min, IVec2::new(30, 42));
        assert_eq!(bbox.max, IVec2::new(50, 50));
    }

    #[test]
    fn test_root_disposal_waits_for_flush() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default()).unwrap();
        tree.spawn_child(root, "a", ElementDesc::default()).unwrap();
        tree.remove(root).unwrap();
        assert!(tree.contains(root));
        assert_eq!(tree.pending_len(), 1);

        assert_eq!(tree.flush().unwrap(), 1);
        assert!(!tree.contains(root));
        assert!(tree.roots().is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_child_removal_is_deferred_during_traversal() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default()).unwrap();
        let child = tree.spawn_child(root, "a", ElementDesc::default()).unwrap();

        tree.begin_traversal();
        tree.remove(child).unwrap();
        tree.remove(child).unwrap();
        assert_eq!(tree.child(root, "a").unwrap(), child);
        tree.end_traversal();

        assert_eq!(tree.flush().unwrap(), 2);
        assert!(tree.child(root, "a").is_err());
        assert!(matches!(tree.get(child), Err(GuiError::StaleElement(_))));
    }

    #[test]
    fn test_failed_deferred_change_keeps_later_removals() {
        let mut tree = tree();
        let victim = tree.spawn_root(ElementDesc::default()).unwrap();
        let loose = tree.create(ElementDesc::default()).unwrap();

        tree.begin_traversal();
        tree.add_root(loose).unwrap();
        tree.add_root(loose).unwrap();
        tree.remove(victim).unwrap();
        tree.end_traversal();

        assert_eq!(tree.flush().unwrap(), 2);
        assert!(!tree.contains(victim));
        assert_eq!(tree.roots(), &[loose]);
        assert_eq!(tree.pending_len(), 0);
    }

    #[test]
    fn test_child_removal_outside_traversal_is_immediate() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default()).unwrap();
        let child = tree.spawn_child(root, "a", ElementDesc::default()).unwrap();
        tree.remove(child).unwrap();
        assert!(!tree.contains(child));
        assert_eq!(tree.pending_len(), 0);
    }

    #[test]
    fn test_same_name_replaces_child() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default()).unwrap();
        let first = tree.spawn_child(root, "slot", ElementDesc::default()).unwrap();
        tree.spawn_child(root, "other", ElementDesc::default()).unwrap();
        let second = tree.spawn_child(root, "slot", ElementDesc::default()).unwrap();
        assert!(!tree.contains(first));
        let names: Vec<_> = tree.get(root).unwrap().children().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["slot", "other"]);
        assert_eq!(tree.child(root, "slot").unwrap(), second);
    }

    #[test]
    fn test_attach_rules() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default()).unwrap();
        let child = tree.spawn_child(root, "a", ElementDesc::default()).unwrap();
        assert!(matches!(tree.add_root(child), Err(GuiError::AlreadyAttached(_))));

        let loose = tree.create(ElementDesc::default()).unwrap();
        let below = tree.spawn_child(loose, "b", ElementDesc::default()).unwrap();
        assert!(tree.add_child(below, "loop", loose).is_err());
    }

    #[test]
    fn test_children_where_walks_in_order() {
        let mut tree = tree();
        let root = tree.spawn_root(ElementDesc::default().hidden()).unwrap();
        let a = tree.spawn_child(root, "a", ElementDesc::default()).unwrap();
        let a1 = tree.spawn_child(a, "a1", ElementDesc::default().hidden()).unwrap();
        let b = tree.spawn_child(root, "b", ElementDesc::default().hidden()).unwrap();
        let hidden = tree.children_where(root, |e| !e.is_visible()).unwrap();
        assert_eq!(hidden, vec![root, a1, b]);
    }
}
