//! Event routing
//!
//! Raw input is broadcast to every root element. An element with a behaviour receives the
//! event through its [`Interactive`] hooks; containers then pass it on to all of their
//! children. Pointer motion is turned into enter, exit and drag signals here, from the
//! element's box and the motion delta, so widgets never track the previous position.
//!
//! Button presses, releases and keyboard input are not culled by position: each
//! behaviour hit-tests for itself, and a press outside its box is how a text box
//! learns it lost focus.

use std::any::Any;

use smallvec::SmallVec;
use tessel_core::{InputEvent, IVec2, KeyEvent, MouseButton, PointerState};

use crate::context::GuiResources;
use crate::error::{GuiError, Result};
use crate::tree::{ElementId, ElementTree};

/// Widget behaviour attached to an element
///
/// Every hook defaults to doing nothing.
#[allow(unused_variables)]
pub trait Interactive: Any {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        Ok(())
    }

    fn mouse_up(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        Ok(())
    }

    /// Raw motion, after any enter, exit or drag signal for the same event
    fn mouse_move(&mut self, cx: &mut EventCx<'_>, pos: IVec2, delta: IVec2) -> Result<()> {
        Ok(())
    }

    fn mouse_enter(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        Ok(())
    }

    fn mouse_exit(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        Ok(())
    }

    /// Motion with the primary button held, wherever the pointer is
    fn mouse_drag(&mut self, cx: &mut EventCx<'_>, pos: IVec2, delta: IVec2) -> Result<()> {
        Ok(())
    }

    fn text_input(&mut self, cx: &mut EventCx<'_>, text: &str) -> Result<()> {
        Ok(())
    }

    fn key_input(&mut self, cx: &mut EventCx<'_>, key: KeyEvent) -> Result<()> {
        Ok(())
    }

    /// Runs once per frame before the element's quad is drawn
    fn draw(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        Ok(())
    }

    /// Whether input should continue on to the element's children
    fn forwards_events(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything a hook may touch while handling an event
pub struct EventCx<'a> {
    pub tree: &'a mut ElementTree,
    pub resources: &'a mut GuiResources,
    pub pointer: PointerState,
    id: ElementId,
}

impl<'a> EventCx<'a> {
    pub fn new(
        tree: &'a mut ElementTree,
        resources: &'a mut GuiResources,
        pointer: PointerState,
        id: ElementId,
    ) -> Self {
        Self {
            tree,
            resources,
            pointer,
            id,
        }
    }

    /// The element whose hook is running
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Reborrow for another element
    pub fn for_element(&mut self, id: ElementId) -> EventCx<'_> {
        EventCx {
            tree: &mut *self.tree,
            resources: &mut *self.resources,
            pointer: self.pointer,
            id,
        }
    }

    /// Run `f` on the behaviour of `id`, which must be a `T`
    ///
    /// The behaviour is moved out of the tree for the duration of the call.
    pub fn with_behaviour<T, R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut T, &mut EventCx<'_>) -> Result<R>,
    ) -> Result<R>
    where
        T: Interactive,
    {
        let mut behaviour = self
            .tree
            .take_behaviour(id)
            .ok_or(GuiError::WrongBehaviour(id, std::any::type_name::<T>()))?;
        let result = match behaviour.as_any_mut().downcast_mut::<T>() {
            Some(typed) => f(typed, &mut self.for_element(id)),
            None => Err(GuiError::WrongBehaviour(id, std::any::type_name::<T>())),
        };
        self.tree.restore_behaviour(id, behaviour);
        result
    }
}

/// Deliver `event` to every root, deferring tree mutations until the traversal ends
pub(crate) fn dispatch(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    event: &InputEvent,
) -> Result<()> {
    tree.begin_traversal();
    let result = dispatch_roots(tree, resources, pointer, event);
    tree.end_traversal();
    result
}

fn dispatch_roots(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    event: &InputEvent,
) -> Result<()> {
    let roots = tree.roots().to_vec();
    for root in roots {
        dispatch_to(tree, resources, pointer, root, event)?;
    }
    Ok(())
}

fn dispatch_to(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    id: ElementId,
    event: &InputEvent,
) -> Result<()> {
    let Some(mut behaviour) = tree.take_behaviour(id) else {
        return Ok(());
    };
    let result = deliver(
        behaviour.as_mut(),
        &mut EventCx::new(tree, resources, pointer, id),
        event,
    );
    let forwards = behaviour.forwards_events();
    tree.restore_behaviour(id, behaviour);
    result?;

    if forwards {
        let children: SmallVec<[ElementId; 8]> = tree.get(id)?.children().map(|(_, child)| child).collect();
        for child in children {
            dispatch_to(tree, resources, pointer, child, event)?;
        }
    }
    Ok(())
}

fn deliver(behaviour: &mut dyn Interactive, cx: &mut EventCx<'_>, event: &InputEvent) -> Result<()> {
    match event {
        InputEvent::MouseDown { pos, button } => behaviour.mouse_down(cx, *pos, *button),
        InputEvent::MouseUp { pos, button } => behaviour.mouse_up(cx, *pos, *button),
        InputEvent::MouseMove { pos, delta } => {
            let bbox = cx.tree.get(cx.id())?.bounding_box();
            if cx.pointer.primary_down() {
                behaviour.mouse_drag(cx, *pos, *delta)?;
            }
            let is_within = bbox.contains_inclusive(*pos);
            let was_within = bbox.contains_inclusive(*pos - *delta);
            if is_within && !was_within {
                behaviour.mouse_enter(cx)?;
            } else if was_within && !is_within {
                behaviour.mouse_exit(cx)?;
            }
            behaviour.mouse_move(cx, *pos, *delta)
        }
        InputEvent::TextInput(text) => behaviour.text_input(cx, text),
        InputEvent::Key(key) => behaviour.key_input(cx, *key),
        InputEvent::Resize { .. } => Ok(()),
    }
}

/// Run the draw hook of `id`, if it has a behaviour
pub(crate) fn draw_hook(
    tree: &mut ElementTree,
    resources: &mut GuiResources,
    pointer: PointerState,
    id: ElementId,
) -> Result<()> {
    let Some(mut behaviour) = tree.take_behaviour(id) else {
        return Ok(());
    };
    let result = behaviour.draw(&mut EventCx::new(tree, resources, pointer, id));
    tree.restore_behaviour(id, behaviour);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::Rgba8;
    use tessel_render::{AttributeLayout, Texture};

    use crate::element::ElementDesc;

    #[derive(Default)]
    struct Counter {
        enter: u32,
        exit: u32,
        drag: u32,
        moves: u32,
        forward: bool,
    }

    impl Interactive for Counter {
        fn mouse_move(&mut self, _cx: &mut EventCx<'_>, _pos: IVec2, _delta: IVec2) -> Result<()> {
            self.moves += 1;
            Ok(())
        }

        fn mouse_enter(&mut self, _cx: &mut EventCx<'_>) -> Result<()> {
            self.enter += 1;
            Ok(())
        }

        fn mouse_exit(&mut self, _cx: &mut EventCx<'_>) -> Result<()> {
            self.exit += 1;
            Ok(())
        }

        fn mouse_drag(&mut self, _cx: &mut EventCx<'_>, _pos: IVec2, _delta: IVec2) -> Result<()> {
            self.drag += 1;
            Ok(())
        }

        fn forwards_events(&self) -> bool {
            self.forward
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn tree() -> ElementTree {
        let layout = AttributeLayout::new([("position", 2), ("tex_coord", 2)]);
        ElementTree::new(layout, IVec2::new(1000, 1000)).unwrap()
    }

    fn square(at: IVec2) -> ElementDesc {
        ElementDesc::new(Texture::solid_box(50, 50, Rgba8::WHITE, 0, Rgba8::WHITE)).at(at)
    }

    fn move_to(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        pointer: &mut PointerState,
        from: IVec2,
        to: IVec2,
    ) {
        let event = InputEvent::MouseMove { pos: to, delta: to - from };
        pointer.apply(&event);
        dispatch(tree, res, *pointer, &event).unwrap();
    }

    #[test]
    fn test_enter_and_exit_fire_once_per_crossing() {
        let mut tree = tree();
        let mut res = GuiResources::headless();
        let mut pointer = PointerState::new();
        let id = tree.spawn_root(square(IVec2::new(100, 100))).unwrap();
        tree.set_behaviour(id, Box::new(Counter::default())).unwrap();

        let path = [(50, 50), (120, 120), (130, 130), (200, 200), (210, 210)];
        for pair in path.windows(2) {
            let (from, to) = (IVec2::from(pair[0]), IVec2::from(pair[1]));
            move_to(&mut tree, &mut res, &mut pointer, from, to);
        }
        let counter = tree.behaviour::<Counter>(id).unwrap();
        assert_eq!((counter.enter, counter.exit), (1, 1));
        assert_eq!(counter.moves, 4);
        assert_eq!(counter.drag, 0);
    }

    #[test]
    fn test_drag_fires_outside_the_box_while_primary_is_held() {
        let mut tree = tree();
        let mut res = GuiResources::headless();
        let mut pointer = PointerState::new();
        let id = tree.spawn_root(square(IVec2::new(100, 100))).unwrap();
        tree.set_behaviour(id, Box::new(Counter::default())).unwrap();

        let press = InputEvent::MouseDown {
            pos: IVec2::new(300, 300),
            button: MouseButton::PRIMARY,
        };
        pointer.apply(&press);
        dispatch(&mut tree, &mut res, pointer, &press).unwrap();
        move_to(&mut tree, &mut res, &mut pointer, IVec2::new(300, 300), IVec2::new(320, 310));

        let counter = tree.behaviour::<Counter>(id).unwrap();
        assert_eq!(counter.drag, 1);
        assert_eq!((counter.enter, counter.exit), (0, 0));
    }

    #[test]
    fn test_only_forwarding_parents_reach_children() {
        let mut tree = tree();
        let mut res = GuiResources::headless();
        let mut pointer = PointerState::new();

        let plain = tree.spawn_root(square(IVec2::ZERO)).unwrap();
        let hidden = tree.spawn_child(plain, "c", square(IVec2::ZERO)).unwrap();
        tree.set_behaviour(plain, Box::new(Counter::default())).unwrap();
        tree.set_behaviour(hidden, Box::new(Counter::default())).unwrap();

        let panel = tree.spawn_root(square(IVec2::new(500, 500))).unwrap();
        let shown = tree.spawn_child(panel, "c", square(IVec2::ZERO)).unwrap();
        let forwarder = Counter {
            forward: true,
            ..Counter::default()
        };
        tree.set_behaviour(panel, Box::new(forwarder)).unwrap();
        tree.set_behaviour(shown, Box::new(Counter::default())).unwrap();

        move_to(&mut tree, &mut res, &mut pointer, IVec2::ZERO, IVec2::new(5, 5));

        assert_eq!(tree.behaviour::<Counter>(plain).unwrap().moves, 1);
        assert_eq!(tree.behaviour::<Counter>(hidden).unwrap().moves, 0);
        assert_eq!(tree.behaviour::<Counter>(panel).unwrap().moves, 1);
        assert_eq!(tree.behaviour::<Counter>(shown).unwrap().moves, 1);
    }
}
