use tessel_core::{IVec2, MouseButton};

use crate::align::Align;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::{EventCx, Interactive};
use crate::tree::{ElementId, ElementTree};

use super::impl_as_any;

/// Invisible handle that drags its parent around
#[derive(Debug, Default)]
pub struct DragBox {
    active: bool,
}

impl DragBox {
    pub fn create(tree: &mut ElementTree, position: IVec2, size: IVec2, align: Align) -> Result<ElementId> {
        let id = tree.create(ElementDesc::default().at(position).align(align).size(size).hidden())?;
        tree.set_behaviour(id, Box::new(DragBox::default()))?;
        Ok(id)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Interactive for DragBox {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button == MouseButton::PRIMARY && cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos) {
            self.active = true;
        }
        Ok(())
    }

    fn mouse_up(&mut self, _cx: &mut EventCx<'_>, _pos: IVec2, button: MouseButton) -> Result<()> {
        if button == MouseButton::PRIMARY {
            self.active = false;
        }
        Ok(())
    }

    fn mouse_move(&mut self, cx: &mut EventCx<'_>, _pos: IVec2, delta: IVec2) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        if let Some(parent) = cx.tree.get(cx.id())?.parent() {
            cx.tree.move_by(parent, delta)?;
        }
        Ok(())
    }

    impl_as_any!();
}
