use tessel_core::{IVec2, MouseButton};
use tessel_render::Texture;

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::{EventCx, Interactive};
use crate::tree::{ElementId, ElementTree};

use super::{impl_as_any, Callback};

/// Square toggle
pub struct Checkbox {
    checked: bool,
    pressed: bool,
    base: Texture,
    check: Texture,
    on_toggle: Option<Callback<bool>>,
}

impl std::fmt::Debug for Checkbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkbox")
            .field("checked", &self.checked)
            .field("pressed", &self.pressed)
            .finish_non_exhaustive()
    }
}

impl Checkbox {
    pub fn create(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        position: IVec2,
        size: i32,
        align: Align,
    ) -> Result<ElementId> {
        let side = size.max(0) as u32;
        let theme = &res.theme;
        let base = Texture::solid_box(side, side, theme.base, 1, theme.highlight_strong);
        let check = Texture::solid_box(side, side, theme.text, (side / 4).max(1), theme.base);

        let id = tree.create(
            ElementDesc::new(base.clone())
                .at(position)
                .align(align)
                .size(IVec2::splat(size)),
        )?;
        tree.set_behaviour(
            id,
            Box::new(Checkbox {
                checked: false,
                pressed: false,
                base,
                check,
                on_toggle: None,
            }),
        )?;
        Ok(id)
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn on_toggle(&mut self, callback: impl FnMut(&mut EventCx<'_>, bool) -> Result<()> + 'static) {
        self.on_toggle = Some(Box::new(callback));
    }

    /// Set the state without notifying
    pub fn set_checked(&mut self, cx: &mut EventCx<'_>, checked: bool) -> Result<()> {
        self.checked = checked;
        let texture = if checked { &self.check } else { &self.base };
        let id = cx.id();
        cx.tree.update_texture(id, texture)
    }
}

impl Interactive for Checkbox {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button == MouseButton::PRIMARY {
            self.pressed = cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos);
        }
        Ok(())
    }

    fn mouse_up(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button != MouseButton::PRIMARY || !std::mem::take(&mut self.pressed) {
            return Ok(());
        }
        if !cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos) {
            return Ok(());
        }
        self.set_checked(cx, !self.checked)?;
        if let Some(callback) = self.on_toggle.as_mut() {
            callback(cx, self.checked)?;
        }
        Ok(())
    }

    impl_as_any!();
}
