use tessel_core::{IVec2, MouseButton};
use tessel_render::Texture;

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::{EventCx, Interactive};
use crate::tree::{ElementId, ElementTree};

use super::{impl_as_any, origin, Callback, Label};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Idle,
    Hovered,
    Pressed,
}

/// Clickable box with an optional centered label
pub struct Button {
    state: ButtonState,
    base: Texture,
    hover: Texture,
    click: Texture,
    on_press: Option<Callback<()>>,
}

impl std::fmt::Debug for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Button").field("state", &self.state).finish_non_exhaustive()
    }
}

impl Button {
    pub fn create(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        position: IVec2,
        size: IVec2,
        label: &str,
        align: Align,
    ) -> Result<ElementId> {
        let (w, h) = (size.x.max(0) as u32, size.y.max(0) as u32);
        let theme = &res.theme;
        let base = Texture::solid_box(w, h, theme.base, 0, theme.base);
        let hover = Texture::solid_box(w, h, theme.highlight, 0, theme.highlight);
        let click = Texture::solid_box(w, h, theme.accent, 0, theme.accent);

        let id = tree.create(ElementDesc::new(base.clone()).at(position).align(align).size(size))?;
        if !label.is_empty() {
            let center = origin(tree, id)? + size / 2;
            let color = res.theme.text;
            let text = Label::create_with(tree, res, center, label, h / 2, Align::Center, color)?;
            tree.add_child(id, "label", text)?;
        }
        tree.set_behaviour(
            id,
            Box::new(Button {
                state: ButtonState::Idle,
                base,
                hover,
                click,
                on_press: None,
            }),
        )?;
        Ok(id)
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn on_press(&mut self, callback: impl FnMut(&mut EventCx<'_>, ()) -> Result<()> + 'static) {
        self.on_press = Some(Box::new(callback));
    }

    pub fn set_base_texture(&mut self, texture: Texture) {
        self.base = texture;
    }

    pub fn set_hover_texture(&mut self, texture: Texture) {
        self.hover = texture;
    }

    fn enter_state(&mut self, cx: &mut EventCx<'_>, state: ButtonState) -> Result<()> {
        self.state = state;
        let texture = match state {
            ButtonState::Idle => &self.base,
            ButtonState::Hovered => &self.hover,
            ButtonState::Pressed => &self.click,
        };
        let id = cx.id();
        cx.tree.update_texture(id, texture)
    }

    fn contains(cx: &EventCx<'_>, pos: IVec2) -> Result<bool> {
        Ok(cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos))
    }
}

impl Interactive for Button {
    fn mouse_enter(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        if self.state == ButtonState::Idle {
            self.enter_state(cx, ButtonState::Hovered)?;
        }
        Ok(())
    }

    fn mouse_exit(&mut self, cx: &mut EventCx<'_>) -> Result<()> {
        self.enter_state(cx, ButtonState::Idle)
    }

    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button == MouseButton::PRIMARY && Self::contains(cx, pos)? {
            self.enter_state(cx, ButtonState::Pressed)?;
        }
        Ok(())
    }

    fn mouse_up(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button != MouseButton::PRIMARY || self.state != ButtonState::Pressed {
            return Ok(());
        }
        if !Self::contains(cx, pos)? {
            return self.enter_state(cx, ButtonState::Idle);
        }
        self.enter_state(cx, ButtonState::Hovered)?;
        if let Some(callback) = self.on_press.as_mut() {
            callback(cx, ())?;
        }
        Ok(())
    }

    impl_as_any!();
}
