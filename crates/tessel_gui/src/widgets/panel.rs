use tessel_core::IVec2;
use tessel_render::Texture;

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::Interactive;
use crate::tree::{ElementId, ElementTree};

use super::{impl_as_any, origin, Button, DragBox, Label};

/// Titled, draggable, closable container laid out in label/element rows
///
/// Every event reaching the panel is passed on to all of its children.
#[derive(Debug)]
pub struct Panel {
    title_bar: i32,
    slot: i32,
    padding: i32,
    divider: i32,
    used_height: i32,
}

impl Panel {
    pub fn create(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        position: IVec2,
        size: IVec2,
        title: &str,
        align: Align,
    ) -> Result<ElementId> {
        let config = &res.config;
        let (title_bar, slot, padding) = (config.title_bar_height, config.slot_size, config.padding);
        let theme = res.theme.clone();
        let (w, tb) = (size.x.max(0) as u32, title_bar.max(0) as u32);

        let pane = Texture::solid_box(w, size.y.max(0) as u32, theme.base, 0, theme.base);
        let id = tree.create(ElementDesc::new(pane).at(position).align(align).size(size))?;
        let top_left = origin(tree, id)?;

        let bar_texture = Texture::solid_box(w, tb, theme.title, 0, theme.title);
        let bar = tree.spawn_child(id, "title_bar", ElementDesc::new(bar_texture).at(top_left))?;
        let title_label = Label::create_with(
            tree,
            res,
            IVec2::new(padding, title_bar / 2),
            title,
            tb / 2,
            Align::CenterLeft,
            theme.text,
        )?;
        tree.add_child(bar, "title", title_label)?;
        let title_width = tree.get(title_label)?.size().x;

        let close = Button::create(
            tree,
            res,
            top_left + IVec2::new(size.x, title_bar / 2),
            IVec2::splat(title_bar),
            "",
            Align::CenterRight,
        )?;
        let close_base = Texture::solid_box(tb, tb, theme.title, 0, theme.title);
        let button = tree.behaviour_mut::<Button>(close)?;
        button.set_base_texture(close_base.clone());
        button.set_hover_texture(Texture::solid_box(tb, tb, theme.danger, 0, theme.danger));
        button.on_press(move |cx, ()| cx.tree.remove(id));
        tree.update_texture(close, &close_base)?;
        tree.spawn_child(
            close,
            "icon",
            ElementDesc::new(Texture::cross(tb / 2, 1, theme.text))
                .at(IVec2::new(-title_bar / 4, 0))
                .align(Align::CenterRight),
        )?;
        tree.add_child(id, "close", close)?;

        let drag_width = (size.x - title_bar - title_width - padding * 2).max(0);
        let drag = DragBox::create(
            tree,
            top_left + IVec2::new(padding + title_width, 0),
            IVec2::new(drag_width, title_bar),
            Align::UpperLeft,
        )?;
        tree.add_child(id, "drag_box", drag)?;

        tree.set_behaviour(
            id,
            Box::new(Panel {
                title_bar,
                slot,
                padding,
                divider: size.x / 3,
                used_height: title_bar + padding,
            }),
        )?;
        Ok(id)
    }

    /// Height available to an element in one row
    pub fn slot_height(&self) -> i32 {
        self.slot - self.padding
    }

    pub fn title_bar_height(&self) -> i32 {
        self.title_bar
    }

    /// Height taken by the title bar and the rows added so far
    pub fn used_height(&self) -> i32 {
        self.used_height
    }

    /// Put `element` in the next row, with `label` on the left of a divider
    ///
    /// The element becomes the panel's child named `label`; the row label and divider
    /// are added as `{label}_label` and `{label}_divider`.
    pub fn add_element(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        panel: ElementId,
        element: ElementId,
        label: &str,
    ) -> Result<()> {
        let (slot, padding, divider, used) = {
            let p = tree.behaviour::<Panel>(panel)?;
            (p.slot, p.padding, p.divider, p.used_height)
        };
        let row = origin(tree, panel)? + IVec2::new(padding, used);

        let color = res.theme.text;
        let text = Label::create_with(
            tree,
            res,
            row + IVec2::new(0, slot / 2),
            label,
            (slot / 2).max(0) as u32,
            Align::CenterLeft,
            color,
        )?;
        tree.add_child(panel, &format!("{label}_label"), text)?;

        let background = res.theme.background;
        tree.spawn_child(
            panel,
            &format!("{label}_divider"),
            ElementDesc::new(Texture::solid_box(2, slot.max(0) as u32, background, 0, background))
                .at(row + IVec2::new(divider, slot / 2))
                .align(Align::CenterLeft),
        )?;

        tree.set_pos(element, row + IVec2::new(divider + padding, 0))?;
        tree.add_child(panel, label, element)?;
        tree.behaviour_mut::<Panel>(panel)?.used_height += slot;
        Ok(())
    }
}

impl Interactive for Panel {
    fn forwards_events(&self) -> bool {
        true
    }

    impl_as_any!();
}
