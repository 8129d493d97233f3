use tessel_core::{IVec2, Rgba8};

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::Interactive;
use crate::tree::{ElementId, ElementTree};

use super::impl_as_any;

/// One line of text
#[derive(Debug)]
pub struct Label {
    text: String,
    size: u32,
    color: Rgba8,
}

impl Label {
    /// Text in the theme's text color, at the configured font size and align
    pub fn create(tree: &mut ElementTree, res: &mut GuiResources, position: IVec2, text: &str) -> Result<ElementId> {
        let (size, align, color) = (res.config.font_size, res.config.label_align, res.theme.text);
        Self::create_with(tree, res, position, text, size, align, color)
    }

    pub fn create_with(
        tree: &mut ElementTree,
        res: &mut GuiResources,
        position: IVec2,
        text: &str,
        size: u32,
        align: Align,
        color: Rgba8,
    ) -> Result<ElementId> {
        let (texture, _) = res.text_texture(text, size, color)?;
        let id = tree.create(ElementDesc::new(texture).at(position).align(align))?;
        tree.set_behaviour(
            id,
            Box::new(Label {
                text: text.to_string(),
                size,
                color,
            }),
        )?;
        Ok(id)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> u32 {
        self.size
    }

    /// Re-render `id` with new text
    pub fn set_text(tree: &mut ElementTree, res: &mut GuiResources, id: ElementId, text: &str) -> Result<()> {
        let label = tree.behaviour_mut::<Label>(id)?;
        if label.text == text {
            return Ok(());
        }
        label.text = text.to_string();
        let (size, color) = (label.size, label.color);
        let (texture, _) = res.text_texture(text, size, color)?;
        tree.update_texture(id, &texture)
    }
}

impl Interactive for Label {
    impl_as_any!();
}
