use tessel_core::{CoreError, IVec2, MouseButton};
use tessel_render::Texture;

use crate::align::Align;
use crate::context::GuiResources;
use crate::element::ElementDesc;
use crate::error::Result;
use crate::router::{EventCx, Interactive};
use crate::tree::{ElementId, ElementTree};

use super::{impl_as_any, origin, Callback, Label};

const MARKER_WIDTH: u32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SliderState {
    #[default]
    Idle,
    Dragging,
}

/// Initial slider setup
#[derive(Clone, Debug)]
pub struct SliderDesc {
    pub position: IVec2,
    pub size: IVec2,
    pub align: Align,
    pub min: f64,
    pub max: f64,
    pub value: f64,
    /// Truncate values to integers
    pub int_steps: bool,
    /// Show the value in a label to the right of the track
    pub show_value: bool,
}

impl Default for SliderDesc {
    fn default() -> Self {
        Self {
            position: IVec2::ZERO,
            size: IVec2::new(100, 20),
            align: Align::UpperLeft,
            min: 0.0,
            max: 1.0,
            value: 0.0,
            int_steps: false,
            show_value: false,
        }
    }
}

/// Horizontal value picker
///
/// The filled part of the track runs from the left edge to the marker and the rest
/// of the track from the marker to the right edge.
pub struct Slider {
    state: SliderState,
    min: f64,
    max: f64,
    value: f64,
    int_steps: bool,
    on_update: Option<Callback<f64>>,
}

impl std::fmt::Debug for Slider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slider")
            .field("state", &self.state)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl Slider {
    pub fn create(tree: &mut ElementTree, res: &mut GuiResources, desc: SliderDesc) -> Result<ElementId> {
        if desc.min.is_nan() || desc.max.is_nan() || desc.max <= desc.min {
            return Err(CoreError::InvalidArgument(format!(
                "slider range {}..{} is empty",
                desc.min, desc.max
            ))
            .into());
        }
        let size = desc.size;
        let (w, h) = (size.x.max(0) as u32, size.y.max(0) as u32);
        let theme = &res.theme;
        let fill = Texture::solid_box(w, h / 2, theme.accent, 0, theme.accent);
        let track = Texture::solid_box(w, h / 2, theme.background, 0, theme.background);
        let marker = Texture::solid_box(MARKER_WIDTH, h, theme.text, 0, theme.text);

        let id = tree.create(
            ElementDesc::default()
                .at(desc.position)
                .align(desc.align)
                .size(size),
        )?;
        let half = IVec2::new(0, size.y / 2);
        tree.spawn_child(id, "slide_bar", ElementDesc::new(fill).align(Align::CenterLeft).size(half))?;
        tree.spawn_child(id, "bar", ElementDesc::new(track).align(Align::CenterLeft).size(half))?;
        tree.spawn_child(id, "marker", ElementDesc::new(marker).align(Align::Center))?;
        if desc.show_value {
            let at = origin(tree, id)? + IVec2::new(size.x + res.config.padding, tree.center_y_offset(id)?);
            let color = res.theme.text;
            let label = Label::create_with(tree, res, at, "", h / 2, Align::CenterLeft, color)?;
            tree.add_child(id, "label", label)?;
        }

        let mut slider = Slider {
            state: SliderState::Idle,
            min: desc.min,
            max: desc.max,
            value: desc.value,
            int_steps: desc.int_steps,
            on_update: None,
        };
        slider.layout(tree, res, id)?;
        tree.set_behaviour(id, Box::new(slider))?;
        Ok(id)
    }

    pub fn state(&self) -> SliderState {
        self.state
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn on_update(&mut self, callback: impl FnMut(&mut EventCx<'_>, f64) -> Result<()> + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    /// Marker distance from the left edge for the current value
    pub fn marker_offset(&self, width: i32) -> i32 {
        ((self.value - self.min) / (self.max - self.min) * width as f64) as i32
    }

    fn step(&self, value: f64) -> f64 {
        let value = if self.int_steps { value.trunc() } else { value };
        value.clamp(self.min, self.max)
    }

    /// Move to `value`, clamped, and notify
    pub fn set_value(&mut self, cx: &mut EventCx<'_>, value: f64) -> Result<()> {
        let id = cx.id();
        self.value = self.step(value);
        self.layout(cx.tree, cx.resources, id)?;
        if let Some(callback) = self.on_update.as_mut() {
            callback(cx, self.value)?;
        }
        Ok(())
    }

    fn value_at(&self, tree: &ElementTree, id: ElementId, x: i32) -> Result<f64> {
        let bbox = tree.get(id)?.bounding_box();
        let width = bbox.width().max(1) as f64;
        let fraction = (x - bbox.min.x) as f64 / width;
        Ok(fraction * (self.max - self.min) + self.min)
    }

    fn layout(&mut self, tree: &mut ElementTree, res: &mut GuiResources, id: ElementId) -> Result<()> {
        self.value = self.step(self.value);
        let size = tree.get(id)?.size();
        let marker_x = self.marker_offset(size.x);
        let base = origin(tree, id)? + IVec2::new(0, tree.center_y_offset(id)?);

        let marker = tree.child(id, "marker")?;
        let bar = tree.child(id, "bar")?;
        let slide_bar = tree.child(id, "slide_bar")?;
        tree.set_pos(marker, base + IVec2::new(marker_x, 0))?;
        tree.set_pos(bar, base + IVec2::new(marker_x, 0))?;
        tree.resize(bar, IVec2::new(size.x - marker_x, size.y / 2))?;
        tree.set_pos(slide_bar, base)?;
        tree.resize(slide_bar, IVec2::new(marker_x, size.y / 2))?;

        if let Ok(label) = tree.child(id, "label") {
            let text = if self.int_steps {
                format!("{}", self.value as i64)
            } else {
                format!("{:.2}", self.value)
            };
            Label::set_text(tree, res, label, &text)?;
        }
        Ok(())
    }
}

impl Interactive for Slider {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, pos: IVec2, button: MouseButton) -> Result<()> {
        if button != MouseButton::PRIMARY || !cx.tree.get(cx.id())?.bounding_box().contains_inclusive(pos) {
            return Ok(());
        }
        self.state = SliderState::Dragging;
        let value = self.value_at(cx.tree, cx.id(), pos.x)?;
        self.set_value(cx, value)
    }

    fn mouse_drag(&mut self, cx: &mut EventCx<'_>, pos: IVec2, _delta: IVec2) -> Result<()> {
        if self.state != SliderState::Dragging {
            return Ok(());
        }
        let value = self.value_at(cx.tree, cx.id(), pos.x)?;
        self.set_value(cx, value)
    }

    fn mouse_up(&mut self, _cx: &mut EventCx<'_>, _pos: IVec2, _button: MouseButton) -> Result<()> {
        self.state = SliderState::Idle;
        Ok(())
    }

    impl_as_any!();
}
