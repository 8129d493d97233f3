//! Stock widgets
//!
//! Each widget is an element (often with a few children) plus an [`Interactive`]
//! behaviour holding its state. Constructors return the id of a detached element for
//! the caller to attach with [`ElementTree::add_root`] or [`ElementTree::add_child`].
//! Widget methods that need the tree are reached through
//! [`EventCx::with_behaviour`](crate::EventCx::with_behaviour).
//!
//! [`Interactive`]: crate::Interactive
//! [`ElementTree::add_root`]: crate::ElementTree::add_root
//! [`ElementTree::add_child`]: crate::ElementTree::add_child

macro_rules! impl_as_any {
    () => {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}
pub(crate) use impl_as_any;

mod button;
mod checkbox;
mod drag_box;
mod label;
mod panel;
mod slider;
mod text_box;

pub use button::{Button, ButtonState};
pub use checkbox::Checkbox;
pub use drag_box::DragBox;
pub use label::Label;
pub use panel::Panel;
pub use slider::{Slider, SliderDesc, SliderState};
pub use text_box::{TextBox, TextBoxState};

use tessel_core::IVec2;

use crate::error::Result;
use crate::router::EventCx;
use crate::tree::{ElementId, ElementTree};

/// Widget notification carrying a value
pub type Callback<T> = Box<dyn FnMut(&mut EventCx<'_>, T) -> Result<()>>;

/// Widget notification carrying the current text
pub type TextCallback = Box<dyn FnMut(&mut EventCx<'_>, &str) -> Result<()>>;

/// Top-left corner of `id`'s box, relative to its own position
///
/// Children placed at `origin(..) + offset` land at `offset` from the top-left of the
/// parent regardless of the parent's align.
pub(crate) fn origin(tree: &ElementTree, id: ElementId) -> Result<IVec2> {
    Ok(-tree.pos_offset(id)?)
}
