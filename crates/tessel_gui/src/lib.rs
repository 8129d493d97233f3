//! Tessel GUI
//!
//! Retained-mode widgets drawn as textured quads in window pixel space.
//!
//! - [`ElementTree`]: arena of elements keyed by [`ElementId`], with named children
//!   and deferred structural changes
//! - [`Interactive`]: per-element behaviour hooks, driven by the event router
//! - [`GuiContext`]: owns the tree, the shared [`GuiResources`] and the UI shader,
//!   and turns raw input and frames into hook calls and draws
//! - [`widgets`]: label, button, checkbox, slider, text box, drag box and panel
//! - [`DebugOverlay`]: one-pixel outlines around elements or arbitrary rectangles
//!
//! Widgets are built detached from `(tree, resources)` and attached with
//! [`ElementTree::add_root`] or [`ElementTree::add_child`]. Changes requested while a
//! traversal is running are queued and applied at the start of the next frame.

pub mod align;
pub mod clipboard;
pub mod config;
pub mod context;
pub mod debug;
pub mod element;
pub mod error;
pub mod render;
pub mod router;
pub mod theme;
pub mod tree;
pub mod widgets;

pub use align::Align;
pub use clipboard::{Clipboard, MemoryClipboard};
#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use config::GuiConfig;
pub use context::{GuiContext, GuiResources};
pub use debug::{DebugEntry, DebugOverlay};
pub use element::{quad_vertices, Element, ElementDesc};
pub use error::{GuiError, Result};
pub use render::blend_for;
pub use router::{EventCx, Interactive};
pub use theme::Theme;
pub use tree::{ElementId, ElementTree};
pub use widgets::{
    Button, ButtonState, Checkbox, DragBox, Label, Panel, Slider, SliderDesc, SliderState, TextBox,
    TextBoxState,
};
