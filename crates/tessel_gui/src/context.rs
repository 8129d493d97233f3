//! Window glue for the element tree
//!
//! [`GuiContext`] owns the tree, the UI shader and the shared [`GuiResources`]. The
//! window forwards raw input to [`GuiContext::handle_event`] and calls
//! [`GuiContext::frame`] (or [`GuiContext::draw`] inside its own pass) once per frame.

use tessel_core::{ClearValue, GpuBackend, InputEvent, IVec2, PassTarget, PointerState, Rgba8};
use tessel_render::{ShaderProgram, Texture};
use tessel_text::TextGenerator;

use crate::clipboard::{Clipboard, MemoryClipboard};
use crate::config::GuiConfig;
use crate::debug::DebugOverlay;
use crate::error::Result;
use crate::render;
use crate::router::{self, EventCx};
use crate::theme::Theme;
use crate::tree::{ElementId, ElementTree};

/// Services shared by every widget
pub struct GuiResources {
    pub theme: Theme,
    pub config: GuiConfig,
    pub text: TextGenerator,
    pub clipboard: Box<dyn Clipboard>,
}

impl std::fmt::Debug for GuiResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiResources")
            .field("theme", &self.theme)
            .field("config", &self.config)
            .field("cached_glyphs", &self.text.cache_len())
            .finish()
    }
}

impl GuiResources {
    pub fn new(theme: Theme, config: GuiConfig, text: TextGenerator, clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            theme,
            config,
            text,
            clipboard,
        }
    }

    /// Stock theme with block glyphs and an in-memory clipboard
    pub fn headless() -> Self {
        Self::new(
            Theme::default(),
            GuiConfig::default(),
            TextGenerator::new(Box::new(tessel_text::FixedRasterizer)),
            Box::new(MemoryClipboard::new()),
        )
    }

    /// Stock theme with the system font and, when enabled, the OS clipboard
    pub fn system() -> Self {
        #[cfg(feature = "system-clipboard")]
        let clipboard: Box<dyn Clipboard> = Box::new(crate::clipboard::SystemClipboard::new());
        #[cfg(not(feature = "system-clipboard"))]
        let clipboard: Box<dyn Clipboard> = Box::new(MemoryClipboard::new());

        Self::new(
            Theme::default(),
            GuiConfig::default(),
            TextGenerator::system_or_fixed(),
            clipboard,
        )
    }

    /// Render one line of text into a texture, returning its character advances too
    pub fn text_texture(&mut self, text: &str, size: u32, color: Rgba8) -> Result<(Texture, Vec<u32>)> {
        let raster = self.text.string_raster(text, size, color)?;
        let texture = Texture::from_glyph(raster.width, raster.height, raster.pixels)?;
        Ok((texture, raster.advances))
    }
}

pub struct GuiContext {
    tree: ElementTree,
    resources: GuiResources,
    pointer: PointerState,
    shader: ShaderProgram,
    debug: DebugOverlay,
}

impl GuiContext {
    /// Compile the UI shader and size the tree to the backend's surface
    pub fn new(backend: &mut dyn GpuBackend, resources: GuiResources) -> Result<Self> {
        let shader = ShaderProgram::ui(backend)?;
        let (width, height) = backend.surface_size();
        let tree = ElementTree::new(shader.layout().clone(), IVec2::new(width as i32, height as i32))?;
        tracing::debug!("gui context ready for a {}x{} surface", width, height);
        Ok(Self {
            tree,
            resources,
            pointer: PointerState::new(),
            shader,
            debug: DebugOverlay::new(),
        })
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn resources(&self) -> &GuiResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut GuiResources {
        &mut self.resources
    }

    /// Tree and resources together, as widget constructors take them
    pub fn split(&mut self) -> (&mut ElementTree, &mut GuiResources) {
        (&mut self.tree, &mut self.resources)
    }

    pub fn theme(&self) -> &Theme {
        &self.resources.theme
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn debug_mut(&mut self) -> &mut DebugOverlay {
        &mut self.debug
    }

    /// Event context for driving widget operations from outside a hook
    pub fn cx(&mut self, id: ElementId) -> EventCx<'_> {
        EventCx::new(&mut self.tree, &mut self.resources, self.pointer, id)
    }

    pub fn add_root(&mut self, id: ElementId) -> Result<()> {
        self.tree.add_root(id)
    }

    /// Route one raw input event
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<()> {
        self.pointer.apply(event);
        match *event {
            InputEvent::Resize { width, height } => {
                self.tree.set_window(IVec2::new(width as i32, height as i32))
            }
            _ => router::dispatch(&mut self.tree, &mut self.resources, self.pointer, event),
        }
    }

    /// Apply tree changes deferred since the last frame
    pub fn begin_frame(&mut self) -> Result<usize> {
        self.tree.flush()
    }

    /// Draw the tree and debug outlines into the current pass
    pub fn draw(&mut self, backend: &mut dyn GpuBackend) -> Result<()> {
        backend.set_depth_test(false);
        render::draw_tree(
            &mut self.tree,
            &mut self.resources,
            self.pointer,
            backend,
            self.shader.id(),
        )?;
        self.debug
            .draw(&self.tree, self.resources.theme.debug, backend, self.shader.id())
    }

    /// A whole GUI-only frame: flush, clear the screen, draw, submit, release garbage
    pub fn frame(&mut self, backend: &mut dyn GpuBackend) -> Result<()> {
        self.begin_frame()?;
        let clear = ClearValue::color(self.resources.theme.window.to_f32_array());
        backend.begin_pass(PassTarget::Screen, Some(clear))?;
        self.draw(backend)?;
        backend.end_frame()?;
        backend.collect_garbage();
        Ok(())
    }
}

impl std::fmt::Debug for GuiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiContext")
            .field("tree", &self.tree)
            .field("pointer", &self.pointer)
            .field("debug", &self.debug)
            .finish()
    }
}
