//! Offscreen geometry pass
//!
//! The G-buffer has four attachments, all sized to the pass:
//!
//! | attachment | format |
//! |---|---|
//! | color | `Rgba8Unorm` |
//! | view position | `Rgba16Float` |
//! | depth | `Depth32Float` |
//! | normal | `Rgba16Float` |
//!
//! Resizing only records the new size. Attachments are rebuilt at the start of the
//! next [`RenderPass::begin`], so a frame never switches targets halfway through.

use tessel_core::{
    BlendMode, ClearValue, FramebufferId, GpuBackend, GpuResource, PassTarget, ReleaseQueue,
    TextureDesc, TextureFormat, TextureId,
};

use crate::config::RenderPassConfig;
use crate::error::Result;

/// Attachment textures and the framebuffer grouping them
struct GBuffer {
    framebuffer: FramebufferId,
    color: TextureId,
    position: TextureId,
    depth: TextureId,
    normal: TextureId,
    release: ReleaseQueue,
}

impl GBuffer {
    fn create(backend: &mut dyn GpuBackend, width: u32, height: u32) -> Result<Self> {
        let color = backend.create_texture(
            &TextureDesc::attachment("gbuffer color", width, height, TextureFormat::Rgba8Unorm),
            None,
        )?;
        let position = backend.create_texture(
            &TextureDesc::attachment("gbuffer position", width, height, TextureFormat::Rgba16Float),
            None,
        )?;
        let depth = backend.create_texture(
            &TextureDesc::attachment("gbuffer depth", width, height, TextureFormat::Depth32Float),
            None,
        )?;
        let normal = backend.create_texture(
            &TextureDesc::attachment("gbuffer normal", width, height, TextureFormat::Rgba16Float),
            None,
        )?;
        // Color outputs in the order the lit shader writes them
        let framebuffer = backend.create_framebuffer(&[color, position, normal], Some(depth))?;
        Ok(Self {
            framebuffer,
            color,
            position,
            depth,
            normal,
            release: backend.release_queue(),
        })
    }
}

impl Drop for GBuffer {
    fn drop(&mut self) {
        self.release.push(GpuResource::Framebuffer(self.framebuffer));
        for texture in [self.color, self.position, self.depth, self.normal] {
            self.release.push(GpuResource::Texture(texture));
        }
    }
}

/// Deferred geometry target
pub struct RenderPass {
    targets: GBuffer,
    size: (u32, u32),
    pending: Option<(u32, u32)>,
    fixed: bool,
    clear: ClearValue,
    generation: u32,
}

impl std::fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("size", &self.size)
            .field("pending", &self.pending)
            .field("fixed", &self.fixed)
            .field("generation", &self.generation)
            .finish()
    }
}

impl RenderPass {
    /// Build attachments at the configured resolution, or the surface size
    pub fn new(backend: &mut dyn GpuBackend, config: &RenderPassConfig) -> Result<Self> {
        let (width, height) = config.resolution.unwrap_or_else(|| backend.surface_size());
        let size = (width.max(1), height.max(1));
        let targets = GBuffer::create(backend, size.0, size.1)?;
        tracing::debug!("render pass created ({}x{})", size.0, size.1);
        Ok(Self {
            targets,
            size,
            pending: None,
            fixed: config.resolution.is_some(),
            clear: ClearValue::color_depth(config.clear_color),
            generation: 0,
        })
    }

    /// Schedule new attachments for the next frame
    ///
    /// Ignored for passes with a fixed resolution, or when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.fixed {
            return;
        }
        let size = (width.max(1), height.max(1));
        if size == self.size {
            self.pending = None;
            return;
        }
        self.pending = Some(size);
    }

    /// Whether a resize is waiting for the next [`begin`](Self::begin)
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply any pending resize, then bind and clear the G-buffer for drawing
    pub fn begin(&mut self, backend: &mut dyn GpuBackend) -> Result<()> {
        if let Some((width, height)) = self.pending.take() {
            // Old targets drop here and go through the release queue
            self.targets = GBuffer::create(backend, width, height)?;
            self.size = (width, height);
            self.generation += 1;
            tracing::info!("render pass regenerated at {}x{}", width, height);
        }
        backend.set_viewport(self.size.0, self.size.1);
        backend.begin_pass(PassTarget::Framebuffer(self.targets.framebuffer), Some(self.clear))?;
        backend.set_depth_test(true);
        backend.set_blend(BlendMode::Replace);
        Ok(())
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.targets.framebuffer
    }

    /// `[color, position, depth, normal]`, the order the composite samples them in
    pub fn attachments(&self) -> [TextureId; 4] {
        let t = &self.targets;
        [t.color, t.position, t.depth, t.normal]
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// How many times the attachments have been rebuilt
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear.color
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear = ClearValue::color_depth(color);
    }
}
