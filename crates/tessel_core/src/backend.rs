//! GPU backend contract
//!
//! Everything above this crate draws through [`GpuBackend`]. The contract is small and
//! immediate-mode in shape (bind, set, draw) so that it maps onto both a recording
//! headless implementation and a real wgpu device.
//!
//! Resource lifetime is handled with a [`ReleaseQueue`]: GPU-owning handles push their
//! ids into the queue when dropped, and the backend frees them at the next frame
//! boundary via [`GpuBackend::collect_garbage`]. No resource is ever released in the
//! middle of a frame that may still reference it.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::error::{CoreError, Result};

new_key_type! {
    /// Handle to a vertex or index buffer
    pub struct BufferId;
    /// Handle to a 2D texture
    pub struct TextureId;
    /// Handle to a compiled shader program
    pub struct ShaderId;
    /// Handle to an offscreen framebuffer
    pub struct FramebufferId;
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// What a buffer holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Mutable vertex data (`f32` components), supports sub-range writes
    Vertex,
    /// Immutable `u32` triangle indices
    Index,
}

/// Buffer creation parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: Option<&'static str>,
    pub kind: BufferKind,
}

impl BufferDesc {
    pub const fn vertex(label: &'static str) -> Self {
        Self {
            label: Some(label),
            kind: BufferKind::Vertex,
        }
    }

    pub const fn index(label: &'static str) -> Self {
        Self {
            label: Some(label),
            kind: BufferKind::Index,
        }
    }
}

/// Texture pixel formats used by the toolkit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, used for images and the G-buffer color target
    Rgba8Unorm,
    /// Half-float RGBA, used for G-buffer positions and normals
    Rgba16Float,
    /// 32-bit depth
    Depth32Float,
}

impl TextureFormat {
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Depth32Float => 4,
        }
    }

    pub const fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

/// Texture creation parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: Option<&'static str>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Whether the texture can be attached to a framebuffer
    pub render_target: bool,
}

impl TextureDesc {
    /// Sampled RGBA image
    pub const fn image(width: u32, height: u32) -> Self {
        Self {
            label: None,
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            render_target: false,
        }
    }

    /// Framebuffer attachment
    pub const fn attachment(label: &'static str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: Some(label),
            width,
            height,
            format,
            render_target: true,
        }
    }

    /// Byte length of a tightly packed upload for this texture
    pub const fn byte_len(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }
}

/// WGSL shader source with `vs_main`/`fs_main` entry points
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: Cow<'static, str>,
    pub wgsl: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(label: impl Into<Cow<'static, str>>, wgsl: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            wgsl: wgsl.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reflection
// ─────────────────────────────────────────────────────────────────────────────

/// A vertex input declared by a shader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflectedAttribute {
    pub name: String,
    pub location: u32,
    /// Number of scalar components (vec3 = 3, mat4 = 16)
    pub components: u32,
}

/// Scalar shape of a uniform member
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Anything the typed setters do not cover; carries the byte size
    Other(u32),
}

impl UniformKind {
    pub const fn byte_size(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::UInt | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
            UniformKind::Other(size) => size,
        }
    }
}

/// A flattened uniform member, e.g. `point_lights[0].position`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflectedUniform {
    pub name: String,
    /// Byte offset inside the uniform block
    pub offset: u32,
    pub kind: UniformKind,
}

/// A sampled texture binding; unit `n` uses bindings `2n` (texture) and `2n + 1` (sampler)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReflectedTexture {
    pub name: String,
    pub unit: u32,
    /// Declared as `texture_depth_2d`
    pub depth: bool,
    /// Whether a sampler is declared next to it
    pub sampled: bool,
}

/// Everything a shader exposes to the host
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Vertex inputs in declaration order
    pub attributes: Vec<ReflectedAttribute>,
    pub uniforms: Vec<ReflectedUniform>,
    /// Size in bytes of the `@group(0) @binding(0)` uniform block, 0 if absent
    pub uniform_block_size: u32,
    pub textures: Vec<ReflectedTexture>,
}

impl ShaderReflection {
    pub fn attribute(&self, name: &str) -> Option<&ReflectedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&ReflectedUniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Uniform values
// ─────────────────────────────────────────────────────────────────────────────

/// Typed value for [`GpuBackend::set_uniform`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub const fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::UInt(_) => UniformKind::UInt,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Little-endian bytes of the value
    pub fn to_bytes(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        match self {
            UniformValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            UniformValue::UInt(v) => out.extend_from_slice(&v.to_le_bytes()),
            UniformValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            UniformValue::Vec2(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            UniformValue::Vec3(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            UniformValue::Vec4(v) => v.iter().for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
            UniformValue::Mat4(m) => m
                .iter()
                .flatten()
                .for_each(|c| out.extend_from_slice(&c.to_le_bytes())),
        }
        out
    }

    /// Write into a uniform staging block at the member described by `uniform`
    pub fn write_into(&self, block: &mut [u8], uniform: &ReflectedUniform) -> Result<()> {
        if self.kind() != uniform.kind {
            return Err(CoreError::InvalidArgument(format!(
                "uniform `{}` is {:?}, got {:?}",
                uniform.name,
                uniform.kind,
                self.kind()
            )));
        }
        let bytes = self.to_bytes();
        let start = uniform.offset as usize;
        let end = start + bytes.len();
        let len = block.len();
        let dst = block
            .get_mut(start..end)
            .ok_or(CoreError::OutOfBounds { index: end, len })?;
        dst.copy_from_slice(&bytes);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Draw state
// ─────────────────────────────────────────────────────────────────────────────

/// One attribute inside a vertex layout, measured in `f32` components
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub offset: u32,
    pub components: u32,
}

/// Packed per-vertex layout handed to the backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexLayoutDesc {
    /// Components per vertex
    pub stride: u32,
    pub attributes: SmallVec<[VertexAttributeDesc; 4]>,
}

/// A single draw
#[derive(Clone, Copy, Debug)]
pub struct DrawCall<'a> {
    pub shader: ShaderId,
    pub layout: &'a VertexLayoutDesc,
    pub vertex_buffer: BufferId,
    pub vertex_count: u32,
    /// Index buffer and index count; `None` draws `vertex_count` vertices in order
    pub indices: Option<(BufferId, u32)>,
}

/// Where a render pass writes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    /// The default framebuffer (window surface)
    Screen,
    Framebuffer(FramebufferId),
}

/// Clear values applied when a pass begins
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValue {
    pub color: [f32; 4],
    /// Depth clear, ignored for targets without depth
    pub depth: Option<f32>,
}

impl ClearValue {
    pub const fn color(color: [f32; 4]) -> Self {
        Self { color, depth: None }
    }

    pub const fn color_depth(color: [f32; 4]) -> Self {
        Self {
            color,
            depth: Some(1.0),
        }
    }
}

/// Color blending
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite
    Replace,
    /// Straight alpha: `src * a + dst * (1 - a)`
    #[default]
    Alpha,
    /// Premultiplied alpha: `src + dst * (1 - a)`
    Premultiplied,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource release
// ─────────────────────────────────────────────────────────────────────────────

/// A GPU object awaiting release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuResource {
    Buffer(BufferId),
    Texture(TextureId),
    Shader(ShaderId),
    Framebuffer(FramebufferId),
}

/// Shared list of resources dropped by their owners
///
/// Owners hold a clone and push on drop; the backend drains it between frames.
#[derive(Clone, Debug, Default)]
pub struct ReleaseQueue {
    pending: Rc<RefCell<Vec<GpuResource>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, resource: GpuResource) {
        self.pending.borrow_mut().push(resource);
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    pub fn drain(&self) -> Vec<GpuResource> {
        let drained = std::mem::take(&mut *self.pending.borrow_mut());
        if !drained.is_empty() {
            tracing::trace!("draining {} released GPU resources", drained.len());
        }
        drained
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend trait
// ─────────────────────────────────────────────────────────────────────────────

/// The graphics device as seen by the toolkit
///
/// State set with `set_*`/`bind_*` applies to every following draw until changed.
/// Draws are recorded against the pass opened by the latest [`begin_pass`] and
/// submitted by [`end_frame`].
///
/// [`begin_pass`]: GpuBackend::begin_pass
/// [`end_frame`]: GpuBackend::end_frame
pub trait GpuBackend {
    /// Queue that handles push into when dropped
    fn release_queue(&self) -> ReleaseQueue;

    /// Create a buffer initialized with `contents`
    fn create_buffer(&mut self, desc: &BufferDesc, contents: &[u8]) -> Result<BufferId>;

    /// Overwrite `data.len()` bytes starting at `offset`
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// Create a texture, optionally uploading tightly packed pixels
    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> Result<TextureId>;

    /// Compile a shader and reflect its attributes, uniforms and textures
    fn create_shader(&mut self, source: &ShaderSource) -> Result<(ShaderId, ShaderReflection)>;

    /// Group textures into a render target
    fn create_framebuffer(
        &mut self,
        color: &[TextureId],
        depth: Option<TextureId>,
    ) -> Result<FramebufferId>;

    /// Free a resource immediately
    fn release(&mut self, resource: GpuResource);

    /// Size of the default framebuffer
    fn surface_size(&self) -> (u32, u32);

    /// Resize the default framebuffer
    fn resize(&mut self, width: u32, height: u32);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Bind a target and optionally clear it
    fn begin_pass(&mut self, target: PassTarget, clear: Option<ClearValue>) -> Result<()>;

    fn set_depth_test(&mut self, enabled: bool);

    fn set_blend(&mut self, mode: BlendMode);

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) -> Result<()>;

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<()>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Submit everything recorded since the previous frame
    fn end_frame(&mut self) -> Result<()>;

    /// Release everything dropped since the last call
    fn collect_garbage(&mut self) {
        for resource in self.release_queue().drain() {
            self.release(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_write_checks_kind_and_bounds() {
        let uniform = ReflectedUniform {
            name: "view_pos".into(),
            offset: 16,
            kind: UniformKind::Vec3,
        };
        let mut block = vec![0u8; 32];
        UniformValue::Vec3([1.0, 2.0, 3.0])
            .write_into(&mut block, &uniform)
            .unwrap();
        assert_eq!(&block[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&block[24..28], &3.0f32.to_le_bytes());

        let err = UniformValue::Float(1.0).write_into(&mut block, &uniform);
        assert!(matches!(err, Err(CoreError::InvalidArgument(_))));

        let mut small = vec![0u8; 20];
        let err = UniformValue::Vec3([0.0; 3]).write_into(&mut small, &uniform);
        assert!(matches!(err, Err(CoreError::OutOfBounds { .. })));
    }

    #[test]
    fn test_release_queue_drains_once() {
        let queue = ReleaseQueue::new();
        let other = queue.clone();
        other.push(GpuResource::Buffer(BufferId::default()));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
