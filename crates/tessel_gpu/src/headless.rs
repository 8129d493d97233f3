//! Headless recording backend
//!
//! Implements the full [`GpuBackend`] contract without a device. Buffer and texture
//! contents are kept in memory, every call is appended to a command log, and draws
//! are validated the same way a real device would reject them (stale handles, index
//! ranges past the end of a buffer, drawing outside a pass).

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use tessel_core::{
    BlendMode, BufferDesc, BufferId, BufferKind, ClearValue, CoreError, DrawCall, FramebufferId,
    GpuBackend, GpuResource, PassTarget, ReleaseQueue, Result, ShaderId, ShaderReflection,
    ShaderSource, TextureDesc, TextureId, UniformValue,
};

use crate::reflect::reflect_wgsl;

/// A recorded draw with the state that applied to it
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub target: PassTarget,
    pub shader: ShaderId,
    pub vertex_buffer: BufferId,
    pub vertex_count: u32,
    pub index_count: Option<u32>,
    pub depth_test: bool,
    pub blend: BlendMode,
    pub textures: SmallVec<[(u32, TextureId); 4]>,
}

/// One entry in the command log
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    CreateBuffer { id: BufferId, kind: BufferKind, len: usize },
    WriteBuffer { id: BufferId, offset: u64, len: usize },
    CreateTexture { id: TextureId, width: u32, height: u32 },
    CreateShader { id: ShaderId, label: String },
    CreateFramebuffer { id: FramebufferId },
    Release(GpuResource),
    Resize { width: u32, height: u32 },
    Viewport { width: u32, height: u32 },
    BeginPass { target: PassTarget, clear: Option<ClearValue> },
    DepthTest(bool),
    Blend(BlendMode),
    SetUniform { shader: ShaderId, name: String },
    BindTexture { unit: u32, texture: TextureId },
    Draw(DrawRecord),
    EndFrame,
}

struct HeadlessBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

struct HeadlessTexture {
    desc: TextureDesc,
    pixels: Option<Vec<u8>>,
}

struct HeadlessShader {
    reflection: ShaderReflection,
    uniforms: Vec<u8>,
}

struct HeadlessFramebuffer {
    color: SmallVec<[TextureId; 4]>,
    depth: Option<TextureId>,
}

/// In-memory backend used by tests and tools
pub struct HeadlessBackend {
    buffers: SlotMap<BufferId, HeadlessBuffer>,
    textures: SlotMap<TextureId, HeadlessTexture>,
    shaders: SlotMap<ShaderId, HeadlessShader>,
    framebuffers: SlotMap<FramebufferId, HeadlessFramebuffer>,
    release_queue: ReleaseQueue,
    size: (u32, u32),
    viewport: (u32, u32),
    depth_test: bool,
    blend: BlendMode,
    bound_textures: FxHashMap<u32, TextureId>,
    current_pass: Option<PassTarget>,
    commands: Vec<Command>,
    frames: u64,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        tracing::debug!("headless backend created ({}x{})", width, height);
        Self {
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            release_queue: ReleaseQueue::new(),
            size: (width, height),
            viewport: (width, height),
            depth_test: false,
            blend: BlendMode::default(),
            bound_textures: FxHashMap::default(),
            current_pass: None,
            commands: Vec::new(),
            frames: 0,
        }
    }

    /// Every call since creation or the last [`take_commands`](Self::take_commands)
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Draws in the command log, in order
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    pub fn buffer_bytes(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(id).map(|b| b.data.as_slice())
    }

    /// Vertex buffer contents decoded as `f32`
    pub fn buffer_f32(&self, id: BufferId) -> Option<Vec<f32>> {
        self.buffer_bytes(id).map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    pub fn texture_desc(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(id).map(|t| &t.desc)
    }

    pub fn texture_pixels(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(id).and_then(|t| t.pixels.as_deref())
    }

    /// Raw staging bytes of a shader's uniform block
    pub fn uniform_block(&self, shader: ShaderId) -> Option<&[u8]> {
        self.shaders.get(shader).map(|s| s.uniforms.as_slice())
    }

    /// Read back a `f32`-based uniform member as its components
    pub fn uniform_f32(&self, shader: ShaderId, name: &str) -> Option<Vec<f32>> {
        let shader = self.shaders.get(shader)?;
        let uniform = shader.reflection.uniform(name)?;
        let start = uniform.offset as usize;
        let end = start + uniform.kind.byte_size() as usize;
        let bytes = shader.uniforms.get(start..end)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    pub fn framebuffer_attachments(&self, id: FramebufferId) -> Option<(&[TextureId], Option<TextureId>)> {
        self.framebuffers.get(id).map(|f| (f.color.as_slice(), f.depth))
    }

    pub fn is_live(&self, resource: GpuResource) -> bool {
        match resource {
            GpuResource::Buffer(id) => self.buffers.contains_key(id),
            GpuResource::Texture(id) => self.textures.contains_key(id),
            GpuResource::Shader(id) => self.shaders.contains_key(id),
            GpuResource::Framebuffer(id) => self.framebuffers.contains_key(id),
        }
    }

    /// Total live resources of all kinds
    pub fn live_resources(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.shaders.len() + self.framebuffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn texture_exists(&self, id: TextureId) -> Result<()> {
        if self.textures.contains_key(id) {
            Ok(())
        } else {
            Err(CoreError::StaleHandle("texture"))
        }
    }
}

impl GpuBackend for HeadlessBackend {
    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }

    fn create_buffer(&mut self, desc: &BufferDesc, contents: &[u8]) -> Result<BufferId> {
        let id = self.buffers.insert(HeadlessBuffer {
            kind: desc.kind,
            data: contents.to_vec(),
        });
        self.commands.push(Command::CreateBuffer {
            id,
            kind: desc.kind,
            len: contents.len(),
        });
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let buf = self.buffers.get_mut(buffer).ok_or(CoreError::StaleHandle("buffer"))?;
        if buf.kind == BufferKind::Index {
            return Err(CoreError::InvalidArgument("index buffers are immutable".into()));
        }
        let start = offset as usize;
        let end = start + data.len();
        let len = buf.data.len();
        buf.data
            .get_mut(start..end)
            .ok_or(CoreError::OutOfBounds { index: end, len })?
            .copy_from_slice(data);
        self.commands.push(Command::WriteBuffer {
            id: buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(CoreError::InvalidArgument(format!(
                "texture size {}x{}",
                desc.width, desc.height
            )));
        }
        if let Some(pixels) = pixels {
            if pixels.len() != desc.byte_len() {
                return Err(CoreError::InvalidArgument(format!(
                    "expected {} bytes of pixel data, got {}",
                    desc.byte_len(),
                    pixels.len()
                )));
            }
        }
        let id = self.textures.insert(HeadlessTexture {
            desc: *desc,
            pixels: pixels.map(<[u8]>::to_vec),
        });
        self.commands.push(Command::CreateTexture {
            id,
            width: desc.width,
            height: desc.height,
        });
        Ok(id)
    }

    fn create_shader(&mut self, source: &ShaderSource) -> Result<(ShaderId, ShaderReflection)> {
        let reflection = reflect_wgsl(&source.label, &source.wgsl)?;
        let id = self.shaders.insert(HeadlessShader {
            uniforms: vec![0; reflection.uniform_block_size as usize],
            reflection: reflection.clone(),
        });
        self.commands.push(Command::CreateShader {
            id,
            label: source.label.to_string(),
        });
        Ok((id, reflection))
    }

    fn create_framebuffer(&mut self, color: &[TextureId], depth: Option<TextureId>) -> Result<FramebufferId> {
        for &texture in color.iter().chain(depth.iter()) {
            self.texture_exists(texture)?;
        }
        let id = self.framebuffers.insert(HeadlessFramebuffer {
            color: color.iter().copied().collect(),
            depth,
        });
        self.commands.push(Command::CreateFramebuffer { id });
        Ok(id)
    }

    fn release(&mut self, resource: GpuResource) {
        let removed = match resource {
            GpuResource::Buffer(id) => self.buffers.remove(id).is_some(),
            GpuResource::Texture(id) => self.textures.remove(id).is_some(),
            GpuResource::Shader(id) => self.shaders.remove(id).is_some(),
            GpuResource::Framebuffer(id) => self.framebuffers.remove(id).is_some(),
        };
        if removed {
            self.commands.push(Command::Release(resource));
        } else {
            tracing::warn!("release of unknown resource {:?}", resource);
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.commands.push(Command::Resize { width, height });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.commands.push(Command::Viewport { width, height });
    }

    fn begin_pass(&mut self, target: PassTarget, clear: Option<ClearValue>) -> Result<()> {
        if let PassTarget::Framebuffer(id) = target {
            if !self.framebuffers.contains_key(id) {
                return Err(CoreError::StaleHandle("framebuffer"));
            }
        }
        self.current_pass = Some(target);
        self.commands.push(Command::BeginPass { target, clear });
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(Command::DepthTest(enabled));
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
        self.commands.push(Command::Blend(mode));
    }

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) -> Result<()> {
        let entry = self.shaders.get_mut(shader).ok_or(CoreError::StaleHandle("shader"))?;
        let uniform = entry
            .reflection
            .uniform(name)
            .ok_or_else(|| CoreError::UnknownUniform(name.to_string()))?;
        value.write_into(&mut entry.uniforms, uniform)?;
        self.commands.push(Command::SetUniform {
            shader,
            name: name.to_string(),
        });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<()> {
        self.texture_exists(texture)?;
        self.bound_textures.insert(unit, texture);
        self.commands.push(Command::BindTexture { unit, texture });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        let target = self
            .current_pass
            .ok_or_else(|| CoreError::Backend("draw outside of a pass".into()))?;
        let shader = self.shaders.get(call.shader).ok_or(CoreError::StaleHandle("shader"))?;

        let vertex_bytes = self
            .buffers
            .get(call.vertex_buffer)
            .ok_or(CoreError::StaleHandle("buffer"))?
            .data
            .len();
        let needed = call.vertex_count as usize * call.layout.stride as usize * 4;
        if needed > vertex_bytes {
            return Err(CoreError::OutOfBounds {
                index: needed,
                len: vertex_bytes,
            });
        }

        if let Some((index_buffer, count)) = call.indices {
            let indices = &self.buffers.get(index_buffer).ok_or(CoreError::StaleHandle("buffer"))?.data;
            let available = indices.len() / 4;
            if count as usize > available {
                return Err(CoreError::OutOfBounds {
                    index: count as usize,
                    len: available,
                });
            }
            for chunk in indices.chunks_exact(4).take(count as usize) {
                let index = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                if index >= call.vertex_count {
                    return Err(CoreError::OutOfBounds {
                        index: index as usize,
                        len: call.vertex_count as usize,
                    });
                }
            }
        }

        let mut textures = SmallVec::new();
        for texture in &shader.reflection.textures {
            let bound = self
                .bound_textures
                .get(&texture.unit)
                .copied()
                .ok_or_else(|| CoreError::Backend(format!("nothing bound to texture unit {}", texture.unit)))?;
            self.texture_exists(bound)?;
            textures.push((texture.unit, bound));
        }

        self.commands.push(Command::Draw(DrawRecord {
            target,
            shader: call.shader,
            vertex_buffer: call.vertex_buffer,
            vertex_count: call.vertex_count,
            index_count: call.indices.map(|(_, count)| count),
            depth_test: self.depth_test,
            blend: self.blend,
            textures,
        }));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.current_pass = None;
        self.frames += 1;
        self.commands.push(Command::EndFrame);
        Ok(())
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        let pending = self.release_queue.len();
        let live = self.live_resources();
        if live > pending {
            tracing::warn!("headless backend dropped with {} unreleased GPU resources", live - pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders;
    use tessel_core::{TextureFormat, VertexAttributeDesc, VertexLayoutDesc};

    fn quad_layout() -> VertexLayoutDesc {
        VertexLayoutDesc {
            stride: 4,
            attributes: smallvec::smallvec![
                VertexAttributeDesc { location: 0, offset: 0, components: 2 },
                VertexAttributeDesc { location: 1, offset: 2, components: 2 },
            ],
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn test_write_buffer_updates_subrange() {
        let mut backend = HeadlessBackend::new(100, 100);
        let id = backend
            .create_buffer(&BufferDesc::vertex("test"), &f32_bytes(&[0.0; 4]))
            .unwrap();
        backend.write_buffer(id, 8, &f32_bytes(&[5.0, 6.0])).unwrap();
        assert_eq!(backend.buffer_f32(id).unwrap(), vec![0.0, 0.0, 5.0, 6.0]);

        let err = backend.write_buffer(id, 12, &f32_bytes(&[1.0, 1.0]));
        assert!(matches!(err, Err(CoreError::OutOfBounds { .. })));
    }

    #[test]
    fn test_index_buffer_is_immutable() {
        let mut backend = HeadlessBackend::new(100, 100);
        let id = backend
            .create_buffer(&BufferDesc::index("idx"), bytemuck::cast_slice(&[0u32, 1, 2]))
            .unwrap();
        assert!(backend.write_buffer(id, 0, &[0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_draw_validates_indices() {
        let mut backend = HeadlessBackend::new(100, 100);
        let (shader, _) = backend
            .create_shader(&ShaderSource::new("ui", shaders::UI_SHADER))
            .unwrap();
        let texture = backend
            .create_texture(&TextureDesc::image(1, 1), Some(&[0, 0, 0, 0]))
            .unwrap();
        let vertices = backend
            .create_buffer(&BufferDesc::vertex("quad"), &f32_bytes(&[0.0; 16]))
            .unwrap();
        let bad = backend
            .create_buffer(&BufferDesc::index("bad"), bytemuck::cast_slice(&[0u32, 1, 7]))
            .unwrap();
        let layout = quad_layout();

        backend.begin_pass(PassTarget::Screen, None).unwrap();
        backend.bind_texture(0, texture).unwrap();
        let call = DrawCall {
            shader,
            layout: &layout,
            vertex_buffer: vertices,
            vertex_count: 4,
            indices: Some((bad, 3)),
        };
        assert!(matches!(backend.draw(&call), Err(CoreError::OutOfBounds { index: 7, .. })));
    }

    #[test]
    fn test_draw_outside_pass_fails() {
        let mut backend = HeadlessBackend::new(10, 10);
        let (shader, _) = backend
            .create_shader(&ShaderSource::new("post", shaders::POST_SHADER))
            .unwrap();
        let vertices = backend
            .create_buffer(&BufferDesc::vertex("quad"), &f32_bytes(&[0.0; 24]))
            .unwrap();
        let layout = quad_layout();
        let call = DrawCall {
            shader,
            layout: &layout,
            vertex_buffer: vertices,
            vertex_count: 6,
            indices: None,
        };
        assert!(backend.draw(&call).is_err());
    }

    #[test]
    fn test_release_queue_frees_on_collect() {
        let mut backend = HeadlessBackend::new(10, 10);
        let id = backend
            .create_texture(
                &TextureDesc::attachment("color", 10, 10, TextureFormat::Rgba8Unorm),
                None,
            )
            .unwrap();
        backend.release_queue().push(GpuResource::Texture(id));
        assert!(backend.is_live(GpuResource::Texture(id)));
        backend.collect_garbage();
        assert!(!backend.is_live(GpuResource::Texture(id)));
    }

    #[test]
    fn test_uniform_readback() {
        let mut backend = HeadlessBackend::new(10, 10);
        let (shader, _) = backend
            .create_shader(&ShaderSource::new("lit", shaders::LIT_SHADER))
            .unwrap();
        backend
            .set_uniform(shader, "view_pos", UniformValue::Vec3([0.0, 0.0, 10.0]))
            .unwrap();
        assert_eq!(backend.uniform_f32(shader, "view_pos").unwrap(), vec![0.0, 0.0, 10.0]);
        assert!(matches!(
            backend.set_uniform(shader, "nope", UniformValue::Float(1.0)),
            Err(CoreError::UnknownUniform(_))
        ));
    }
}
