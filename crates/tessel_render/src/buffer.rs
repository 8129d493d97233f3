//! GPU buffer mirrors
//!
//! The CPU side keeps `f64` vertex data; buffers hold the `f32` copy the shaders read.
//! Both types queue their GPU buffer for release when dropped.

use tessel_core::{BufferDesc, BufferId, GpuBackend, GpuResource, ReleaseQueue};

use crate::error::{RenderError, Result};

fn to_f32(data: &[f64]) -> Vec<f32> {
    data.iter().map(|&v| v as f32).collect()
}

/// Mutable vertex buffer supporting sub-range re-upload
#[derive(Debug)]
pub struct VertexBuffer {
    id: BufferId,
    /// Length in `f32` components
    len: usize,
    release: ReleaseQueue,
}

impl VertexBuffer {
    pub fn new(backend: &mut dyn GpuBackend, label: &'static str, data: &[f64]) -> Result<Self> {
        let floats = to_f32(data);
        let id = backend.create_buffer(&BufferDesc::vertex(label), bytemuck::cast_slice(&floats))?;
        Ok(Self {
            id,
            len: data.len(),
            release: backend.release_queue(),
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Re-upload `data` starting at component `offset`
    pub fn update(&mut self, backend: &mut dyn GpuBackend, offset: usize, data: &[f64]) -> Result<()> {
        let end = offset + data.len();
        if end > self.len {
            return Err(RenderError::out_of_bounds(end, self.len));
        }
        let floats = to_f32(data);
        backend.write_buffer(self.id, (offset * 4) as u64, bytemuck::cast_slice(&floats))?;
        Ok(())
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.release.push(GpuResource::Buffer(self.id));
    }
}

/// Immutable `u32` triangle index buffer
#[derive(Debug)]
pub struct IndexBuffer {
    id: BufferId,
    count: u32,
    release: ReleaseQueue,
}

impl IndexBuffer {
    pub fn new(backend: &mut dyn GpuBackend, label: &'static str, indices: &[u32]) -> Result<Self> {
        let id = backend.create_buffer(&BufferDesc::index(label), bytemuck::cast_slice(indices))?;
        Ok(Self {
            id,
            count: indices.len() as u32,
            release: backend.release_queue(),
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        self.release.push(GpuResource::Buffer(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_gpu::HeadlessBackend;

    #[test]
    fn test_partial_update_writes_only_the_range() {
        let mut backend = HeadlessBackend::new(10, 10);
        let mut buffer = VertexBuffer::new(&mut backend, "test", &[0.0; 6]).unwrap();
        buffer.update(&mut backend, 2, &[1.5, 2.5]).unwrap();
        assert_eq!(
            backend.buffer_f32(buffer.id()).unwrap(),
            vec![0.0, 0.0, 1.5, 2.5, 0.0, 0.0]
        );
        assert!(buffer.update(&mut backend, 5, &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_drop_queues_release() {
        let mut backend = HeadlessBackend::new(10, 10);
        let id = {
            let indices = IndexBuffer::new(&mut backend, "idx", &[0, 1, 2]).unwrap();
            assert_eq!(indices.count(), 3);
            indices.id()
        };
        assert!(backend.is_live(GpuResource::Buffer(id)));
        backend.collect_garbage();
        assert!(!backend.is_live(GpuResource::Buffer(id)));
    }
}
