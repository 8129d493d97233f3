//! Attribute-driven meshes
//!
//! A [`Mesh`] owns a flat `f64` vertex array laid out by an [`AttributeLayout`] and a
//! triangle index list. The GPU copy is a mirror: every CPU mutation widens a dirty
//! range, and [`Mesh::sync`] uploads exactly that range before the next draw.

use std::ops::Range;

use tessel_core::{DVec3, DrawCall, GpuBackend, ShaderId};

use crate::attributes::{names, AttributeLayout};
use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::error::{RenderError, Result};

/// How `set_vertices` recomputes normals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NormalMode {
    /// `normalize((v0 - v1) x (v2 - v1))` per face, written to all three corners.
    /// A vertex shared by several faces keeps the normal of the last face processed.
    #[default]
    FaceNormal,
    /// Direction from the mesh center to the vertex
    Centered,
}

struct MeshBuffers {
    vertices: VertexBuffer,
    indices: IndexBuffer,
}

/// Packed vertex data plus triangle indices
pub struct Mesh {
    layout: AttributeLayout,
    vertices: Vec<f64>,
    indices: Vec<u32>,
    normal_mode: NormalMode,
    center: DVec3,
    dirty: Option<Range<usize>>,
    gpu: Option<MeshBuffers>,
    label: &'static str,
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("label", &self.label)
            .field("stride", &self.layout.stride())
            .field("vertices", &self.vertex_count())
            .field("indices", &self.indices.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Mesh {
    /// Validate and wrap vertex and index data
    ///
    /// Fails on empty input, a vertex array that is not a whole number of vertices,
    /// an index list that is not whole triangles, or an index past the last vertex.
    pub fn new(layout: AttributeLayout, vertices: Vec<f64>, indices: Vec<u32>) -> Result<Self> {
        let stride = layout.stride() as usize;
        if stride == 0 || vertices.is_empty() || indices.is_empty() {
            return Err(RenderError::invalid("mesh requires vertices, indices and a non-empty layout"));
        }
        if vertices.len() % stride != 0 {
            return Err(RenderError::Stride {
                len: vertices.len(),
                stride: layout.stride(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(RenderError::invalid(format!(
                "index count {} is not a triangle list",
                indices.len()
            )));
        }
        let vertex_count = vertices.len() / stride;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RenderError::out_of_bounds(bad as usize, vertex_count));
        }

        Ok(Self {
            layout,
            vertices,
            indices,
            normal_mode: NormalMode::default(),
            center: DVec3::ZERO,
            dirty: None,
            gpu: None,
            label: "mesh",
        })
    }

    pub fn with_normal_mode(mut self, mode: NormalMode) -> Self {
        self.normal_mode = mode;
        self
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Center used by [`NormalMode::Centered`]
    pub fn set_center(&mut self, center: DVec3) {
        self.center = center;
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    pub fn normal_mode(&self) -> NormalMode {
        self.normal_mode
    }

    pub fn stride(&self) -> usize {
        self.layout.stride() as usize
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.stride()
    }

    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// One packed vertex
    pub fn vertex(&self, index: usize) -> Result<&[f64]> {
        let stride = self.stride();
        self.vertices
            .get(index * stride..(index + 1) * stride)
            .ok_or_else(|| RenderError::out_of_bounds(index, self.vertex_count()))
    }

    /// Read one attribute of one vertex
    pub fn attribute(&self, vertex: usize, name: &str) -> Result<&[f64]> {
        let slot = self.layout.require(name)?;
        let start = vertex * self.stride() + slot.offset as usize;
        self.vertices
            .get(start..start + slot.components as usize)
            .ok_or_else(|| RenderError::out_of_bounds(vertex, self.vertex_count()))
    }

    /// Overwrite one attribute of one vertex
    ///
    /// `values` must have exactly as many components as the attribute.
    pub fn write_attribute(&mut self, vertex: usize, name: &str, values: &[f64]) -> Result<()> {
        let slot = self.layout.require(name)?;
        let components = slot.components as usize;
        if values.len() != components {
            return Err(RenderError::AttributeSize {
                name: name.to_string(),
                expected: components,
                actual: values.len(),
            });
        }
        let count = self.vertex_count();
        if vertex >= count {
            return Err(RenderError::out_of_bounds(vertex, count));
        }
        let start = vertex * self.stride() + slot.offset as usize;
        self.vertices[start..start + components].copy_from_slice(values);
        self.mark_dirty(start..start + components);
        Ok(())
    }

    /// Overwrite one attribute for every vertex from tightly packed `data`
    pub fn fill_attribute(&mut self, name: &str, data: &[f64]) -> Result<()> {
        let slot = self.layout.require(name)?;
        let components = slot.components as usize;
        let offset = slot.offset as usize;
        let expected = self.vertex_count() * components;
        if data.len() != expected {
            return Err(RenderError::AttributeSize {
                name: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        let stride = self.stride();
        for (vertex, values) in self.vertices.chunks_exact_mut(stride).zip(data.chunks_exact(components)) {
            vertex[offset..offset + components].copy_from_slice(values);
        }
        self.mark_dirty(0..self.vertices.len());
        Ok(())
    }

    /// Positions of every vertex, padded with zeros for 2D layouts
    pub fn positions(&self) -> Result<Vec<DVec3>> {
        let slot = self.layout.require(names::POSITION)?;
        let offset = slot.offset as usize;
        let components = (slot.components as usize).min(3);
        Ok(self
            .vertices
            .chunks_exact(self.stride())
            .map(|v| {
                let mut p = [0.0; 3];
                p[..components].copy_from_slice(&v[offset..offset + components]);
                DVec3::from_array(p)
            })
            .collect())
    }

    /// Overwrite every vertex position, optionally recomputing normals
    pub fn set_vertices(&mut self, positions: &[DVec3], update_normals: bool) -> Result<()> {
        if positions.is_empty() {
            return Err(RenderError::invalid("set_vertices requires at least one position"));
        }
        let count = self.vertex_count();
        if positions.len() != count {
            return Err(RenderError::AttributeSize {
                name: names::POSITION.to_string(),
                expected: count,
                actual: positions.len(),
            });
        }
        if update_normals {
            self.normal_offset()?;
        }
        let slot = self.layout.require(names::POSITION)?;
        let offset = slot.offset as usize;
        let components = (slot.components as usize).min(3);
        let stride = self.stride();
        for (vertex, position) in self.vertices.chunks_exact_mut(stride).zip(positions) {
            vertex[offset..offset + components].copy_from_slice(&position.to_array()[..components]);
        }
        self.mark_dirty(0..self.vertices.len());

        if update_normals {
            self.recalculate_normals()?;
        }
        Ok(())
    }

    /// Translate every position by `delta`
    pub fn translate(&mut self, delta: DVec3) -> Result<()> {
        let moved: Vec<DVec3> = self.positions()?.into_iter().map(|p| p + delta).collect();
        self.center += delta;
        self.set_vertices(&moved, false)
    }

    /// Recompute normals according to the mesh's [`NormalMode`]
    pub fn recalculate_normals(&mut self) -> Result<()> {
        let normal_offset = self.normal_offset()?;
        let positions = self.positions()?;
        let stride = self.stride();

        match self.normal_mode {
            NormalMode::Centered => {
                for (vertex, position) in self.vertices.chunks_exact_mut(stride).zip(&positions) {
                    let n = (*position - self.center).normalize_or_zero();
                    vertex[normal_offset..normal_offset + 3].copy_from_slice(&n.to_array());
                }
            }
            NormalMode::FaceNormal => {
                for face in self.indices.chunks_exact(3) {
                    let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
                    let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);
                    let n = (v0 - v1).cross(v2 - v1).normalize_or_zero().to_array();
                    for i in [i0, i1, i2] {
                        let start = i * stride + normal_offset;
                        self.vertices[start..start + 3].copy_from_slice(&n);
                    }
                }
            }
        }
        self.mark_dirty(0..self.vertices.len());
        Ok(())
    }

    /// Offset of the 3-component normal within a vertex
    fn normal_offset(&self) -> Result<usize> {
        let slot = self.layout.require(names::NORMAL)?;
        if slot.components != 3 {
            return Err(RenderError::AttributeSize {
                name: names::NORMAL.to_string(),
                expected: 3,
                actual: slot.components as usize,
            });
        }
        Ok(slot.offset as usize)
    }

    fn mark_dirty(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(current) => current.start.min(range.start)..current.end.max(range.end),
            None => range,
        });
    }

    /// Whether CPU data has changed since the last upload
    pub fn is_dirty(&self) -> bool {
        self.gpu.is_none() || self.dirty.is_some()
    }

    /// Component range awaiting upload
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Create the GPU buffers on first use, then upload the dirty range
    pub fn sync(&mut self, backend: &mut dyn GpuBackend) -> Result<()> {
        if self.gpu.is_none() {
            let vertices = VertexBuffer::new(backend, self.label, &self.vertices)?;
            let indices = IndexBuffer::new(backend, self.label, &self.indices)?;
            self.gpu = Some(MeshBuffers { vertices, indices });
            self.dirty = None;
            return Ok(());
        }
        if let (Some(buffers), Some(range)) = (&mut self.gpu, self.dirty.take()) {
            buffers
                .vertices
                .update(backend, range.start, &self.vertices[range.clone()])?;
        }
        Ok(())
    }

    /// Sync and draw the whole mesh with `shader`
    ///
    /// Uniforms and textures must already be set on the backend.
    pub fn draw(&mut self, backend: &mut dyn GpuBackend, shader: ShaderId) -> Result<()> {
        self.sync(backend)?;
        let Some(buffers) = &self.gpu else {
            return Ok(());
        };
        backend.draw(&DrawCall {
            shader,
            layout: self.layout.desc(),
            vertex_buffer: buffers.vertices.id(),
            vertex_count: self.vertex_count() as u32,
            indices: Some((buffers.indices.id(), buffers.indices.count())),
        })?;
        Ok(())
    }

    /// GPU vertex buffer, once synced
    pub fn vertex_buffer(&self) -> Option<&VertexBuffer> {
        self.gpu.as_ref().map(|b| &b.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::CoreError;
    use tessel_gpu::HeadlessBackend;

    fn lit_layout() -> AttributeLayout {
        AttributeLayout::new([("position", 3), ("tex_coord", 2), ("normal", 3)])
    }

    fn triangle(a: DVec3, b: DVec3, c: DVec3) -> Mesh {
        let mut vertices = Vec::new();
        for p in [a, b, c] {
            vertices.extend_from_slice(&[p.x, p.y, p.z, 0.0, 0.0, 0.0, 0.0, 0.0]);
        }
        Mesh::new(lit_layout(), vertices, vec![0, 1, 2]).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_out_of_range() {
        assert!(matches!(
            Mesh::new(lit_layout(), Vec::new(), vec![0, 1, 2]),
            Err(RenderError::Core(CoreError::InvalidArgument(_)))
        ));
        assert!(matches!(
            Mesh::new(lit_layout(), vec![0.0; 16], vec![0, 1, 2]),
            Err(RenderError::Core(CoreError::OutOfBounds { index: 2, len: 2 }))
        ));
        assert!(matches!(
            Mesh::new(lit_layout(), vec![0.0; 12], vec![0, 0, 0]),
            Err(RenderError::Stride { len: 12, stride: 8 })
        ));
    }

    #[test]
    fn test_set_vertices_without_normal_slot_leaves_mesh_untouched() {
        let layout = AttributeLayout::new([("position", 3), ("tex_coord", 2)]);
        let mut mesh = Mesh::new(layout, vec![0.0; 15], vec![0, 1, 2]).unwrap();
        let before = mesh.vertices().to_vec();

        assert!(mesh.set_vertices(&[DVec3::ONE; 3], true).is_err());
        assert_eq!(mesh.vertices(), &before[..]);
        assert_eq!(mesh.dirty_range(), None);

        mesh.set_vertices(&[DVec3::ONE; 3], false).unwrap();
        assert_eq!(&mesh.vertices()[..5], &[1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_triangle_face_normal() {
        let (a, b, c) = (DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.0, 1.0, 0.0));
        let mut mesh = triangle(a, b, c);
        mesh.set_vertices(&[a, b, c], true).unwrap();

        let expected = (a - b).cross(c - b).normalize();
        for i in 0..3 {
            assert_eq!(mesh.attribute(i, "normal").unwrap(), &expected.to_array());
        }
    }

    #[test]
    fn test_shared_vertex_keeps_last_face_normal() {
        // Two faces share vertices 0 and 2; no averaging happens.
        let layout = lit_layout();
        let corners = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
        ];
        let mut vertices = Vec::new();
        for p in corners {
            vertices.extend_from_slice(&[p.x, p.y, p.z, 0.0, 0.0, 0.0, 0.0, 0.0]);
        }
        let mut mesh = Mesh::new(layout, vertices, vec![0, 1, 2, 0, 2, 3]).unwrap();
        mesh.set_vertices(&corners, true).unwrap();

        let second = (corners[0] - corners[2]).cross(corners[3] - corners[2]).normalize();
        assert_eq!(mesh.attribute(0, "normal").unwrap(), &second.to_array());
        assert_eq!(mesh.attribute(2, "normal").unwrap(), &second.to_array());
        assert_ne!(mesh.attribute(1, "normal").unwrap(), &second.to_array());
    }

    #[test]
    fn test_centered_normals_point_away_from_center() {
        let a = DVec3::new(2.0, 0.0, 0.0);
        let b = DVec3::new(0.0, 3.0, 0.0);
        let c = DVec3::new(0.0, 0.0, -4.0);
        let mut mesh = triangle(a, b, c).with_normal_mode(NormalMode::Centered);
        mesh.set_vertices(&[a, b, c], true).unwrap();
        assert_eq!(mesh.attribute(0, "normal").unwrap(), &[1.0, 0.0, 0.0]);
        assert_eq!(mesh.attribute(2, "normal").unwrap(), &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_attribute_size_mismatch_is_an_error() {
        let mut mesh = triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
        assert!(matches!(
            mesh.write_attribute(0, "tex_coord", &[0.5]),
            Err(RenderError::AttributeSize { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            mesh.fill_attribute("normal", &[0.0; 6]),
            Err(RenderError::AttributeSize { expected: 9, .. })
        ));
        assert!(mesh.set_vertices(&[], false).is_err());
    }

    #[test]
    fn test_sync_uploads_dirty_range_only() {
        let mut backend = HeadlessBackend::new(10, 10);
        let mut mesh = triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
        mesh.sync(&mut backend).unwrap();
        assert!(!mesh.is_dirty());

        mesh.write_attribute(1, "tex_coord", &[0.25, 0.75]).unwrap();
        assert_eq!(mesh.dirty_range(), Some(11..13));
        backend.take_commands();
        mesh.sync(&mut backend).unwrap();

        let id = mesh.vertex_buffer().unwrap().id();
        assert_eq!(
            backend.commands(),
            &[tessel_gpu::Command::WriteBuffer { id, offset: 44, len: 8 }]
        );
        assert_eq!(backend.buffer_f32(id).unwrap()[11..13], [0.25, 0.75]);
    }
}
