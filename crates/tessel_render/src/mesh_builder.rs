//! Primitive mesh generation
//!
//! Every primitive is assembled against a caller-supplied layout that must carry
//! `position` (3), `tex_coord` (2) and `normal` (3). Faces are wound so the
//! face-normal rule `(v0 - v1) x (v2 - v1)` points outward.

use tessel_core::{DQuat, DVec2, DVec3};

use crate::attributes::{names, AttributeLayout};
use crate::error::{RenderError, Result};
use crate::mesh::{Mesh, NormalMode};

const TEX_MIN: f64 = 0.01;
const TEX_MAX: f64 = 0.99;

const CARDINALS: [DVec3; 6] = [DVec3::Z, DVec3::NEG_Z, DVec3::X, DVec3::NEG_X, DVec3::Y, DVec3::NEG_Y];

/// Two axes spanning the plane perpendicular to `normal`, with `a x b == normal`
fn plane_axes(normal: DVec3) -> (DVec3, DVec3) {
    let a = DVec3::new(normal.y, normal.z, normal.x);
    (a, normal.cross(a))
}

struct Geometry {
    positions: Vec<DVec3>,
    tex_coords: Vec<DVec2>,
    indices: Vec<u32>,
}

/// Builds cubes, planes and spheres for a lit-style layout
#[derive(Clone, Debug)]
pub struct MeshBuilder {
    layout: AttributeLayout,
    scale: f64,
    rotation: DQuat,
}

impl MeshBuilder {
    pub fn new(layout: &AttributeLayout) -> Result<Self> {
        for (name, components) in [(names::POSITION, 3), (names::TEX_COORD, 2), (names::NORMAL, 3)] {
            let slot = layout.require(name)?;
            if slot.components != components {
                return Err(RenderError::AttributeSize {
                    name: name.to_string(),
                    expected: components as usize,
                    actual: slot.components as usize,
                });
            }
        }
        Ok(Self {
            layout: layout.clone(),
            scale: 1.0,
            rotation: DQuat::IDENTITY,
        })
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Unit cube with 4 vertices per face and flat face normals
    pub fn cube(&self) -> Result<Mesh> {
        let mut geometry = Geometry {
            positions: Vec::with_capacity(24),
            tex_coords: Vec::with_capacity(24),
            indices: Vec::with_capacity(36),
        };
        for normal in CARDINALS {
            let (a, b) = plane_axes(normal);
            let base = geometry.positions.len() as u32;
            let center = normal * 0.5;
            geometry.positions.extend([
                center - a * 0.5 - b * 0.5,
                center + a * 0.5 - b * 0.5,
                center + a * 0.5 + b * 0.5,
                center - a * 0.5 + b * 0.5,
            ]);
            geometry.tex_coords.extend([
                DVec2::new(0.0, 0.0),
                DVec2::new(0.5, 0.0),
                DVec2::new(0.5, 0.5),
                DVec2::new(0.0, 0.5),
            ]);
            geometry
                .indices
                .extend([base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        self.assemble(geometry, NormalMode::FaceNormal)
    }

    /// Square grid of `resolution × resolution` vertices spanning -1..1 on the plane
    pub fn plane(&self, resolution: u32, normal: DVec3) -> Result<Mesh> {
        let geometry = Self::plane_geometry(resolution, normal, false)?;
        self.assemble(geometry, NormalMode::FaceNormal)
    }

    /// Sphere built from six cube-face grids projected onto the unit sphere
    pub fn sphere(&self, resolution: u32) -> Result<Mesh> {
        let mut geometry = Geometry {
            positions: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
        };
        for normal in CARDINALS {
            let face = Self::plane_geometry(resolution, normal, true)?;
            let base = geometry.positions.len() as u32;
            geometry.positions.extend(face.positions.iter().map(|p| p.normalize()));
            geometry.tex_coords.extend(face.tex_coords);
            geometry.indices.extend(face.indices.iter().map(|i| i + base));
        }
        self.assemble(geometry, NormalMode::Centered)
    }

    fn plane_geometry(resolution: u32, normal: DVec3, on_unit_cube: bool) -> Result<Geometry> {
        if resolution < 2 {
            return Err(RenderError::invalid(format!(
                "plane resolution must be at least 2, got {resolution}"
            )));
        }
        let normal = normal.try_normalize().ok_or_else(|| RenderError::invalid("plane normal is zero"))?;
        let (a, b) = plane_axes(normal);
        let res = resolution as usize;
        let offset = if on_unit_cube { normal } else { DVec3::ZERO };

        let mut positions = vec![DVec3::ZERO; res * res];
        let mut tex_coords = vec![DVec2::ZERO; res * res];
        let mut indices = Vec::with_capacity((res - 1) * (res - 1) * 6);
        for x in 0..res {
            for y in 0..res {
                let i = y * res + x;
                let p = DVec2::new(x as f64, y as f64) / (res - 1) as f64 * 2.0 - DVec2::ONE;
                positions[i] = a * p.x + b * p.y + offset;
                tex_coords[i] = (p + DVec2::ONE) / 2.0;

                if x != res - 1 && y != res - 1 {
                    let i = i as u32;
                    let r = resolution;
                    indices.extend([i, i + r, i + r + 1, i, i + r + 1, i + 1]);
                }
            }
        }
        Ok(Geometry {
            positions,
            tex_coords,
            indices,
        })
    }

    fn assemble(&self, geometry: Geometry, mode: NormalMode) -> Result<Mesh> {
        let stride = self.layout.stride() as usize;
        let pos = self.layout.require(names::POSITION)?.offset as usize;
        let tex = self.layout.require(names::TEX_COORD)?.offset as usize;

        let mut vertices = vec![0.0; geometry.positions.len() * stride];
        for ((vertex, position), uv) in vertices
            .chunks_exact_mut(stride)
            .zip(&geometry.positions)
            .zip(&geometry.tex_coords)
        {
            let p = self.rotation * *position * self.scale;
            vertex[pos..pos + 3].copy_from_slice(&p.to_array());
            vertex[tex] = uv.x.clamp(TEX_MIN, TEX_MAX);
            vertex[tex + 1] = uv.y.clamp(TEX_MIN, TEX_MAX);
        }

        let mut mesh = Mesh::new(self.layout.clone(), vertices, geometry.indices)?.with_normal_mode(mode);
        mesh.recalculate_normals()?;
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MeshBuilder {
        let layout = AttributeLayout::new([("position", 3), ("tex_coord", 2), ("normal", 3)]);
        MeshBuilder::new(&layout).unwrap()
    }

    fn normal(mesh: &Mesh, vertex: usize) -> DVec3 {
        DVec3::from_slice(mesh.attribute(vertex, "normal").unwrap())
    }

    #[test]
    fn test_cube_has_outward_face_normals() {
        let cube = builder().cube().unwrap();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices().len(), 36);
        for (face, expected) in CARDINALS.iter().enumerate() {
            for corner in 0..4 {
                let n = normal(&cube, face * 4 + corner);
                assert!((n - *expected).length() < 1e-12, "face {face}: {n:?}");
            }
        }
    }

    #[test]
    fn test_plane_grid_and_tex_clamp() {
        let plane = builder().plane(3, DVec3::Y).unwrap();
        assert_eq!(plane.vertex_count(), 9);
        assert_eq!(plane.indices().len(), 24);
        assert!((normal(&plane, 4) - DVec3::Y).length() < 1e-12);
        assert_eq!(plane.attribute(0, "tex_coord").unwrap(), &[0.01, 0.01]);
        assert_eq!(plane.attribute(8, "tex_coord").unwrap(), &[0.99, 0.99]);
        assert!(builder().plane(1, DVec3::Y).is_err());
    }

    #[test]
    fn test_sphere_vertices_on_unit_sphere() {
        let sphere = builder().scale(2.0).sphere(4).unwrap();
        assert_eq!(sphere.vertex_count(), 6 * 16);
        assert_eq!(sphere.normal_mode(), NormalMode::Centered);
        for (i, p) in sphere.positions().unwrap().iter().enumerate() {
            assert!((p.length() - 2.0).abs() < 1e-9);
            assert!((normal(&sphere, i) - p.normalize()).length() < 1e-9);
        }
    }

    #[test]
    fn test_requires_lit_layout() {
        let ui = AttributeLayout::new([("position", 2), ("tex_coord", 2)]);
        assert!(MeshBuilder::new(&ui).is_err());
    }
}
