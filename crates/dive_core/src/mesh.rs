//! Mesh and line geometry for the DIVE scene graph.
//!
//! GPU-agnostic vertex/index data produced by the geometry builders and
//! handed to whatever renderer walks the scene.

use dive_math::{Aabb, Vec3};
use serde::Serialize;

use crate::geometry::{GeometryError, GeometryResult};

/// A triangle mesh: vertex positions, optional normals and UVs, and
/// triangle indices (every 3 indices form a triangle).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - left to the renderer if absent)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self::new_with_uvs(positions, indices, normals, None)
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Aabb::from_positions(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Check the index and attribute invariants.
    ///
    /// Indices must come in whole triangles and stay within the position
    /// array; normals and UVs, when present, must match the vertex count.
    pub fn validate(&self) -> GeometryResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::RaggedIndices {
                len: self.indices.len(),
                what: "triangles",
            });
        }
        check_indices(&self.indices, self.positions.len())?;

        if let Some(normals) = &self.normals {
            check_attribute("normals", normals.len(), self.positions.len())?;
        }
        if let Some(uvs) = &self.uvs {
            check_attribute("uvs", uvs.len(), self.positions.len())?;
        }
        Ok(())
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Line segments: every 2 indices form one segment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lines {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl Lines {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_positions(&positions);
        Self {
            positions,
            indices,
            bounds,
        }
    }

    pub fn validate(&self) -> GeometryResult<()> {
        if self.indices.len() % 2 != 0 {
            return Err(GeometryError::RaggedIndices {
                len: self.indices.len(),
                what: "segments",
            });
        }
        check_indices(&self.indices, self.positions.len())
    }

    pub fn segment_count(&self) -> usize {
        self.indices.len() / 2
    }
}

fn check_indices(indices: &[u32], len: usize) -> GeometryResult<()> {
    match indices.iter().find(|&&i| i as usize >= len) {
        Some(&index) => Err(GeometryError::IndexOutOfRange {
            index: index as i64,
            len,
        }),
        None => Ok(()),
    }
}

fn check_attribute(name: &'static str, got: usize, expected: usize) -> GeometryResult<()> {
    if got != expected {
        return Err(GeometryError::AttributeMismatch {
            name,
            got,
            expected,
        });
    }
    Ok(())
}
