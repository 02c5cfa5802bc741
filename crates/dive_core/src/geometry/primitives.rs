//! Box, fan, polyline and quad-grid builders.

use dive_math::{Aabb, Vec3};

use super::{GeometryError, GeometryResult};
use crate::mesh::{Lines, Mesh};

/// Upper bound on vertices a single `QUAD_GRID` may generate.
pub const MAX_GRID_VERTICES: i64 = 1 << 20;

/// Center and size of the axis-aligned box spanned by two corners.
///
/// Min/max are taken per axis, so `box_from_corners(a, b)` and
/// `box_from_corners(b, a)` are identical.
pub fn box_from_corners(a: Vec3, b: Vec3) -> (Vec3, Vec3) {
    let aabb = Aabb::from_points(a, b);
    (aabb.centroid(), aabb.size())
}

/// Fan triangulation of a `count`-gon whose vertices start at `base`.
///
/// Emits `(0, i, i + 1)` for `i = 1..count - 1`, offset by `base`.
/// No convexity or planarity check is made.
pub fn fan_indices(count: usize, base: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(count.saturating_sub(2) * 3);
    for i in 1..count.saturating_sub(1) {
        let i = i as u32;
        indices.push(base);
        indices.push(base + i);
        indices.push(base + i + 1);
    }
    indices
}

/// Build one mesh from a list of polygons, each fan-triangulated.
pub fn fan_mesh(polygons: &[Vec<Vec3>], max_face_vertices: usize) -> GeometryResult<Mesh> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for polygon in polygons {
        if polygon.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                what: "polygon",
                min: 3,
                got: polygon.len(),
            });
        }
        if polygon.len() > max_face_vertices {
            return Err(GeometryError::FaceTooLarge {
                count: polygon.len(),
                limit: max_face_vertices,
            });
        }

        let base = positions.len() as u32;
        positions.extend_from_slice(polygon);
        indices.extend(fan_indices(polygon.len(), base));
    }

    Ok(Mesh::new(positions, indices, None))
}

/// Open polyline through `points`: segments `(i, i + 1)`.
pub fn polyline(points: Vec<Vec3>) -> GeometryResult<Lines> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewVertices {
            what: "line",
            min: 2,
            got: points.len(),
        });
    }

    let mut indices = Vec::with_capacity((points.len() - 1) * 2);
    for i in 0..points.len() as u32 - 1 {
        indices.push(i);
        indices.push(i + 1);
    }

    Ok(Lines::new(points, indices))
}

/// Bilinear quad grid.
///
/// `corners` are the points at parameters (0,0), (0,1), (1,0), (1,1) in
/// that order. `nx` by `ny` vertices are generated; vertex `(i, j)` sits at
/// `tx = i / (nx - 1)`, `ty = j / (ny - 1)`, or 0.5 along an axis with a
/// single vertex. Each cell gets two triangles split along the
/// `(i, j)`-`(i + 1, j + 1)` diagonal. Texture coordinates are `(tx, ty)`.
pub fn quad_grid(corners: [Vec3; 4], nx: i64, ny: i64) -> GeometryResult<Mesh> {
    if nx < 1 || ny < 1 || nx.saturating_mul(ny) > MAX_GRID_VERTICES {
        return Err(GeometryError::InvalidGrid { nx, ny });
    }
    let (nx, ny) = (nx as usize, ny as usize);
    let [c00, c01, c10, c11] = corners;

    let param = |k: usize, n: usize| -> f32 {
        if n == 1 {
            0.5
        } else {
            k as f32 / (n - 1) as f32
        }
    };

    let mut positions = Vec::with_capacity(nx * ny);
    let mut uvs = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        let tx = param(i, nx);
        for j in 0..ny {
            let ty = param(j, ny);
            let p = c00 * ((1.0 - tx) * (1.0 - ty))
                + c01 * ((1.0 - tx) * ty)
                + c10 * (tx * (1.0 - ty))
                + c11 * (tx * ty);
            positions.push(p);
            uvs.push([tx, ty]);
        }
    }

    let vertex = |i: usize, j: usize| (i * ny + j) as u32;
    let mut indices = Vec::with_capacity((nx - 1) * ny.saturating_sub(1) * 6);
    for i in 0..nx - 1 {
        for j in 0..ny - 1 {
            let a = vertex(i, j);
            let b = vertex(i + 1, j);
            let c = vertex(i + 1, j + 1);
            let d = vertex(i, j + 1);
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    Ok(Mesh::new_with_uvs(positions, indices, None, Some(uvs)))
}

/// Group a flat coordinate run into `Vec3`s.
pub fn vec3_from_flat(values: &[f32]) -> GeometryResult<Vec<Vec3>> {
    if values.len() % 3 != 0 {
        return Err(GeometryError::RaggedCoordinates {
            len: values.len(),
            arity: 3,
        });
    }
    Ok(values
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect())
}

/// Group a flat coordinate run into texture coordinate pairs.
pub fn uv_from_flat(values: &[f32]) -> GeometryResult<Vec<[f32; 2]>> {
    if values.len() % 2 != 0 {
        return Err(GeometryError::RaggedCoordinates {
            len: values.len(),
            arity: 2,
        });
    }
    Ok(values.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
}
