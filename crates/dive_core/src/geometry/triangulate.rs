//! Ear-clipping triangulation for `indexed_poly` faces.
//!
//! Faces may be concave and mildly non-planar. Each face is projected to
//! 2D by dropping the axis where its Newell normal is largest, then ears
//! are clipped until a single triangle is left.

use dive_math::{Vec2, Vec3};

use super::{GeometryError, GeometryResult};
use crate::mesh::Mesh;

/// Face normal by Newell's method, normalized.
///
/// Returns `Vec3::ZERO` for degenerate (collinear or empty) input.
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal.normalize_or_zero()
}

/// The two axes kept when projecting onto the plane most parallel to the face.
fn projection_axes(normal: Vec3) -> (usize, usize) {
    let a = normal.abs();
    if a.x >= a.y && a.x >= a.z {
        (1, 2)
    } else if a.y >= a.z {
        (2, 0)
    } else {
        (0, 1)
    }
}

/// Twice the signed area of triangle `(a, b, c)`.
fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn signed_area(points: &[Vec2]) -> f32 {
    let mut area = 0.0;
    for (i, p) in points.iter().enumerate() {
        area += p.perp_dot(points[(i + 1) % points.len()]);
    }
    area * 0.5
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2, orientation: f32, tolerance: f32) -> bool {
    let d1 = cross(a, b, p) * orientation;
    let d2 = cross(b, c, p) * orientation;
    let d3 = cross(c, a, p) * orientation;
    d1 >= -tolerance && d2 >= -tolerance && d3 >= -tolerance
}

/// Triangulate a simple polygon by ear clipping.
///
/// Returns triangles as indices into `points`, wound like the input. If no
/// ear can be found during a full pass over the remaining vertices (self
/// intersecting or degenerate input), the remainder is fan-filled so the
/// result always holds `points.len() - 2` triangles.
pub fn ear_clip(points: &[Vec3], epsilon: f32) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let (u, v) = projection_axes(newell_normal(points));
    let projected: Vec<Vec2> = points.iter().map(|p| Vec2::new(p[u], p[v])).collect();

    let orientation = if signed_area(&projected) < 0.0 { -1.0 } else { 1.0 };

    // Scale the tolerance with the polygon so it is unit independent.
    let (min, max) = projected
        .iter()
        .fold((projected[0], projected[0]), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = (max - min).max_element();
    let tolerance = epsilon * extent * extent;

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);
    let mut cursor = 0;
    let mut misses = 0;

    while remaining.len() > 3 {
        let m = remaining.len();
        if misses > m {
            log::debug!("No ear among {} remaining vertices, fan-filling the rest", m);
            for k in 1..m - 1 {
                triangles.push([remaining[0], remaining[k], remaining[k + 1]]);
            }
            return triangles;
        }

        let i = cursor % m;
        let prev = remaining[(i + m - 1) % m];
        let current = remaining[i];
        let next = remaining[(i + 1) % m];
        let (a, b, c) = (projected[prev], projected[current], projected[next]);

        let convex = cross(a, b, c) * orientation > tolerance;
        let is_ear = convex
            && !remaining.iter().any(|&k| {
                if k == prev || k == current || k == next {
                    return false;
                }
                let p = projected[k];
                // Coincident vertices (seams) never block an ear.
                if p == a || p == b || p == c {
                    return false;
                }
                point_in_triangle(p, a, b, c, orientation, tolerance)
            });

        if is_ear {
            triangles.push([prev, current, next]);
            remaining.remove(i);
            cursor = i % (m - 1);
            misses = 0;
        } else {
            cursor = i + 1;
            misses += 1;
        }
    }

    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

/// Split a sentinel-terminated index list into faces.
///
/// Any negative value ends the current face. A final face without a
/// terminator is kept. Empty faces are dropped.
pub fn split_faces(list: &[i64]) -> Vec<Vec<i64>> {
    let mut faces = Vec::new();
    let mut face = Vec::new();
    for &index in list {
        if index < 0 {
            if !face.is_empty() {
                faces.push(std::mem::take(&mut face));
            }
        } else {
            face.push(index);
        }
    }
    if !face.is_empty() {
        faces.push(face);
    }
    faces
}

/// Shared vertex/normal/texcoord lists plus polygon index lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedPoly {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<[f32; 2]>,
    pub faces: Vec<Vec<i64>>,
    pub normal_faces: Vec<Vec<i64>>,
    pub texcoord_faces: Vec<Vec<i64>>,
}

impl IndexedPoly {
    /// Triangulate every face into a single mesh.
    ///
    /// Without normal or texcoord lists the mesh indexes the shared vertex
    /// list directly. With either list present, every triangle corner gets
    /// its own vertex so per-face attributes are kept.
    pub fn build(&self, max_face_vertices: usize, epsilon: f32) -> GeometryResult<Mesh> {
        let expand = !self.normals.is_empty() || !self.texcoords.is_empty();

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();

        for (f, face) in self.faces.iter().enumerate() {
            if face.len() < 3 {
                log::debug!("Skipping face {} with {} vertices", f, face.len());
                continue;
            }
            if face.len() > max_face_vertices {
                return Err(GeometryError::FaceTooLarge {
                    count: face.len(),
                    limit: max_face_vertices,
                });
            }

            let global = face
                .iter()
                .map(|&index| self.vertex_index(index))
                .collect::<GeometryResult<Vec<usize>>>()?;

            let local = if global.len() == 3 {
                vec![[0, 1, 2]]
            } else {
                let points: Vec<Vec3> = global.iter().map(|&g| self.vertices[g]).collect();
                ear_clip(&points, epsilon)
            };

            for triangle in local {
                for k in triangle {
                    if expand {
                        positions.push(self.vertices[global[k]]);
                        normals.push(self.corner_normal(f, k, global[k]));
                        uvs.push(self.corner_texcoord(f, k, global[k]));
                        indices.push(positions.len() as u32 - 1);
                    } else {
                        indices.push(global[k] as u32);
                    }
                }
            }
        }

        if !expand {
            return Ok(Mesh::new(self.vertices.clone(), indices, None));
        }

        let normals = (!self.normals.is_empty()).then_some(normals);
        let uvs = (!self.texcoords.is_empty()).then_some(uvs);
        Ok(Mesh::new_with_uvs(positions, indices, normals, uvs))
    }

    fn vertex_index(&self, index: i64) -> GeometryResult<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.vertices.len())
            .ok_or(GeometryError::IndexOutOfRange {
                index,
                len: self.vertices.len(),
            })
    }

    fn corner_normal(&self, face: usize, corner: usize, vertex: usize) -> Vec3 {
        lookup(&self.normal_faces, face, corner)
            .and_then(|i| self.normals.get(i))
            .or_else(|| self.normals.get(vertex))
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    fn corner_texcoord(&self, face: usize, corner: usize, vertex: usize) -> [f32; 2] {
        lookup(&self.texcoord_faces, face, corner)
            .and_then(|i| self.texcoords.get(i))
            .or_else(|| self.texcoords.get(vertex))
            .copied()
            .unwrap_or([0.0, 0.0])
    }
}

/// Per-face attribute index for one corner, if the face list provides it.
fn lookup(faces: &[Vec<i64>], face: usize, corner: usize) -> Option<usize> {
    faces
        .get(face)
        .and_then(|f| f.get(corner))
        .and_then(|&i| usize::try_from(i).ok())
}
