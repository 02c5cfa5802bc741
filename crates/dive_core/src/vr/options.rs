//! Parser configuration.

use serde::{Deserialize, Serialize};

use crate::scene::MaterialInheritance;

/// Default maximum block nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum vertex count of a single polygon face.
pub const DEFAULT_MAX_FACE_VERTICES: usize = 4096;

/// Default relative tolerance of the ear-clipping inside test.
pub const DEFAULT_EAR_EPSILON: f32 = 1e-6;

/// Knobs for one parse call. Loadable from JSON; missing fields keep their
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Nesting deeper than this aborts the parse
    pub max_depth: usize,

    /// Larger `N_POLY` / `indexed_poly` faces drop their view
    pub max_face_vertices: usize,

    pub material_inheritance: MaterialInheritance,

    pub ear_epsilon: f32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_face_vertices: DEFAULT_MAX_FACE_VERTICES,
            material_inheritance: MaterialInheritance::PerObject,
            ear_epsilon: DEFAULT_EAR_EPSILON,
        }
    }
}
