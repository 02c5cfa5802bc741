//! Geometry builders.
//!
//! Pure numeric routines that turn primitive parameter sets into
//! renderer-ready vertex/index data. Nothing here knows about tokens or
//! the scene graph; the `.vr` grammar rules call into these and wrap any
//! [`GeometryError`] into a parse error for the enclosing view.

mod primitives;
mod triangulate;

use thiserror::Error;

pub use primitives::*;
pub use triangulate::*;

/// Errors raised while building geometry from primitive parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{what} needs at least {min} vertices, got {got}")]
    TooFewVertices {
        what: &'static str,
        min: usize,
        got: usize,
    },

    #[error("{len} coordinates do not form whole {arity}-component tuples")]
    RaggedCoordinates { len: usize, arity: usize },

    #[error("{len} indices do not form whole {what}")]
    RaggedIndices { len: usize, what: &'static str },

    #[error("index {index} out of range for {len} vertices")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{name} has {got} entries for {expected} vertices")]
    AttributeMismatch {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("face has {count} vertices, limit is {limit}")]
    FaceTooLarge { count: usize, limit: usize },

    #[error("grid subdivision {nx}x{ny} is invalid")]
    InvalidGrid { nx: i64, ny: i64 },
}

/// Result type for geometry builders.
pub type GeometryResult<T> = Result<T, GeometryError>;
