// Re-export glam for convenience
pub use glam::*;

// DIVE math types
mod aabb;
mod transform;

pub use aabb::Aabb;
pub use transform::{euler_xyz, fixed_xyz, from_basis_rows, Mat4Ext};
