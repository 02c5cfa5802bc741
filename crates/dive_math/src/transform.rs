// Rotation helpers for the DIVE transform keywords.
//
// All angles are radians. Matrices are column-major glam types.

use glam::{Mat3, Mat4, Vec3};

use crate::Aabb;

/// Rotation for `eulerxyz`: about X, then the rotated Y, then the rotated Z.
pub fn euler_xyz(angles: Vec3) -> Mat3 {
    Mat3::from_rotation_x(angles.x) * Mat3::from_rotation_y(angles.y) * Mat3::from_rotation_z(angles.z)
}

/// Rotation for `fixedxyz`: about the fixed world X, then Y, then Z axes.
pub fn fixed_xyz(angles: Vec3) -> Mat3 {
    Mat3::from_rotation_z(angles.z) * Mat3::from_rotation_y(angles.y) * Mat3::from_rotation_x(angles.x)
}

/// Rotation given as three basis rows, as written by `rotation v.. v.. v..`.
pub fn from_basis_rows(rows: [Vec3; 3]) -> Mat3 {
    Mat3::from_cols(rows[0], rows[1], rows[2]).transpose()
}

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return *aabb;
        }

        let mut result = Aabb::EMPTY;
        for corner in aabb.corners() {
            result.grow(self.transform_point3(corner));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_euler_single_axis_matches_glam() {
        let m = euler_xyz(Vec3::new(0.0, 0.0, FRAC_PI_2));
        assert!(close(m * Vec3::X, Vec3::Y));
    }

    #[test]
    fn test_euler_and_fixed_differ_in_order() {
        let angles = Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0);
        let euler = euler_xyz(angles) * Vec3::Z;
        let fixed = fixed_xyz(angles) * Vec3::Z;

        // Intrinsic X then Y: Z -> X. Extrinsic X then Y: Z -> -Y -> -Y.
        assert!(close(euler, Vec3::X));
        assert!(close(fixed, Vec3::new(0.0, -1.0, 0.0)));
    }

    #[test]
    fn test_basis_rows_identity() {
        let m = from_basis_rows([Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(m, Mat3::IDENTITY);
    }

    #[test]
    fn test_basis_rows_are_rows() {
        // Row 0 = (0, 1, 0): x' = y
        let m = from_basis_rows([Vec3::Y, Vec3::NEG_X, Vec3::Z]);
        assert!(close(m * Vec3::new(0.0, 1.0, 0.0), Vec3::X));
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!(close(transformed.min, Vec3::splat(5.0)));
        assert!(close(transformed.max, Vec3::splat(6.0)));
    }

    #[test]
    fn test_transform_aabb_empty_stays_empty() {
        let mat = Mat4::from_translation(Vec3::ONE);
        assert!(mat.transform_aabb(&Aabb::EMPTY).is_empty());
    }
}
