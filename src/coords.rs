//! Coordinate basis conversion.
//!
//! The source format is left-handed with Y up; the armature model is
//! right-handed with Z up. Swapping the Y and Z axes converts between the two,
//! and since the swap is its own inverse the same operator works in both
//! directions.
//!
//! ```rust,ignore
//! use myth_armature::coords::ConvertBasis;
//!
//! let bind = MATRIX_YZ * source_bind * MATRIX_YZ;
//! assert_eq!(source_bind.convert_basis(), bind);
//! ```

use glam::{Mat3, Mat4, Quat, Vec3};

/// Change-of-basis matrix that swaps the Y and Z axes.
pub const MATRIX_YZ: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
]);

/// 3x3 counterpart of [`MATRIX_YZ`] for pure rotations.
pub const MATRIX3_YZ: Mat3 = Mat3::from_cols_array(&[
    1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, //
    0.0, 1.0, 0.0, //
]);

/// Values that can be carried across the Y/Z basis swap.
///
/// Every implementation is an involution: `x.convert_basis().convert_basis()`
/// yields `x` again (up to floating point tolerance).
pub trait ConvertBasis {
    #[must_use]
    fn convert_basis(self) -> Self;
}

impl ConvertBasis for Vec3 {
    #[inline]
    fn convert_basis(self) -> Self {
        Vec3::new(self.x, self.z, self.y)
    }
}

impl ConvertBasis for Mat3 {
    /// Pre- and post-multiplies by the swap matrix.
    #[inline]
    fn convert_basis(self) -> Self {
        MATRIX3_YZ * self * MATRIX3_YZ
    }
}

impl ConvertBasis for Mat4 {
    /// Pre- and post-multiplies by the swap matrix.
    #[inline]
    fn convert_basis(self) -> Self {
        MATRIX_YZ * self * MATRIX_YZ
    }
}

impl ConvertBasis for Quat {
    /// Conjugating a rotation by a reflection keeps the angle and maps the
    /// axis to `-S·axis`, which for the Y/Z swap is `(-x, -z, -y)`.
    #[inline]
    fn convert_basis(self) -> Self {
        Quat::from_xyzw(-self.x, -self.z, -self.y, self.w)
    }
}

/// Builds a matrix from 16 floats laid out row by row.
#[must_use]
pub fn mat4_from_row_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(values).transpose()
}

/// Flattens a matrix into 16 floats laid out row by row.
#[must_use]
pub fn mat4_to_row_major(mat: &Mat4) -> [f32; 16] {
    mat.transpose().to_cols_array()
}
