use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

bitflags! {
    /// Per-bone behavior switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BoneFlags: u32 {
        /// Head is glued to the parent's tail.
        const CONNECT           = 1 << 0;
        /// Bone deforms vertices in its vertex group.
        const DEFORM            = 1 << 1;
        const INHERIT_ROTATION  = 1 << 2;
        const INHERIT_SCALE     = 1 << 3;
        /// Multiply vertex group weights by the bone envelope.
        const ENVELOPE_MULTIPLY = 1 << 4;
        const LOCAL_LOCATION    = 1 << 5;
        const RELATIVE_PARENT   = 1 << 6;
        const CYCLIC_OFFSET     = 1 << 7;
    }
}

impl BoneFlags {
    /// Flags of every bone the importer creates: disconnected, deforming,
    /// inheriting rotation and scale, no envelope or cyclic offset behavior.
    pub const IMPORTED: Self = Self::DEFORM
        .union(Self::INHERIT_ROTATION)
        .union(Self::INHERIT_SCALE);
}

impl Default for BoneFlags {
    fn default() -> Self {
        Self::IMPORTED
    }
}

/// Bone geometry while its armature is in edit mode.
///
/// Only reachable through an [`EditSession`](super::EditSession); the parent
/// is a slot in that session and has no meaning outside it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBone {
    pub(crate) name: String,
    pub head: Vec3,
    pub tail: Vec3,
    /// Twist about the head-to-tail axis, in radians.
    pub roll: f32,
    pub flags: BoneFlags,
    pub(crate) parent: Option<usize>,
}

impl EditBone {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            head: Vec3::ZERO,
            tail: Vec3::Y,
            roll: 0.0,
            flags: BoneFlags::IMPORTED,
            parent: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        (self.tail - self.head).length()
    }

    /// Sets the roll so the bone's local +Z points as close to `up` as the
    /// current head-to-tail axis allows.
    pub fn align_roll(&mut self, up: Vec3) {
        self.roll = roll_to_align(self.tail - self.head, up);
    }

    /// Armature-space rest matrix implied by head, tail and roll.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        bone_matrix(self.head, self.tail, self.roll)
    }
}

/// Committed rest bone of an [`Armature`](super::Armature).
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
    pub roll: f32,
    pub flags: BoneFlags,
    /// Rest matrix in armature space.
    pub matrix_local: Mat4,
}

impl Bone {
    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        (self.tail - self.head).length()
    }
}

/// Rotation taking +Y onto the bone axis by the shortest arc.
///
/// A zero-length axis yields the identity so degenerate bones still get a
/// usable frame.
fn axis_rotation(axis: Vec3) -> Quat {
    let length = axis.length();
    if length <= f32::EPSILON || !length.is_finite() {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Y, axis / length)
}

/// Rest matrix of a bone: the bone's +Y runs from head to tail, rolled about
/// that axis by `roll`, translated to the head.
#[must_use]
pub fn bone_matrix(head: Vec3, tail: Vec3, roll: f32) -> Mat4 {
    let rotation = axis_rotation(tail - head) * Quat::from_rotation_y(roll);
    Mat4::from_rotation_translation(rotation, head)
}

/// Roll that brings the bone's +Z toward `up` once the bone points along
/// `axis`. Returns 0 when the axis is degenerate or `up` is parallel to it.
#[must_use]
pub fn roll_to_align(axis: Vec3, up: Vec3) -> f32 {
    let length = axis.length();
    if length <= f32::EPSILON || !length.is_finite() {
        return 0.0;
    }
    let nor = axis / length;
    let z0 = axis_rotation(axis) * Vec3::Z;

    // project `up` onto the plane perpendicular to the bone
    let target = up - nor * up.dot(nor);
    if target.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    let target = target.normalize();

    z0.cross(target).dot(nor).atan2(z0.dot(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_bone_matrix_points_y_along_axis() {
        let m = bone_matrix(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 4.0), 0.0);
        assert!(m.y_axis.truncate().abs_diff_eq(Vec3::Z, EPSILON));
        assert!(m.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), EPSILON));
    }

    #[test]
    fn test_align_roll_reaches_target() {
        let axis = Vec3::new(0.3, 1.0, -0.2);
        let up = Vec3::new(1.0, 0.0, 0.5);
        let roll = roll_to_align(axis, up);
        let m = bone_matrix(Vec3::ZERO, axis, roll);

        let z = m.z_axis.truncate();
        let nor = axis.normalize();
        let expected = (up - nor * up.dot(nor)).normalize();
        assert!(z.abs_diff_eq(expected, EPSILON), "{z} != {expected}");
    }

    #[test]
    fn test_roll_quarter_turn() {
        // bone along +Y, default +Z; aligning to +X is a quarter turn
        let roll = roll_to_align(Vec3::Y, Vec3::X);
        assert!((roll - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn test_degenerate_axis() {
        assert_eq!(roll_to_align(Vec3::ZERO, Vec3::Z), 0.0);
        let m = bone_matrix(Vec3::ONE, Vec3::ONE, 0.0);
        assert!(m.abs_diff_eq(Mat4::from_translation(Vec3::ONE), EPSILON));
    }
}
