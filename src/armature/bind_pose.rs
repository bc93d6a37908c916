//! Bind-pose reconciliation.
//!
//! Sibling bones are re-expressed in the armature's own frame, the bind-pose
//! armature is laid out straight from the inverse bind matrices, and its pose
//! is copied onto the deform armature so the latter's default pose matches
//! the bind pose without touching its rest geometry.

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::armature::ObjectKey;
use crate::armature::context::EditContext;
use crate::armature::edit::EditSession;
use crate::armature::hierarchy::{BoneAnnotation, BoneSet, BoneTable};
use crate::errors::{ArmatureError, Result};
use crate::scene::SceneGraph;

/// Re-bases a sibling bone from the parent frame of the armature object into
/// the armature's local frame, recording the correction in `rel_rotation`.
///
/// The origin rotation is inverted exactly, so a non-unit quaternion is
/// undone rather than conjugated.
pub fn rebase_sibling(annotation: &mut BoneAnnotation, origin_position: Vec3, origin_rotation: Quat) {
    let length_squared = origin_rotation.length_squared();
    let inverse = if length_squared > 0.0 {
        origin_rotation.conjugate() / length_squared
    } else {
        log::warn!("Armature origin rotation is degenerate, sibling kept unrotated");
        Quat::IDENTITY
    };
    annotation.rotation = inverse * annotation.rotation;
    annotation.position = inverse * (annotation.position - origin_position);
    annotation.rel_rotation = inverse;
}

/// Inverse of a bind matrix, or `None` when the matrix is singular.
fn invert_bind_pose(bind_pose: Mat4) -> Option<Mat4> {
    let det = bind_pose.determinant();
    if !det.is_finite() || det.abs() <= f32::MIN_POSITIVE {
        return None;
    }
    let m = bind_pose.inverse();
    m.is_finite().then_some(m)
}

/// Creates one bind-pose bone per selected bone that carries a bind matrix.
///
/// The inverse bind matrix is already the bone's frame in armature space, so
/// head, tail and roll are read from it directly. A singular bind matrix
/// yields a zero-length bone at the origin. Each bone is parented to the
/// bind-pose bone of its nearest selected ancestor, so members without a
/// bind matrix are bridged. The bone name used is stored in the
/// annotation's `pose_bone`.
pub fn build_bind_pose_bones(
    session: &mut EditSession<'_>,
    graph: &SceneGraph,
    bones: &BoneSet,
    table: &mut BoneTable,
    bone_length: f32,
) -> Result<()> {
    let mut handles = FxHashMap::default();

    for node in bones.iter() {
        let Some(bind_pose) = table.bind_pose(node) else {
            continue;
        };
        let name = graph.name(node).ok_or(ArmatureError::NodeNotFound)?;

        let handle = session.new_bone(name);
        let bone = session.bone_mut(handle)?;
        if let Some(m) = invert_bind_pose(bind_pose) {
            bone.head = m.transform_point3(Vec3::ZERO);
            bone.tail = bone.head + m.transform_vector3(Vec3::Y).normalize_or_zero() * bone_length;
            bone.align_roll(m.transform_vector3(Vec3::Z));
        } else {
            bone.head = Vec3::ZERO;
            bone.tail = Vec3::ZERO;
            bone.roll = 0.0;
        }
        if bone.length() <= f32::EPSILON {
            log::warn!("Bind pose of '{name}' is degenerate, zero length");
        }

        handles.insert(node, handle);
        table.entry(node).pose_bone = Some(session.name(handle)?.to_string());
    }

    for node in bones.iter() {
        let Some(&handle) = handles.get(&node) else {
            continue;
        };
        let parent = graph
            .ancestors(node)
            .take_while(|&ancestor| bones.contains(ancestor))
            .find_map(|ancestor| handles.get(&ancestor).copied());
        if parent.is_some() {
            session.set_parent(handle, parent)?;
        }
    }
    Ok(())
}

/// Copies the bind-pose armature's pose matrices onto the deform armature.
///
/// Only bones present in both armatures are copied; they are applied
/// parent-first on the target so each basis is solved against its parent's
/// final pose. Bones with a singular bind matrix keep their rest pose.
pub fn copy_bind_pose(
    ctx: &mut EditContext,
    bones: &BoneSet,
    table: &BoneTable,
    bind_pose_obj: ObjectKey,
    armature_obj: ObjectKey,
) -> Result<()> {
    let source = ctx.pose(bind_pose_obj)?;
    let mut matrices: FxHashMap<String, Mat4> = FxHashMap::default();

    for node in bones.iter() {
        let Some(annotation) = table.get(node) else {
            continue;
        };
        let (Some(pose_bone), Some(bone)) = (&annotation.pose_bone, annotation.bone.name()) else {
            continue;
        };
        if annotation.bind_pose.and_then(invert_bind_pose).is_none() {
            continue;
        }
        let matrix = source
            .matrix(pose_bone)
            .ok_or_else(|| ArmatureError::PoseBoneNotFound(pose_bone.clone()))?;
        matrices.insert(bone.to_string(), matrix);
    }

    log::debug!("Copying {} bind pose matrices", matrices.len());
    ctx.pose_mut(armature_obj)?.set_matrices(&matrices)
}
