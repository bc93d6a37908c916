use glam::{Quat, Vec3};

use crate::armature::edit::EditSession;
use crate::armature::hierarchy::{BoneRef, BoneTable};
use crate::errors::{ArmatureError, Result};
use crate::scene::{NodeHandle, SceneGraph};

/// Fills head, tail and roll of every bone reachable from `roots`.
///
/// The armature object carries no bone, so each root starts from the origin
/// with no rotation. Afterwards every visited annotation holds the bone's
/// name instead of its edit handle.
pub fn process_armature(
    session: &mut EditSession<'_>,
    graph: &SceneGraph,
    table: &mut BoneTable,
    roots: &[NodeHandle],
    bone_length: f32,
) -> Result<()> {
    for &root in roots {
        process_bone(
            session,
            graph,
            table,
            root,
            Vec3::ZERO,
            Quat::IDENTITY,
            bone_length,
        )?;
    }
    Ok(())
}

fn process_bone(
    session: &mut EditSession<'_>,
    graph: &SceneGraph,
    table: &mut BoneTable,
    node: NodeHandle,
    position: Vec3,
    rotation: Quat,
    bone_length: f32,
) -> Result<()> {
    let annotation = table.get(node).ok_or(ArmatureError::NodeNotFound)?;
    let handle = annotation
        .bone
        .edit_handle()
        .ok_or_else(|| ArmatureError::StaleEditHandle {
            bone: graph.name(node).unwrap_or_default().to_string(),
        })?;

    let head = rotation * annotation.position + position;
    let world_rotation = rotation * annotation.rotation;
    let tail = head + world_rotation * Vec3::new(0.0, bone_length, 0.0);

    let bone = session.bone_mut(handle)?;
    bone.head = head;
    bone.tail = tail;
    bone.align_roll(world_rotation * Vec3::Z);
    if bone.length() <= f32::EPSILON {
        log::warn!("Bone '{}' has a degenerate rotation, zero length", bone.name());
    }

    let node_ref = graph.get_node(node).ok_or(ArmatureError::NodeNotFound)?;
    for &child in node_ref.children() {
        if table.is_member(child) {
            process_bone(
                session,
                graph,
                table,
                child,
                head,
                world_rotation,
                bone_length,
            )?;
        }
    }

    // edit handles die with the session; keep the name
    let name = session.name(handle)?.to_string();
    if let Some(annotation) = table.get_mut(node) {
        annotation.bone = BoneRef::Named(name);
    }
    Ok(())
}
