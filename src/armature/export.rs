//! Inverse direction: reading skin data back out of built armatures.
//!
//! Used when a scene is written back to the source format, and as a check
//! that an import round-trips.

use smallvec::SmallVec;

use crate::armature::ArmatureKey;
use crate::armature::context::{EditContext, SceneObject};
use crate::coords::{ConvertBasis, mat4_to_row_major};
use crate::errors::{ArmatureError, Result};
use crate::scene::BoneWeight;

/// Maximum bone influences per vertex in the source format.
pub const MAX_INFLUENCES: usize = 4;

/// Per-vertex bone weights reconstructed from vertex groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBoneWeights {
    /// Bones in joint order: vertex groups named after a bone of the armature,
    /// in group order.
    pub bones: Vec<String>,
    pub weights: Vec<BoneWeight>,
    /// Largest number of non-padding influences on any vertex.
    pub max_influences: usize,
}

/// Reduces each vertex's group memberships to its four heaviest bones.
///
/// Groups whose name is not a bone of `armature` are ignored. Influences are
/// sorted by descending weight and padded with `(0, 0.0)`.
pub fn mesh_bone_weights(
    ctx: &EditContext,
    object: &SceneObject,
    armature: ArmatureKey,
    vertex_count: usize,
) -> Result<MeshBoneWeights> {
    let armature = ctx.armature(armature).ok_or(ArmatureError::ObjectNotFound)?;

    let mut result = MeshBoneWeights {
        weights: vec![BoneWeight::default(); vertex_count],
        ..Default::default()
    };
    let mut influences: Vec<SmallVec<[(u32, f32); 8]>> = vec![SmallVec::new(); vertex_count];

    for group in &object.vertex_groups {
        if !armature.contains(&group.name) {
            continue;
        }
        let bone_index = result.bones.len() as u32;
        result.bones.push(group.name.clone());
        for (vertex, weight) in group.iter() {
            if let Some(list) = influences.get_mut(vertex as usize) {
                list.push((bone_index, weight));
            }
        }
    }

    for (list, out) in influences.iter_mut().zip(&mut result.weights) {
        list.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        list.truncate(MAX_INFLUENCES);
        result.max_influences = result.max_influences.max(list.len());
        for (slot, &(index, weight)) in list.iter().enumerate() {
            out.indices[slot] = index;
            out.weights[slot] = weight;
        }
    }
    Ok(result)
}

/// Derives row-major bind pose matrices for `bone_names`.
///
/// Each bone is looked up in the `bind_poses` armatures first, in order, then
/// in `armature`. The bind matrix is the inverse of the bone's rest matrix,
/// carried back across the Y/Z basis swap.
pub fn make_bind_poses(
    ctx: &EditContext,
    bone_names: &[String],
    armature: ArmatureKey,
    bind_poses: &[ArmatureKey],
) -> Result<Vec<[f32; 16]>> {
    let fallback = ctx.armature(armature).ok_or(ArmatureError::ObjectNotFound)?;

    bone_names
        .iter()
        .map(|name| {
            let bone = bind_poses
                .iter()
                .filter_map(|&key| ctx.armature(key))
                .find_map(|a| a.bone(name))
                .or_else(|| fallback.bone(name))
                .ok_or_else(|| ArmatureError::BoneNotFound(name.clone()))?;
            let bind = bone.matrix_local.inverse().convert_basis();
            Ok(mat4_to_row_major(&bind))
        })
        .collect()
}
