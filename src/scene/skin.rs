use serde::{Deserialize, Serialize};

use crate::armature::{ArmatureKey, ObjectKey};
use crate::scene::NodeHandle;

/// Up to four bone influences of one vertex.
///
/// `indices` point into the owning skin's `bone_names`; a zero weight marks
/// an unused slot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneWeight {
    pub indices: [u32; 4],
    pub weights: [f32; 4],
}

/// Back-references from a skin to the armature pair built for it.
///
/// Consumed by mesh binding: vertex groups are named after bones of
/// `armature`, and the mesh object receives one deform modifier per object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinBinding {
    pub armature: ArmatureKey,
    pub armature_obj: ObjectKey,
    pub bind_pose: ArmatureKey,
    pub bind_pose_obj: ObjectKey,
}

/// A skinned mesh descriptor as delivered by the scene loader.
#[derive(Debug, Clone)]
pub struct Skin {
    /// Transform node carrying the skinned mesh renderer.
    pub node: NodeHandle,
    /// Opaque reference to the mesh this skin deforms.
    pub mesh: String,
    /// Names of the transforms this skin deforms, in joint order.
    pub bone_names: Vec<String>,
    /// Row-major 4x4 bind pose matrices in source convention, one per bone.
    pub bind_poses: Vec<[f32; 16]>,
    /// Per-vertex bone influences.
    pub weights: Vec<BoneWeight>,
    /// Filled in once an armature has been built for this skin.
    pub binding: Option<SkinBinding>,
}

impl Skin {
    #[must_use]
    pub fn new(node: NodeHandle, mesh: &str) -> Self {
        Self {
            node,
            mesh: mesh.to_string(),
            bone_names: Vec::new(),
            bind_poses: Vec::new(),
            weights: Vec::new(),
            binding: None,
        }
    }

    /// Appends a bone together with its bind pose.
    #[must_use]
    pub fn with_bone(mut self, name: &str, bind_pose: [f32; 16]) -> Self {
        self.bone_names.push(name.to_string());
        self.bind_poses.push(bind_pose);
        self
    }

    /// A skin that deforms at least one bone designates an armature root.
    #[inline]
    #[must_use]
    pub fn is_armature(&self) -> bool {
        !self.bone_names.is_empty()
    }
}
