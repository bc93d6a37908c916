//! Armature construction.
//!
//! Turns the skins of an imported [`SceneGraph`](crate::scene::SceneGraph)
//! into a pair of skeletons:
//!
//! - the deform armature, whose rest geometry follows the source transforms,
//! - the bind-pose armature, whose rest geometry follows the inverse bind
//!   matrices and whose pose seeds the deform armature's default pose.
//!
//! Pipeline, leaf first:
//!
//! 1. [`hierarchy`]: select the bone set (ancestor closure up to sibling
//!    boundaries) and record bind matrices in a side table.
//! 2. [`builder`]: create both containers, place placeholder bones and wire
//!    parents inside an [`EditSession`].
//! 3. [`propagate`]: walk the bone tree top-down filling head/tail/roll.
//! 4. [`bind_pose`]: place bind-pose bones directly from the inverse bind
//!    matrices and copy their pose onto the deform armature.
//! 5. [`skinning`]: vertex groups and deform modifiers for the meshes.

pub mod armature;
pub mod bind_pose;
pub mod bone;
pub mod builder;
pub mod context;
pub mod edit;
pub mod export;
pub mod hierarchy;
pub mod pose;
pub mod propagate;
pub mod skinning;

pub use armature::Armature;
pub use bone::{Bone, BoneFlags, EditBone};
pub use builder::{ArmatureBuild, ArmatureBuilder};
pub use context::{Collection, EditContext, ObjectData, SceneObject};
pub use edit::{EditBoneHandle, EditSession};
pub use hierarchy::{BoneAnnotation, BoneRef, BoneSet, BoneTable};
pub use pose::{Pose, PoseBone};
pub use skinning::{ArmatureModifier, ModifierFlags, VertexGroup};

use slotmap::new_key_type;

/// Length of every generated bone segment, independent of source scale.
pub const BONE_LENGTH: f32 = 0.1;

new_key_type! {
    pub struct ArmatureKey;
    pub struct ObjectKey;
    pub struct CollectionKey;
}
