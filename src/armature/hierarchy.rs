//! Bone set selection.
//!
//! A skin names the transforms it deforms, but an armature needs connected
//! chains: every ancestor between a deformed bone and the edge of the import
//! batch must become a bone as well. The edge is marked by the *sibling*
//! set; a sibling boundary is itself included, anything above it is not.
//!
//! Nothing is written to the scene graph. Per-build data lives in a
//! [`BoneTable`] keyed by [`NodeHandle`], so several builds can share one
//! graph.

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashSet;
use slotmap::SparseSecondaryMap;

use crate::armature::edit::EditBoneHandle;
use crate::coords::{ConvertBasis, mat4_from_row_major};
use crate::errors::{ArmatureError, Result};
use crate::scene::{NodeHandle, SceneGraph, Skin};

/// Reference from a bone-set entry to its generated bone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoneRef {
    #[default]
    Unassigned,
    /// Live handle, valid only while the deform armature is in edit mode.
    Edit(EditBoneHandle),
    /// Persistent key, valid after edit mode ends.
    Named(String),
}

impl BoneRef {
    #[must_use]
    pub fn edit_handle(&self) -> Option<EditBoneHandle> {
        match self {
            BoneRef::Edit(handle) => Some(*handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            BoneRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// Build-time annotations for one selected transform.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneAnnotation {
    /// Selected for the armature being built; propagation only descends
    /// into members.
    pub member: bool,
    /// Local position used for bone geometry, re-based for sibling bones.
    pub position: Vec3,
    /// Local rotation used for bone geometry, re-based for sibling bones.
    pub rotation: Quat,
    /// Correction applied while re-basing; identity for ordinary bones.
    pub rel_rotation: Quat,
    /// Bind matrix, already in armature convention.
    pub bind_pose: Option<Mat4>,
    pub bone: BoneRef,
    /// Name of the matching bone in the bind-pose armature.
    pub pose_bone: Option<String>,
    /// Some source children were left out of the armature.
    pub partial_import: bool,
}

impl Default for BoneAnnotation {
    fn default() -> Self {
        Self {
            member: false,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            rel_rotation: Quat::IDENTITY,
            bind_pose: None,
            bone: BoneRef::Unassigned,
            pose_bone: None,
            partial_import: false,
        }
    }
}

/// Side table of [`BoneAnnotation`]s keyed by scene node.
#[derive(Debug, Clone, Default)]
pub struct BoneTable {
    entries: SparseSecondaryMap<NodeHandle, BoneAnnotation>,
}

impl BoneTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node: NodeHandle) -> Option<&BoneAnnotation> {
        self.entries.get(node)
    }

    pub fn get_mut(&mut self, node: NodeHandle) -> Option<&mut BoneAnnotation> {
        self.entries.get_mut(node)
    }

    /// Annotation for `node`, created with defaults on first access.
    pub fn entry(&mut self, node: NodeHandle) -> &mut BoneAnnotation {
        if !self.entries.contains_key(node) {
            self.entries.insert(node, BoneAnnotation::default());
        }
        &mut self.entries[node]
    }

    #[must_use]
    pub fn is_member(&self, node: NodeHandle) -> bool {
        self.entries.get(node).is_some_and(|a| a.member)
    }

    #[must_use]
    pub fn bind_pose(&self, node: NodeHandle) -> Option<Mat4> {
        self.entries.get(node).and_then(|a| a.bind_pose)
    }

    /// Persistent bone name once edit mode has ended.
    #[must_use]
    pub fn bone_name(&self, node: NodeHandle) -> Option<&str> {
        self.entries.get(node).and_then(|a| a.bone.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &BoneAnnotation)> {
        self.entries.iter()
    }
}

/// Selected transforms for one armature, in scene pre-order.
#[derive(Debug, Clone, Default)]
pub struct BoneSet {
    order: Vec<NodeHandle>,
    members: FxHashSet<NodeHandle>,
}

impl BoneSet {
    /// Orders `members` parent-before-child following the scene graph.
    fn from_members(graph: &SceneGraph, members: FxHashSet<NodeHandle>) -> Self {
        let order = graph
            .traverse_pre_order()
            .into_iter()
            .filter(|h| members.contains(h))
            .collect();
        Self { order, members }
    }

    #[must_use]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.members.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.order.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Where an upward walk may stop.
struct Boundaries<'a> {
    siblings: &'a FxHashSet<NodeHandle>,
    /// Transform of the armature object; carries no bone itself.
    armature_root: Option<NodeHandle>,
}

impl Boundaries<'_> {
    /// Adds `start` and its ancestors up to the nearest boundary.
    ///
    /// A sibling boundary is added and ends the walk. The armature root ends
    /// the walk without being added. Reaching a scene root is an error unless
    /// the sibling set is empty, in which case the whole graph is one batch.
    fn walk_up(
        &self,
        graph: &SceneGraph,
        start: NodeHandle,
        bones: &mut FxHashSet<NodeHandle>,
    ) -> Result<()> {
        let mut current = start;
        bones.insert(current);

        while !self.siblings.contains(&current) {
            match graph.parent(current) {
                Some(parent)
                    if Some(parent) == self.armature_root && !self.siblings.contains(&parent) =>
                {
                    break;
                }
                Some(parent) => {
                    bones.insert(parent);
                    current = parent;
                }
                None if self.siblings.is_empty() => break,
                None => {
                    return Err(ArmatureError::UnboundedHierarchy {
                        bone: graph.name(start).unwrap_or_default().to_string(),
                        root: graph.name(current).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Records the skin's bind matrices and returns the ancestor closure of its
/// bones.
///
/// Bind poses are row-major in source convention; with `convert` they are
/// carried across the Y/Z basis swap before being stored. When several skins
/// share a bone, the last recorded bind matrix wins.
pub fn find_bones(
    graph: &SceneGraph,
    skin: &Skin,
    siblings: &FxHashSet<NodeHandle>,
    armature_root: Option<NodeHandle>,
    table: &mut BoneTable,
    convert: bool,
) -> Result<FxHashSet<NodeHandle>> {
    if skin.bind_poses.len() < skin.bone_names.len() {
        return Err(ArmatureError::BindPoseCountMismatch {
            skin: skin.mesh.clone(),
            bones: skin.bone_names.len(),
            bind_poses: skin.bind_poses.len(),
        });
    }

    let mut bones = FxHashSet::default();
    for (name, bind_pose) in skin.bone_names.iter().zip(&skin.bind_poses) {
        let node = graph
            .find_by_name(name)
            .ok_or_else(|| ArmatureError::BoneNotFound(name.clone()))?;
        let matrix = mat4_from_row_major(bind_pose);
        table.entry(node).bind_pose = Some(if convert {
            matrix.convert_basis()
        } else {
            matrix
        });
        bones.insert(node);
    }

    let boundaries = Boundaries {
        siblings,
        armature_root,
    };

    // iterate until the closure stops growing
    loop {
        let before = bones.len();
        let current: Vec<NodeHandle> = bones.iter().copied().collect();
        for bone in current {
            boundaries.walk_up(graph, bone, &mut bones)?;
        }
        if bones.len() == before {
            break;
        }
    }

    Ok(bones)
}

/// Selects the bone set shared by all `skins`.
///
/// The first skin's transform is the armature root. Every selected node is
/// marked as a member in the returned table and seeded with its own local
/// position and rotation.
pub fn resolve_bone_set(
    graph: &SceneGraph,
    skins: &[Skin],
    siblings: &FxHashSet<NodeHandle>,
    convert: bool,
) -> Result<(BoneSet, BoneTable)> {
    let armature_root = skins.first().map(|s| s.node);
    let mut table = BoneTable::new();
    let mut members = FxHashSet::default();

    for skin in skins {
        let bones = find_bones(graph, skin, siblings, armature_root, &mut table, convert)?;
        members.extend(bones);
    }

    for &node in &members {
        let transform = graph
            .get_node(node)
            .ok_or(ArmatureError::NodeNotFound)?
            .transform;
        let entry = table.entry(node);
        entry.member = true;
        entry.position = transform.position;
        entry.rotation = transform.rotation;
        entry.rel_rotation = Quat::IDENTITY;
    }

    let set = BoneSet::from_members(graph, members);
    log::debug!("Resolved {} bones for {} skins", set.len(), skins.len());
    Ok((set, table))
}
