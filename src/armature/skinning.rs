//! Mesh binding glue: vertex groups, armature modifiers, bone parenting.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::armature::ObjectKey;
use crate::armature::context::EditContext;
use crate::errors::{ArmatureError, Result};
use crate::scene::{BoneWeight, Skin, SkinBinding};

/// Named per-vertex weights; the name matches the bone it binds to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexGroup {
    pub name: String,
    weights: FxHashMap<u32, f32>,
}

impl VertexGroup {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weights: FxHashMap::default(),
        }
    }

    /// Accumulates `weight` onto a vertex, clamped to 1.
    pub fn add(&mut self, vertex: u32, weight: f32) {
        let w = self.weights.entry(vertex).or_insert(0.0);
        *w = (*w + weight).min(1.0);
    }

    #[must_use]
    pub fn weight(&self, vertex: u32) -> Option<f32> {
        self.weights.get(&vertex).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.weights.iter().map(|(&v, &w)| (v, w))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModifierFlags: u32 {
        const APPLY_ON_SPLINE  = 1 << 0;
        const BONE_ENVELOPES   = 1 << 1;
        const PRESERVE_VOLUME  = 1 << 2;
        /// Stack on top of the previous modifier instead of the base mesh.
        const MULTI_MODIFIER   = 1 << 3;
        const VERTEX_GROUPS    = 1 << 4;
    }
}

/// Deforms a mesh object by an armature object through vertex groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmatureModifier {
    pub name: String,
    pub object: ObjectKey,
    pub flags: ModifierFlags,
}

impl ArmatureModifier {
    /// Vertex-group driven deform: no spline, no envelopes, no volume
    /// preservation, single layer.
    #[must_use]
    pub fn new(name: &str, object: ObjectKey) -> Self {
        Self {
            name: name.to_string(),
            object,
            flags: ModifierFlags::VERTEX_GROUPS,
        }
    }
}

/// Creates one vertex group per bone and fills it from the skin's weights.
///
/// Zero weights are skipped; influences naming a bone index past the end of
/// `bone_names` are dropped with a warning.
pub fn create_vertex_groups(
    ctx: &mut EditContext,
    object: ObjectKey,
    bone_names: &[String],
    weights: &[BoneWeight],
) -> Result<()> {
    let object = ctx.object_mut(object).ok_or(ArmatureError::ObjectNotFound)?;

    let first = object.vertex_groups.len();
    object
        .vertex_groups
        .extend(bone_names.iter().map(|name| VertexGroup::new(name)));
    let groups = &mut object.vertex_groups[first..];

    for (vertex, weight) in weights.iter().enumerate() {
        for (&index, &w) in weight.indices.iter().zip(&weight.weights) {
            if w == 0.0 {
                continue;
            }
            match groups.get_mut(index as usize) {
                Some(group) => group.add(vertex as u32, w),
                None => log::warn!("Vertex {vertex} references missing bone #{index}"),
            }
        }
    }
    Ok(())
}

/// Adds the bind-pose and deform modifiers, in that order.
pub fn create_armature_modifiers(
    ctx: &mut EditContext,
    object: ObjectKey,
    binding: &SkinBinding,
) -> Result<()> {
    let object = ctx.object_mut(object).ok_or(ArmatureError::ObjectNotFound)?;
    object
        .modifiers
        .push(ArmatureModifier::new("BindPose", binding.bind_pose_obj));
    object
        .modifiers
        .push(ArmatureModifier::new("Armature", binding.armature_obj));
    Ok(())
}

/// Binds a skin's mesh object to the armature pair built for it.
pub fn bind_skin(ctx: &mut EditContext, object: ObjectKey, skin: &Skin) -> Result<()> {
    let binding = skin
        .binding
        .ok_or_else(|| ArmatureError::SkinNotBound(skin.mesh.clone()))?;
    create_vertex_groups(ctx, object, &skin.bone_names, &skin.weights)?;
    create_armature_modifiers(ctx, object, &binding)
}

/// Hangs `child` from a bone of `armature`.
///
/// Bone parenting attaches at the tail, so the parent inverse pulls the child
/// back by one bone length to sit on the head.
pub fn parent_to_bone(
    ctx: &mut EditContext,
    child: ObjectKey,
    armature: ObjectKey,
    bone: &str,
    bone_length: f32,
) -> Result<()> {
    let armature_object = ctx.object(armature).ok_or(ArmatureError::ObjectNotFound)?;
    let armature_key = armature_object
        .armature()
        .ok_or_else(|| ArmatureError::NotAnArmature(armature_object.name.clone()))?;
    let has_bone = ctx
        .armature(armature_key)
        .is_some_and(|a| a.contains(bone));
    if !has_bone {
        return Err(ArmatureError::PoseBoneNotFound(bone.to_string()));
    }

    ctx.set_parent(child, Some(armature))?;
    let object = ctx.object_mut(child).ok_or(ArmatureError::ObjectNotFound)?;
    object.parent_bone = Some(bone.to_string());
    object.matrix_parent_inverse = Mat4::from_translation(Vec3::new(0.0, -bone_length, 0.0));
    Ok(())
}
