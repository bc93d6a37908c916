//! Scoped skeleton editing.
//!
//! Bone geometry and parentage can only change while an armature is in edit
//! mode. An [`EditSession`] holds the armature exclusively; the
//! [`EditBoneHandle`]s it hands out are tied to that session and rejected by
//! any other one, including a later session on the same armature. Anything
//! that must outlive the session has to be keyed by bone name.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::armature::ObjectKey;
use crate::armature::armature::Armature;
use crate::armature::bone::{Bone, EditBone};
use crate::armature::pose::Pose;
use crate::errors::{ArmatureError, Result};

/// Edit-time reference to a bone; valid only inside the issuing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditBoneHandle {
    armature: Uuid,
    generation: u32,
    index: u32,
}

/// Exclusive edit-mode access to one armature.
///
/// Edit bones are committed back to rest bones, and the owning object's pose
/// re-synchronised, when the session is dropped or [`exit`](Self::exit)ed.
pub struct EditSession<'a> {
    object: ObjectKey,
    armature: &'a mut Armature,
    pose: &'a mut Pose,
    edit_object: &'a mut Option<ObjectKey>,
    generation: u32,
    bones: Vec<EditBone>,
    index: FxHashMap<String, usize>,
}

impl<'a> EditSession<'a> {
    pub(crate) fn new(
        object: ObjectKey,
        armature: &'a mut Armature,
        pose: &'a mut Pose,
        edit_object: &'a mut Option<ObjectKey>,
    ) -> Self {
        *edit_object = Some(object);

        // existing rest bones come back as edit bones
        let mut bones: Vec<EditBone> = armature
            .bones()
            .iter()
            .map(|b| EditBone {
                name: b.name.clone(),
                head: b.head,
                tail: b.tail,
                roll: b.roll,
                flags: b.flags,
                parent: None,
            })
            .collect();
        for (i, bone) in armature.bones().iter().enumerate() {
            bones[i].parent = bone.parent.as_deref().and_then(|p| armature.bone_index(p));
        }
        let index = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();

        Self {
            object,
            generation: armature.generation,
            armature,
            pose,
            edit_object,
            bones,
            index,
        }
    }

    /// Object whose armature is being edited.
    #[inline]
    #[must_use]
    pub fn object(&self) -> ObjectKey {
        self.object
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Creates a bone at the origin, one unit along +Y, with importer flags.
    ///
    /// A name already taken in this armature gets a `.001`, `.002`, ...
    /// suffix; read the final name back through [`name`](Self::name).
    pub fn new_bone(&mut self, name: &str) -> EditBoneHandle {
        let name = self.unique_name(name);
        let slot = self.bones.len();
        self.index.insert(name.clone(), slot);
        self.bones.push(EditBone::new(name));
        self.handle(slot)
    }

    /// Looks up an edit bone by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<EditBoneHandle> {
        self.index.get(name).map(|&slot| self.handle(slot))
    }

    /// Like [`find`](Self::find), for bones that must exist.
    pub fn bone_handle(&self, name: &str) -> Result<EditBoneHandle> {
        self.find(name)
            .ok_or_else(|| ArmatureError::EditBoneNotFound(name.to_string()))
    }

    pub fn bone(&self, handle: EditBoneHandle) -> Result<&EditBone> {
        let slot = self.slot(handle)?;
        Ok(&self.bones[slot])
    }

    pub fn bone_mut(&mut self, handle: EditBoneHandle) -> Result<&mut EditBone> {
        let slot = self.slot(handle)?;
        Ok(&mut self.bones[slot])
    }

    /// Persistent key of a bone; survives the session.
    pub fn name(&self, handle: EditBoneHandle) -> Result<&str> {
        self.bone(handle).map(EditBone::name)
    }

    pub fn parent(&self, handle: EditBoneHandle) -> Result<Option<EditBoneHandle>> {
        let slot = self.slot(handle)?;
        Ok(self.bones[slot].parent.map(|p| self.handle(p)))
    }

    /// Re-parents a bone. Parenting a bone under itself or its own
    /// descendant is refused with a warning.
    pub fn set_parent(
        &mut self,
        child: EditBoneHandle,
        parent: Option<EditBoneHandle>,
    ) -> Result<()> {
        let child_slot = self.slot(child)?;
        let parent_slot = parent.map(|p| self.slot(p)).transpose()?;

        if let Some(p) = parent_slot {
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == child_slot {
                    log::warn!(
                        "Cannot parent bone '{}' under its own descendant",
                        self.bones[child_slot].name
                    );
                    return Ok(());
                }
                cursor = self.bones[c].parent;
            }
        }

        self.bones[child_slot].parent = parent_slot;
        Ok(())
    }

    /// Leaves edit mode, committing all bones.
    pub fn exit(self) {}

    fn handle(&self, slot: usize) -> EditBoneHandle {
        EditBoneHandle {
            armature: self.armature.id,
            generation: self.generation,
            index: slot as u32,
        }
    }

    fn slot(&self, handle: EditBoneHandle) -> Result<usize> {
        let slot = handle.index as usize;
        if handle.armature != self.armature.id
            || handle.generation != self.generation
            || slot >= self.bones.len()
        {
            return Err(ArmatureError::StaleEditHandle {
                bone: format!("#{}", handle.index),
            });
        }
        Ok(slot)
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.index.contains_key(name) {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}.{n:03}");
            if !self.index.contains_key(&candidate) {
                log::debug!("Bone name '{name}' taken, using '{candidate}'");
                return candidate;
            }
            n += 1;
        }
    }

    fn commit(&mut self) {
        let bones = self
            .bones
            .iter()
            .map(|b| Bone {
                name: b.name.clone(),
                parent: b.parent.map(|p| self.bones[p].name.clone()),
                head: b.head,
                tail: b.tail,
                roll: b.roll,
                flags: b.flags,
                matrix_local: b.matrix(),
            })
            .collect();

        self.armature.set_bones(bones);
        self.armature.generation = self.armature.generation.wrapping_add(1);
        self.pose.rebuild(self.armature);
        *self.edit_object = None;
    }
}

impl Drop for EditSession<'_> {
    fn drop(&mut self) {
        self.commit();
    }
}
