//! Scene-editing context.
//!
//! Stands in for the host application's object/collection/mode state. Rather
//! than ambient globals, the "active object" and the edit-mode owner live in
//! an [`EditContext`] value threaded through the builder; edit-mode
//! excursions borrow it exclusively and restore the active object afterwards.

use glam::Mat4;
use slotmap::SlotMap;

use crate::armature::armature::Armature;
use crate::armature::edit::EditSession;
use crate::armature::pose::Pose;
use crate::armature::skinning::{ArmatureModifier, VertexGroup};
use crate::armature::{ArmatureKey, CollectionKey, ObjectKey};
use crate::errors::{ArmatureError, Result};
use crate::scene::Transform;

/// Data carried by a scene object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectData {
    Empty,
    Armature(ArmatureKey),
    /// Opaque mesh reference, as found on [`Skin::mesh`](crate::scene::Skin).
    Mesh(String),
}

/// An object placed in the host scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
    pub transform: Transform,
    pub(crate) parent: Option<ObjectKey>,
    /// Bone of the parent armature this object hangs from, if any.
    pub parent_bone: Option<String>,
    /// Correction applied between the parent frame and this object.
    pub matrix_parent_inverse: Mat4,
    /// Pose of the armature, empty for any other data.
    pub pose: Pose,
    pub vertex_groups: Vec<VertexGroup>,
    pub modifiers: Vec<ArmatureModifier>,
}

impl SceneObject {
    #[must_use]
    pub fn new(name: &str, data: ObjectData) -> Self {
        Self {
            name: name.to_string(),
            data,
            transform: Transform::new(),
            parent: None,
            parent_bone: None,
            matrix_parent_inverse: Mat4::IDENTITY,
            pose: Pose::new(),
            vertex_groups: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectKey> {
        self.parent
    }

    /// Armature data block, when this object carries one.
    #[must_use]
    pub fn armature(&self) -> Option<ArmatureKey> {
        match self.data {
            ObjectData::Armature(key) => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn vertex_group(&self, name: &str) -> Option<&VertexGroup> {
        self.vertex_groups.iter().find(|g| g.name == name)
    }
}

/// Named set of objects.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub name: String,
    objects: Vec<ObjectKey>,
}

impl Collection {
    #[must_use]
    pub fn objects(&self) -> &[ObjectKey] {
        &self.objects
    }

    #[must_use]
    pub fn contains(&self, object: ObjectKey) -> bool {
        self.objects.contains(&object)
    }
}

/// Host scene state the armature builder operates on.
pub struct EditContext {
    armatures: SlotMap<ArmatureKey, Armature>,
    objects: SlotMap<ObjectKey, SceneObject>,
    collections: SlotMap<CollectionKey, Collection>,
    /// Working collection objects must be linked to before they can be edited.
    staging: CollectionKey,
    active: Option<ObjectKey>,
    edit_object: Option<ObjectKey>,
}

impl Default for EditContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EditContext {
    #[must_use]
    pub fn new() -> Self {
        let mut collections = SlotMap::with_key();
        let staging = collections.insert(Collection {
            name: "Scene Collection".to_string(),
            objects: Vec::new(),
        });
        Self {
            armatures: SlotMap::with_key(),
            objects: SlotMap::with_key(),
            collections,
            staging,
            active: None,
            edit_object: None,
        }
    }

    // ========================================================================
    // Data blocks
    // ========================================================================

    pub fn create_armature(&mut self, name: &str) -> ArmatureKey {
        self.armatures.insert(Armature::new(name))
    }

    #[must_use]
    pub fn armature(&self, key: ArmatureKey) -> Option<&Armature> {
        self.armatures.get(key)
    }

    pub fn armature_mut(&mut self, key: ArmatureKey) -> Option<&mut Armature> {
        self.armatures.get_mut(key)
    }

    /// Removes an armature data block. Objects still using it fall back to
    /// empties.
    pub fn remove_armature(&mut self, key: ArmatureKey) -> Option<Armature> {
        for object in self.objects.values_mut() {
            if object.data == ObjectData::Armature(key) {
                object.data = ObjectData::Empty;
                object.pose = Pose::new();
            }
        }
        self.armatures.remove(key)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Creates an object for `data`, optionally copying a source transform.
    ///
    /// The object is not linked to any collection.
    pub fn create_object(
        &mut self,
        name: &str,
        data: ObjectData,
        transform: Option<&Transform>,
    ) -> ObjectKey {
        let mut object = SceneObject::new(name, data);
        if let Some(transform) = transform {
            object.transform = *transform;
        }
        if let Some(armature) = object.armature().and_then(|k| self.armatures.get(k)) {
            object.pose.rebuild(armature);
        }
        self.objects.insert(object)
    }

    #[must_use]
    pub fn object(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &SceneObject)> {
        self.objects.iter()
    }

    pub fn set_parent(&mut self, child: ObjectKey, parent: Option<ObjectKey>) -> Result<()> {
        if let Some(p) = parent
            && !self.objects.contains_key(p)
        {
            return Err(ArmatureError::ObjectNotFound);
        }
        let object = self
            .objects
            .get_mut(child)
            .ok_or(ArmatureError::ObjectNotFound)?;
        object.parent = parent;
        Ok(())
    }

    /// Removes an object, unlinking it everywhere and orphaning its children.
    pub fn remove_object(&mut self, key: ObjectKey) -> Option<SceneObject> {
        for collection in self.collections.values_mut() {
            collection.objects.retain(|&o| o != key);
        }
        for object in self.objects.values_mut() {
            if object.parent == Some(key) {
                object.parent = None;
                object.parent_bone = None;
            }
        }
        if self.active == Some(key) {
            self.active = None;
        }
        self.objects.remove(key)
    }

    /// Pose of an armature object.
    pub fn pose(&self, key: ObjectKey) -> Result<&Pose> {
        self.objects
            .get(key)
            .map(|o| &o.pose)
            .ok_or(ArmatureError::ObjectNotFound)
    }

    pub fn pose_mut(&mut self, key: ObjectKey) -> Result<&mut Pose> {
        self.objects
            .get_mut(key)
            .map(|o| &mut o.pose)
            .ok_or(ArmatureError::ObjectNotFound)
    }

    // ========================================================================
    // Collections
    // ========================================================================

    pub fn create_collection(&mut self, name: &str) -> CollectionKey {
        self.collections.insert(Collection {
            name: name.to_string(),
            objects: Vec::new(),
        })
    }

    #[must_use]
    pub fn collection(&self, key: CollectionKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    #[inline]
    #[must_use]
    pub fn staging_collection(&self) -> CollectionKey {
        self.staging
    }

    /// Links an object into a collection; linking twice is a no-op.
    pub fn link(&mut self, collection: CollectionKey, object: ObjectKey) -> Result<()> {
        if !self.objects.contains_key(object) {
            return Err(ArmatureError::ObjectNotFound);
        }
        let collection = self
            .collections
            .get_mut(collection)
            .ok_or(ArmatureError::CollectionNotFound)?;
        if !collection.objects.contains(&object) {
            collection.objects.push(object);
        }
        Ok(())
    }

    pub fn unlink(&mut self, collection: CollectionKey, object: ObjectKey) -> Result<()> {
        let collection = self
            .collections
            .get_mut(collection)
            .ok_or(ArmatureError::CollectionNotFound)?;
        collection.objects.retain(|&o| o != object);
        Ok(())
    }

    // ========================================================================
    // Active object & edit mode
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn active_object(&self) -> Option<ObjectKey> {
        self.active
    }

    pub fn set_active(&mut self, object: Option<ObjectKey>) {
        self.active = object;
    }

    /// Object currently in edit mode, if any.
    #[inline]
    #[must_use]
    pub fn edit_object(&self) -> Option<ObjectKey> {
        self.edit_object
    }

    /// Runs `f` with `object` as the active object, then restores the
    /// previously active one whatever `f` returns.
    pub fn with_active<R>(&mut self, object: ObjectKey, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.active.replace(object);
        let result = f(self);
        self.active = saved.filter(|&k| self.objects.contains_key(k));
        result
    }

    /// Enters edit mode on the active object.
    ///
    /// The active object must be an armature linked into the staging
    /// collection, and no other object may be in edit mode.
    pub fn enter_edit_mode(&mut self) -> Result<EditSession<'_>> {
        let key = self.active.ok_or(ArmatureError::NoActiveObject)?;
        if let Some(busy) = self.edit_object {
            let name = self
                .objects
                .get(busy)
                .map_or_else(String::new, |o| o.name.clone());
            return Err(ArmatureError::EditModeBusy(name));
        }

        let object = self
            .objects
            .get_mut(key)
            .ok_or(ArmatureError::ObjectNotFound)?;
        let ObjectData::Armature(armature_key) = object.data else {
            return Err(ArmatureError::NotAnArmature(object.name.clone()));
        };
        let staged = self
            .collections
            .get(self.staging)
            .is_some_and(|c| c.objects.contains(&key));
        if !staged {
            log::warn!("Editing '{}' outside the staging collection", object.name);
        }
        let armature = self
            .armatures
            .get_mut(armature_key)
            .ok_or_else(|| ArmatureError::NotAnArmature(object.name.clone()))?;

        Ok(EditSession::new(
            key,
            armature,
            &mut object.pose,
            &mut self.edit_object,
        ))
    }
}
