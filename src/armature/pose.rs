use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::armature::armature::Armature;
use crate::errors::{ArmatureError, Result};

/// Runtime pose of one bone.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseBone {
    pub name: String,
    /// Index of the parent in [`Pose::bones`]; always smaller than this bone's.
    pub parent: Option<usize>,
    /// Rest matrix in armature space.
    pub rest: Mat4,
    /// Local pose transform relative to the rest frame.
    pub basis: Mat4,
    /// Posed matrix in armature space.
    pub matrix: Mat4,
}

impl PoseBone {
    /// Matrix that carries rest-pose vertices to their posed location.
    #[must_use]
    pub fn skinning_matrix(&self) -> Mat4 {
        self.matrix * self.rest.inverse()
    }
}

/// Pose of an armature object.
///
/// Stored parent-first, mirroring the armature's bone order. A bone's posed
/// matrix is `parent.matrix * parent.rest⁻¹ * rest * basis`, or `rest * basis`
/// for roots, so an untouched pose reproduces the rest geometry.
#[derive(Debug, Clone, Default)]
pub struct Pose {
    bones: Vec<PoseBone>,
    index: FxHashMap<String, usize>,
}

impl Pose {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[PoseBone] {
        &self.bones
    }

    #[must_use]
    pub fn bone(&self, name: &str) -> Option<&PoseBone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    #[must_use]
    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        self.bone(name).map(|b| b.matrix)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Re-synchronises with the armature's rest bones after an edit session.
    ///
    /// Bones that survive keep their basis; new bones start at rest.
    pub(crate) fn rebuild(&mut self, armature: &Armature) {
        let mut bones = Vec::with_capacity(armature.len());
        for bone in armature.bones() {
            let basis = self
                .bone(&bone.name)
                .map_or(Mat4::IDENTITY, |previous| previous.basis);
            bones.push(PoseBone {
                name: bone.name.clone(),
                parent: bone.parent.as_deref().and_then(|p| armature.bone_index(p)),
                rest: bone.matrix_local,
                basis,
                matrix: bone.matrix_local,
            });
        }

        self.index = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        self.bones = bones;
        self.update_matrices(0);
    }

    /// Sets a bone's local basis and refreshes its descendants.
    pub fn set_basis(&mut self, name: &str, basis: Mat4) -> Result<()> {
        let i = self.slot(name)?;
        self.bones[i].basis = basis;
        self.update_matrices(i);
        Ok(())
    }

    /// Poses a bone so its armature-space matrix becomes `matrix`, given the
    /// parent's current pose. Descendants keep their basis and follow.
    pub fn set_matrix(&mut self, name: &str, matrix: Mat4) -> Result<()> {
        let i = self.slot(name)?;
        self.bones[i].basis = self.parent_space(i).inverse() * matrix;
        self.update_matrices(i);
        Ok(())
    }

    /// Applies several armature-space matrices at once.
    ///
    /// Bones are visited parent-first, so each basis is solved against its
    /// parent's final matrix regardless of the map's iteration order.
    pub fn set_matrices(&mut self, matrices: &FxHashMap<String, Mat4>) -> Result<()> {
        if let Some(missing) = matrices.keys().find(|name| !self.index.contains_key(*name)) {
            return Err(ArmatureError::PoseBoneNotFound(missing.clone()));
        }

        for i in 0..self.bones.len() {
            let parent_space = self.parent_space(i);
            let bone = &mut self.bones[i];
            if let Some(target) = matrices.get(&bone.name) {
                bone.basis = parent_space.inverse() * *target;
            }
            bone.matrix = parent_space * bone.basis;
        }
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ArmatureError::PoseBoneNotFound(name.to_string()))
    }

    /// Frame the basis of bone `i` is expressed in: the rest matrix carried
    /// along by the parent's pose.
    fn parent_space(&self, i: usize) -> Mat4 {
        let bone = &self.bones[i];
        match bone.parent {
            Some(p) => {
                let parent = &self.bones[p];
                parent.matrix * parent.rest.inverse() * bone.rest
            }
            None => bone.rest,
        }
    }

    fn update_matrices(&mut self, from: usize) {
        for i in from..self.bones.len() {
            let matrix = self.parent_space(i) * self.bones[i].basis;
            self.bones[i].matrix = matrix;
        }
    }
}
