use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::armature::bone::Bone;

/// Armature data block: a named, ordered set of rest bones.
///
/// Bones are stored parent-first, so iterating [`Armature::bones`] always
/// visits a parent before any of its children. Rest geometry can only change
/// through an [`EditSession`](super::EditSession).
#[derive(Debug, Clone)]
pub struct Armature {
    pub id: Uuid,
    pub name: String,
    /// Draw bone axes in viewports.
    pub show_axes: bool,

    bones: Vec<Bone>,
    index: FxHashMap<String, usize>,
    /// Bumped every time an edit session commits; handles issued by earlier
    /// sessions compare against it.
    pub(crate) generation: u32,
}

impl Armature {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            show_axes: false,
            bones: Vec::new(),
            index: FxHashMap::default(),
            generation: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    #[must_use]
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    /// Direct children of the named bone, in storage order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bone> + 'a {
        self.bones
            .iter()
            .filter(move |b| b.parent.as_deref() == Some(name))
    }

    /// Replaces the rest bones, reordering them parent-first.
    ///
    /// Relative order among siblings (and among roots) is preserved. A bone
    /// whose parent name does not resolve becomes a root.
    pub(crate) fn set_bones(&mut self, bones: Vec<Bone>) {
        let parents: Vec<Option<usize>> = {
            let names: FxHashMap<&str, usize> = bones
                .iter()
                .enumerate()
                .map(|(i, b)| (b.name.as_str(), i))
                .collect();
            bones
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    b.parent
                        .as_deref()
                        .and_then(|p| names.get(p).copied())
                        .filter(|&p| p != i)
                })
                .collect()
        };

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); bones.len()];
        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }

        let mut order = Vec::with_capacity(bones.len());
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(children[i].iter().rev().copied());
        }

        let mut slots: Vec<Option<Bone>> = bones.into_iter().map(Some).collect();
        let mut sorted = Vec::with_capacity(slots.len());
        for i in order {
            if let Some(mut bone) = slots[i].take() {
                if parents[i].is_none() {
                    bone.parent = None;
                }
                sorted.push(bone);
            }
        }
        // bones caught in a parent cycle are unreachable from any root
        for mut bone in slots.into_iter().flatten() {
            log::warn!("Bone '{}' is part of a parent cycle, detaching", bone.name);
            bone.parent = None;
            sorted.push(bone);
        }

        self.index = sorted
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        self.bones = sorted;
    }
}
