use glam::Vec3;
use rustc_hash::FxHashSet;

use crate::armature::bind_pose::{build_bind_pose_bones, copy_bind_pose, rebase_sibling};
use crate::armature::context::{EditContext, ObjectData};
use crate::armature::edit::{EditBoneHandle, EditSession};
use crate::armature::hierarchy::{BoneRef, BoneSet, BoneTable, resolve_bone_set};
use crate::armature::propagate::process_armature;
use crate::armature::{ArmatureKey, CollectionKey, ObjectKey};
use crate::errors::{ArmatureError, Result};
use crate::scene::{NodeHandle, SceneGraph, Skin, SkinBinding, Transform};
use crate::settings::ImportSettings;

/// Everything one armature build produced.
#[derive(Debug, Clone)]
pub struct ArmatureBuild {
    pub armature: ArmatureKey,
    pub armature_obj: ObjectKey,
    pub bind_pose: ArmatureKey,
    pub bind_pose_obj: ObjectKey,
    /// Transforms that became bones.
    pub bones: BoneSet,
    /// Per-bone annotations; bone references are names by now.
    pub table: BoneTable,
    /// Bones with no parent inside the armature.
    pub roots: Vec<NodeHandle>,
}

impl ArmatureBuild {
    #[must_use]
    pub fn binding(&self) -> SkinBinding {
        SkinBinding {
            armature: self.armature,
            armature_obj: self.armature_obj,
            bind_pose: self.bind_pose,
            bind_pose_obj: self.bind_pose_obj,
        }
    }
}

/// Builds a deform armature and its bind-pose twin from a group of skins.
///
/// All skins are assumed to share compatible transforms and bind poses; the
/// first one provides the armature object's name and transform.
#[derive(Debug, Clone, Default)]
pub struct ArmatureBuilder {
    settings: ImportSettings,
}

impl ArmatureBuilder {
    #[must_use]
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Runs the whole pipeline and records back-references on every skin.
    ///
    /// The bind-pose object ends up linked into `import_collection`, parented
    /// to the deform object; neither stays in the staging collection. On
    /// failure nothing created here survives when `rollback_on_error` is set.
    pub fn build(
        &self,
        ctx: &mut EditContext,
        graph: &SceneGraph,
        skins: &mut [Skin],
        siblings: &FxHashSet<NodeHandle>,
        import_collection: CollectionKey,
    ) -> Result<ArmatureBuild> {
        let first = skins.first().ok_or(ArmatureError::NoSkins)?;
        if !skins.iter().any(Skin::is_armature) {
            return Err(ArmatureError::NoSkins);
        }
        if ctx.collection(import_collection).is_none() {
            return Err(ArmatureError::CollectionNotFound);
        }
        let root = graph.get_node(first.node).ok_or(ArmatureError::NodeNotFound)?;
        let origin = root.transform;
        let name = root.name.clone();

        let (bones, table) =
            resolve_bone_set(graph, skins, siblings, self.settings.convert_bind_poses)?;

        // 1. containers
        let bind_pose_name = format!("{name}{}", self.settings.bind_pose_suffix);
        let armature = ctx.create_armature(&name);
        let bind_pose = ctx.create_armature(&bind_pose_name);
        for key in [armature, bind_pose] {
            if let Some(data) = ctx.armature_mut(key) {
                data.show_axes = self.settings.show_axes;
            }
        }
        let armature_obj = ctx.create_object(&name, ObjectData::Armature(armature), Some(&origin));
        let bind_pose_obj =
            ctx.create_object(&bind_pose_name, ObjectData::Armature(bind_pose), None);

        let mut build = ArmatureBuild {
            armature,
            armature_obj,
            bind_pose,
            bind_pose_obj,
            bones,
            table,
            roots: Vec::new(),
        };

        // 2. bones
        if let Err(err) = self.populate(ctx, graph, siblings, &origin, &mut build, import_collection)
        {
            if self.settings.rollback_on_error {
                log::warn!("Armature '{name}' failed, rolling back: {err}");
                Self::rollback(ctx, &build);
            }
            return Err(err);
        }

        let binding = build.binding();
        for skin in skins.iter_mut() {
            skin.binding = Some(binding);
        }

        log::info!(
            "Built armature '{name}': {} bones, {} roots",
            build.bones.len(),
            build.roots.len()
        );
        Ok(build)
    }

    fn populate(
        &self,
        ctx: &mut EditContext,
        graph: &SceneGraph,
        siblings: &FxHashSet<NodeHandle>,
        origin: &Transform,
        build: &mut ArmatureBuild,
        import_collection: CollectionKey,
    ) -> Result<()> {
        let bone_length = self.settings.bone_length;
        let (armature_obj, bind_pose_obj) = (build.armature_obj, build.bind_pose_obj);

        ctx.set_parent(bind_pose_obj, Some(armature_obj))?;
        // only staged objects may enter edit mode
        let staging = ctx.staging_collection();
        ctx.link(staging, armature_obj)?;
        ctx.link(staging, bind_pose_obj)?;

        // 2.1 deform armature: placeholders, parents, geometry
        let roots = ctx.with_active(armature_obj, |ctx| -> Result<Vec<NodeHandle>> {
            let mut session = ctx.enter_edit_mode()?;
            for node in build.bones.iter() {
                let name = graph.name(node).ok_or(ArmatureError::NodeNotFound)?;
                let annotation = build.table.entry(node);
                if siblings.contains(&node) {
                    rebase_sibling(annotation, origin.position, origin.rotation);
                }
                annotation.bone = BoneRef::Edit(create_bone(&mut session, name, bone_length)?);
            }
            let roots = link_bones(&mut session, graph, &build.bones, &mut build.table)?;
            process_armature(&mut session, graph, &mut build.table, &roots, bone_length)?;
            session.exit();
            Ok(roots)
        })?;
        log::debug!("Deform armature has {} root bones", roots.len());
        build.roots = roots;

        // 2.2 bind-pose armature, placed straight from the bind matrices
        ctx.with_active(bind_pose_obj, |ctx| -> Result<()> {
            let mut session = ctx.enter_edit_mode()?;
            build_bind_pose_bones(&mut session, graph, &build.bones, &mut build.table, bone_length)?;
            session.exit();
            Ok(())
        })?;

        // 2.3 seed the deform pose
        copy_bind_pose(ctx, &build.bones, &build.table, bind_pose_obj, armature_obj)?;

        // 3. cleanup & attachment
        ctx.unlink(staging, armature_obj)?;
        ctx.unlink(staging, bind_pose_obj)?;
        ctx.link(import_collection, bind_pose_obj)?;
        Ok(())
    }

    fn rollback(ctx: &mut EditContext, build: &ArmatureBuild) {
        ctx.remove_object(build.bind_pose_obj);
        ctx.remove_object(build.armature_obj);
        ctx.remove_armature(build.bind_pose);
        ctx.remove_armature(build.armature);
    }
}

/// Creates a placeholder bone: at the origin, one bone length along +Y,
/// disconnected, deforming, inheriting rotation and scale.
fn create_bone(
    session: &mut EditSession<'_>,
    name: &str,
    bone_length: f32,
) -> Result<EditBoneHandle> {
    let handle = session.new_bone(name);
    let bone = session.bone_mut(handle)?;
    bone.head = Vec3::ZERO;
    bone.tail = Vec3::new(0.0, bone_length, 0.0);
    Ok(handle)
}

/// Wires parents among the placeholders and returns the armature roots.
///
/// A bone whose source parent is outside the set becomes a root. A bone with
/// a source child outside the set is marked as a partial import.
fn link_bones(
    session: &mut EditSession<'_>,
    graph: &SceneGraph,
    bones: &BoneSet,
    table: &mut BoneTable,
) -> Result<Vec<NodeHandle>> {
    let handle_of = |table: &BoneTable, node: NodeHandle| {
        table
            .get(node)
            .and_then(|a| a.bone.edit_handle())
            .ok_or_else(|| ArmatureError::StaleEditHandle {
                bone: graph.name(node).unwrap_or_default().to_string(),
            })
    };

    let mut roots = Vec::new();
    for node in bones.iter() {
        let handle = handle_of(table, node)?;
        match graph.parent(node).filter(|&p| bones.contains(p)) {
            Some(parent) => session.set_parent(handle, Some(handle_of(table, parent)?))?,
            None => roots.push(node),
        }

        let source = graph.get_node(node).ok_or(ArmatureError::NodeNotFound)?;
        let partial = source.children().iter().any(|&c| !bones.contains(c));
        if partial {
            log::debug!("Bone '{}' leaves part of its subtree out", source.name);
        }
        table.entry(node).partial_import = partial;
    }
    Ok(roots)
}
