//! Edit Mode & Context Tests
//!
//! Tests for:
//! - Entering edit mode: active object, busy session, non-armature objects
//! - Edit bone handles: stale handles across sessions and armatures
//! - Bone naming, parenting and commit on exit/drop
//! - Active object save/restore
//! - Pose evaluation: basis, armature-space matrices, parent-first solving

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};
use myth_armature::armature::ObjectKey;
use myth_armature::errors::ArmatureError;
use myth_armature::{EditContext, ObjectData};
use rustc_hash::FxHashMap;

const EPSILON: f32 = 1e-5;

fn armature_object(ctx: &mut EditContext, name: &str) -> ObjectKey {
    let armature = ctx.create_armature(name);
    let object = ctx.create_object(name, ObjectData::Armature(armature), None);
    let staging = ctx.staging_collection();
    ctx.link(staging, object).unwrap();
    object
}

/// Root -> Child, one unit apart along +Y.
fn two_bone_rig(ctx: &mut EditContext) -> ObjectKey {
    let object = armature_object(ctx, "Rig");
    ctx.with_active(object, |ctx| {
        let mut session = ctx.enter_edit_mode().unwrap();
        let root = session.new_bone("Root");
        let child = session.new_bone("Child");
        {
            let bone = session.bone_mut(child).unwrap();
            bone.head = Vec3::new(0.0, 1.0, 0.0);
            bone.tail = Vec3::new(0.0, 2.0, 0.0);
        }
        session.set_parent(child, Some(root)).unwrap();
        session.exit();
    });
    object
}

// ============================================================================
// Entering Edit Mode
// ============================================================================

#[test]
fn edit_mode_needs_active_object() {
    let mut ctx = EditContext::new();
    armature_object(&mut ctx, "Rig");
    let err = ctx.enter_edit_mode().err().unwrap();
    assert_eq!(err, ArmatureError::NoActiveObject);
}

#[test]
fn edit_mode_needs_armature() {
    let mut ctx = EditContext::new();
    let mesh = ctx.create_object("Body", ObjectData::Mesh("body.mesh".to_string()), None);
    ctx.set_active(Some(mesh));
    let err = ctx.enter_edit_mode().err().unwrap();
    assert_eq!(err, ArmatureError::NotAnArmature("Body".to_string()));
}

#[test]
fn edit_mode_is_exclusive() {
    let mut ctx = EditContext::new();
    let first = armature_object(&mut ctx, "First");
    let second = armature_object(&mut ctx, "Second");

    ctx.set_active(Some(first));
    std::mem::forget(ctx.enter_edit_mode().unwrap());
    assert_eq!(ctx.edit_object(), Some(first));

    ctx.set_active(Some(second));
    let err = ctx.enter_edit_mode().err().unwrap();
    assert_eq!(err, ArmatureError::EditModeBusy("First".to_string()));
}

#[test]
fn exiting_releases_edit_mode() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(object));

    let session = ctx.enter_edit_mode().unwrap();
    assert_eq!(session.object(), object);
    session.exit();
    assert_eq!(ctx.edit_object(), None);

    // and may be entered again
    assert!(ctx.enter_edit_mode().is_ok());
}

// ============================================================================
// Edit Bone Handles
// ============================================================================

#[test]
fn handle_is_stale_after_session() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(object));

    let mut session = ctx.enter_edit_mode().unwrap();
    let handle = session.new_bone("Bone");
    session.exit();

    let session = ctx.enter_edit_mode().unwrap();
    assert!(matches!(
        session.bone(handle),
        Err(ArmatureError::StaleEditHandle { .. })
    ));
    // the bone itself survives, reachable by name
    let fresh = session.find("Bone").unwrap();
    assert_eq!(session.name(fresh).unwrap(), "Bone");
}

#[test]
fn handle_from_other_armature_is_rejected() {
    let mut ctx = EditContext::new();
    let a = armature_object(&mut ctx, "A");
    let b = armature_object(&mut ctx, "B");

    let foreign = ctx.with_active(a, |ctx| {
        let mut session = ctx.enter_edit_mode().unwrap();
        session.new_bone("Bone")
    });
    ctx.with_active(b, |ctx| {
        let mut session = ctx.enter_edit_mode().unwrap();
        session.new_bone("Bone");
        assert!(session.bone_mut(foreign).is_err());
    });
}

#[test]
fn duplicate_names_get_suffix() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(object));

    let mut session = ctx.enter_edit_mode().unwrap();
    let first = session.new_bone("Bone");
    let second = session.new_bone("Bone");
    let third = session.new_bone("Bone");

    assert_eq!(session.name(first).unwrap(), "Bone");
    assert_eq!(session.name(second).unwrap(), "Bone.001");
    assert_eq!(session.name(third).unwrap(), "Bone.002");
    assert_eq!(session.len(), 3);
}

#[test]
fn parent_cycle_is_refused() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(object));

    let mut session = ctx.enter_edit_mode().unwrap();
    let a = session.new_bone("A");
    let b = session.new_bone("B");
    session.set_parent(b, Some(a)).unwrap();
    session.set_parent(a, Some(b)).unwrap();
    session.set_parent(a, Some(a)).unwrap();

    assert_eq!(session.parent(a).unwrap(), None);
    assert_eq!(session.parent(b).unwrap(), Some(a));
}

// ============================================================================
// Commit
// ============================================================================

#[test]
fn commit_orders_bones_parent_first() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    let key = ctx.object(object).unwrap().armature().unwrap();

    ctx.with_active(object, |ctx| {
        let mut session = ctx.enter_edit_mode().unwrap();
        let hand = session.new_bone("Hand");
        let arm = session.new_bone("Arm");
        let shoulder = session.new_bone("Shoulder");
        session.set_parent(hand, Some(arm)).unwrap();
        session.set_parent(arm, Some(shoulder)).unwrap();
    });

    let names: Vec<_> = ctx
        .armature(key)
        .unwrap()
        .bones()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, ["Shoulder", "Arm", "Hand"]);
}

#[test]
fn drop_commits_like_exit() {
    let mut ctx = EditContext::new();
    let object = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(object));
    {
        let mut session = ctx.enter_edit_mode().unwrap();
        let bone = session.new_bone("Bone");
        session.bone_mut(bone).unwrap().tail = Vec3::new(0.0, 0.0, 2.0);
    }

    assert_eq!(ctx.edit_object(), None);
    let key = ctx.object(object).unwrap().armature().unwrap();
    let bone = ctx.armature(key).unwrap().bone("Bone").unwrap();
    assert!((bone.length() - 2.0).abs() < EPSILON);
    assert_eq!(ctx.pose(object).unwrap().len(), 1);
}

#[test]
fn reopened_session_sees_committed_bones() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    ctx.set_active(Some(object));

    let session = ctx.enter_edit_mode().unwrap();
    let child = session.bone_handle("Child").unwrap();
    let root = session.bone_handle("Root").unwrap();
    assert_eq!(session.parent(child).unwrap(), Some(root));
    assert!(session.bone(child).unwrap().head.abs_diff_eq(Vec3::Y, EPSILON));
    assert_eq!(
        session.bone_handle("Tail"),
        Err(ArmatureError::EditBoneNotFound("Tail".to_string()))
    );
}

// ============================================================================
// Active Object
// ============================================================================

#[test]
fn with_active_restores_previous() {
    let mut ctx = EditContext::new();
    let camera = ctx.create_object("Camera", ObjectData::Empty, None);
    let rig = armature_object(&mut ctx, "Rig");
    ctx.set_active(Some(camera));

    let seen = ctx.with_active(rig, |ctx| ctx.active_object());
    assert_eq!(seen, Some(rig));
    assert_eq!(ctx.active_object(), Some(camera));

    let failed: Result<(), ArmatureError> = ctx.with_active(camera, |ctx| {
        ctx.enter_edit_mode()?;
        Ok(())
    });
    assert!(failed.is_err());
    assert_eq!(ctx.active_object(), Some(camera));
}

#[test]
fn removed_armature_leaves_empty_object() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let key = ctx.object(object).unwrap().armature().unwrap();

    assert!(ctx.remove_armature(key).is_some());
    let object = ctx.object(object).unwrap();
    assert_eq!(object.data, ObjectData::Empty);
    assert!(object.pose.is_empty());
}

// ============================================================================
// Pose
// ============================================================================

#[test]
fn rest_pose_reproduces_rest_matrices() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let pose = ctx.pose(object).unwrap();

    for bone in pose.bones() {
        assert!(bone.matrix.abs_diff_eq(bone.rest, EPSILON));
        assert!(bone.skinning_matrix().abs_diff_eq(Mat4::IDENTITY, EPSILON));
    }
}

#[test]
fn parent_basis_carries_children() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let pose = ctx.pose_mut(object).unwrap();

    // quarter turn about the root's local Z swings the child from +Y to -X
    pose.set_basis("Root", Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2)))
        .unwrap();

    let head = pose.matrix("Child").unwrap().w_axis.truncate();
    assert!(head.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), EPSILON), "{head}");
}

#[test]
fn set_matrix_solves_basis_against_parent() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let pose = ctx.pose_mut(object).unwrap();

    pose.set_basis("Root", Mat4::from_quat(Quat::from_rotation_x(0.7)))
        .unwrap();
    let target = Mat4::from_rotation_translation(Quat::from_rotation_y(1.1), Vec3::new(3.0, 0.0, 1.0));
    pose.set_matrix("Child", target).unwrap();

    assert!(pose.matrix("Child").unwrap().abs_diff_eq(target, EPSILON));
}

#[test]
fn set_matrices_is_order_independent() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let pose = ctx.pose_mut(object).unwrap();

    let mut targets = FxHashMap::default();
    targets.insert(
        "Child".to_string(),
        Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0)),
    );
    targets.insert(
        "Root".to_string(),
        Mat4::from_rotation_translation(Quat::from_rotation_z(0.4), Vec3::new(1.0, 0.0, 0.0)),
    );
    pose.set_matrices(&targets).unwrap();

    for (name, target) in &targets {
        assert!(pose.matrix(name).unwrap().abs_diff_eq(*target, EPSILON), "{name}");
    }
}

#[test]
fn set_matrices_rejects_unknown_bone() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let pose = ctx.pose_mut(object).unwrap();

    let mut targets = FxHashMap::default();
    targets.insert("Tail".to_string(), Mat4::IDENTITY);
    assert_eq!(
        pose.set_matrices(&targets),
        Err(ArmatureError::PoseBoneNotFound("Tail".to_string()))
    );
}

#[test]
fn pose_basis_survives_edit_session() {
    let mut ctx = EditContext::new();
    let object = two_bone_rig(&mut ctx);
    let basis = Mat4::from_quat(Quat::from_rotation_y(0.3));
    ctx.pose_mut(object).unwrap().set_basis("Root", basis).unwrap();

    ctx.with_active(object, |ctx| {
        let mut session = ctx.enter_edit_mode().unwrap();
        session.new_bone("Extra");
    });

    let pose = ctx.pose(object).unwrap();
    assert_eq!(pose.len(), 3);
    assert!(pose.bone("Root").unwrap().basis.abs_diff_eq(basis, EPSILON));
    assert_eq!(pose.bone("Extra").unwrap().basis, Mat4::IDENTITY);
}
