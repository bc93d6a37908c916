//! Bind Pose Tests
//!
//! Tests for:
//! - Bind-pose bones placed straight from inverse bind matrices
//! - Round trip: bind matrix -> bind-pose bone -> pose matrix -> bind matrix
//! - Seeding the deform pose from the bind-pose armature
//! - Writing bind matrices back out in source layout

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};
use myth_armature::armature::bind_pose::rebase_sibling;
use myth_armature::armature::export::make_bind_poses;
use myth_armature::armature::hierarchy::BoneAnnotation;
use myth_armature::coords::{ConvertBasis, mat4_from_row_major, mat4_to_row_major};
use myth_armature::scene::{Node, SceneGraph, Skin, Transform};
use myth_armature::{ArmatureBuilder, BONE_LENGTH, EditContext};
use rustc_hash::FxHashSet;

const EPSILON: f32 = 1e-4;

/// Row-major bind matrix of a bone sitting at `position` with `rotation`.
fn bind_at(position: Vec3, rotation: Quat) -> [f32; 16] {
    mat4_to_row_major(&Mat4::from_rotation_translation(rotation, position).inverse())
}

struct Fixture {
    graph: SceneGraph,
    skins: Vec<Skin>,
    bind_poses: Vec<[f32; 16]>,
}

/// Hips -> Spine -> Head with rigid bind matrices that do not match the
/// transforms.
fn fixture() -> Fixture {
    let mut graph = SceneGraph::new();
    let mesh = graph.add_node(Node::new("Mesh"));
    let hips = graph.add_node(Node::with_transform(
        "Hips",
        Transform::from_position_rotation(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY),
    ));
    let spine = graph.add_to_parent(
        Node::with_transform(
            "Spine",
            Transform::from_position_rotation(Vec3::new(0.0, 0.5, 0.0), Quat::from_rotation_x(0.2)),
        ),
        hips,
    );
    graph.add_to_parent(
        Node::with_transform(
            "Head",
            Transform::from_position_rotation(Vec3::new(0.0, 0.6, 0.0), Quat::IDENTITY),
        ),
        spine,
    );

    let bind_poses = vec![
        bind_at(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_y(0.3)),
        bind_at(Vec3::new(0.1, 1.5, 0.0), Quat::from_rotation_z(-0.4)),
        bind_at(
            Vec3::new(0.1, 2.1, 0.2),
            Quat::from_euler(glam::EulerRot::XYZ, 0.5, 0.1, -0.3),
        ),
    ];
    let mut skin = Skin::new(mesh, "Body");
    for (name, bind) in ["Hips", "Spine", "Head"].iter().zip(&bind_poses) {
        skin = skin.with_bone(name, *bind);
    }
    Fixture {
        graph,
        skins: vec![skin],
        bind_poses,
    }
}

// ============================================================================
// Bind-Pose Armature
// ============================================================================

#[test]
fn bind_pose_armature_mirrors_topology() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    let bind = ctx.armature(build.bind_pose).unwrap();
    assert_eq!(bind.len(), 3);
    assert_eq!(bind.bone("Spine").unwrap().parent.as_deref(), Some("Hips"));
    assert_eq!(bind.bone("Head").unwrap().parent.as_deref(), Some("Spine"));
    for bone in bind.bones() {
        assert!((bone.length() - BONE_LENGTH).abs() < 1e-5);
    }
    for node in build.bones.iter() {
        let annotation = build.table.get(node).unwrap();
        assert_eq!(annotation.pose_bone.as_deref(), f.graph.name(node));
    }
    Ok(())
}

#[test]
fn bind_matrix_round_trips_through_pose() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    let pose = ctx.pose(build.bind_pose_obj)?;
    for (name, source) in ["Hips", "Spine", "Head"].iter().zip(&f.bind_poses) {
        let expected = mat4_from_row_major(source).convert_basis();
        let actual = pose.matrix(name).unwrap().inverse();
        assert!(
            actual.abs_diff_eq(expected, EPSILON),
            "{name}: {actual} != {expected}"
        );
    }
    Ok(())
}

#[test]
fn scaled_bind_matrix_keeps_bone_length() -> anyhow::Result<()> {
    let mut graph = SceneGraph::new();
    let mesh = graph.add_node(Node::new("Mesh"));
    graph.add_node(Node::new("A"));
    let scaled = mat4_to_row_major(&Mat4::from_scale(Vec3::splat(0.01)));

    let mut skins = vec![Skin::new(mesh, "Body").with_bone("A", scaled)];
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &graph,
        &mut skins,
        &FxHashSet::default(),
        collection,
    )?;

    let bone = ctx.armature(build.bind_pose).unwrap().bone("A").unwrap();
    assert!((bone.length() - BONE_LENGTH).abs() < 1e-5);
    Ok(())
}

#[test]
fn bind_pose_parent_bridges_unbound_members() -> anyhow::Result<()> {
    // A -> B -> C, only A and C carry bind matrices
    let mut graph = SceneGraph::new();
    let mesh = graph.add_node(Node::new("Mesh"));
    let a = graph.add_node(Node::new("A"));
    let b = graph.add_to_parent(Node::new("B"), a);
    graph.add_to_parent(Node::new("C"), b);

    let identity = Mat4::IDENTITY.to_cols_array();
    let mut skins = vec![
        Skin::new(mesh, "Body")
            .with_bone("A", identity)
            .with_bone("C", identity),
    ];
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &graph,
        &mut skins,
        &FxHashSet::default(),
        collection,
    )?;

    let deform = ctx.armature(build.armature).unwrap();
    assert_eq!(deform.bone("C").unwrap().parent.as_deref(), Some("B"));

    let bind = ctx.armature(build.bind_pose).unwrap();
    assert_eq!(bind.len(), 2);
    assert_eq!(bind.bone("A").unwrap().parent, None);
    assert_eq!(bind.bone("C").unwrap().parent.as_deref(), Some("A"));
    assert!(build.table.get(b).unwrap().pose_bone.is_none());
    Ok(())
}

#[test]
fn bind_pose_root_when_no_ancestor_is_bound() -> anyhow::Result<()> {
    let mut graph = SceneGraph::new();
    let mesh = graph.add_node(Node::new("Mesh"));
    let a = graph.add_node(Node::new("A"));
    let b = graph.add_to_parent(Node::new("B"), a);
    graph.add_to_parent(Node::new("C"), b);

    let identity = Mat4::IDENTITY.to_cols_array();
    let mut skins = vec![Skin::new(mesh, "Body").with_bone("C", identity)];
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &graph,
        &mut skins,
        &FxHashSet::default(),
        collection,
    )?;

    let bind = ctx.armature(build.bind_pose).unwrap();
    assert_eq!(bind.len(), 1);
    assert_eq!(bind.bone("C").unwrap().parent, None);
    assert!(build.table.get(a).unwrap().pose_bone.is_none());
    assert_eq!(ctx.armature(build.armature).unwrap().len(), 3);
    Ok(())
}

#[test]
fn singular_bind_matrix_gives_zero_length_bone() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    // A -> B, A's bind matrix is all zeros
    let mut graph = SceneGraph::new();
    let mesh = graph.add_node(Node::new("Mesh"));
    let a = graph.add_node(Node::new("A"));
    graph.add_to_parent(
        Node::with_transform(
            "B",
            Transform::from_position_rotation(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY),
        ),
        a,
    );

    let mut skins = vec![
        Skin::new(mesh, "Body")
            .with_bone("A", [0.0; 16])
            .with_bone("B", bind_at(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY)),
    ];
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &graph,
        &mut skins,
        &FxHashSet::default(),
        collection,
    )?;

    let bind = ctx.armature(build.bind_pose).unwrap();
    let bone = bind.bone("A").unwrap();
    assert!(bone.head.is_finite() && bone.tail.is_finite());
    assert!(bone.length() < 1e-6);
    assert_eq!(bind.bone("B").unwrap().parent.as_deref(), Some("A"));

    // the degenerate bone stays at rest and does not poison its child
    let deform = ctx.pose(build.armature_obj)?;
    assert!(deform.bone("A").unwrap().basis.abs_diff_eq(Mat4::IDENTITY, EPSILON));
    let expected = ctx.pose(build.bind_pose_obj)?.matrix("B").unwrap();
    let actual = deform.matrix("B").unwrap();
    assert!(actual.is_finite());
    assert!(actual.abs_diff_eq(expected, EPSILON), "{actual} != {expected}");
    Ok(())
}

#[test]
fn rebase_inverts_non_unit_rotation() {
    let origin = Quat::from_rotation_z(FRAC_PI_2) * 2.0;
    let mut annotation = BoneAnnotation {
        rotation: origin,
        ..BoneAnnotation::default()
    };

    rebase_sibling(&mut annotation, Vec3::ZERO, origin);

    assert!(annotation.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    assert!((annotation.rel_rotation * origin).abs_diff_eq(Quat::IDENTITY, 1e-5));
}

// ============================================================================
// Deform Pose Seeding
// ============================================================================

#[test]
fn deform_pose_matches_bind_pose() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    let deform = ctx.pose(build.armature_obj)?;
    let bind = ctx.pose(build.bind_pose_obj)?;
    for name in ["Hips", "Spine", "Head"] {
        let expected = bind.matrix(name).unwrap();
        let actual = deform.matrix(name).unwrap();
        assert!(actual.abs_diff_eq(expected, EPSILON), "{name}: {actual} != {expected}");
    }
    Ok(())
}

#[test]
fn seeding_pose_keeps_rest_geometry() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    // rest heads still come from the transforms
    let armature = ctx.armature(build.armature).unwrap();
    assert!(armature.bone("Hips").unwrap().head.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    assert!(armature.bone("Spine").unwrap().head.abs_diff_eq(Vec3::new(0.0, 1.5, 0.0), 1e-5));

    let pose = ctx.pose(build.armature_obj)?;
    let hips = pose.bone("Hips").unwrap();
    assert!(hips.rest.abs_diff_eq(armature.bone("Hips").unwrap().matrix_local, 1e-5));
    assert!(!hips.basis.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn make_bind_poses_restores_source_matrices() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    let names = f.skins[0].bone_names.clone();
    let exported = make_bind_poses(&ctx, &names, build.armature, &[build.bind_pose])?;
    assert_eq!(exported.len(), 3);
    for (out, source) in exported.iter().zip(&f.bind_poses) {
        let out = mat4_from_row_major(out);
        let source = mat4_from_row_major(source);
        assert!(out.abs_diff_eq(source, EPSILON), "{out} != {source}");
    }
    Ok(())
}

#[test]
fn make_bind_poses_falls_back_to_deform_armature() -> anyhow::Result<()> {
    let mut f = fixture();
    let mut ctx = EditContext::new();
    let collection = ctx.create_collection("Import");
    let build = ArmatureBuilder::default().build(
        &mut ctx,
        &f.graph,
        &mut f.skins,
        &FxHashSet::default(),
        collection,
    )?;

    let names = vec!["Hips".to_string()];
    let exported = make_bind_poses(&ctx, &names, build.armature, &[])?;
    let rest = ctx.armature(build.armature).unwrap().bone("Hips").unwrap().matrix_local;
    let expected = rest.inverse().convert_basis();
    assert!(mat4_from_row_major(&exported[0]).abs_diff_eq(expected, EPSILON));

    let missing = vec!["Tail".to_string()];
    assert!(make_bind_poses(&ctx, &missing, build.armature, &[build.bind_pose]).is_err());
    Ok(())
}
