//! Error Types
//!
//! This module defines the error types used throughout the armature importer.
//!
//! # Overview
//!
//! The main error type [`ArmatureError`] covers all failure modes including:
//! - Malformed source data (missing bones, unbounded hierarchies)
//! - Stale keys into the scene graph or the editing context
//! - Edit-mode misuse (no active object, busy session, stale edit handles)
//!
//! Degenerate geometry is deliberately not an error: a zero-length or
//! zero rotation produces a zero-length bone segment and a warning.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ArmatureError>`.
//!
//! ```rust,ignore
//! use myth_armature::errors::{ArmatureError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for armature construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArmatureError {
    // ========================================================================
    // Source Data Errors
    // ========================================================================
    /// A skin references a bone name that does not exist in the scene graph.
    #[error("Bone not found in scene graph: {0}")]
    BoneNotFound(String),

    /// An ancestor walk left the import batch without meeting a sibling
    /// boundary or the armature root.
    #[error("Bone '{bone}' reaches scene root '{root}' without crossing a sibling boundary")]
    UnboundedHierarchy {
        /// Bone whose ancestor walk escaped
        bone: String,
        /// Scene root the walk ended on
        root: String,
    },

    /// A skin lists fewer bind poses than bones.
    #[error("Skin '{skin}' has {bones} bones but only {bind_poses} bind poses")]
    BindPoseCountMismatch {
        /// Name of the offending skin
        skin: String,
        /// Number of bone names
        bones: usize,
        /// Number of bind pose matrices
        bind_poses: usize,
    },

    /// A skin was bound to a mesh before any armature was built for it.
    #[error("Skin for mesh '{0}' has no armature")]
    SkinNotBound(String),

    /// The builder was handed no skin that deforms any bone.
    #[error("Cannot build an armature without skinned bones")]
    NoSkins,

    // ========================================================================
    // Stale Key Errors
    // ========================================================================
    /// A node handle does not resolve in the scene graph.
    #[error("Scene node not found")]
    NodeNotFound,

    /// An object key does not resolve in the editing context.
    #[error("Scene object not found")]
    ObjectNotFound,

    /// A collection key does not resolve in the editing context.
    #[error("Collection not found")]
    CollectionNotFound,

    // ========================================================================
    // Edit Mode Errors
    // ========================================================================
    /// Edit mode was requested on an object that carries no armature.
    #[error("Object '{0}' is not an armature")]
    NotAnArmature(String),

    /// Edit mode was requested with no active object.
    #[error("No active object to enter edit mode on")]
    NoActiveObject,

    /// Another object is already in edit mode.
    #[error("Object '{0}' is already in edit mode")]
    EditModeBusy(String),

    /// An edit bone handle was used outside the session that issued it.
    #[error("Edit bone handle for '{bone}' is no longer valid")]
    StaleEditHandle {
        /// Name of the bone, if it could be recovered
        bone: String,
    },

    /// No edit bone with this name exists in the current session.
    #[error("Edit bone not found: {0}")]
    EditBoneNotFound(String),

    /// No pose bone with this name exists on the object.
    #[error("Pose bone not found: {0}")]
    PoseBoneNotFound(String),
}

/// Alias for `Result<T, ArmatureError>`.
pub type Result<T> = std::result::Result<T, ArmatureError>;
