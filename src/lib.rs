#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Skeletal armature reconstruction for imported scenes.
//!
//! Given a transform hierarchy and the skins that reference it, builds a
//! deform armature (rest geometry from the transforms) and a bind-pose
//! armature (rest geometry from the inverse bind matrices), parents the
//! latter to the former, and seeds the deform pose from the bind pose.
//!
//! ```rust,ignore
//! use myth_armature::{ArmatureBuilder, EditContext, ImportSettings};
//!
//! let mut ctx = EditContext::new();
//! let collection = ctx.create_collection("Import");
//! let build = ArmatureBuilder::new(ImportSettings::default())
//!     .build(&mut ctx, &graph, &mut skins, &siblings, collection)?;
//! ```

pub mod armature;
pub mod coords;
pub mod errors;
pub mod scene;
pub mod settings;

pub use armature::{
    Armature, ArmatureBuild, ArmatureBuilder, BONE_LENGTH, EditContext, EditSession, ObjectData,
    Pose,
};
pub use coords::{ConvertBasis, MATRIX_YZ};
pub use errors::{ArmatureError, Result};
pub use scene::{Node, NodeHandle, SceneGraph, Skin, Transform};
pub use settings::ImportSettings;
