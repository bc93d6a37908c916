//! Import Settings
//!
//! Tunables for armature construction. Every field has a default, so a
//! settings file only needs to name what it changes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_armature::ImportSettings;
//!
//! let settings = ImportSettings::default();
//!
//! let settings = ImportSettings {
//!     show_axes: false,
//!     ..Default::default()
//! };
//!
//! let settings = ImportSettings::from_json(r#"{ "bone_length": 0.25 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::armature::BONE_LENGTH;

/// Armature import configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Length of every generated bone.
    pub bone_length: f32,
    /// Draw bone axes on both generated armatures.
    pub show_axes: bool,
    /// Appended to the armature name for the bind-pose armature and object.
    pub bind_pose_suffix: String,
    /// Carry bind matrices across the Y/Z basis swap before use.
    pub convert_bind_poses: bool,
    /// Remove everything a failed build created.
    pub rollback_on_error: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            bone_length: BONE_LENGTH,
            show_axes: true,
            bind_pose_suffix: ".bindPose".to_string(),
            convert_bind_poses: true,
            rollback_on_error: true,
        }
    }
}

impl ImportSettings {
    /// Parses settings from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
