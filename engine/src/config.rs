//! Engine Configuration
//!
//! Bake, scene and volume-material settings in one JSON document. Every
//! field has a default, so a partial file only overrides what it names:
//!
//! ```json
//! {
//!   "bake": { "resolution": 64, "bleed_radius": 0 },
//!   "scene": { "lights": [{ "position": [2, 4, 2], "color": [1, 0.9, 0.8, 1] }] },
//!   "volume": { "shading": "emission", "density_scale": 2.0 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render::materials::VolumeParams;
use crate::scene::SceneSettings;
use crate::volume::BakeConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bake: BakeConfig,
    pub scene: SceneSettings,
    /// Initial volumetric material parameters
    pub volume: VolumeParams,
    /// Directory with WGSL files overriding the embedded shaders
    pub shader_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_json(&source)?;
        log::info!("[EngineConfig] Loaded {}", path.display());
        Ok(config)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bake.validate()?;
        self.volume.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VolumeError;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.bake.resolution, 128);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(r#"{ "bake": { "bleed_radius": 0 } }"#).unwrap();
        assert_eq!(config.bake.bleed_radius, 0);
        assert_eq!(config.bake.resolution, 128);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let err = EngineConfig::from_json(r#"{ "bake": { "resolution": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(VolumeError::Configuration(_))));
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_json("{ bake").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/smokelab/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
