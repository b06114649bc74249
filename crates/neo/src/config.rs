//! Engine configuration.
//!
//! Everything has a default, so a config file only needs the fields it
//! changes:
//!
//! ```json
//! { "app_name": "Shadows", "width": 1600, "height": 900, "vsync": false }
//! ```

use std::path::{Path, PathBuf};

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::{NeoError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title.
    pub app_name: String,
    /// Resource directory demos load from.
    pub app_res: PathBuf,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Start the UDP diagnostics sender (needs the `diagnostics` feature).
    pub attach_diagnostics: bool,
    pub clear_color: Vec4,
    /// Where [`ShaderProgram::from_files`](crate::render::ShaderProgram::from_files)
    /// looks for shader sources.
    pub shader_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "Neo".into(),
            app_res: PathBuf::from("res"),
            width: 1280,
            height: 720,
            vsync: true,
            attach_diagnostics: true,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl EngineConfig {
    pub fn named(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| NeoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        log::info!("loaded config {} from {}", config.app_name, path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "app_name": "VFC", "vsync": false }"#).unwrap();
        assert_eq!(config.app_name, "VFC");
        assert!(!config.vsync);
        assert_eq!(config.width, 1280);
        assert_eq!(config.shader_dir, PathBuf::from("shaders"));
    }

    #[test]
    fn clear_color_reads_as_an_array() {
        let config = EngineConfig::from_json(r#"{ "clear_color": [0.1, 0.2, 0.3, 1.0] }"#).unwrap();
        assert_eq!(config.clear_color, Vec4::new(0.1, 0.2, 0.3, 1.0));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = EngineConfig::from_json("{ width: }").unwrap_err();
        assert!(matches!(err, NeoError::Config(_)));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = EngineConfig::load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
