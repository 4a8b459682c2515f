use crate::color::Rgba;
use crate::document::CanvasSize;
use crate::history::MAX_HISTORY_LENGTH;
use crate::interaction::{Tool, ToolSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor defaults. Every field is optional in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Cap on undo history entries
    pub max_history: usize,
    /// Flood fill tolerance, 0 to 255
    pub tolerance: u8,
    pub stroke_width: f32,
    pub stroke_color: Rgba,
    pub fill_color: Rgba,
    /// Cells per side on pixel canvases that don't specify their own
    pub default_grid_size: u32,
    /// Key of the shared blob in [`crate::persistence::MemoryStore`]
    pub storage_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 500,
            canvas_height: 500,
            max_history: MAX_HISTORY_LENGTH,
            tolerance: 20,
            stroke_width: 5.0,
            stroke_color: Rgba::BLACK,
            fill_color: Rgba::BLACK,
            default_grid_size: 25,
            storage_key: "drawings-storage".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width, self.canvas_height)
    }

    pub fn history_len(&self) -> usize {
        self.max_history.max(1)
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            tool: Tool::Pen,
            stroke_color: self.stroke_color,
            stroke_width: self.stroke_width,
            fill_color: self.fill_color,
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EditorConfig::from_json_str(r##"{"tolerance": 0, "stroke_color": "#f00"}"##).unwrap();
        assert_eq!(config.tolerance, 0);
        assert_eq!(config.stroke_color, Rgba::opaque(255, 0, 0));
        assert_eq!(config.canvas_size(), CanvasSize::new(500, 500));
        assert_eq!(config.max_history, 50);
        assert_eq!(config.storage_key, "drawings-storage");
    }

    #[test]
    fn test_bad_color_is_a_parse_error() {
        let err = EditorConfig::from_json_str(r#"{"fill_color": "nope"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = EditorConfig::from_json_file("/nonexistent/layer-paint.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_zero_history_is_clamped() {
        let config = EditorConfig {
            max_history: 0,
            ..EditorConfig::default()
        };
        assert_eq!(config.history_len(), 1);
    }
}
