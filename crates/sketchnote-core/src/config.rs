//! Editor defaults.

use serde::{Deserialize, Serialize};

/// Defaults applied to freshly created shapes and to values the render layer
/// reads back when a shape omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_font_size: f64,
    pub default_stroke: String,
    pub text_fill: String,
    pub shape_fill: String,
    pub text_box_width: f64,
    pub text_box_height: f64,
    pub text_padding: f64,
    pub line_stroke_width: f64,
    /// Pointer slack in canvas units for hit testing.
    pub hit_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_font_size: 16.0,
            default_stroke: "black".to_string(),
            text_fill: "black".to_string(),
            shape_fill: "transparent".to_string(),
            text_box_width: 100.0,
            text_box_height: 20.0,
            text_padding: 5.0,
            line_stroke_width: 2.0,
            hit_tolerance: 4.0,
        }
    }
}

impl EditorConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the config to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
