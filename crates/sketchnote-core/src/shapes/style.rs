//! Style properties shared by every shape variant.

use peniko::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel stored for "no fill" so it survives a server round trip.
pub const TRANSPARENT: &str = "transparent";

/// Fully transparent hex emitted by color pickers for "no fill".
const PICKER_TRANSPARENT: &str = "#00000000";

/// A paint value as stored on the wire: either the `transparent` sentinel or a
/// CSS color string that is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Paint {
    Transparent,
    Color(String),
}

impl Paint {
    /// Create a color paint from any CSS color string.
    pub fn color(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    /// Create a paint from a color picker value. A fully transparent hex
    /// becomes the `transparent` sentinel.
    pub fn from_picker(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.eq_ignore_ascii_case(PICKER_TRANSPARENT) {
            Paint::Transparent
        } else {
            Self::from(value)
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Paint::Transparent)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Paint::Transparent => TRANSPARENT,
            Paint::Color(c) => c,
        }
    }

    /// Resolve to a render color. Transparent paints and unparseable colors
    /// resolve to `None`.
    pub fn to_color(&self) -> Option<Color> {
        match self {
            Paint::Transparent => None,
            Paint::Color(c) => parse_css_color(c),
        }
    }
}

impl From<String> for Paint {
    fn from(value: String) -> Self {
        if value == TRANSPARENT {
            Paint::Transparent
        } else {
            Paint::Color(value)
        }
    }
}

impl From<&str> for Paint {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Paint> for String {
    fn from(paint: Paint) -> Self {
        match paint {
            Paint::Transparent => TRANSPARENT.to_string(),
            Paint::Color(c) => c,
        }
    }
}

/// Style mapping of a shape. Every field is optional; keys this type does not
/// know about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Paint>,
    #[serde(
        rename = "strokeWidth",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShapeStyle {
    /// Style with just a fill and a stroke, as freshly created shapes get.
    pub fn new(fill: Paint, stroke: Paint) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            ..Self::default()
        }
    }

    /// Fill resolved for rendering.
    pub fn fill_color(&self) -> Option<Color> {
        self.fill.as_ref().and_then(Paint::to_color)
    }

    /// Stroke resolved for rendering.
    pub fn stroke_color(&self) -> Option<Color> {
        self.stroke.as_ref().and_then(Paint::to_color)
    }
}

/// Parse a CSS color string (`#rgb`, `#rrggbb`, `#rrggbbaa` or a basic named
/// color).
pub fn parse_css_color(color: &str) -> Option<Color> {
    let color = color.trim();
    if color.eq_ignore_ascii_case(TRANSPARENT) {
        return None;
    }

    if let Some(hex) = color.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Color::from_rgba8(r, g, b, 255))
            }
            6 => Some(Color::from_rgba8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Color::from_rgba8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        };
    }

    let (r, g, b) = match color.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, 255))
}
