//! Text shape properties.

use super::ShapeGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Font size used when a record carries none.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;
/// Box size used when a record carries none.
pub const DEFAULT_TEXT_WIDTH: f64 = 100.0;
pub const DEFAULT_TEXT_HEIGHT: f64 = 20.0;

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

/// Properties of a text box. The shape origin is the top-left corner of the
/// box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "fontSize", default = "default_font_size")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TextProps {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_FONT_SIZE)
    }
}

impl TextProps {
    pub fn new(text: impl Into<String>, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font_size,
            width: None,
            height: None,
            extra: Map::new(),
        }
    }

    /// Size of the text box, falling back to the default box.
    pub fn box_size(&self) -> (f64, f64) {
        (
            self.width.unwrap_or(DEFAULT_TEXT_WIDTH),
            self.height.unwrap_or(DEFAULT_TEXT_HEIGHT),
        )
    }
}

impl ShapeGeometry for TextProps {
    fn bounds(&self, origin: Point) -> Rect {
        let (width, height) = self.box_size();
        Rect::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool {
        self.bounds(origin).inflate(tolerance, tolerance).contains(point)
    }

    fn drag_to(&self, origin: Point, current: Point) -> Self {
        Self {
            width: Some((current.x - origin.x).abs()),
            height: Some((current.y - origin.y).abs()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_size_defaults() {
        let props: TextProps = serde_json::from_value(serde_json::json!({"text": "hi"})).unwrap();
        assert_eq!(props.text, "hi");
        assert!((props.font_size - DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
        assert_eq!(props.box_size(), (DEFAULT_TEXT_WIDTH, DEFAULT_TEXT_HEIGHT));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(TextProps::new("note", 24.0)).unwrap();
        assert_eq!(json, serde_json::json!({"text": "note", "fontSize": 24.0}));
    }

    #[test]
    fn test_hit_test() {
        let props = TextProps::default();
        assert!(props.hit_test(Point::ZERO, Point::new(50.0, 10.0), 0.0));
        assert!(!props.hit_test(Point::ZERO, Point::new(50.0, 40.0), 0.0));
    }
}
