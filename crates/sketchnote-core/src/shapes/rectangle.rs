//! Rectangle shape properties.

use super::ShapeGeometry;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties of a rectangle. The shape origin is the top-left corner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RectangleProps {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RectangleProps {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            extra: Map::new(),
        }
    }

    /// Get the rectangle as a kurbo Rect anchored at `origin`.
    pub fn as_rect(&self, origin: Point) -> Rect {
        Rect::from_points(origin, origin + Vec2::new(self.width, self.height))
    }
}

impl ShapeGeometry for RectangleProps {
    fn bounds(&self, origin: Point) -> Rect {
        self.as_rect(origin)
    }

    fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool {
        self.as_rect(origin)
            .inflate(tolerance, tolerance)
            .contains(point)
    }

    fn drag_to(&self, origin: Point, current: Point) -> Self {
        Self {
            width: (current.x - origin.x).abs(),
            height: (current.y - origin.y).abs(),
            ..self.clone()
        }
    }
}
