//! Circle shape properties.

use super::ShapeGeometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties of a circle. The shape origin is the center.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CircleProps {
    #[serde(default)]
    pub radius: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CircleProps {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            extra: Map::new(),
        }
    }

    /// Radius as drawn; negative values collapse to zero.
    pub fn effective_radius(&self) -> f64 {
        self.radius.max(0.0)
    }
}

impl ShapeGeometry for CircleProps {
    fn bounds(&self, origin: Point) -> Rect {
        let r = self.effective_radius();
        Rect::new(origin.x - r, origin.y - r, origin.x + r, origin.y + r)
    }

    fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool {
        origin.distance(point) <= self.effective_radius() + tolerance
    }

    fn drag_to(&self, origin: Point, current: Point) -> Self {
        Self {
            radius: origin.distance(current).max(0.0),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_radius_is_distance() {
        let props = CircleProps::default();
        let dragged = props.drag_to(Point::new(10.0, 10.0), Point::new(13.0, 14.0));
        assert!((dragged.radius - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test_edge() {
        let props = CircleProps::new(10.0);
        assert!(props.hit_test(Point::ZERO, Point::new(10.0, 0.0), 0.0));
        assert!(!props.hit_test(Point::ZERO, Point::new(15.0, 0.0), 0.0));
    }

    #[test]
    fn test_negative_radius_collapses() {
        let props = CircleProps::new(-3.0);
        let bounds = props.bounds(Point::new(5.0, 5.0));
        assert!(bounds.area().abs() < f64::EPSILON);
    }
}
