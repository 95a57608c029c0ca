//! Line shape properties.

use super::{ShapeGeometry, point_to_polyline_dist};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties of a line. Points are a flat `[x0, y0, x1, y1, ...]` list
/// relative to the shape origin.
///
/// Older records carry `endX`/`endY` instead of a point list; those are read
/// as a single segment from the origin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<f64>>,
    #[serde(rename = "endX", default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(rename = "endY", default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LineProps {
    /// A line through the given flat point list.
    pub fn from_points(points: Vec<f64>) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    /// The flat point list used for drawing.
    pub fn effective_points(&self) -> Vec<f64> {
        match &self.points {
            Some(points) => points.clone(),
            None => vec![
                0.0,
                0.0,
                self.end_x.unwrap_or(0.0),
                self.end_y.unwrap_or(0.0),
            ],
        }
    }

    /// Points in world coordinates. A trailing odd coordinate is ignored.
    pub fn world_points(&self, origin: Point) -> Vec<Point> {
        self.effective_points()
            .chunks_exact(2)
            .map(|p| origin + Vec2::new(p[0], p[1]))
            .collect()
    }
}

impl ShapeGeometry for LineProps {
    fn bounds(&self, origin: Point) -> Rect {
        let points = self.world_points(origin);
        let Some(first) = points.first() else {
            return Rect::from_points(origin, origin);
        };
        points
            .iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
    }

    fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool {
        let points = self.world_points(origin);
        match points.as_slice() {
            [] => false,
            [single] => single.distance(point) <= tolerance,
            _ => point_to_polyline_dist(point, &points) <= tolerance,
        }
    }

    fn drag_to(&self, origin: Point, current: Point) -> Self {
        Self {
            points: Some(vec![0.0, 0.0, current.x - origin.x, current.y - origin.y]),
            end_x: None,
            end_y: None,
            extra: self.extra.clone(),
        }
    }
}
