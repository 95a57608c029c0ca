//! Shape definitions for the drawing canvas.

mod circle;
mod line;
mod rectangle;
mod style;
mod text;

pub use circle::CircleProps;
pub use line::LineProps;
pub use rectangle::RectangleProps;
pub use style::{Paint, ShapeStyle, TRANSPARENT, parse_css_color};
pub use text::{DEFAULT_FONT_SIZE, DEFAULT_TEXT_HEIGHT, DEFAULT_TEXT_WIDTH, TextProps};

use crate::config::EditorConfig;
use crate::error::ShapeError;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a shape.
///
/// Shapes loaded from the server carry their integer id rendered as a string.
/// Shapes drawn locally get a time-ordered UUID until the server assigns one,
/// so a local id never parses as a server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawShapeId", into = "String")]
pub struct ShapeId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawShapeId {
    Int(i64),
    Str(String),
}

impl From<RawShapeId> for ShapeId {
    fn from(raw: RawShapeId) -> Self {
        match raw {
            RawShapeId::Int(id) => ShapeId::from_server(id),
            RawShapeId::Str(id) => ShapeId(id),
        }
    }
}

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh client-side id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_server(id: i64) -> Self {
        Self(id.to_string())
    }

    /// The server id, if this id was assigned by the server.
    pub fn server_id(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Convert back to the server's integer id.
    pub fn to_server_id(&self) -> Result<i64, ShapeError> {
        self.server_id()
            .ok_or_else(|| ShapeError::InvalidServerId(self.0.clone()))
    }

    pub fn is_local(&self) -> bool {
        self.server_id().is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ShapeId> for String {
    fn from(id: ShapeId) -> Self {
        id.0
    }
}

impl From<&str> for ShapeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ShapeId {
    fn from(id: i64) -> Self {
        Self::from_server(id)
    }
}

/// The closed set of shape variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Circle,
    Line,
    Text,
}

impl ShapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Rectangle => "rectangle",
            ShapeType::Circle => "circle",
            ShapeType::Line => "line",
            ShapeType::Text => "text",
        }
    }

    pub fn all() -> &'static [ShapeType] {
        &[
            ShapeType::Rectangle,
            ShapeType::Circle,
            ShapeType::Line,
            ShapeType::Text,
        ]
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeType {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangle" => Ok(ShapeType::Rectangle),
            "circle" => Ok(ShapeType::Circle),
            "line" => Ok(ShapeType::Line),
            "text" => Ok(ShapeType::Text),
            other => Err(ShapeError::UnsupportedShapeType(other.to_string())),
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Geometry shared by every property variant. Coordinates in the properties
/// are relative to the shape origin, which is passed in.
pub trait ShapeGeometry: Sized {
    /// Bounding box in canvas coordinates.
    fn bounds(&self, origin: Point) -> Rect;

    /// Check if a canvas point hits the shape.
    fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool;

    /// Properties after dragging from the origin to `current` while drawing.
    fn drag_to(&self, origin: Point, current: Point) -> Self;
}

/// Variant-specific properties of a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeProperties {
    Rectangle(RectangleProps),
    Circle(CircleProps),
    Line(LineProps),
    Text(TextProps),
}

impl Serialize for ShapeProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ShapeProperties::Rectangle(p) => p.serialize(serializer),
            ShapeProperties::Circle(p) => p.serialize(serializer),
            ShapeProperties::Line(p) => p.serialize(serializer),
            ShapeProperties::Text(p) => p.serialize(serializer),
        }
    }
}

impl ShapeProperties {
    /// Zeroed properties for a freshly created shape.
    pub fn defaults(shape_type: ShapeType, config: &EditorConfig) -> Self {
        match shape_type {
            ShapeType::Rectangle => ShapeProperties::Rectangle(RectangleProps::new(0.0, 0.0)),
            ShapeType::Circle => ShapeProperties::Circle(CircleProps::new(0.0)),
            ShapeType::Line => ShapeProperties::Line(LineProps::from_points(vec![0.0, 0.0])),
            ShapeType::Text => {
                ShapeProperties::Text(TextProps::new(String::new(), config.default_font_size))
            }
        }
    }

    /// Parse a properties mapping for the given variant.
    pub fn from_map(shape_type: ShapeType, map: Map<String, Value>) -> Result<Self, ShapeError> {
        let value = Value::Object(map);
        let invalid = |e: serde_json::Error| ShapeError::InvalidProperties {
            shape_type: shape_type.to_string(),
            message: e.to_string(),
        };
        Ok(match shape_type {
            ShapeType::Rectangle => {
                ShapeProperties::Rectangle(serde_json::from_value(value).map_err(invalid)?)
            }
            ShapeType::Circle => {
                ShapeProperties::Circle(serde_json::from_value(value).map_err(invalid)?)
            }
            ShapeType::Line => ShapeProperties::Line(serde_json::from_value(value).map_err(invalid)?),
            ShapeType::Text => ShapeProperties::Text(serde_json::from_value(value).map_err(invalid)?),
        })
    }

    /// Render the properties as a plain mapping.
    pub fn to_map(&self) -> Result<Map<String, Value>, ShapeError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ShapeError::InvalidProperties {
                shape_type: self.shape_type().to_string(),
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(ShapeError::InvalidProperties {
                shape_type: self.shape_type().to_string(),
                message: e.to_string(),
            }),
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeProperties::Rectangle(_) => ShapeType::Rectangle,
            ShapeProperties::Circle(_) => ShapeType::Circle,
            ShapeProperties::Line(_) => ShapeType::Line,
            ShapeProperties::Text(_) => ShapeType::Text,
        }
    }

    pub fn bounds(&self, origin: Point) -> Rect {
        match self {
            ShapeProperties::Rectangle(p) => p.bounds(origin),
            ShapeProperties::Circle(p) => p.bounds(origin),
            ShapeProperties::Line(p) => p.bounds(origin),
            ShapeProperties::Text(p) => p.bounds(origin),
        }
    }

    pub fn hit_test(&self, origin: Point, point: Point, tolerance: f64) -> bool {
        match self {
            ShapeProperties::Rectangle(p) => p.hit_test(origin, point, tolerance),
            ShapeProperties::Circle(p) => p.hit_test(origin, point, tolerance),
            ShapeProperties::Line(p) => p.hit_test(origin, point, tolerance),
            ShapeProperties::Text(p) => p.hit_test(origin, point, tolerance),
        }
    }

    pub fn drag_to(&self, origin: Point, current: Point) -> Self {
        match self {
            ShapeProperties::Rectangle(p) => ShapeProperties::Rectangle(p.drag_to(origin, current)),
            ShapeProperties::Circle(p) => ShapeProperties::Circle(p.drag_to(origin, current)),
            ShapeProperties::Line(p) => ShapeProperties::Line(p.drag_to(origin, current)),
            ShapeProperties::Text(p) => ShapeProperties::Text(p.drag_to(origin, current)),
        }
    }
}

/// A drawable shape.
///
/// The properties variant is fixed at construction; [`Shape::set_properties`]
/// refuses to switch it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ShapeWire")]
pub struct Shape {
    pub id: ShapeId,
    pub x: f64,
    pub y: f64,
    properties: ShapeProperties,
    pub style: ShapeStyle,
    /// Server-assigned sort key.
    pub order: Option<i64>,
}

#[derive(Deserialize)]
struct ShapeWire {
    id: ShapeId,
    shape_type: ShapeType,
    x: f64,
    y: f64,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    style: ShapeStyle,
    #[serde(default)]
    order: Option<i64>,
}

impl TryFrom<ShapeWire> for Shape {
    type Error = ShapeError;

    fn try_from(wire: ShapeWire) -> Result<Self, Self::Error> {
        Ok(Shape {
            id: wire.id,
            x: wire.x,
            y: wire.y,
            properties: ShapeProperties::from_map(wire.shape_type, wire.properties)?,
            style: wire.style,
            order: wire.order,
        })
    }
}

impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a ShapeId,
            shape_type: ShapeType,
            x: f64,
            y: f64,
            properties: &'a ShapeProperties,
            style: &'a ShapeStyle,
            #[serde(skip_serializing_if = "Option::is_none")]
            order: Option<i64>,
        }

        Wire {
            id: &self.id,
            shape_type: self.shape_type(),
            x: self.x,
            y: self.y,
            properties: &self.properties,
            style: &self.style,
            order: self.order,
        }
        .serialize(serializer)
    }
}

impl Shape {
    pub fn new(
        id: ShapeId,
        x: f64,
        y: f64,
        properties: ShapeProperties,
        style: ShapeStyle,
    ) -> Self {
        Self {
            id,
            x,
            y,
            properties,
            style,
            order: None,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        self.properties.shape_type()
    }

    pub fn properties(&self) -> &ShapeProperties {
        &self.properties
    }

    /// Replace the properties, keeping the variant.
    pub fn set_properties(&mut self, properties: ShapeProperties) -> Result<(), ShapeError> {
        if properties.shape_type() != self.shape_type() {
            return Err(ShapeError::TypeMismatch {
                expected: self.shape_type().to_string(),
                found: properties.shape_type().to_string(),
            });
        }
        self.properties = properties;
        Ok(())
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Rect {
        self.properties.bounds(self.origin())
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.properties.hit_test(self.origin(), point, tolerance)
    }

    /// Structural equality used for dirty tracking: position, variant,
    /// properties and style. Ids and order are not compared.
    pub fn same_content(&self, other: &Shape) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.properties == other.properties
            && self.style == other.style
    }

    /// Text content, for text shapes.
    pub fn text(&self) -> Option<&str> {
        match &self.properties {
            ShapeProperties::Text(p) => Some(&p.text),
            _ => None,
        }
    }

    /// Set the text content. Returns false for non-text shapes.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        match &mut self.properties {
            ShapeProperties::Text(p) => {
                p.text = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        self.shape_type() == ShapeType::Text
    }
}

/// Create a shape of the given variant at `(x, y)` with zeroed geometry and
/// default style.
pub fn create_shape(shape_type: ShapeType, x: f64, y: f64, config: &EditorConfig) -> Shape {
    let fill = match shape_type {
        ShapeType::Text => Paint::from(config.text_fill.as_str()),
        _ => Paint::from(config.shape_fill.as_str()),
    };
    let style = ShapeStyle::new(fill, Paint::from(config.default_stroke.as_str()));
    Shape::new(
        ShapeId::generate(),
        x,
        y,
        ShapeProperties::defaults(shape_type, config),
        style,
    )
}

/// Create a shape from a variant name, failing for names outside the
/// variant set.
pub fn create_shape_named(
    shape_type: &str,
    x: f64,
    y: f64,
    config: &EditorConfig,
) -> Result<Shape, ShapeError> {
    Ok(create_shape(shape_type.parse()?, x, y, config))
}

/// Recompute a shape's geometry for the current pointer position while
/// drawing. The input is left untouched.
pub fn update_shape_geometry(shape: &Shape, current_x: f64, current_y: f64) -> Shape {
    let mut updated = shape.clone();
    updated.properties = shape
        .properties
        .drag_to(shape.origin(), Point::new(current_x, current_y));
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> EditorConfig {
        EditorConfig::default()
    }

    #[test]
    fn test_create_defaults() {
        let rect = create_shape(ShapeType::Rectangle, 5.0, 6.0, &config());
        assert_eq!(rect.shape_type(), ShapeType::Rectangle);
        assert_eq!(rect.style.fill, Some(Paint::Transparent));
        assert_eq!(rect.style.stroke, Some(Paint::color("black")));
        assert!(rect.id.is_local());

        let text = create_shape(ShapeType::Text, 0.0, 0.0, &config());
        assert_eq!(text.style.fill, Some(Paint::color("black")));
        assert_eq!(text.text(), Some(""));
        match text.properties() {
            ShapeProperties::Text(p) => assert!((p.font_size - 16.0).abs() < f64::EPSILON),
            other => panic!("unexpected properties {:?}", other),
        }

        let line = create_shape(ShapeType::Line, 0.0, 0.0, &config());
        match line.properties() {
            ShapeProperties::Line(p) => assert_eq!(p.points, Some(vec![0.0, 0.0])),
            other => panic!("unexpected properties {:?}", other),
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = create_shape(ShapeType::Circle, 0.0, 0.0, &config());
        let b = create_shape(ShapeType::Circle, 0.0, 0.0, &config());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_unsupported_type() {
        let err = create_shape_named("hexagon", 0.0, 0.0, &config()).unwrap_err();
        assert_eq!(err, ShapeError::UnsupportedShapeType("hexagon".into()));
        assert!(create_shape_named("circle", 0.0, 0.0, &config()).is_ok());
    }

    #[test]
    fn test_circle_three_four_five() {
        let circle = create_shape(ShapeType::Circle, 10.0, 10.0, &config());
        let updated = update_shape_geometry(&circle, 13.0, 14.0);
        match updated.properties() {
            ShapeProperties::Circle(p) => assert!((p.radius - 5.0).abs() < f64::EPSILON),
            other => panic!("unexpected properties {:?}", other),
        }
        // The input is not mutated.
        match circle.properties() {
            ShapeProperties::Circle(p) => assert!(p.radius.abs() < f64::EPSILON),
            other => panic!("unexpected properties {:?}", other),
        }
    }

    #[test]
    fn test_line_relative_points() {
        let line = create_shape(ShapeType::Line, 0.0, 0.0, &config());
        let updated = update_shape_geometry(&line, 5.0, -3.0);
        match updated.properties() {
            ShapeProperties::Line(p) => assert_eq!(p.points, Some(vec![0.0, 0.0, 5.0, -3.0])),
            other => panic!("unexpected properties {:?}", other),
        }
    }

    #[test]
    fn test_rectangle_drag_up_left() {
        let rect = create_shape(ShapeType::Rectangle, 100.0, 100.0, &config());
        let updated = update_shape_geometry(&rect, 60.0, 70.0);
        assert_eq!(
            updated.properties(),
            &ShapeProperties::Rectangle(RectangleProps::new(40.0, 30.0))
        );
        assert_eq!(updated.id, rect.id);
    }

    #[test]
    fn test_set_properties_rejects_variant_change() {
        let mut rect = create_shape(ShapeType::Rectangle, 0.0, 0.0, &config());
        let err = rect
            .set_properties(ShapeProperties::Circle(CircleProps::new(3.0)))
            .unwrap_err();
        assert!(matches!(err, ShapeError::TypeMismatch { .. }));
        assert!(
            rect.set_properties(ShapeProperties::Rectangle(RectangleProps::new(1.0, 2.0)))
                .is_ok()
        );
    }

    #[test]
    fn test_shape_json_round_trip_keeps_unknown_keys() {
        let json = json!({
            "id": "7",
            "shape_type": "rectangle",
            "x": 1.5,
            "y": 2.5,
            "properties": {"width": 10.0, "height": 20.0, "cornerRadius": 3},
            "style": {"fill": "transparent", "stroke": "#112233"},
            "order": 4
        });
        let shape: Shape = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(shape.id.server_id(), Some(7));
        assert_eq!(shape.order, Some(4));
        assert_eq!(serde_json::to_value(&shape).unwrap(), json);
    }

    #[test]
    fn test_integer_id_is_accepted() {
        let json = json!({
            "id": 12,
            "shape_type": "circle",
            "x": 0.0,
            "y": 0.0,
            "properties": {"radius": 4.0}
        });
        let shape: Shape = serde_json::from_value(json).unwrap();
        assert_eq!(shape.id, ShapeId::from_server(12));
        assert_eq!(shape.style, ShapeStyle::default());
    }

    #[test]
    fn test_unknown_shape_type_fails_to_parse() {
        let json = json!({"id": "1", "shape_type": "star", "x": 0.0, "y": 0.0});
        assert!(serde_json::from_value::<Shape>(json).is_err());
    }

    #[test]
    fn test_same_content_ignores_id_and_order() {
        let a = create_shape(ShapeType::Rectangle, 1.0, 1.0, &config());
        let mut b = a.clone();
        b.id = ShapeId::from_server(9);
        b.order = Some(3);
        assert!(a.same_content(&b));
        b.x = 2.0;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_server_id_conversion() {
        assert_eq!(ShapeId::from_server(42).to_server_id(), Ok(42));
        let local = ShapeId::generate();
        assert!(matches!(
            local.to_server_id(),
            Err(ShapeError::InvalidServerId(_))
        ));
    }

    #[test]
    fn test_point_to_segment_dist() {
        let d = point_to_segment_dist(
            Point::new(5.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert!((d - 3.0).abs() < f64::EPSILON);
        let d = point_to_segment_dist(Point::new(13.0, 4.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < f64::EPSILON);
    }
}
