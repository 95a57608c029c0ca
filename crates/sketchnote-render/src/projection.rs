//! Projection of the session's shapes into drawable primitives.
//!
//! The layer owns no authoritative state. It is rebuilt from scratch whenever
//! the session changes, and interaction callbacks hand back
//! [`SessionAction`]s instead of mutating anything themselves.

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use sketchnote_core::config::EditorConfig;
use sketchnote_core::session::{Session, SessionAction};
use sketchnote_core::shapes::{
    CircleProps, LineProps, Paint, RectangleProps, Shape, ShapeId, ShapeProperties, TextProps,
    parse_css_color,
};

/// Stroke width used when a rectangle or circle has none.
const DEFAULT_STROKE_WIDTH: f64 = 1.0;
/// Border width of text boxes.
const TEXT_BORDER_WIDTH: f64 = 1.0;

/// A basic vector primitive in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        rect: Rect,
    },
    Circle {
        center: Point,
        radius: f64,
    },
    Polyline {
        points: Vec<Point>,
    },
    /// Text inside a bordered box.
    TextBox {
        frame: Rect,
        text: String,
        font_size: f64,
        padding: f64,
    },
}

impl Primitive {
    pub fn bounds(&self) -> Rect {
        match self {
            Primitive::Rect { rect } => *rect,
            Primitive::Circle { center, radius } => {
                Rect::new(center.x - radius, center.y - radius, center.x + radius, center.y + radius)
            }
            Primitive::Polyline { points } => match points.first() {
                Some(first) => points
                    .iter()
                    .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
                None => Rect::ZERO,
            },
            Primitive::TextBox { frame, .. } => *frame,
        }
    }
}

/// Paint resolved for drawing. `None` means nothing is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
}

/// One drawable per shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub shape_id: ShapeId,
    pub primitive: Primitive,
    pub style: ResolvedStyle,
    pub selected: bool,
    /// The shape this drawable was built from, for reading geometry back.
    pub source: Shape,
}

/// Drag or resize applied to a drawable by the shell, relative to the
/// shape's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveTransform {
    pub translation: Vec2,
    pub scale: Vec2,
}

impl Default for PrimitiveTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl PrimitiveTransform {
    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            translation: Vec2::new(dx, dy),
            ..Self::default()
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            scale: Vec2::new(sx, sy),
            ..Self::default()
        }
    }

    pub fn then_translate(mut self, dx: f64, dy: f64) -> Self {
        self.translation += Vec2::new(dx, dy);
        self
    }
}

fn color_or(paint: Option<&Paint>, fallback: &str) -> Option<Color> {
    match paint {
        Some(paint) => paint.to_color(),
        None => parse_css_color(fallback),
    }
}

/// Box of a text shape. A missing or zero dimension falls back to the
/// configured default.
fn text_box(props: &TextProps, config: &EditorConfig) -> (f64, f64) {
    (
        props.width.filter(|w| *w != 0.0).unwrap_or(config.text_box_width),
        props.height.filter(|h| *h != 0.0).unwrap_or(config.text_box_height),
    )
}

/// Build the drawable for a single shape.
pub fn project_shape(shape: &Shape, selected: bool, config: &EditorConfig) -> Drawable {
    let origin = shape.origin();
    let style = &shape.style;
    let (primitive, resolved) = match shape.properties() {
        ShapeProperties::Rectangle(p) => (
            Primitive::Rect {
                rect: p.as_rect(origin),
            },
            ResolvedStyle {
                fill: style.fill_color(),
                stroke: style.stroke_color(),
                stroke_width: style.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            },
        ),
        ShapeProperties::Circle(p) => (
            Primitive::Circle {
                center: origin,
                radius: p.effective_radius(),
            },
            ResolvedStyle {
                fill: style.fill_color(),
                stroke: style.stroke_color(),
                stroke_width: style.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            },
        ),
        ShapeProperties::Line(p) => (
            Primitive::Polyline {
                points: p.world_points(origin),
            },
            ResolvedStyle {
                fill: None,
                stroke: style.stroke_color(),
                stroke_width: style.stroke_width.unwrap_or(config.line_stroke_width),
            },
        ),
        ShapeProperties::Text(p) => {
            let (width, height) = text_box(p, config);
            (
                Primitive::TextBox {
                    frame: Rect::from_points(origin, origin + Vec2::new(width, height)),
                    text: p.text.clone(),
                    font_size: if p.font_size > 0.0 {
                        p.font_size
                    } else {
                        config.default_font_size
                    },
                    padding: style.padding.unwrap_or(config.text_padding),
                },
                ResolvedStyle {
                    fill: color_or(style.fill.as_ref(), &config.text_fill),
                    stroke: color_or(style.stroke.as_ref(), &config.default_stroke),
                    stroke_width: TEXT_BORDER_WIDTH,
                },
            )
        }
    };

    Drawable {
        shape_id: shape.id.clone(),
        primitive,
        style: resolved,
        selected,
        source: shape.clone(),
    }
}

/// Read a transformed drawable back into its shape. The origin follows the
/// translation; the geometry is scaled per variant.
pub fn read_back(shape: &Shape, transform: &PrimitiveTransform, config: &EditorConfig) -> Shape {
    let mut updated = shape.clone();
    updated.x += transform.translation.x;
    updated.y += transform.translation.y;
    let (sx, sy) = (transform.scale.x, transform.scale.y);

    let properties = match shape.properties() {
        ShapeProperties::Rectangle(p) => ShapeProperties::Rectangle(RectangleProps {
            width: p.width * sx,
            height: p.height * sy,
            ..p.clone()
        }),
        ShapeProperties::Circle(p) => ShapeProperties::Circle(CircleProps {
            radius: p.effective_radius() * sx.abs().max(sy.abs()),
            ..p.clone()
        }),
        ShapeProperties::Line(p) => {
            let points = p
                .effective_points()
                .chunks_exact(2)
                .flat_map(|xy| [xy[0] * sx, xy[1] * sy])
                .collect();
            updated.style.stroke_width =
                Some(shape.style.stroke_width.unwrap_or(config.line_stroke_width));
            ShapeProperties::Line(LineProps {
                points: Some(points),
                end_x: None,
                end_y: None,
                ..p.clone()
            })
        }
        ShapeProperties::Text(p) => {
            let (width, height) = text_box(p, config);
            if updated.style.fill.is_none() {
                updated.style.fill = Some(Paint::from(config.text_fill.as_str()));
            }
            if updated.style.padding.is_none() {
                updated.style.padding = Some(config.text_padding);
            }
            ShapeProperties::Text(TextProps {
                width: Some(width * sx),
                height: Some(height * sy),
                ..p.clone()
            })
        }
    };

    // The variant is unchanged, so this cannot fail.
    if updated.set_properties(properties).is_err() {
        log::error!("Read-back changed the variant of shape {}", shape.id);
        return shape.clone();
    }
    updated
}

/// The drawable set for the current session.
#[derive(Debug, Clone, Default)]
pub struct RenderLayer {
    drawables: Vec<Drawable>,
    config: EditorConfig,
}

impl RenderLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_session(session: &Session) -> Self {
        let mut layer = Self::new();
        layer.rebuild(session);
        layer
    }

    /// Discard every drawable and project the session again.
    pub fn rebuild(&mut self, session: &Session) {
        self.config = session.config().clone();
        let selected = session.selected_shape_id();
        self.drawables = session
            .shapes()
            .iter()
            .map(|shape| project_shape(shape, selected == Some(&shape.id), &self.config))
            .collect();
        log::debug!("Rebuilt render layer with {} drawables", self.drawables.len());
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Drawable> {
        self.drawables.iter().find(|d| &d.shape_id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Click or tap on a drawable selects its shape.
    pub fn on_click(&self, id: &ShapeId) -> Option<SessionAction> {
        self.get(id)
            .map(|d| SessionAction::SelectShape(Some(d.shape_id.clone())))
    }

    /// Double click on a text drawable opens the text overlay at its origin.
    pub fn on_double_click(&self, id: &ShapeId) -> Option<SessionAction> {
        let drawable = self.get(id)?;
        if !drawable.source.is_text() {
            return None;
        }
        Some(SessionAction::ShowTextOverlay {
            shape_id: drawable.shape_id.clone(),
            position: drawable.source.origin(),
        })
    }

    /// A drag or resize finished: write the drawable's geometry back.
    pub fn on_transform_end(
        &self,
        id: &ShapeId,
        transform: PrimitiveTransform,
    ) -> Option<SessionAction> {
        let drawable = self.get(id)?;
        Some(SessionAction::UpdateShape(read_back(
            &drawable.source,
            &transform,
            &self.config,
        )))
    }
}
