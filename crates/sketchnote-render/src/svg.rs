//! SVG rendering backend.
//!
//! Writes every drawable of a layer as an SVG element, in collection order,
//! so later shapes paint over earlier ones. Selected drawables get a dashed
//! outline in the selection color.

use std::fmt::Write;

use kurbo::Rect;
use peniko::Color;

use crate::projection::{Drawable, Primitive, RenderLayer};
use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};

/// Gap between a selected drawable and its outline.
const SELECTION_MARGIN: f64 = 4.0;

/// Format a color as an SVG paint value.
fn paint(color: Option<Color>) -> String {
    match color {
        None => "none".to_string(),
        Some(color) => {
            let c = color.to_rgba8();
            if c.a == 255 {
                format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
            } else {
                format!("rgba({},{},{},{:.3})", c.r, c.g, c.b, f64::from(c.a) / 255.0)
            }
        }
    }
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Renders a layer to an SVG document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    output: String,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document built by the last `build_scene`.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn render_drawable(
        &mut self,
        drawable: &Drawable,
        editing: bool,
    ) -> Result<(), std::fmt::Error> {
        let out = &mut self.output;
        let style = &drawable.style;
        let stroke = paint(style.stroke);
        let fill = paint(style.fill);
        let id = escape_xml(drawable.shape_id.as_str());

        match &drawable.primitive {
            Primitive::Rect { rect } => writeln!(
                out,
                r#"  <rect data-id="{}" x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
                id,
                rect.x0,
                rect.y0,
                rect.width(),
                rect.height(),
                fill,
                stroke,
                style.stroke_width
            )?,
            Primitive::Circle { center, radius } => writeln!(
                out,
                r#"  <circle data-id="{}" cx="{}" cy="{}" r="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
                id, center.x, center.y, radius, fill, stroke, style.stroke_width
            )?,
            Primitive::Polyline { points } => {
                let coords: Vec<String> =
                    points.iter().map(|p| format!("{},{}", p.x, p.y)).collect();
                writeln!(
                    out,
                    r#"  <polyline data-id="{}" points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                    id,
                    coords.join(" "),
                    stroke,
                    style.stroke_width
                )?
            }
            Primitive::TextBox {
                frame,
                text,
                font_size,
                padding,
            } => {
                writeln!(out, r#"  <g data-id="{}">"#, id)?;
                writeln!(
                    out,
                    r#"    <rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                    frame.x0,
                    frame.y0,
                    frame.width(),
                    frame.height(),
                    stroke,
                    style.stroke_width
                )?;
                if !editing {
                    let x = frame.x0 + padding;
                    for (i, line) in text.lines().enumerate() {
                        let y = frame.y0 + padding + font_size * (i as f64 + 1.0);
                        writeln!(
                            out,
                            r#"    <text x="{}" y="{}" font-size="{}" fill="{}">{}</text>"#,
                            x,
                            y,
                            font_size,
                            fill,
                            escape_xml(line)
                        )?;
                    }
                }
                writeln!(out, "  </g>")?;
            }
        }
        Ok(())
    }

    fn render_selection(&mut self, bounds: Rect, color: Color) -> Result<(), std::fmt::Error> {
        let outline = bounds.inflate(SELECTION_MARGIN, SELECTION_MARGIN);
        writeln!(
            self.output,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="1" stroke-dasharray="4 2"/>"#,
            outline.x0,
            outline.y0,
            outline.width(),
            outline.height(),
            paint(Some(color))
        )
    }
}

impl Renderer for SvgRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let (width, height) = (ctx.viewport_size.width, ctx.viewport_size.height);
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(RendererError::InvalidViewport(format!("{}x{}", width, height)));
        }

        self.output.clear();
        writeln!(
            self.output,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )?;
        writeln!(
            self.output,
            r#"  <rect width="100%" height="100%" fill="{}"/>"#,
            paint(Some(self.background_color(ctx)))
        )?;

        for drawable in ctx.layer.drawables() {
            let editing = ctx.editing_shape_id.as_ref() == Some(&drawable.shape_id);
            self.render_drawable(drawable, editing)?;
        }
        for drawable in ctx.layer.drawables().iter().filter(|d| d.selected) {
            self.render_selection(drawable.primitive.bounds(), ctx.selection_color)?;
        }

        writeln!(self.output, "</svg>")?;
        log::debug!(
            "Built SVG scene with {} drawables",
            ctx.layer.drawables().len()
        );
        Ok(())
    }
}

/// Render a layer to an SVG string in one call.
pub fn render_svg(layer: &RenderLayer, viewport_size: kurbo::Size) -> RenderResult<String> {
    let mut renderer = SvgRenderer::new();
    renderer.build_scene(&RenderContext::new(layer, viewport_size))?;
    Ok(renderer.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use sketchnote_core::config::EditorConfig;
    use sketchnote_core::session::Session;
    use sketchnote_core::shapes::{
        CircleProps, Paint, RectangleProps, ShapeProperties, ShapeType, create_shape,
    };

    fn session_with_shapes() -> Session {
        let config = EditorConfig::default();
        let mut session = Session::new();

        let mut rect = create_shape(ShapeType::Rectangle, 10.0, 20.0, &config);
        rect.set_properties(ShapeProperties::Rectangle(RectangleProps::new(30.0, 40.0)))
            .unwrap();
        rect.style.fill = Some(Paint::color("#ff0000"));
        session.add_shape(rect);

        let mut circle = create_shape(ShapeType::Circle, 50.0, 50.0, &config);
        circle
            .set_properties(ShapeProperties::Circle(CircleProps::new(5.0)))
            .unwrap();
        session.add_shape(circle);
        session
    }

    #[test]
    fn test_paint_format() {
        assert_eq!(paint(None), "none");
        assert_eq!(paint(Some(Color::from_rgba8(255, 0, 16, 255))), "#ff0010");
        assert_eq!(
            paint(Some(Color::from_rgba8(0, 0, 0, 0))),
            "rgba(0,0,0,0.000)"
        );
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_render_shapes_in_order() {
        let session = session_with_shapes();
        let layer = RenderLayer::from_session(&session);
        let svg = render_svg(&layer, Size::new(200.0, 100.0)).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r##"x="10" y="20" width="30" height="40" fill="#ff0000""##));
        assert!(svg.contains(r#"cx="50" cy="50" r="5" fill="none""#));
        let rect_at = svg.find("<rect data-id").unwrap();
        let circle_at = svg.find("<circle").unwrap();
        assert!(rect_at < circle_at);
        assert!(!svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_selection_outline() {
        let mut session = session_with_shapes();
        let id = session.shapes()[0].id.clone();
        session.select_shape(Some(id));
        let layer = RenderLayer::from_session(&session);
        let svg = render_svg(&layer, Size::new(200.0, 100.0)).unwrap();
        assert!(svg.contains(
            r##"<rect x="6" y="16" width="38" height="48" fill="none" stroke="#3b82f6" stroke-width="1" stroke-dasharray="4 2"/>"##
        ));
    }

    #[test]
    fn test_text_hidden_while_editing() {
        let config = EditorConfig::default();
        let mut session = Session::new();
        let mut text = create_shape(ShapeType::Text, 0.0, 0.0, &config);
        text.set_text("a<b");
        let id = text.id.clone();
        session.add_shape(text);
        let layer = RenderLayer::from_session(&session);

        let svg = render_svg(&layer, Size::new(100.0, 100.0)).unwrap();
        assert!(svg.contains(">a&lt;b</text>"));

        session.show_text_overlay(id, Point::ZERO);
        let mut renderer = SvgRenderer::new();
        renderer
            .build_scene(&RenderContext::for_session(
                &layer,
                &session,
                Size::new(100.0, 100.0),
            ))
            .unwrap();
        assert!(!renderer.output().contains("<text"));
        assert!(renderer.output().contains("<g data-id"));
    }

    #[test]
    fn test_invalid_viewport() {
        let layer = RenderLayer::new();
        assert!(matches!(
            render_svg(&layer, Size::new(0.0, 10.0)),
            Err(RendererError::InvalidViewport(_))
        ));
    }
}
