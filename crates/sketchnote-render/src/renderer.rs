//! Renderer trait abstraction.

use crate::projection::RenderLayer;
use kurbo::Size;
use peniko::Color;
use sketchnote_core::session::Session;
use sketchnote_core::shapes::ShapeId;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
}

impl From<std::fmt::Error> for RendererError {
    fn from(e: std::fmt::Error) -> Self {
        RendererError::RenderFailed(e.to_string())
    }
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The projected drawables.
    pub layer: &'a RenderLayer,
    /// Viewport size in pixels.
    pub viewport_size: Size,
    pub background_color: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Text shape under the text overlay. Its text is not drawn.
    pub editing_shape_id: Option<ShapeId>,
}

impl<'a> RenderContext<'a> {
    pub fn new(layer: &'a RenderLayer, viewport_size: Size) -> Self {
        Self {
            layer,
            viewport_size,
            background_color: Color::from_rgba8(255, 255, 255, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            editing_shape_id: None,
        }
    }

    /// Context for a session: the overlay target becomes the editing shape.
    pub fn for_session(layer: &'a RenderLayer, session: &Session, viewport_size: Size) -> Self {
        let overlay = session.text_overlay();
        let editing = overlay
            .visible
            .then(|| overlay.shape_id.clone())
            .flatten();
        Self::new(layer, viewport_size).with_editing_shape(editing)
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the shape being edited (its text is skipped in build_scene).
    pub fn with_editing_shape(mut self, shape_id: Option<ShapeId>) -> Self {
        self.editing_shape_id = shape_id;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the output for a frame from the context's drawables, in
    /// collection order.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
