//! Sketchnote Render Library
//!
//! Projects a session's shapes into drawable primitives and renders them.
//! The bundled backend writes SVG.

pub mod projection;
mod renderer;
mod svg;

pub use projection::{
    Drawable, Primitive, PrimitiveTransform, RenderLayer, ResolvedStyle, project_shape, read_back,
};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use svg::{SvgRenderer, render_svg};
