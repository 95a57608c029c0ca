//! Editing session state for the open project.
//!
//! The session is the single writer of the live shape collection and its
//! saved baseline. The gesture machine, the save path and the render layer
//! all go through its methods (or [`SessionAction`]) to change anything.

use crate::config::EditorConfig;
use crate::diff::{ShapeDiff, compute_diff, has_unsaved_changes};
use crate::error::ShapeError;
use crate::input::Key;
use crate::shapes::{Paint, Shape, ShapeId, ShapeProperties};
use crate::tools::ToolKind;
use kurbo::Point;
use serde_json::Value;

/// State of the inline text editor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextOverlay {
    pub visible: bool,
    /// Canvas position of the editor.
    pub position: Point,
    /// The text shape being edited.
    pub shape_id: Option<ShapeId>,
}

/// A mutation request, for callers that hand changes back instead of holding
/// the session mutably (the render layer's interaction callbacks).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    AddShape(Shape),
    UpdateShape(Shape),
    DeleteShape(ShapeId),
    SelectShape(Option<ShapeId>),
    SetActiveTool(Option<ToolKind>),
    ShowTextOverlay { shape_id: ShapeId, position: Point },
    CloseTextOverlay,
    InitializeSavedShapes(Vec<Shape>),
    MarkClean,
    Reorder { from: usize, to: usize },
    ClearAll,
}

/// In-memory editing state: live shapes, the saved baseline, selection,
/// active tool and the text overlay.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) config: EditorConfig,
    pub(crate) shapes: Vec<Shape>,
    pub(crate) saved_shapes: Vec<Shape>,
    pub(crate) dirty: bool,
    pub(crate) selected: Option<ShapeId>,
    active_tool: Option<ToolKind>,
    pub(crate) text_overlay: TextOverlay,
    /// Bumped when the collection is replaced wholesale (project load or
    /// clear). Save tickets from an older generation are discarded.
    pub(crate) generation: u64,
    /// Bumped on every content mutation of `shapes`.
    pub(crate) revision: u64,
    pub(crate) save_in_flight: bool,
    pub(crate) error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            config,
            shapes: Vec::new(),
            saved_shapes: Vec::new(),
            dirty: false,
            selected: None,
            active_tool: None,
            text_overlay: TextOverlay::default(),
            generation: 0,
            revision: 0,
            save_in_flight: false,
            error: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn saved_shapes(&self) -> &[Shape] {
        &self.saved_shapes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| &s.id == id)
    }

    pub fn selected_shape_id(&self) -> Option<&ShapeId> {
        self.selected.as_ref()
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selected.as_ref().and_then(|id| self.shape(id))
    }

    pub fn active_tool(&self) -> Option<ToolKind> {
        self.active_tool
    }

    pub fn text_overlay(&self) -> &TextOverlay {
        &self.text_overlay
    }

    /// The error banner, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.error = Some(message);
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight
    }

    /// Changes not yet saved, keyed by id.
    pub fn diff(&self) -> ShapeDiff {
        compute_diff(&self.shapes, &self.saved_shapes)
    }

    pub(crate) fn recompute_dirty(&mut self) {
        self.dirty = has_unsaved_changes(&self.shapes, &self.saved_shapes);
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.recompute_dirty();
    }

    fn index_of(&self, id: &ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| &s.id == id)
    }

    /// Append a shape. Returns false if its id is already present.
    pub fn add_shape(&mut self, shape: Shape) -> bool {
        if self.index_of(&shape.id).is_some() {
            log::warn!("Ignoring shape with duplicate id {}", shape.id);
            return false;
        }
        log::debug!("Adding {} {}", shape.shape_type(), shape.id);
        self.shapes.push(shape);
        self.touch();
        true
    }

    /// Replace the shape with the same id. Returns false if the id is unknown
    /// or the replacement has a different variant.
    pub fn update_shape(&mut self, shape: Shape) -> bool {
        let Some(index) = self.index_of(&shape.id) else {
            log::debug!("Update for unknown shape {}", shape.id);
            return false;
        };
        let existing = &self.shapes[index];
        if existing.shape_type() != shape.shape_type() {
            log::warn!(
                "Refusing to change shape {} from {} to {}",
                shape.id,
                existing.shape_type(),
                shape.shape_type()
            );
            return false;
        }
        self.shapes[index] = shape;
        self.touch();
        true
    }

    /// Remove a shape by id, dropping the selection and the text overlay if
    /// they pointed at it.
    pub fn delete_shape(&mut self, id: &ShapeId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.shapes.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.text_overlay.shape_id.as_ref() == Some(id) {
            self.close_text_overlay();
        }
        log::debug!("Deleted shape {}", id);
        self.touch();
        true
    }

    pub fn select_shape(&mut self, id: Option<ShapeId>) {
        self.selected = id;
    }

    pub fn set_active_tool(&mut self, tool: Option<ToolKind>) {
        self.active_tool = tool;
    }

    /// Seed both the live shapes and the baseline with a freshly loaded
    /// collection.
    pub fn initialize_saved_shapes(&mut self, shapes: Vec<Shape>) {
        log::info!("Initializing session with {} shapes", shapes.len());
        self.saved_shapes = shapes.clone();
        self.shapes = shapes;
        if self.selected.as_ref().is_some_and(|id| self.index_of(id).is_none()) {
            self.selected = None;
        }
        let overlay_target = self.text_overlay.shape_id.as_ref();
        if overlay_target.is_some_and(|id| self.index_of(id).is_none()) {
            self.close_text_overlay();
        }
        self.generation += 1;
        self.revision += 1;
        self.save_in_flight = false;
        self.dirty = false;
    }

    /// Accept the live shapes as saved.
    pub fn mark_clean(&mut self) {
        self.saved_shapes = self.shapes.clone();
        self.dirty = false;
    }

    /// Move the shape at `from` to `to`. Out-of-range indices leave the
    /// collection untouched and return false.
    pub fn reorder_shapes(&mut self, from: usize, to: usize) -> bool {
        let len = self.shapes.len();
        if from >= len || to >= len {
            log::debug!("Reorder {} -> {} out of bounds for {} shapes", from, to, len);
            return false;
        }
        if from == to {
            return true;
        }
        let shape = self.shapes.remove(from);
        self.shapes.insert(to, shape);
        self.touch();
        true
    }

    /// Drop everything: shapes, baseline, selection and text overlay.
    pub fn clear_all(&mut self) {
        log::info!("Clearing session");
        self.shapes.clear();
        self.saved_shapes.clear();
        self.selected = None;
        self.close_text_overlay();
        self.generation += 1;
        self.revision += 1;
        self.save_in_flight = false;
        self.dirty = false;
    }

    pub fn show_text_overlay(&mut self, shape_id: ShapeId, position: Point) {
        self.text_overlay = TextOverlay {
            visible: true,
            position,
            shape_id: Some(shape_id),
        };
    }

    pub fn close_text_overlay(&mut self) {
        self.text_overlay = TextOverlay {
            visible: false,
            position: self.text_overlay.position,
            shape_id: None,
        };
    }

    /// Replace the text of the shape the overlay is editing.
    pub fn edit_text(&mut self, text: &str) -> bool {
        let Some(id) = self.text_overlay.shape_id.clone() else {
            return false;
        };
        self.modify(&id, |shape| shape.set_text(text))
    }

    fn modify(&mut self, id: &ShapeId, f: impl FnOnce(&mut Shape) -> bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut shape = self.shapes[index].clone();
        if !f(&mut shape) || shape == self.shapes[index] {
            return false;
        }
        self.shapes[index] = shape;
        self.touch();
        true
    }

    /// Set the fill from the properties panel. A picker's fully transparent
    /// hex is stored as the `transparent` sentinel.
    pub fn set_fill(&mut self, id: &ShapeId, fill: Paint) -> bool {
        let fill = Paint::from_picker(fill);
        self.modify(id, |shape| {
            shape.style.fill = Some(fill);
            true
        })
    }

    pub fn set_stroke(&mut self, id: &ShapeId, stroke: Paint) -> bool {
        self.modify(id, |shape| {
            shape.style.stroke = Some(stroke);
            true
        })
    }

    pub fn set_stroke_width(&mut self, id: &ShapeId, width: f64) -> bool {
        self.modify(id, |shape| {
            shape.style.stroke_width = Some(width);
            true
        })
    }

    /// Set a single properties key (e.g. `width`, `radius`, `fontSize`).
    /// Values the variant cannot hold are rejected with an error and leave
    /// the shape untouched.
    pub fn set_property(
        &mut self,
        id: &ShapeId,
        key: &str,
        value: Value,
    ) -> Result<bool, ShapeError> {
        let Some(shape) = self.shape(id) else {
            return Ok(false);
        };
        let mut map = shape.properties().to_map()?;
        map.insert(key.to_string(), value);
        let properties = ShapeProperties::from_map(shape.shape_type(), map)?;
        Ok(self.modify(id, |shape| shape.set_properties(properties).is_ok()))
    }

    /// Topmost shape under a canvas point.
    pub fn shape_at(&self, point: Point) -> Option<&Shape> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.hit_test(point, self.config.hit_tolerance))
    }

    /// Keyboard shortcuts. Delete and Backspace remove the selected shape;
    /// Escape closes the text overlay. Keys are ignored while the text
    /// overlay is open so typing does not delete shapes.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if self.text_overlay.visible {
            if key == Key::Escape {
                self.close_text_overlay();
                return true;
            }
            return false;
        }
        match key {
            Key::Delete | Key::Backspace => {
                let Some(id) = self.selected.take() else {
                    return false;
                };
                self.delete_shape(&id)
            }
            Key::Escape => {
                let had_selection = self.selected.is_some();
                self.selected = None;
                had_selection
            }
        }
    }

    /// Apply a mutation request. Returns whether the session changed.
    pub fn apply(&mut self, action: SessionAction) -> bool {
        match action {
            SessionAction::AddShape(shape) => self.add_shape(shape),
            SessionAction::UpdateShape(shape) => self.update_shape(shape),
            SessionAction::DeleteShape(id) => self.delete_shape(&id),
            SessionAction::SelectShape(id) => {
                let changed = self.selected != id;
                self.select_shape(id);
                changed
            }
            SessionAction::SetActiveTool(tool) => {
                let changed = self.active_tool != tool;
                self.set_active_tool(tool);
                changed
            }
            SessionAction::ShowTextOverlay { shape_id, position } => {
                self.show_text_overlay(shape_id, position);
                true
            }
            SessionAction::CloseTextOverlay => {
                let was_visible = self.text_overlay.visible;
                self.close_text_overlay();
                was_visible
            }
            SessionAction::InitializeSavedShapes(shapes) => {
                self.initialize_saved_shapes(shapes);
                true
            }
            SessionAction::MarkClean => {
                self.mark_clean();
                true
            }
            SessionAction::Reorder { from, to } => self.reorder_shapes(from, to),
            SessionAction::ClearAll => {
                self.clear_all();
                true
            }
        }
    }
}
