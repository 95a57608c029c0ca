//! Pointer gestures: turns down/move/up sequences into shape creation,
//! live resizing and selection.

use crate::input::PointerEvent;
use crate::session::Session;
use crate::shapes::{ShapeId, create_shape, update_shape_geometry};
use kurbo::Point;

/// State of the gesture machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// The most recently created shape follows the pointer.
    Drawing,
}

/// Interprets pointer events against a session.
#[derive(Debug, Clone, Default)]
pub struct GestureMachine {
    state: GestureState,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        self.state == GestureState::Drawing
    }

    /// Dispatch a pointer event.
    pub fn handle(&mut self, session: &mut Session, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, target } => self.pointer_down(session, position, target),
            PointerEvent::Move { position } => self.pointer_move(session, position),
            PointerEvent::Up { .. } => self.pointer_up(session),
            PointerEvent::DoubleClick { target, .. } => self.double_click(session, target),
        }
    }

    /// Pointer pressed. A hit on a shape selects it; otherwise the selection
    /// is cleared and, if a drawing tool is active, a new shape starts here.
    pub fn pointer_down(&mut self, session: &mut Session, position: Point, target: Option<ShapeId>) {
        if let Some(id) = target {
            log::debug!("Selecting shape {}", id);
            session.select_shape(Some(id));
            session.close_text_overlay();
            return;
        }

        session.close_text_overlay();
        session.select_shape(None);

        let Some(shape_type) = session.active_tool().and_then(|tool| tool.shape_type()) else {
            return;
        };

        let shape = create_shape(shape_type, position.x, position.y, session.config());
        let id = shape.id.clone();
        let is_text = shape.is_text();
        if !session.add_shape(shape) {
            return;
        }
        if is_text {
            session.show_text_overlay(id, position);
        }
        log::debug!("Started drawing {} at {:?}", shape_type, position);
        self.state = GestureState::Drawing;
    }

    /// Pointer moved. While drawing, the most recent shape follows it.
    pub fn pointer_move(&mut self, session: &mut Session, position: Point) {
        if !self.is_drawing() || session.active_tool().and_then(|t| t.shape_type()).is_none() {
            return;
        }
        let Some(last) = session.shapes().last() else {
            return;
        };
        let updated = update_shape_geometry(last, position.x, position.y);
        session.update_shape(updated);
    }

    /// Pointer released. Ends drawing and selects the shape just drawn; a
    /// text shape gets the text overlay at its origin.
    pub fn pointer_up(&mut self, session: &mut Session) {
        let was_drawing = self.is_drawing();
        self.state = GestureState::Idle;
        if !was_drawing {
            return;
        }

        let Some(last) = session.shapes().last() else {
            return;
        };
        let id = last.id.clone();
        let text_origin = last.is_text().then(|| last.origin());
        session.select_shape(Some(id.clone()));
        if let Some(origin) = text_origin {
            session.show_text_overlay(id, origin);
        }
    }

    /// Double click. Opens the text overlay on a text shape, whatever the
    /// drawing state.
    pub fn double_click(&mut self, session: &mut Session, target: Option<ShapeId>) {
        let Some(shape) = target.as_ref().and_then(|id| session.shape(id)) else {
            return;
        };
        if !shape.is_text() {
            return;
        }
        let (id, origin) = (shape.id.clone(), shape.origin());
        session.show_text_overlay(id, origin);
    }

    /// Abandon the current gesture without touching the session.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
