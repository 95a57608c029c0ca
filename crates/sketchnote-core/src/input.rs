//! Pointer and keyboard events delivered by the canvas shell.

use crate::shapes::ShapeId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pointer event in canvas coordinates. `target` is the shape under the
/// pointer, if the shell's hit testing found one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        target: Option<ShapeId>,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
    },
    DoubleClick {
        position: Point,
        target: Option<ShapeId>,
    },
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
}
