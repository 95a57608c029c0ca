//! Sketchnote Core Library
//!
//! Shape-editing session engine for the Sketchnote drawing tool: the shape
//! model, the draw gesture state machine, the session store with dirty
//! tracking, and the batch save that reconciles local edits with the server.

pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod input;
pub mod persistence;
pub mod projects;
pub mod reconcile;
pub mod session;
pub mod shapes;
pub mod tools;

pub use config::EditorConfig;
pub use diff::{ShapeDiff, compute_diff, has_unsaved_changes};
pub use editor::Editor;
pub use error::{SessionError, SessionResult, ShapeError};
pub use input::{Key, PointerEvent};
pub use persistence::{MemoryBackend, PersistenceError, ProjectBackend, ShapeBackend};
pub use projects::ProjectList;
pub use reconcile::{SaveReport, SaveTicket};
pub use session::{Session, SessionAction, TextOverlay};
pub use shapes::{Paint, Shape, ShapeId, ShapeType, create_shape, update_shape_geometry};
pub use tools::{GestureMachine, GestureState, ToolKind};
