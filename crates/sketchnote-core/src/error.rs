//! Error types for the shape model and the editing session.

use crate::persistence::{BatchSubset, PersistenceError};
use thiserror::Error;

/// Errors raised by the shape model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("Unsupported shape type: {0}")]
    UnsupportedShapeType(String),
    #[error("Shape type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("Invalid {shape_type} properties: {message}")]
    InvalidProperties { shape_type: String, message: String },
    #[error("Shape id {0} has not been assigned by the server")]
    InvalidServerId(String),
}

/// Errors raised by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("A save is already in progress")]
    SaveInProgress,
    #[error("Save response arrived for a session that is no longer active")]
    StaleSave,
    #[error("Save partially failed: {}", describe_subsets(.failed))]
    PartialSave { failed: Vec<BatchSubset> },
    #[error("No project is open")]
    NoProject,
}

fn describe_subsets(subsets: &[BatchSubset]) -> String {
    subsets
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
