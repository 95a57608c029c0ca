//! Persistence collaborators: the shape store and the project store.
//!
//! Backends speak the server's wire records (integer ids). The session
//! converts between those and [`Shape`](crate::shapes::Shape).

mod memory;
mod records;

pub use memory::{CallCounts, MemoryBackend};
pub(crate) use records::records_into_shapes;
pub use records::{
    BatchOutcome, Project, ProjectId, ProjectInput, ShapeBatch, ShapeInput, ShapeRecord,
    ShapeUpdate,
};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    Other(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// `Send + Sync` on native targets, nothing on WASM where everything runs on
/// one thread.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// One of the three sub-requests of a batch save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchSubset {
    Added,
    Updated,
    Deleted,
}

impl fmt::Display for BatchSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchSubset::Added => "added",
            BatchSubset::Updated => "updated",
            BatchSubset::Deleted => "deleted",
        })
    }
}

/// Shape storage for a project.
pub trait ShapeBackend: MaybeSendSync {
    /// Load every shape of a project.
    fn load_shapes(&self, project_id: ProjectId) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>>;

    /// Create shapes; the server assigns ids and order.
    fn create_shapes(
        &self,
        project_id: ProjectId,
        shapes: Vec<ShapeInput>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>>;

    /// Update existing shapes by id.
    fn update_shapes(
        &self,
        project_id: ProjectId,
        shapes: Vec<ShapeUpdate>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>>;

    /// Delete shapes by id, returning the acknowledged ids.
    fn delete_shapes(
        &self,
        project_id: ProjectId,
        ids: Vec<i64>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<i64>>>;

    /// Submit a batch. Only non-empty subsets are sent, and each subset's
    /// result is reported on its own so one failure does not hide another
    /// subset's success.
    fn save_batch(&self, batch: ShapeBatch) -> BoxFuture<'_, BatchOutcome> {
        Box::pin(async move {
            let ShapeBatch {
                project_id,
                added,
                updated,
                deleted,
            } = batch;

            let added = if added.is_empty() {
                None
            } else {
                Some(self.create_shapes(project_id, added).await)
            };
            let updated = if updated.is_empty() {
                None
            } else {
                Some(self.update_shapes(project_id, updated).await)
            };
            let deleted = if deleted.is_empty() {
                None
            } else {
                Some(self.delete_shapes(project_id, deleted).await)
            };

            BatchOutcome {
                added,
                updated,
                deleted,
            }
        })
    }
}

/// Project storage.
pub trait ProjectBackend: MaybeSendSync {
    fn list_projects(&self) -> BoxFuture<'_, PersistenceResult<Vec<Project>>>;

    fn create_project(&self, input: ProjectInput) -> BoxFuture<'_, PersistenceResult<Project>>;

    fn update_project(
        &self,
        id: ProjectId,
        input: ProjectInput,
    ) -> BoxFuture<'_, PersistenceResult<Project>>;

    fn delete_project(&self, id: ProjectId) -> BoxFuture<'_, PersistenceResult<()>>;
}
