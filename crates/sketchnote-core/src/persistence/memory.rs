//! In-memory backend.

use super::{
    BatchSubset, BoxFuture, PersistenceError, PersistenceResult, Project, ProjectBackend,
    ProjectId, ProjectInput, ShapeBackend, ShapeInput, ShapeRecord, ShapeUpdate,
};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Number of calls each backend operation has received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub load: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl CallCounts {
    /// Shape write requests of any kind.
    pub fn writes(&self) -> usize {
        self.create + self.update + self.delete
    }
}

#[derive(Default)]
struct MemoryState {
    projects: Vec<Project>,
    shapes: HashMap<ProjectId, Vec<ShapeRecord>>,
    last_project_id: ProjectId,
    last_shape_id: i64,
    failures: HashSet<BatchSubset>,
    fail_loads: bool,
    calls: CallCounts,
}

impl MemoryState {
    fn next_shape_id(&mut self) -> i64 {
        self.last_shape_id += 1;
        self.last_shape_id
    }

    fn next_project_id(&mut self) -> ProjectId {
        self.last_project_id += 1;
        self.last_project_id
    }

    fn check_failure(&self, subset: BatchSubset) -> PersistenceResult<()> {
        if self.failures.contains(&subset) {
            return Err(PersistenceError::Status {
                status: 500,
                message: format!("{} request rejected", subset),
            });
        }
        Ok(())
    }
}

/// In-memory shape and project store for testing and offline use.
///
/// Mirrors the server's behavior: created shapes get fresh integer ids and an
/// `order` after every existing shape, updates keep the stored order, and
/// deleting a project drops its shapes. Individual batch subsets can be made
/// to fail.
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

fn lock_error(e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Other(format!("Lock error: {}", e))
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request for `subset` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_subset(&self, subset: BatchSubset) {
        if let Ok(mut state) = self.state.write() {
            state.failures.insert(subset);
        }
    }

    /// Make shape loads fail or succeed.
    pub fn fail_loads(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_loads = fail;
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.write() {
            state.failures.clear();
            state.fail_loads = false;
        }
    }

    /// Insert a project directly, returning its id.
    pub fn insert_project(&self, title: &str) -> ProjectId {
        match self.state.write() {
            Ok(mut state) => {
                let id = state.next_project_id();
                state.projects.push(Project {
                    id,
                    title: title.to_string(),
                    description: None,
                    is_public: false,
                    owner_id: Some(1),
                    created_at: None,
                    updated_at: None,
                });
                id
            }
            Err(_) => 0,
        }
    }

    /// Store records as-is. Later created shapes get ids above the highest
    /// seeded id.
    pub fn seed_shapes(&self, project_id: ProjectId, records: Vec<ShapeRecord>) {
        if let Ok(mut state) = self.state.write() {
            let max_id = records.iter().map(|r| r.id).max().unwrap_or(0);
            state.last_shape_id = state.last_shape_id.max(max_id);
            state.shapes.entry(project_id).or_default().extend(records);
        }
    }

    /// Stored shapes of a project, in order.
    pub fn shapes(&self, project_id: ProjectId) -> Vec<ShapeRecord> {
        self.state
            .read()
            .map(|state| sorted(state.shapes.get(&project_id).cloned().unwrap_or_default()))
            .unwrap_or_default()
    }

    pub fn calls(&self) -> CallCounts {
        self.state
            .read()
            .map(|state| state.calls)
            .unwrap_or_default()
    }
}

fn sorted(mut records: Vec<ShapeRecord>) -> Vec<ShapeRecord> {
    records.sort_by_key(|r| r.order.unwrap_or(0));
    records
}

impl ShapeBackend for MemoryBackend {
    fn load_shapes(&self, project_id: ProjectId) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            state.calls.load += 1;
            if state.fail_loads {
                return Err(PersistenceError::Network("connection refused".to_string()));
            }
            Ok(sorted(state.shapes.get(&project_id).cloned().unwrap_or_default()))
        })
    }

    fn create_shapes(
        &self,
        project_id: ProjectId,
        shapes: Vec<ShapeInput>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            state.calls.create += 1;
            state.check_failure(BatchSubset::Added)?;

            let mut order = state
                .shapes
                .get(&project_id)
                .and_then(|records| records.iter().filter_map(|r| r.order).max())
                .unwrap_or(0);

            let mut created = Vec::with_capacity(shapes.len());
            for input in shapes {
                let properties = input
                    .properties
                    .to_map()
                    .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
                order += 1;
                created.push(ShapeRecord {
                    id: state.next_shape_id(),
                    shape_type: input.shape_type,
                    x: input.x,
                    y: input.y,
                    properties,
                    style: input.style,
                    order: Some(order),
                    created_at: None,
                    updated_at: None,
                    created_by_id: Some(1),
                    project_id: Some(project_id),
                });
            }
            state
                .shapes
                .entry(project_id)
                .or_default()
                .extend(created.iter().cloned());
            log::debug!("Created {} shapes in project {}", created.len(), project_id);
            Ok(created)
        })
    }

    fn update_shapes(
        &self,
        project_id: ProjectId,
        shapes: Vec<ShapeUpdate>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<ShapeRecord>>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            state.calls.update += 1;
            state.check_failure(BatchSubset::Updated)?;

            let records = state.shapes.entry(project_id).or_default();
            // Validate everything first so a bad id leaves the store untouched.
            let mut targets = Vec::with_capacity(shapes.len());
            for update in &shapes {
                let index = records
                    .iter()
                    .position(|r| r.id == update.id)
                    .ok_or_else(|| PersistenceError::NotFound(format!("shape {}", update.id)))?;
                let properties = update
                    .properties
                    .to_map()
                    .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
                targets.push((index, properties));
            }

            let mut updated = Vec::with_capacity(shapes.len());
            for (update, (index, properties)) in shapes.into_iter().zip(targets) {
                let record = &mut records[index];
                record.shape_type = update.shape_type;
                record.x = update.x;
                record.y = update.y;
                record.properties = properties;
                record.style = update.style;
                updated.push(record.clone());
            }
            Ok(updated)
        })
    }

    fn delete_shapes(
        &self,
        project_id: ProjectId,
        ids: Vec<i64>,
    ) -> BoxFuture<'_, PersistenceResult<Vec<i64>>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            state.calls.delete += 1;
            state.check_failure(BatchSubset::Deleted)?;

            if let Some(records) = state.shapes.get_mut(&project_id) {
                records.retain(|r| !ids.contains(&r.id));
            }
            Ok(ids)
        })
    }
}

impl ProjectBackend for MemoryBackend {
    fn list_projects(&self) -> BoxFuture<'_, PersistenceResult<Vec<Project>>> {
        Box::pin(async move {
            let state = self.state.read().map_err(lock_error)?;
            Ok(state.projects.clone())
        })
    }

    fn create_project(&self, input: ProjectInput) -> BoxFuture<'_, PersistenceResult<Project>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            let project = Project {
                id: state.next_project_id(),
                title: input.title.unwrap_or_default(),
                description: input.description,
                is_public: input.is_public.unwrap_or(false),
                owner_id: Some(1),
                created_at: None,
                updated_at: None,
            };
            state.projects.push(project.clone());
            Ok(project)
        })
    }

    fn update_project(
        &self,
        id: ProjectId,
        input: ProjectInput,
    ) -> BoxFuture<'_, PersistenceResult<Project>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            let project = state
                .projects
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| PersistenceError::NotFound(format!("project {}", id)))?;
            if let Some(title) = input.title {
                project.title = title;
            }
            if input.description.is_some() {
                project.description = input.description;
            }
            if let Some(is_public) = input.is_public {
                project.is_public = is_public;
            }
            Ok(project.clone())
        })
    }

    fn delete_project(&self, id: ProjectId) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            let mut state = self.state.write().map_err(lock_error)?;
            let before = state.projects.len();
            state.projects.retain(|p| p.id != id);
            if state.projects.len() == before {
                return Err(PersistenceError::NotFound(format!("project {}", id)));
            }
            state.shapes.remove(&id);
            Ok(())
        })
    }
}
