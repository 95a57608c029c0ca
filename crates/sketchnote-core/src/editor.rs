//! Editor: ties the session, the project list and the backend together.

use crate::config::EditorConfig;
use crate::error::{SessionError, SessionResult};
use crate::input::{Key, PointerEvent};
use crate::persistence::{
    PersistenceError, ProjectBackend, ProjectId, ProjectInput, ShapeBackend, records_into_shapes,
};
use crate::projects::ProjectList;
use crate::reconcile::SaveReport;
use crate::session::Session;
use crate::tools::GestureMachine;
use std::sync::Arc;

/// Editor state for one signed-in user.
pub struct Editor<B> {
    backend: Arc<B>,
    session: Session,
    projects: ProjectList,
    gestures: GestureMachine,
    /// Project whose shapes the session holds.
    loaded: Option<ProjectId>,
    /// Project-level error banner.
    error: Option<String>,
}

impl<B: ShapeBackend + ProjectBackend> Editor<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, EditorConfig::default())
    }

    pub fn with_config(backend: Arc<B>, config: EditorConfig) -> Self {
        Self {
            backend,
            session: Session::with_config(config),
            projects: ProjectList::new(),
            gestures: GestureMachine::new(),
            loaded: None,
            error: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn projects(&self) -> &ProjectList {
        &self.projects
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn gestures(&self) -> &GestureMachine {
        &self.gestures
    }

    /// Project whose shapes are loaded into the session.
    pub fn loaded_project(&self) -> Option<ProjectId> {
        self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn project_error(&mut self, action: &str, err: PersistenceError) -> SessionError {
        let message = format!("Failed to {}: {}", action, err);
        log::warn!("{}", message);
        self.error = Some(message);
        err.into()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        self.gestures.handle(&mut self.session, event);
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        self.session.handle_key(key)
    }

    /// Fetch the project list. If that changes the current project, its
    /// shapes are loaded.
    pub async fn refresh_projects(&mut self) -> SessionResult<()> {
        let projects = match self.backend.list_projects().await {
            Ok(projects) => projects,
            Err(e) => return Err(self.project_error("fetch projects", e)),
        };
        log::info!("Fetched {} projects", projects.len());
        self.projects.set_projects(projects);

        match self.projects.current_id() {
            Some(id) if self.loaded != Some(id) => self.open_project(id).await,
            Some(_) => Ok(()),
            None => {
                self.session.clear_all();
                self.loaded = None;
                Ok(())
            }
        }
    }

    /// Make a project current and load its shapes into the session.
    ///
    /// If loading fails the session keeps its shapes and the project they
    /// were loaded from becomes current again, so a later save still goes to
    /// that project.
    pub async fn open_project(&mut self, id: ProjectId) -> SessionResult<()> {
        let previous = self.projects.current_id();
        if !self.projects.set_current(id) {
            return Err(SessionError::NoProject);
        }
        self.gestures.cancel();

        let loaded = self
            .backend
            .load_shapes(id)
            .await
            .and_then(records_into_shapes);
        match loaded {
            Ok(shapes) => {
                self.session.initialize_saved_shapes(shapes);
                self.session.close_text_overlay();
                self.session.select_shape(None);
                self.session.dismiss_error();
                self.loaded = Some(id);
                log::info!("Opened project {}", id);
                Ok(())
            }
            Err(e) => {
                let restore = match self.loaded {
                    Some(loaded) if self.projects.get(loaded).is_some() => Some(loaded),
                    _ => previous,
                };
                self.projects.restore_current(restore);
                log::warn!("Failed to load shapes of project {}: {}", id, e);
                self.session.set_error(format!("Failed to load shapes: {}", e));
                Err(e.into())
            }
        }
    }

    /// Create a project and open it.
    pub async fn create_project(&mut self, input: ProjectInput) -> SessionResult<ProjectId> {
        let project = match self.backend.create_project(input).await {
            Ok(project) => project,
            Err(e) => return Err(self.project_error("create project", e)),
        };
        let id = project.id;
        log::info!("Created project {} ({})", id, project.title);
        self.projects.insert_created(project);
        self.open_project(id).await?;
        Ok(id)
    }

    pub async fn update_project(&mut self, id: ProjectId, input: ProjectInput) -> SessionResult<()> {
        match self.backend.update_project(id, input).await {
            Ok(project) => {
                self.projects.replace_updated(project);
                Ok(())
            }
            Err(e) => Err(self.project_error("update project", e)),
        }
    }

    pub async fn rename_project(&mut self, id: ProjectId, title: &str) -> SessionResult<()> {
        self.update_project(id, ProjectInput::rename(title)).await
    }

    /// Delete a project. The session is cleared when no project remains;
    /// otherwise the newly current project is opened.
    pub async fn delete_project(&mut self, id: ProjectId) -> SessionResult<()> {
        if let Err(e) = self.backend.delete_project(id).await {
            return Err(self.project_error("delete project", e));
        }
        log::info!("Deleted project {}", id);

        let new_current = self.projects.remove_deleted(id);
        if self.loaded == Some(id) {
            self.loaded = None;
        }
        if self.projects.is_empty() {
            self.session.clear_all();
            self.loaded = None;
            return Ok(());
        }
        match new_current {
            Some(Some(next)) => self.open_project(next).await,
            _ => Ok(()),
        }
    }

    /// Save the session's changes to the current project.
    pub async fn save(&mut self) -> SessionResult<SaveReport> {
        let Some(id) = self.loaded else {
            return Err(SessionError::NoProject);
        };
        self.session.save_shapes(self.backend.as_ref(), id).await
    }
}
