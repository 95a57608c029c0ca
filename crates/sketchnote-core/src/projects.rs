//! The user's project list and which project is open.

use crate::persistence::{Project, ProjectId};

/// Project list plus the current project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectList {
    projects: Vec<Project>,
    current: Option<ProjectId>,
}

impl ProjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn current_id(&self) -> Option<ProjectId> {
        self.current
    }

    pub fn current(&self) -> Option<&Project> {
        self.current.and_then(|id| self.get(id))
    }

    /// Make a listed project current. Unknown ids are ignored.
    pub fn set_current(&mut self, id: ProjectId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Point the current project back at `id` after a failed switch. An id
    /// that is no longer listed is ignored.
    pub(crate) fn restore_current(&mut self, id: Option<ProjectId>) {
        match id {
            Some(id) => {
                self.set_current(id);
            }
            None => self.current = None,
        }
    }

    /// Replace the list after fetching. The first project becomes current if
    /// none is.
    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        if self.current.is_some_and(|id| self.get(id).is_none()) {
            self.current = None;
        }
        if self.current.is_none() {
            self.current = self.projects.first().map(|p| p.id);
        }
    }

    /// Add a newly created project and make it current.
    pub fn insert_created(&mut self, project: Project) {
        self.current = Some(project.id);
        self.projects.push(project);
    }

    /// Replace a project by id after an update.
    pub fn replace_updated(&mut self, project: Project) -> bool {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => {
                *existing = project;
                true
            }
            None => false,
        }
    }

    /// Drop a deleted project. If it was current, the first remaining project
    /// becomes current. Returns the new current id when it changed.
    pub fn remove_deleted(&mut self, id: ProjectId) -> Option<Option<ProjectId>> {
        self.projects.retain(|p| p.id != id);
        if self.current != Some(id) {
            return None;
        }
        self.current = self.projects.first().map(|p| p.id);
        Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: ProjectId, title: &str) -> Project {
        Project {
            id,
            title: title.to_string(),
            description: None,
            is_public: false,
            owner_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_fetch_selects_first() {
        let mut list = ProjectList::new();
        list.set_projects(vec![project(4, "a"), project(7, "b")]);
        assert_eq!(list.current_id(), Some(4));

        list.set_current(7);
        list.set_projects(vec![project(4, "a"), project(7, "b")]);
        assert_eq!(list.current_id(), Some(7));

        list.set_projects(vec![project(4, "a")]);
        assert_eq!(list.current_id(), Some(4));
    }

    #[test]
    fn test_create_becomes_current() {
        let mut list = ProjectList::new();
        list.set_projects(vec![project(1, "a")]);
        list.insert_created(project(2, "b"));
        assert_eq!(list.current().map(|p| p.title.as_str()), Some("b"));
        assert_eq!(list.projects().len(), 2);
    }

    #[test]
    fn test_update_replaces_by_id() {
        let mut list = ProjectList::new();
        list.set_projects(vec![project(1, "a")]);
        assert!(list.replace_updated(project(1, "renamed")));
        assert_eq!(list.projects()[0].title, "renamed");
        assert!(!list.replace_updated(project(9, "ghost")));
    }

    #[test]
    fn test_restore_current() {
        let mut list = ProjectList::new();
        list.set_projects(vec![project(1, "a"), project(2, "b")]);
        list.set_current(2);
        list.restore_current(Some(1));
        assert_eq!(list.current_id(), Some(1));
        list.restore_current(Some(9));
        assert_eq!(list.current_id(), Some(1));
        list.restore_current(None);
        assert_eq!(list.current_id(), None);
    }

    #[test]
    fn test_delete_current_falls_back_to_first() {
        let mut list = ProjectList::new();
        list.set_projects(vec![project(1, "a"), project(2, "b"), project(3, "c")]);
        list.set_current(2);

        assert_eq!(list.remove_deleted(3), None);
        assert_eq!(list.current_id(), Some(2));

        assert_eq!(list.remove_deleted(2), Some(Some(1)));
        assert_eq!(list.remove_deleted(1), Some(None));
        assert!(list.is_empty());
        assert!(!list.set_current(1));
    }
}
