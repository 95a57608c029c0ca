//! Batch save: turning the session's pending changes into a request and
//! merging the server's answer back into the session.
//!
//! A save is split in two so the shell can keep editing while the request is
//! in flight: [`Session::begin_save`] snapshots the session and produces a
//! [`SaveTicket`], and [`Session::finish_save`] merges the per-subset
//! [`BatchOutcome`]. [`Session::save_shapes`] runs both around a backend call.

use crate::error::{SessionError, SessionResult};
use crate::persistence::{
    BatchOutcome, BatchSubset, PersistenceError, PersistenceResult, ProjectId, ShapeBackend,
    ShapeBatch, ShapeInput, ShapeRecord, ShapeUpdate, records_into_shapes,
};
use crate::session::Session;
use crate::shapes::{Shape, ShapeId};
use std::collections::{HashMap, HashSet};

/// An in-flight save.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    generation: u64,
    revision: u64,
    project_id: ProjectId,
    /// Live shapes when the save started.
    snapshot: Vec<Shape>,
    /// Saved shapes when the save started.
    baseline: Vec<Shape>,
    /// Ids sent as new shapes, in request order.
    added: Vec<ShapeId>,
    updated: Vec<ShapeId>,
    deleted: Vec<ShapeId>,
    batch: ShapeBatch,
}

impl SaveTicket {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// The request to hand to the backend.
    pub fn batch(&self) -> &ShapeBatch {
        &self.batch
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveReport {
    /// Nothing differed from the saved shapes; no request was made.
    Unchanged,
    Saved {
        added: usize,
        updated: usize,
        deleted: usize,
    },
}

/// Committed shapes of a subset: `Some` if the subset succeeded (or was not
/// sent), `None` if it failed. A response whose records do not convert counts
/// as a failure of that subset.
fn committed_shapes(
    result: Option<PersistenceResult<Vec<ShapeRecord>>>,
    subset: BatchSubset,
    failed: &mut Vec<BatchSubset>,
    first_error: &mut Option<PersistenceError>,
) -> Option<Vec<Shape>> {
    match result {
        None => Some(Vec::new()),
        Some(Err(_)) => None,
        Some(Ok(records)) => match records_into_shapes(records) {
            Ok(shapes) => Some(shapes),
            Err(e) => {
                log::warn!("Unreadable {} response: {}", subset, e);
                failed.push(subset);
                first_error.get_or_insert(e);
                None
            }
        },
    }
}

impl Session {
    /// Start a save of the pending changes for `project_id`.
    ///
    /// Returns `Ok(None)` when there is nothing to send; the session is then
    /// marked clean (a pure reorder has nothing to persist). Fails with
    /// [`SessionError::SaveInProgress`] while another save is pending.
    pub fn begin_save(&mut self, project_id: ProjectId) -> SessionResult<Option<SaveTicket>> {
        if self.save_in_flight {
            return Err(SessionError::SaveInProgress);
        }

        let diff = self.diff();
        if diff.is_empty() {
            self.mark_clean();
            return Ok(None);
        }

        let mut added = Vec::new();
        let mut inputs = Vec::new();
        let mut updated = Vec::new();
        let mut updates = Vec::new();

        for shape in &diff.added {
            added.push(shape.id.clone());
            inputs.push(ShapeInput::from(shape));
        }
        for shape in &diff.updated {
            match ShapeUpdate::try_from(shape) {
                Ok(update) => {
                    updated.push(shape.id.clone());
                    updates.push(update);
                }
                // Accepted locally without ever reaching the server.
                Err(_) => {
                    added.push(shape.id.clone());
                    inputs.push(ShapeInput::from(shape));
                }
            }
        }
        let deleted_server_ids = diff.deleted.iter().filter_map(ShapeId::server_id).collect();

        let ticket = SaveTicket {
            generation: self.generation,
            revision: self.revision,
            project_id,
            snapshot: self.shapes.clone(),
            baseline: self.saved_shapes.clone(),
            added,
            updated,
            deleted: diff.deleted,
            batch: ShapeBatch {
                project_id,
                added: inputs,
                updated: updates,
                deleted: deleted_server_ids,
            },
        };

        log::info!(
            "Saving project {}: {} added, {} updated, {} deleted",
            project_id,
            ticket.added.len(),
            ticket.updated.len(),
            ticket.deleted.len()
        );
        self.save_in_flight = true;
        Ok(Some(ticket))
    }

    /// Drop an in-flight save whose request was never sent.
    pub fn cancel_save(&mut self, ticket: SaveTicket) {
        if ticket.generation == self.generation {
            self.save_in_flight = false;
        }
    }

    /// Merge the outcome of a save.
    ///
    /// Each subset that succeeded is committed to the saved shapes; failed
    /// subsets keep their previous baseline so the session stays dirty and
    /// the change can be retried. Edits made while the request was in flight
    /// are kept and rebased onto the server's ids.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        outcome: BatchOutcome,
    ) -> SessionResult<SaveReport> {
        if ticket.generation != self.generation {
            log::warn!(
                "Discarding save response for project {} from an earlier session",
                ticket.project_id
            );
            return Err(SessionError::StaleSave);
        }
        self.save_in_flight = false;

        let sent = outcome.sent_subsets();
        let mut failed = outcome.failed_subsets();
        let mut first_error = outcome.first_error().cloned();
        let deleted_ok = !failed.contains(&BatchSubset::Deleted);
        let created = committed_shapes(
            outcome.added,
            BatchSubset::Added,
            &mut failed,
            &mut first_error,
        );
        let server_updated = committed_shapes(
            outcome.updated,
            BatchSubset::Updated,
            &mut failed,
            &mut first_error,
        );

        if sent > 0 && failed.len() == sent {
            let err = first_error
                .unwrap_or_else(|| PersistenceError::Other("save failed".to_string()));
            self.set_error(format!("Failed to save shapes: {}", err));
            return Err(err.into());
        }

        // Local id of each sent shape -> the server's version of it.
        let mut replacements: HashMap<ShapeId, Shape> = HashMap::new();
        if let Some(created) = &created {
            if created.len() != ticket.added.len() {
                log::warn!(
                    "Server returned {} shapes for {} created",
                    created.len(),
                    ticket.added.len()
                );
            }
            for (local, server) in ticket.added.iter().zip(created) {
                replacements.insert(local.clone(), server.clone());
            }
        }
        if let Some(updated) = &server_updated {
            for server in updated {
                replacements.insert(server.id.clone(), server.clone());
            }
        }

        let merged = merge_baseline(
            &ticket,
            created.as_deref(),
            server_updated.as_deref(),
            deleted_ok,
        );

        let edited_in_flight = self.revision != ticket.revision;
        let live = if !edited_in_flight && failed.is_empty() {
            merged.clone()
        } else {
            rebase(&self.shapes, &ticket.snapshot, &replacements)
        };

        let remap = |id: &mut Option<ShapeId>| {
            if let Some(server) = id.as_ref().and_then(|id| replacements.get(id)) {
                *id = Some(server.id.clone());
            }
        };
        remap(&mut self.selected);
        remap(&mut self.text_overlay.shape_id);

        self.saved_shapes = merged;
        self.shapes = live;
        self.revision += 1;
        self.recompute_dirty();

        if !failed.is_empty() {
            let err = SessionError::PartialSave { failed };
            let message = match &first_error {
                Some(cause) => format!("{} ({})", err, cause),
                None => err.to_string(),
            };
            self.set_error(message);
            return Err(err);
        }

        self.error = None;
        let report = SaveReport::Saved {
            added: created.map(|c| c.len()).unwrap_or(0),
            updated: server_updated.map(|u| u.len()).unwrap_or(0),
            deleted: ticket.deleted.len(),
        };
        log::info!("Saved project {}: {:?}", ticket.project_id, report);
        Ok(report)
    }

    /// Diff, send and merge in one go.
    pub async fn save_shapes<B: ShapeBackend + ?Sized>(
        &mut self,
        backend: &B,
        project_id: ProjectId,
    ) -> SessionResult<SaveReport> {
        let Some(ticket) = self.begin_save(project_id)? else {
            log::debug!("No changes to save for project {}", project_id);
            return Ok(SaveReport::Unchanged);
        };
        // Deletes of shapes the server never saw are committed locally.
        let outcome = if ticket.batch.is_empty() {
            BatchOutcome::default()
        } else {
            backend.save_batch(ticket.batch.clone()).await
        };
        self.finish_save(ticket, outcome)
    }
}

/// The new saved collection: the snapshot minus added and deleted shapes,
/// with committed updates taking the server's version and failed updates
/// keeping the old saved version, failed deletes restored, committed
/// creations appended, all sorted by `order`.
fn merge_baseline(
    ticket: &SaveTicket,
    created: Option<&[Shape]>,
    server_updated: Option<&[Shape]>,
    deletes_committed: bool,
) -> Vec<Shape> {
    let added: HashSet<&ShapeId> = ticket.added.iter().collect();
    let updated: HashSet<&ShapeId> = ticket.updated.iter().collect();
    let deleted: HashSet<&ShapeId> = ticket.deleted.iter().collect();
    let old: HashMap<&ShapeId, &Shape> = ticket.baseline.iter().map(|s| (&s.id, s)).collect();
    let echoed: HashMap<&ShapeId, &Shape> = server_updated
        .unwrap_or_default()
        .iter()
        .map(|s| (&s.id, s))
        .collect();

    let mut merged: Vec<Shape> = Vec::with_capacity(ticket.snapshot.len());
    for shape in &ticket.snapshot {
        if added.contains(&shape.id) {
            continue;
        }
        if !updated.contains(&shape.id) {
            merged.push(shape.clone());
            continue;
        }
        let version = if server_updated.is_some() {
            echoed.get(&shape.id).copied().unwrap_or(shape)
        } else {
            match old.get(&shape.id) {
                Some(previous) => *previous,
                None => continue,
            }
        };
        merged.push(version.clone());
    }

    if !deletes_committed {
        merged.extend(
            ticket
                .baseline
                .iter()
                .filter(|s| deleted.contains(&s.id) && !s.id.is_local())
                .cloned(),
        );
    }
    if let Some(created) = created {
        merged.extend(created.iter().cloned());
    }

    // Stable, so equal orders keep arrival order.
    merged.sort_by_key(|s| s.order.unwrap_or(0));
    merged
}

/// Carry the live collection over to the server's ids. Shapes untouched
/// since the save started take the server's version; shapes edited in the
/// meantime keep their content and adopt the server's id and order.
fn rebase(
    live: &[Shape],
    snapshot: &[Shape],
    replacements: &HashMap<ShapeId, Shape>,
) -> Vec<Shape> {
    let sent: HashMap<&ShapeId, &Shape> = snapshot.iter().map(|s| (&s.id, s)).collect();
    live.iter()
        .map(|shape| {
            let Some(server) = replacements.get(&shape.id) else {
                return shape.clone();
            };
            let unchanged = sent
                .get(&shape.id)
                .is_some_and(|before| before.same_content(shape));
            if unchanged {
                server.clone()
            } else {
                let mut rebased = shape.clone();
                rebased.id = server.id.clone();
                rebased.order = server.order;
                rebased
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::persistence::MemoryBackend;
    use crate::shapes::{ShapeStyle, ShapeType, create_shape};
    use serde_json::json;

    fn record(id: i64, x: f64, order: i64) -> ShapeRecord {
        let style = create_shape(ShapeType::Rectangle, 0.0, 0.0, &EditorConfig::default()).style;
        ShapeRecord {
            id,
            shape_type: ShapeType::Rectangle,
            x,
            y: 0.0,
            properties: json!({"width": 10.0, "height": 10.0})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            style,
            order: Some(order),
            created_at: None,
            updated_at: None,
            created_by_id: None,
            project_id: Some(1),
        }
    }

    fn local_rect(x: f64) -> Shape {
        create_shape(ShapeType::Rectangle, x, 0.0, &EditorConfig::default())
    }

    /// Backend with project 1 holding shapes 1 and 2, and a session loaded
    /// from it.
    fn seeded() -> (MemoryBackend, Session) {
        let backend = MemoryBackend::new();
        backend.seed_shapes(1, vec![record(1, 0.0, 1), record(2, 20.0, 2)]);
        let records = pollster::block_on(backend.load_shapes(1)).unwrap();
        let mut session = Session::new();
        session.initialize_saved_shapes(records_into_shapes(records).unwrap());
        (backend, session)
    }

    fn ids(shapes: &[Shape]) -> Vec<&str> {
        shapes.iter().map(|s| s.id.as_str()).collect()
    }

    fn moved(session: &Session, id: i64, x: f64) -> Shape {
        let mut shape = session.shape(&ShapeId::from_server(id)).unwrap().clone();
        shape.x = x;
        shape
    }

    #[test]
    fn test_merge_server_response() {
        let (_, mut session) = seeded();
        let updated = moved(&session, 1, 5.0);
        session.update_shape(updated);
        session.delete_shape(&ShapeId::from_server(2));
        session.add_shape(local_rect(40.0));

        let ticket = session.begin_save(1).unwrap().unwrap();
        assert_eq!(ticket.batch().added.len(), 1);
        assert_eq!(ticket.batch().updated[0].id, 1);
        assert_eq!(ticket.batch().deleted, vec![2]);

        let outcome = BatchOutcome {
            added: Some(Ok(vec![record(101, 40.0, 3)])),
            updated: Some(Ok(vec![record(1, 5.0, 1)])),
            deleted: Some(Ok(vec![2])),
        };
        let report = session.finish_save(ticket, outcome).unwrap();
        assert_eq!(
            report,
            SaveReport::Saved {
                added: 1,
                updated: 1,
                deleted: 1
            }
        );
        assert_eq!(ids(session.shapes()), vec!["1", "101"]);
        assert_eq!(session.shapes(), session.saved_shapes());
        assert!(!session.is_dirty());
        assert!(!session.is_saving());
    }

    #[test]
    fn test_merge_sorts_by_order() {
        let (_, mut session) = seeded();
        session.add_shape(local_rect(40.0));
        let ticket = session.begin_save(1).unwrap().unwrap();
        // A server that slots the new shape first.
        let outcome = BatchOutcome {
            added: Some(Ok(vec![record(7, 40.0, 0)])),
            ..BatchOutcome::default()
        };
        session.finish_save(ticket, outcome).unwrap();
        assert_eq!(ids(session.saved_shapes()), vec!["7", "1", "2"]);
    }

    #[test]
    fn test_save_twice_sends_once() {
        let (backend, mut session) = seeded();
        session.add_shape(local_rect(40.0));

        let first = pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        assert!(matches!(first, SaveReport::Saved { added: 1, .. }));
        let second = pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        assert_eq!(second, SaveReport::Unchanged);

        assert_eq!(backend.calls().writes(), 1);
        assert_eq!(ids(session.shapes()), vec!["1", "2", "3"]);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_pure_reorder_save_marks_clean_without_request() {
        let (backend, mut session) = seeded();
        session.reorder_shapes(0, 1);
        assert!(session.is_dirty());

        let report = pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        assert_eq!(report, SaveReport::Unchanged);
        assert!(!session.is_dirty());
        assert_eq!(backend.calls().writes(), 0);
    }

    #[test]
    fn test_concurrent_save_rejected() {
        let (_, mut session) = seeded();
        session.add_shape(local_rect(40.0));
        let ticket = session.begin_save(1).unwrap().unwrap();
        assert!(session.is_saving());
        assert!(matches!(session.begin_save(1), Err(SessionError::SaveInProgress)));

        session.cancel_save(ticket);
        assert!(!session.is_saving());
        assert!(session.begin_save(1).unwrap().is_some());
    }

    #[test]
    fn test_stale_response_discarded() {
        let (backend, mut session) = seeded();
        session.add_shape(local_rect(40.0));
        let ticket = session.begin_save(1).unwrap().unwrap();
        let outcome = pollster::block_on(backend.save_batch(ticket.batch().clone()));

        // Another project was opened meanwhile.
        session.initialize_saved_shapes(vec![local_rect(0.0)]);
        let before = session.shapes().to_vec();
        assert!(matches!(
            session.finish_save(ticket, outcome),
            Err(SessionError::StaleSave)
        ));
        assert_eq!(session.shapes(), before.as_slice());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_total_failure_keeps_state() {
        let (backend, mut session) = seeded();
        backend.fail_subset(BatchSubset::Added);
        session.add_shape(local_rect(40.0));
        let before = session.shapes().to_vec();

        let result = pollster::block_on(session.save_shapes(&backend, 1));
        assert!(matches!(result, Err(SessionError::Persistence(_))));
        assert_eq!(session.shapes(), before.as_slice());
        assert_eq!(session.saved_shapes().len(), 2);
        assert!(session.is_dirty());
        assert!(!session.is_saving());
        assert!(session.error().is_some());

        // Retry once the server recovers.
        backend.clear_failures();
        pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        assert!(!session.is_dirty());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_partial_failure_commits_successful_subsets() {
        let (backend, mut session) = seeded();
        backend.fail_subset(BatchSubset::Updated);
        let updated = moved(&session, 1, 50.0);
        session.update_shape(updated);
        session.add_shape(local_rect(40.0));

        let result = pollster::block_on(session.save_shapes(&backend, 1));
        match result {
            Err(SessionError::PartialSave { failed }) => {
                assert_eq!(failed, vec![BatchSubset::Updated])
            }
            other => panic!("unexpected result {:?}", other),
        }

        // The created shape is committed under its server id.
        assert_eq!(ids(session.saved_shapes()), vec!["1", "2", "3"]);
        assert_eq!(ids(session.shapes()), vec!["1", "2", "3"]);
        // The failed update is still pending.
        assert!(session.is_dirty());
        let diff = session.diff();
        assert!(diff.added.is_empty());
        assert_eq!(diff.updated.len(), 1);
        assert!((diff.updated[0].x - 50.0).abs() < f64::EPSILON);
        assert!(session.error().is_some());
    }

    #[test]
    fn test_unreadable_created_records_count_as_failed() {
        let (_backend, mut session) = seeded();
        let updated = moved(&session, 1, 50.0);
        session.update_shape(updated);
        session.add_shape(local_rect(40.0));

        let ticket = session.begin_save(1).unwrap().unwrap();
        let mut garbled = record(3, 40.0, 3);
        garbled.properties = json!({"width": "wide"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let outcome = BatchOutcome {
            added: Some(Ok(vec![garbled])),
            updated: Some(Ok(vec![record(1, 50.0, 1)])),
            deleted: None,
        };

        match session.finish_save(ticket, outcome) {
            Err(SessionError::PartialSave { failed }) => {
                assert_eq!(failed, vec![BatchSubset::Added])
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(ids(session.saved_shapes()), vec!["1", "2"]);
        let diff = session.diff();
        assert_eq!(diff.added.len(), 1);
        assert!(diff.updated.is_empty());
        assert!(
            session
                .error()
                .is_some_and(|e| e.starts_with("Save partially failed: added"))
        );
    }

    #[test]
    fn test_failed_delete_stays_pending() {
        let (backend, mut session) = seeded();
        backend.fail_subset(BatchSubset::Deleted);
        let updated = moved(&session, 1, 50.0);
        session.update_shape(updated);
        session.delete_shape(&ShapeId::from_server(2));

        let result = pollster::block_on(session.save_shapes(&backend, 1));
        assert!(matches!(result, Err(SessionError::PartialSave { .. })));
        assert_eq!(ids(session.saved_shapes()), vec!["1", "2"]);
        assert_eq!(session.diff().deleted, vec![ShapeId::from_server(2)]);
        assert!(session.diff().updated.is_empty());
    }

    #[test]
    fn test_edits_during_save_are_rebased() {
        let backend = MemoryBackend::new();
        let mut session = Session::new();
        session.initialize_saved_shapes(Vec::new());

        let a = local_rect(0.0);
        let a_id = a.id.clone();
        session.add_shape(a);
        session.select_shape(Some(a_id.clone()));
        let ticket = session.begin_save(1).unwrap().unwrap();

        // Keep editing while the request is out.
        let mut edited = session.shape(&a_id).unwrap().clone();
        edited.x = 99.0;
        session.update_shape(edited);
        let b = local_rect(10.0);
        let b_id = b.id.clone();
        session.add_shape(b);

        let outcome = pollster::block_on(backend.save_batch(ticket.batch().clone()));
        session.finish_save(ticket, outcome).unwrap();

        let server_id = ShapeId::from_server(1);
        assert_eq!(ids(session.saved_shapes()), vec!["1"]);
        assert!(session.saved_shapes()[0].x.abs() < f64::EPSILON);
        assert_eq!(session.shapes()[0].id, server_id);
        assert!((session.shapes()[0].x - 99.0).abs() < f64::EPSILON);
        assert_eq!(session.shapes()[1].id, b_id);
        assert_eq!(session.selected_shape_id(), Some(&server_id));

        let diff = session.diff();
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.added.len(), 1);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_local_shape_marked_clean_is_sent_as_new() {
        let backend = MemoryBackend::new();
        let mut session = Session::new();
        session.add_shape(local_rect(0.0));
        session.mark_clean();
        let mut shape = session.shapes()[0].clone();
        shape.style = ShapeStyle::default();
        session.update_shape(shape);

        pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        let calls = backend.calls();
        assert_eq!((calls.create, calls.update), (1, 0));
        assert_eq!(ids(session.shapes()), vec!["1"]);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_deleting_unsaved_local_shape_sends_nothing() {
        let backend = MemoryBackend::new();
        let mut session = Session::new();
        let shape = local_rect(0.0);
        let id = shape.id.clone();
        session.add_shape(shape);
        session.mark_clean();
        session.delete_shape(&id);

        let report = pollster::block_on(session.save_shapes(&backend, 1)).unwrap();
        assert_eq!(
            report,
            SaveReport::Saved {
                added: 0,
                updated: 0,
                deleted: 1
            }
        );
        assert_eq!(backend.calls().writes(), 0);
        assert!(session.saved_shapes().is_empty());
        assert!(!session.is_dirty());
    }
}
