//! Change detection between the live shapes and the last saved snapshot.

use crate::shapes::{Shape, ShapeId};
use std::collections::{HashMap, HashSet};

/// Id-keyed differences between two shape collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeDiff {
    /// Shapes whose id is not in the snapshot, in collection order.
    pub added: Vec<Shape>,
    /// Shapes present in both whose content differs, in collection order.
    pub updated: Vec<Shape>,
    /// Snapshot ids missing from the collection, in snapshot order.
    pub deleted: Vec<ShapeId>,
}

impl ShapeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Compute what must be sent to bring `saved` up to `current`.
pub fn compute_diff(current: &[Shape], saved: &[Shape]) -> ShapeDiff {
    let saved_by_id: HashMap<&ShapeId, &Shape> = saved.iter().map(|s| (&s.id, s)).collect();
    let current_ids: HashSet<&ShapeId> = current.iter().map(|s| &s.id).collect();

    let mut diff = ShapeDiff::default();
    for shape in current {
        match saved_by_id.get(&shape.id) {
            None => diff.added.push(shape.clone()),
            Some(saved) if !shape.same_content(saved) => diff.updated.push(shape.clone()),
            Some(_) => {}
        }
    }
    diff.deleted = saved
        .iter()
        .filter(|s| !current_ids.contains(&s.id))
        .map(|s| s.id.clone())
        .collect();
    diff
}

/// Positional comparison: the collections are unchanged only if they have
/// the same length and each pair at the same index has the same content.
/// A pure reorder of distinct shapes therefore counts as a change.
pub fn has_unsaved_changes(current: &[Shape], saved: &[Shape]) -> bool {
    current.len() != saved.len()
        || current
            .iter()
            .zip(saved)
            .any(|(a, b)| !a.same_content(b))
}
