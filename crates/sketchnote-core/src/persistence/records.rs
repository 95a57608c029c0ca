//! Wire records exchanged with the persistence collaborator.

use super::{BatchSubset, PersistenceError, PersistenceResult};
use crate::error::ShapeError;
use crate::shapes::{Shape, ShapeId, ShapeProperties, ShapeStyle, ShapeType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-side project id.
pub type ProjectId = i64;

/// A shape as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: i64,
    pub shape_type: ShapeType,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl ShapeRecord {
    /// Convert into a session shape; the integer id becomes its string form.
    pub fn into_shape(self) -> Result<Shape, ShapeError> {
        let properties = ShapeProperties::from_map(self.shape_type, self.properties)?;
        let mut shape = Shape::new(
            ShapeId::from_server(self.id),
            self.x,
            self.y,
            properties,
            self.style,
        );
        shape.order = self.order;
        Ok(shape)
    }
}

impl TryFrom<ShapeRecord> for Shape {
    type Error = ShapeError;

    fn try_from(record: ShapeRecord) -> Result<Self, Self::Error> {
        record.into_shape()
    }
}

/// Convert a list of records, failing on the first malformed one.
pub(crate) fn records_into_shapes(records: Vec<ShapeRecord>) -> PersistenceResult<Vec<Shape>> {
    records
        .into_iter()
        .map(|r| {
            let id = r.id;
            r.into_shape()
                .map_err(|e| PersistenceError::Malformed(format!("shape {}: {}", id, e)))
        })
        .collect()
}

/// A newly drawn shape. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeInput {
    pub shape_type: ShapeType,
    pub x: f64,
    pub y: f64,
    pub properties: ShapeProperties,
    pub style: ShapeStyle,
}

impl From<&Shape> for ShapeInput {
    fn from(shape: &Shape) -> Self {
        Self {
            shape_type: shape.shape_type(),
            x: shape.x,
            y: shape.y,
            properties: shape.properties().clone(),
            style: shape.style.clone(),
        }
    }
}

/// An edited shape, addressed by its server id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeUpdate {
    pub id: i64,
    pub shape_type: ShapeType,
    pub x: f64,
    pub y: f64,
    pub properties: ShapeProperties,
    pub style: ShapeStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TryFrom<&Shape> for ShapeUpdate {
    type Error = ShapeError;

    fn try_from(shape: &Shape) -> Result<Self, Self::Error> {
        Ok(Self {
            id: shape.id.to_server_id()?,
            shape_type: shape.shape_type(),
            x: shape.x,
            y: shape.y,
            properties: shape.properties().clone(),
            style: shape.style.clone(),
            order: shape.order,
        })
    }
}

/// A batch save request for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeBatch {
    pub project_id: ProjectId,
    pub added: Vec<ShapeInput>,
    pub updated: Vec<ShapeUpdate>,
    pub deleted: Vec<i64>,
}

impl ShapeBatch {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Per-subset results of a batch save. `None` means the subset was empty and
/// nothing was sent for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    pub added: Option<PersistenceResult<Vec<ShapeRecord>>>,
    pub updated: Option<PersistenceResult<Vec<ShapeRecord>>>,
    pub deleted: Option<PersistenceResult<Vec<i64>>>,
}

impl BatchOutcome {
    /// Subsets whose sub-request failed.
    pub fn failed_subsets(&self) -> Vec<BatchSubset> {
        let mut failed = Vec::new();
        if matches!(self.added, Some(Err(_))) {
            failed.push(BatchSubset::Added);
        }
        if matches!(self.updated, Some(Err(_))) {
            failed.push(BatchSubset::Updated);
        }
        if matches!(self.deleted, Some(Err(_))) {
            failed.push(BatchSubset::Deleted);
        }
        failed
    }

    /// Number of subsets that were sent.
    pub fn sent_subsets(&self) -> usize {
        [
            self.added.is_some(),
            self.updated.is_some(),
            self.deleted.is_some(),
        ]
        .iter()
        .filter(|sent| **sent)
        .count()
    }

    /// The first error reported by any subset.
    pub fn first_error(&self) -> Option<&PersistenceError> {
        [
            self.added.as_ref().and_then(|r| r.as_ref().err()),
            self.updated.as_ref().and_then(|r| r.as_ref().err()),
            self.deleted.as_ref().and_then(|r| r.as_ref().err()),
        ]
        .into_iter()
        .flatten()
        .next()
    }
}

/// A project as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Fields sent when creating or updating a project. Unset fields are left out
/// of the request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl ProjectInput {
    /// Input for a new private project.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
            is_public: Some(false),
        }
    }

    /// Input that only renames.
    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::shapes::{Paint, create_shape};
    use serde_json::json;

    #[test]
    fn test_record_into_shape() {
        let record: ShapeRecord = serde_json::from_value(json!({
            "id": 101,
            "shape_type": "line",
            "x": 3.0,
            "y": 4.0,
            "properties": {"points": [0.0, 0.0, 10.0, 10.0]},
            "style": {"stroke": "red", "strokeWidth": 2.5},
            "order": 2,
            "created_at": "2024-01-01T00:00:00Z",
            "created_by_id": 5,
            "project_id": 9
        }))
        .unwrap();
        let shape = record.into_shape().unwrap();
        assert_eq!(shape.id.as_str(), "101");
        assert_eq!(shape.order, Some(2));
        assert_eq!(shape.style.stroke, Some(Paint::color("red")));
        assert_eq!(shape.style.stroke_width, Some(2.5));
    }

    #[test]
    fn test_malformed_properties_reported() {
        let record: ShapeRecord = serde_json::from_value(json!({
            "id": 1,
            "shape_type": "circle",
            "x": 0.0,
            "y": 0.0,
            "properties": {"radius": "big"}
        }))
        .unwrap();
        let err = records_into_shapes(vec![record]).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn test_input_omits_id() {
        let shape = create_shape(ShapeType::Rectangle, 1.0, 2.0, &EditorConfig::default());
        let json = serde_json::to_value(ShapeInput::from(&shape)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["shape_type"], "rectangle");
        assert_eq!(json["properties"], json!({"width": 0.0, "height": 0.0}));
        assert_eq!(json["style"]["fill"], "transparent");
    }

    #[test]
    fn test_update_requires_server_id() {
        let mut shape = create_shape(ShapeType::Circle, 0.0, 0.0, &EditorConfig::default());
        assert!(ShapeUpdate::try_from(&shape).is_err());
        shape.id = ShapeId::from_server(7);
        assert_eq!(ShapeUpdate::try_from(&shape).unwrap().id, 7);
    }

    #[test]
    fn test_outcome_failed_subsets() {
        let outcome = BatchOutcome {
            added: Some(Ok(Vec::new())),
            updated: Some(Err(PersistenceError::Network("down".into()))),
            deleted: None,
        };
        assert_eq!(outcome.failed_subsets(), vec![BatchSubset::Updated]);
        assert_eq!(outcome.sent_subsets(), 2);
        assert_eq!(
            outcome.first_error(),
            Some(&PersistenceError::Network("down".into()))
        );
    }

    #[test]
    fn test_project_input_new_is_private() {
        let json = serde_json::to_value(ProjectInput::new("Sketches")).unwrap();
        assert_eq!(json, json!({"title": "Sketches", "is_public": false}));
    }
}
