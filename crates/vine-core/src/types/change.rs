//! Change records decoded from the feed.

use serde::Serialize;
use serde_json::{Map, Value};

use super::Position;

/// One change announced by the feed.
///
/// The feed uses the CouchDB continuous changes format: `seq` carries the
/// position and `id` the subject (package) name. Every other field is kept as
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub position: Position,
    pub subject_id: String,
    pub metadata: Map<String, Value>,
}

impl ChangeRecord {
    /// Create a record without metadata
    pub fn new(position: Position, subject_id: impl Into<String>) -> Self {
        Self {
            position,
            subject_id: subject_id.into(),
            metadata: Map::new(),
        }
    }

    /// Build a record from a decoded feed line.
    ///
    /// Returns `None` when the position or subject id is absent or invalid.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let position = fields.get("seq").and_then(Position::from_json)?;
        let subject_id = match fields.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => return None,
        };
        fields.remove("seq");

        Some(Self {
            position,
            subject_id,
            metadata: fields,
        })
    }

    /// Whether the feed flagged this subject as deleted
    pub fn is_deleted(&self) -> bool {
        self.metadata
            .get("deleted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
