//! Action log entries for projects, documents and annotations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

text_enum!(ActionType {
    Create => "CREATE",
    Update => "UPDATE",
    Delete => "DELETE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Project,
    Document,
    Annotation,
}

text_enum!(EntityType {
    Project => "PROJECT",
    Document => "DOCUMENT",
    Annotation => "ANNOTATION",
});

impl EntityType {
    /// Parse a URL path segment (`project`, `documents`, `ANNOTATION`, ...)
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().trim_end_matches('s') {
            "project" => Some(EntityType::Project),
            "document" => Some(EntityType::Document),
            "annotation" => Some(EntityType::Annotation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub id: Uuid,
    pub action: ActionType,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}
