//! Projects and the source documents they contain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: Uuid,
    pub reviewers: Vec<Uuid>,
    pub contact_email: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the acting user when omitted
    #[serde(default)]
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub reviewers: Vec<Uuid>,
    pub contact_email: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub reviewers: Option<Vec<Uuid>>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Publication state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
}

text_enum!(DocumentStatus {
    Draft => "draft",
    Published => "published",
});

/// Source document. The text itself lives in external storage; only paths are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub language: String,
    pub notes: Option<String>,
    pub storage_path_pdf: Option<String>,
    pub storage_path_txt: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub language: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub storage_path_pdf: Option<String>,
    #[serde(default)]
    pub storage_path_txt: Option<String>,
    #[serde(default)]
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub storage_path_pdf: Option<String>,
    #[serde(default)]
    pub storage_path_txt: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}
