//! Bulk import results and batch history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row-level import failure. Rows are numbered from 1 at the first row after the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    pub row: usize,
    pub custom_id: String,
    pub error: String,
}

impl ImportRowError {
    pub fn new(row: usize, custom_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            row,
            custom_id: custom_id.into(),
            error: error.into(),
        }
    }
}

/// Persisted summary of one bulk import call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub file_name: Option<String>,
    /// Hex SHA-256 of the uploaded bytes
    pub file_sha256: String,
    pub rows_total: usize,
    pub rows_skipped: usize,
    pub created_count: usize,
    pub errors: Vec<ImportRowError>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}
