//! Spreadsheet import of annotations into one document
//!
//! Structural problems (unreadable file, missing required columns, unknown
//! document) reject the whole call before any row is touched. After that,
//! rows are processed strictly in order and each one either produces a record
//! or a row error; a failing row never aborts the batch.

use annot_common::models::annotation::{
    split_list, FALLBACK_LEMMA, FALLBACK_PAGE, FALLBACK_TRIGGER_WORD, FALLBACK_UNDEFINED,
};
use annot_common::models::{
    ActionType, AnnotationRecord, AnnotationStatus, DomainType, EntityType, FunctionType,
    ImportBatch, ImportRowError, NewAnnotation, NoveltyType, User,
};
use annot_common::time::now;
use annot_common::{Error, Result};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::lookup_registry::{find_or_create_domain, find_or_create_pos};
use super::sheet::{parse_sheet, SheetRow};
use crate::db;

/// Normalized headers every import file must carry
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "customid",
    "expression",
    "conceptualmetaphor",
    "sourcedomain",
    "targetdomain",
];

/// Result of one import call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub batch_id: Uuid,
    pub created: Vec<AnnotationRecord>,
    pub errors: Vec<ImportRowError>,
    /// Rows ignored because expression or a domain was empty
    pub skipped: usize,
}

/// Import the first sheet of `file_bytes` into `document_id` as `user`
pub async fn bulk_import(
    pool: &SqlitePool,
    file_bytes: &[u8],
    file_name: Option<&str>,
    document_id: Uuid,
    user: &User,
) -> Result<ImportOutcome> {
    let started_at = now();

    db::documents::get_document(pool, document_id).await?;

    let sheet = parse_sheet(file_bytes)?;

    let missing = sheet.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        warn!(document_id = %document_id, ?missing, "Import rejected: missing required columns");
        return Err(Error::Import(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let batch_id = Uuid::new_v4();
    let mut created = Vec::new();
    let mut errors = Vec::new();
    let mut skipped = 0usize;

    for (row_number, row) in sheet.records() {
        if is_skippable(&row) {
            skipped += 1;
            continue;
        }

        let custom_id = cell(&row, "customid").to_string();
        match import_row(pool, &row, document_id, user.id).await {
            Ok(record) => {
                debug!(row = row_number, custom_id = %record.custom_id, "Imported row");
                let details = json!({ "source": "bulk_import", "batchId": batch_id, "row": row_number });
                if let Err(e) = db::action_logs::record_action(
                    pool,
                    ActionType::Create,
                    EntityType::Annotation,
                    record.id,
                    user,
                    Some(details),
                )
                .await
                {
                    warn!(row = row_number, error = %e, "Failed to record import action");
                }
                created.push(record);
            }
            Err(message) => {
                debug!(row = row_number, custom_id = %custom_id, error = %message, "Row rejected");
                errors.push(ImportRowError::new(row_number, custom_id, message));
            }
        }
    }

    let batch = ImportBatch {
        id: batch_id,
        document_id,
        user_id: user.id,
        file_name: file_name.map(str::to_string),
        file_sha256: sha256_hex(file_bytes),
        rows_total: sheet.rows.len(),
        rows_skipped: skipped,
        created_count: created.len(),
        errors: errors.clone(),
        started_at,
        ended_at: now(),
    };
    db::import_batches::save_batch(pool, &batch).await?;

    info!(
        document_id = %document_id,
        batch_id = %batch_id,
        rows = batch.rows_total,
        created = created.len(),
        failed = errors.len(),
        skipped,
        "Bulk import finished"
    );

    Ok(ImportOutcome {
        batch_id,
        created,
        errors,
        skipped,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn cell<'a>(row: &'a SheetRow, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

fn text_or(row: &SheetRow, key: &str, fallback: &str) -> String {
    match cell(row, key) {
        "" => fallback.to_string(),
        value => value.to_string(),
    }
}

fn optional(row: &SheetRow, key: &str) -> Option<String> {
    match cell(row, key) {
        "" => None,
        value => Some(value.to_string()),
    }
}

/// Rows without an expression or either domain are ignored silently
fn is_skippable(row: &SheetRow) -> bool {
    ["expression", "sourcedomain", "targetdomain"]
        .iter()
        .any(|key| cell(row, key).is_empty())
}

fn parse_novelty(row: &SheetRow) -> std::result::Result<NoveltyType, String> {
    match cell(row, "noveltytype") {
        "" => Ok(NoveltyType::default()),
        value => NoveltyType::from_cell(value).ok_or_else(|| {
            format!(
                "Invalid noveltyType '{}' (expected one of: {})",
                value,
                labels(NoveltyType::ALL.iter().map(NoveltyType::as_str))
            )
        }),
    }
}

fn parse_function(row: &SheetRow) -> std::result::Result<FunctionType, String> {
    match cell(row, "functiontype") {
        "" => Ok(FunctionType::default()),
        value => FunctionType::from_cell(value).ok_or_else(|| {
            format!(
                "Invalid functionType '{}' (expected one of: {})",
                value,
                labels(FunctionType::ALL.iter().map(FunctionType::as_str))
            )
        }),
    }
}

fn labels<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

/// Validate, resolve lookups and persist one row
///
/// Errors are returned as the message stored in the row error.
async fn import_row(
    pool: &SqlitePool,
    row: &SheetRow,
    document_id: Uuid,
    user_id: Uuid,
) -> std::result::Result<AnnotationRecord, String> {
    let custom_id = cell(row, "customid");
    if custom_id.is_empty() {
        return Err("customId is required".to_string());
    }

    // Enum cells are checked before any lookup is created for the row
    let novelty_type = parse_novelty(row)?;
    let function_type = parse_function(row)?;

    let (source, _) = find_or_create_domain(pool, cell(row, "sourcedomain"), DomainType::Source)
        .await
        .map_err(|e| e.to_string())?;
    let (target, _) = find_or_create_domain(pool, cell(row, "targetdomain"), DomainType::Target)
        .await
        .map_err(|e| e.to_string())?;

    let pos = match cell(row, "pos") {
        "" => None,
        name => Some(
            find_or_create_pos(pool, name)
                .await
                .map_err(|e| e.to_string())?
                .0
                .id,
        ),
    };

    let new = NewAnnotation {
        custom_id: custom_id.to_string(),
        document_id,
        expression: cell(row, "expression").to_string(),
        section: text_or(row, "section", FALLBACK_UNDEFINED),
        subsection: optional(row, "subsection"),
        subsection2: optional(row, "subsection2"),
        subsection3: optional(row, "subsection3"),
        subsection4: optional(row, "subsection4"),
        page: text_or(row, "page", FALLBACK_PAGE),
        order: optional(row, "order"),
        trigger_word: text_or(row, "triggerword", FALLBACK_TRIGGER_WORD),
        trigger_word_loc: optional(row, "triggerwordloc"),
        lemma: text_or(row, "lemma", FALLBACK_LEMMA),
        pos,
        context: text_or(row, "context", FALLBACK_UNDEFINED),
        literal_meaning: text_or(row, "literalmeaning", FALLBACK_UNDEFINED),
        contextual_meaning: text_or(row, "contextualmeaning", FALLBACK_UNDEFINED),
        source_domain: source.id,
        target_domain: target.id,
        conceptual_metaphor: text_or(row, "conceptualmetaphor", FALLBACK_UNDEFINED),
        ontological_mappings: split_list(cell(row, "ontologicalmappings")),
        epistemic_mappings: split_list(cell(row, "epistemicmappings")),
        novelty_type,
        function_type,
        status: AnnotationStatus::UnderReview,
        comments: split_list(cell(row, "comments")),
        created_by: user_id,
    };

    db::annotations::insert_annotation(pool, &new)
        .await
        .map_err(|e| match e {
            e if e.is_unique_violation() => format!("Duplicate customId: {}", custom_id),
            Error::InvalidInput(message) => message,
            other => other.to_string(),
        })
}
