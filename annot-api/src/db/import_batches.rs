//! Import batch history

use annot_common::db::{get_count, get_json, get_timestamp, get_uuid};
use annot_common::models::ImportBatch;
use annot_common::time::to_db_string;
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const BATCH_COLUMNS: &str = "id, document_id, user_id, file_name, file_sha256, rows_total, \
     rows_skipped, created_count, errors, started_at, ended_at";

fn batch_from_row(row: &SqliteRow) -> Result<ImportBatch> {
    Ok(ImportBatch {
        id: get_uuid(row, "id")?,
        document_id: get_uuid(row, "document_id")?,
        user_id: get_uuid(row, "user_id")?,
        file_name: row.try_get("file_name")?,
        file_sha256: row.try_get("file_sha256")?,
        rows_total: get_count(row, "rows_total")?,
        rows_skipped: get_count(row, "rows_skipped")?,
        created_count: get_count(row, "created_count")?,
        errors: get_json(row, "errors")?,
        started_at: get_timestamp(row, "started_at")?,
        ended_at: get_timestamp(row, "ended_at")?,
    })
}

pub async fn save_batch(pool: &SqlitePool, batch: &ImportBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_batches (
            id, document_id, user_id, file_name, file_sha256,
            rows_total, rows_skipped, created_count, errors, started_at, ended_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(batch.document_id.to_string())
    .bind(batch.user_id.to_string())
    .bind(&batch.file_name)
    .bind(&batch.file_sha256)
    .bind(batch.rows_total as i64)
    .bind(batch.rows_skipped as i64)
    .bind(batch.created_count as i64)
    .bind(serde_json::to_string(&batch.errors)?)
    .bind(to_db_string(&batch.started_at))
    .bind(to_db_string(&batch.ended_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_batch(pool: &SqlitePool, id: Uuid) -> Result<ImportBatch> {
    let row = sqlx::query(&format!("SELECT {} FROM import_batches WHERE id = ?", BATCH_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Import batch {}", id)))?;

    batch_from_row(&row)
}

/// Batches for one document, newest first
pub async fn list_batches(pool: &SqlitePool, document_id: Uuid) -> Result<Vec<ImportBatch>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM import_batches WHERE document_id = ? ORDER BY started_at DESC",
        BATCH_COLUMNS
    ))
    .bind(document_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(batch_from_row).collect()
}
