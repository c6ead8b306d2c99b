//! Document database operations

use annot_common::db::{get_enum, get_timestamp, get_uuid};
use annot_common::models::{Document, DocumentPatch, NewDocument};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, project_id, created_by, title, description, doc_type, language, \
     notes, storage_path_pdf, storage_path_txt, status, created_at, updated_at";

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: get_uuid(row, "id")?,
        project_id: get_uuid(row, "project_id")?,
        created_by: get_uuid(row, "created_by")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        doc_type: row.try_get("doc_type")?,
        language: row.try_get("language")?,
        notes: row.try_get("notes")?,
        storage_path_pdf: row.try_get("storage_path_pdf")?,
        storage_path_txt: row.try_get("storage_path_txt")?,
        status: get_enum(row, "status")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

pub async fn create_document(
    pool: &SqlitePool,
    project_id: Uuid,
    new: &NewDocument,
    created_by: Uuid,
) -> Result<Document> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput("title is required".to_string()));
    }

    // Surface a missing project as 404 rather than a constraint failure
    super::projects::get_project(pool, project_id).await?;

    let id = Uuid::new_v4();
    let ts = to_db_string(&now());

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, project_id, created_by, title, description, doc_type, language,
            notes, storage_path_pdf, storage_path_txt, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(project_id.to_string())
    .bind(created_by.to_string())
    .bind(new.title.trim())
    .bind(&new.description)
    .bind(&new.doc_type)
    .bind(&new.language)
    .bind(&new.notes)
    .bind(&new.storage_path_pdf)
    .bind(&new.storage_path_txt)
    .bind(new.status.as_str())
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await?;

    info!(document_id = %id, project_id = %project_id, "Created document");
    get_document(pool, id).await
}

pub async fn find_document(pool: &SqlitePool, id: Uuid) -> Result<Option<Document>> {
    let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(document_from_row).transpose()
}

pub async fn get_document(pool: &SqlitePool, id: Uuid) -> Result<Document> {
    find_document(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Document {}", id)))
}

pub async fn list_documents(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Document>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM documents WHERE project_id = ? ORDER BY created_at",
        DOCUMENT_COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(document_from_row).collect()
}

pub async fn update_document(pool: &SqlitePool, id: Uuid, patch: &DocumentPatch) -> Result<Document> {
    let current = get_document(pool, id).await?;

    let title = match &patch.title {
        Some(title) if title.trim().is_empty() => {
            return Err(Error::InvalidInput("title is required".to_string()))
        }
        Some(title) => title.trim().to_string(),
        None => current.title,
    };

    sqlx::query(
        r#"
        UPDATE documents
        SET title = ?, description = ?, doc_type = ?, language = ?, notes = ?,
            storage_path_pdf = ?, storage_path_txt = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(patch.description.clone().or(current.description))
    .bind(patch.doc_type.clone().unwrap_or(current.doc_type))
    .bind(patch.language.clone().unwrap_or(current.language))
    .bind(patch.notes.clone().or(current.notes))
    .bind(patch.storage_path_pdf.clone().or(current.storage_path_pdf))
    .bind(patch.storage_path_txt.clone().or(current.storage_path_txt))
    .bind(patch.status.unwrap_or(current.status).as_str())
    .bind(to_db_string(&now()))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    get_document(pool, id).await
}

/// Delete a document; its annotations and import batches cascade
pub async fn delete_document(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Document {}", id)));
    }

    info!(document_id = %id, "Deleted document");
    Ok(())
}
