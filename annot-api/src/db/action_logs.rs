//! Action log: who created, updated or deleted which project, document or annotation

use annot_common::db::{get_enum, get_timestamp, get_uuid};
use annot_common::models::{ActionLog, ActionType, EntityType, User};
use annot_common::time::{now, to_db_string};
use annot_common::Result;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const LOG_COLUMNS: &str = "id, action, entity_type, entity_id, user_id, user_email, details, created_at";

fn log_from_row(row: &SqliteRow) -> Result<ActionLog> {
    let details: Option<String> = row.try_get("details")?;
    Ok(ActionLog {
        id: get_uuid(row, "id")?,
        action: get_enum(row, "action")?,
        entity_type: get_enum(row, "entity_type")?,
        entity_id: get_uuid(row, "entity_id")?,
        user_id: get_uuid(row, "user_id")?,
        user_email: row.try_get("user_email")?,
        details: details.map(|d| serde_json::from_str(&d)).transpose()?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

/// Append one log entry
pub async fn record_action(
    pool: &SqlitePool,
    action: ActionType,
    entity_type: EntityType,
    entity_id: Uuid,
    user: &User,
    details: Option<Value>,
) -> Result<ActionLog> {
    let entry = ActionLog {
        id: Uuid::new_v4(),
        action,
        entity_type,
        entity_id,
        user_id: user.id,
        user_email: user.email.clone(),
        details,
        created_at: now(),
    };

    sqlx::query(
        r#"
        INSERT INTO action_logs (id, action, entity_type, entity_id, user_id, user_email, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.action.as_str())
    .bind(entry.entity_type.as_str())
    .bind(entry.entity_id.to_string())
    .bind(entry.user_id.to_string())
    .bind(&entry.user_email)
    .bind(entry.details.as_ref().map(serde_json::to_string).transpose()?)
    .bind(to_db_string(&entry.created_at))
    .execute(pool)
    .await?;

    tracing::debug!(
        action = %entry.action,
        entity_type = %entry.entity_type,
        entity_id = %entry.entity_id,
        "Recorded action"
    );

    Ok(entry)
}

/// Log entries for one entity, newest first
pub async fn logs_for_entity(
    pool: &SqlitePool,
    entity_type: EntityType,
    entity_id: Uuid,
) -> Result<Vec<ActionLog>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM action_logs WHERE entity_type = ? AND entity_id = ? ORDER BY created_at DESC, rowid DESC",
        LOG_COLUMNS
    ))
    .bind(entity_type.as_str())
    .bind(entity_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(log_from_row).collect()
}

/// Log entries written by one user, newest first
pub async fn logs_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<ActionLog>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM action_logs WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        LOG_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(log_from_row).collect()
}
