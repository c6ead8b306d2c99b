//! Project database operations

use annot_common::db::{get_json, get_timestamp, get_uuid};
use annot_common::models::{NewProject, Project, ProjectPatch};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, reviewers, contact_email, notes, created_at, updated_at";

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: get_uuid(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        owner: get_uuid(row, "owner_id")?,
        reviewers: get_json(row, "reviewers")?,
        contact_email: row.try_get("contact_email")?,
        notes: row.try_get("notes")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn unknown_user_as_invalid(e: sqlx::Error) -> Error {
    let err = Error::Database(e);
    if err.is_foreign_key_violation() {
        Error::InvalidInput("Project owner does not exist".to_string())
    } else {
        err
    }
}

/// Create a project; the owner defaults to the acting user
pub async fn create_project(pool: &SqlitePool, new: &NewProject, acting_user: Uuid) -> Result<Project> {
    if new.name.trim().is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()));
    }
    if new.contact_email.trim().is_empty() {
        return Err(Error::InvalidInput("contactEmail is required".to_string()));
    }

    let id = Uuid::new_v4();
    let owner = new.owner.unwrap_or(acting_user);
    let ts = to_db_string(&now());

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, description, owner_id, reviewers, contact_email, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.name.trim())
    .bind(&new.description)
    .bind(owner.to_string())
    .bind(serde_json::to_string(&new.reviewers)?)
    .bind(new.contact_email.trim())
    .bind(&new.notes)
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await
    .map_err(unknown_user_as_invalid)?;

    info!(project_id = %id, owner = %owner, "Created project");
    get_project(pool, id).await
}

pub async fn find_project(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(project_from_row).transpose()
}

pub async fn get_project(pool: &SqlitePool, id: Uuid) -> Result<Project> {
    find_project(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project {}", id)))
}

/// List projects, optionally restricted to one owner, newest first
pub async fn list_projects(pool: &SqlitePool, owner: Option<Uuid>) -> Result<Vec<Project>> {
    let rows = match owner {
        Some(owner) => {
            sqlx::query(&format!(
                "SELECT {} FROM projects WHERE owner_id = ? ORDER BY created_at DESC",
                PROJECT_COLUMNS
            ))
            .bind(owner.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM projects ORDER BY created_at DESC",
                PROJECT_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(project_from_row).collect()
}

pub async fn update_project(pool: &SqlitePool, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
    let current = get_project(pool, id).await?;

    let name = match &patch.name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("name is required".to_string()))
        }
        Some(name) => name.trim().to_string(),
        None => current.name,
    };
    let reviewers = patch.reviewers.clone().unwrap_or(current.reviewers);

    sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, description = ?, owner_id = ?, reviewers = ?, contact_email = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&name)
    .bind(patch.description.clone().or(current.description))
    .bind(patch.owner.unwrap_or(current.owner).to_string())
    .bind(serde_json::to_string(&reviewers)?)
    .bind(patch.contact_email.clone().unwrap_or(current.contact_email))
    .bind(patch.notes.clone().or(current.notes))
    .bind(to_db_string(&now()))
    .bind(id.to_string())
    .execute(pool)
    .await
    .map_err(unknown_user_as_invalid)?;

    get_project(pool, id).await
}

/// Delete a project together with its documents and their annotations
pub async fn delete_project(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Project {}", id)));
    }

    info!(project_id = %id, "Deleted project");
    Ok(())
}
