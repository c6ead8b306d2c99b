//! User database operations

use annot_common::db::{get_enum, get_json, get_timestamp, get_uuid};
use annot_common::models::{IdentityProfile, NewUser, User, UserPatch, UserRole};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, google_id, avatar, role, column_preferences, created_at, updated_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: get_uuid(row, "id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        google_id: row.try_get("google_id")?,
        avatar: row.try_get("avatar")?,
        role: get_enum(row, "role")?,
        column_preferences: get_json(row, "column_preferences")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidInput(format!("Invalid email address: '{}'", email)));
    }
    Ok(email)
}

/// Create a user; duplicate email or external id is a Conflict
pub async fn create_user(pool: &SqlitePool, new: &NewUser) -> Result<User> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()));
    }
    let email = normalize_email(&new.email)?;
    let id = Uuid::new_v4();
    let ts = to_db_string(&now());

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, google_id, avatar, role, column_preferences, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, '{}', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(&email)
    .bind(&new.google_id)
    .bind(&new.avatar)
    .bind(new.role.as_str())
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await
    .map_err(|e| {
        let err = Error::Database(e);
        if err.is_unique_violation() {
            Error::Conflict(format!("A user with email {} already exists", email))
        } else {
            err
        }
    })?;

    info!(user_id = %id, email = %email, "Created user");
    get_user(pool, id).await
}

pub async fn find_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<User> {
    find_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {}", id)))
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_google_id(pool: &SqlitePool, google_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE google_id = ?", USER_COLUMNS))
        .bind(google_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY name, email", USER_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(user_from_row).collect()
}

pub async fn update_user(pool: &SqlitePool, id: Uuid, patch: &UserPatch) -> Result<User> {
    let current = get_user(pool, id).await?;

    let name = match &patch.name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("name is required".to_string()))
        }
        Some(name) => name.trim().to_string(),
        None => current.name,
    };
    let email = match &patch.email {
        Some(email) => normalize_email(email)?,
        None => current.email,
    };
    let google_id = patch.google_id.clone().or(current.google_id);
    let avatar = patch.avatar.clone().or(current.avatar);
    let role = patch.role.unwrap_or(current.role);

    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, google_id = ?, avatar = ?, role = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&name)
    .bind(&email)
    .bind(&google_id)
    .bind(&avatar)
    .bind(role.as_str())
    .bind(to_db_string(&now()))
    .bind(id.to_string())
    .execute(pool)
    .await
    .map_err(|e| {
        let err = Error::Database(e);
        if err.is_unique_violation() {
            Error::Conflict(format!("A user with email {} already exists", email))
        } else {
            err
        }
    })?;

    get_user(pool, id).await
}

/// Replace the stored column preferences (must be a JSON object)
pub async fn set_column_preferences(
    pool: &SqlitePool,
    id: Uuid,
    preferences: &serde_json::Value,
) -> Result<User> {
    if !preferences.is_object() {
        return Err(Error::InvalidInput(
            "columnPreferences must be a JSON object".to_string(),
        ));
    }

    let result = sqlx::query("UPDATE users SET column_preferences = ?, updated_at = ? WHERE id = ?")
        .bind(serde_json::to_string(preferences)?)
        .bind(to_db_string(&now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }

    get_user(pool, id).await
}

/// Delete a user. Users still owning projects or annotations are a Conflict.
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_foreign_key_violation() {
                Error::Conflict(format!("User {} still owns projects, documents or annotations", id))
            } else {
                err
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }

    info!(user_id = %id, "Deleted user");
    Ok(())
}

/// Resolve the local user for an external identity
///
/// Looks up by external id, then by email (linking the external id to the
/// existing account), and otherwise creates a new editor.
pub async fn find_or_create_from_identity(
    pool: &SqlitePool,
    profile: &IdentityProfile,
) -> Result<User> {
    if let Some(user) = find_user_by_google_id(pool, &profile.external_id).await? {
        return Ok(user);
    }

    let email = profile
        .email
        .as_deref()
        .ok_or_else(|| Error::InvalidInput("Identity profile has no email".to_string()))?;

    if let Some(user) = find_user_by_email(pool, email).await? {
        sqlx::query("UPDATE users SET google_id = ?, avatar = COALESCE(avatar, ?), updated_at = ? WHERE id = ?")
            .bind(&profile.external_id)
            .bind(&profile.avatar)
            .bind(to_db_string(&now()))
            .bind(user.id.to_string())
            .execute(pool)
            .await?;
        info!(user_id = %user.id, "Linked external identity to existing user");
        return get_user(pool, user.id).await;
    }

    create_user(
        pool,
        &NewUser {
            name: profile.display_name.clone(),
            email: email.to_string(),
            google_id: Some(profile.external_id.clone()),
            avatar: profile.avatar.clone(),
            role: UserRole::Editor,
        },
    )
    .await
}

