//! Conceptual domain database operations
//!
//! Domains are unique on (name, type). `insert_domain` reports a uniqueness
//! violation as a plain database error so the lookup registry can recover
//! from a lost insert race; the CRUD entry points turn it into a Conflict.

use annot_common::db::{get_enum, get_uuid};
use annot_common::models::{Domain, DomainPatch, DomainType, NewDomain};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

fn domain_from_row(row: &SqliteRow) -> Result<Domain> {
    Ok(Domain {
        id: get_uuid(row, "id")?,
        name: row.try_get("name")?,
        domain_type: get_enum(row, "domain_type")?,
    })
}

pub async fn find_domain(pool: &SqlitePool, name: &str, domain_type: DomainType) -> Result<Option<Domain>> {
    let row = sqlx::query("SELECT id, name, domain_type FROM domains WHERE name = ? AND domain_type = ?")
        .bind(name)
        .bind(domain_type.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(domain_from_row).transpose()
}

/// Insert without translating constraint errors
pub async fn insert_domain(pool: &SqlitePool, name: &str, domain_type: DomainType) -> Result<Domain> {
    let id = Uuid::new_v4();

    sqlx::query("INSERT INTO domains (id, name, domain_type, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(domain_type.as_str())
        .bind(to_db_string(&now()))
        .execute(pool)
        .await?;

    Ok(Domain {
        id,
        name: name.to_string(),
        domain_type,
    })
}

pub async fn create_domain(pool: &SqlitePool, input: &NewDomain) -> Result<Domain> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Domain name is required".to_string()));
    }

    match insert_domain(pool, name, input.domain_type).await {
        Ok(domain) => {
            info!(domain_id = %domain.id, name = %domain.name, "Created domain");
            Ok(domain)
        }
        Err(e) if e.is_unique_violation() => Err(Error::Conflict(format!(
            "{} domain '{}' already exists",
            input.domain_type, name
        ))),
        Err(e) => Err(e),
    }
}

pub async fn find_domain_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Domain>> {
    let row = sqlx::query("SELECT id, name, domain_type FROM domains WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(domain_from_row).transpose()
}

pub async fn get_domain(pool: &SqlitePool, id: Uuid) -> Result<Domain> {
    find_domain_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Domain {}", id)))
}

/// List domains sorted by name, optionally of a single type
pub async fn list_domains(pool: &SqlitePool, domain_type: Option<DomainType>) -> Result<Vec<Domain>> {
    let rows = match domain_type {
        Some(domain_type) => {
            sqlx::query("SELECT id, name, domain_type FROM domains WHERE domain_type = ? ORDER BY name")
                .bind(domain_type.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT id, name, domain_type FROM domains ORDER BY name, domain_type")
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(domain_from_row).collect()
}

pub async fn update_domain(pool: &SqlitePool, id: Uuid, patch: &DomainPatch) -> Result<Domain> {
    let current = get_domain(pool, id).await?;

    let name = match &patch.name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("Domain name is required".to_string()))
        }
        Some(name) => name.trim().to_string(),
        None => current.name,
    };
    let domain_type = patch.domain_type.unwrap_or(current.domain_type);

    sqlx::query("UPDATE domains SET name = ?, domain_type = ? WHERE id = ?")
        .bind(&name)
        .bind(domain_type.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::Conflict(format!("{} domain '{}' already exists", domain_type, name))
            } else {
                err
            }
        })?;

    get_domain(pool, id).await
}

/// Delete a domain. Domains referenced by annotations cannot be deleted.
pub async fn delete_domain(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM domains WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_foreign_key_violation() {
                Error::Conflict(format!("Domain {} is used by annotations", id))
            } else {
                err
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Domain {}", id)));
    }

    info!(domain_id = %id, "Deleted domain");
    Ok(())
}
