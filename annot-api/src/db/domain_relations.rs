//! Relations between conceptual domains (hypernymy, meronymy, ...)

use annot_common::db::{get_enum, get_uuid};
use annot_common::models::{DomainRelation, DomainRelationPatch, NewDomainRelation};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use uuid::Uuid;

fn relation_from_row(row: &SqliteRow) -> Result<DomainRelation> {
    Ok(DomainRelation {
        id: get_uuid(row, "id")?,
        domain_a: get_uuid(row, "domain_a")?,
        domain_b: get_uuid(row, "domain_b")?,
        relation_type: get_enum(row, "relation_type")?,
    })
}

fn unknown_domain_as_invalid(e: sqlx::Error) -> Error {
    let err = Error::Database(e);
    if err.is_foreign_key_violation() {
        Error::InvalidInput("Relation refers to an unknown domain".to_string())
    } else {
        err
    }
}

pub async fn create_relation(pool: &SqlitePool, new: &NewDomainRelation) -> Result<DomainRelation> {
    if new.domain_a == new.domain_b {
        return Err(Error::InvalidInput("A domain cannot be related to itself".to_string()));
    }

    let id = Uuid::new_v4();
    let ts = to_db_string(&now());

    sqlx::query(
        r#"
        INSERT INTO domain_relations (id, domain_a, domain_b, relation_type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.domain_a.to_string())
    .bind(new.domain_b.to_string())
    .bind(new.relation_type.as_str())
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await
    .map_err(unknown_domain_as_invalid)?;

    Ok(DomainRelation {
        id,
        domain_a: new.domain_a,
        domain_b: new.domain_b,
        relation_type: new.relation_type,
    })
}

pub async fn get_relation(pool: &SqlitePool, id: Uuid) -> Result<DomainRelation> {
    let row = sqlx::query("SELECT id, domain_a, domain_b, relation_type FROM domain_relations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Domain relation {}", id)))?;

    relation_from_row(&row)
}

pub async fn list_relations(pool: &SqlitePool) -> Result<Vec<DomainRelation>> {
    let rows = sqlx::query(
        "SELECT id, domain_a, domain_b, relation_type FROM domain_relations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(relation_from_row).collect()
}

pub async fn update_relation(
    pool: &SqlitePool,
    id: Uuid,
    patch: &DomainRelationPatch,
) -> Result<DomainRelation> {
    let current = get_relation(pool, id).await?;
    let updated = DomainRelation {
        id,
        domain_a: patch.domain_a.unwrap_or(current.domain_a),
        domain_b: patch.domain_b.unwrap_or(current.domain_b),
        relation_type: patch.relation_type.unwrap_or(current.relation_type),
    };

    if updated.domain_a == updated.domain_b {
        return Err(Error::InvalidInput("A domain cannot be related to itself".to_string()));
    }

    sqlx::query(
        "UPDATE domain_relations SET domain_a = ?, domain_b = ?, relation_type = ?, updated_at = ? WHERE id = ?",
    )
    .bind(updated.domain_a.to_string())
    .bind(updated.domain_b.to_string())
    .bind(updated.relation_type.as_str())
    .bind(to_db_string(&now()))
    .bind(id.to_string())
    .execute(pool)
    .await
    .map_err(unknown_domain_as_invalid)?;

    Ok(updated)
}

pub async fn delete_relation(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM domain_relations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Domain relation {}", id)));
    }
    Ok(())
}
