//! Idempotent find-or-create over the domain and part-of-speech tables
//!
//! No in-process cache: the UNIQUE constraints on `domains(name, domain_type)`
//! and `pos(name)` are the only arbiter. When two callers race to insert the
//! same key, the loser's insert fails with a uniqueness violation and it
//! re-reads the winner's row.

use annot_common::models::{Domain, DomainType, Pos};
use annot_common::{Error, Result};
use sqlx::SqlitePool;
use std::future::Future;
use tracing::debug;

use crate::db;

/// Find an entry by key, inserting it when absent
///
/// Returns the entry and whether this call created it.
async fn find_or_insert<T, FindFut, InsertFut>(
    key: &str,
    find: impl Fn() -> FindFut,
    insert: impl FnOnce() -> InsertFut,
) -> Result<(T, bool)>
where
    FindFut: Future<Output = Result<Option<T>>>,
    InsertFut: Future<Output = Result<T>>,
{
    if let Some(existing) = find().await? {
        return Ok((existing, false));
    }

    match insert().await {
        Ok(created) => Ok((created, true)),
        Err(e) if e.is_unique_violation() => {
            debug!(key, "Lost insert race, re-reading existing entry");
            let existing = find().await?.ok_or_else(|| {
                Error::Internal(format!("'{}' vanished after a uniqueness conflict", key))
            })?;
            Ok((existing, false))
        }
        Err(e) => Err(e),
    }
}

fn clean_name<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} name is required", what)));
    }
    Ok(name)
}

/// Find or create a conceptual domain keyed on (name, type)
pub async fn find_or_create_domain(
    pool: &SqlitePool,
    name: &str,
    domain_type: DomainType,
) -> Result<(Domain, bool)> {
    let name = clean_name(name, "Domain")?;

    find_or_insert(
        name,
        || db::domains::find_domain(pool, name, domain_type),
        || db::domains::insert_domain(pool, name, domain_type),
    )
    .await
}

/// Find or create a part of speech keyed on name
pub async fn find_or_create_pos(pool: &SqlitePool, name: &str) -> Result<(Pos, bool)> {
    let name = clean_name(name, "Part of speech")?;

    find_or_insert(
        name,
        || db::pos::find_pos(pool, name),
        || db::pos::insert_pos(pool, name),
    )
    .await
}
