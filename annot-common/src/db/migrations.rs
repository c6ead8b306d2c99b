//! Database schema migrations
//!
//! Versioned, idempotent upgrades tracked in the `schema_version` table.
//! Existing migrations are never edited; every schema change gets a new one.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: lookup indexes for filtered listing and log queries
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_annotations_document ON annotations(document_id)",
        "CREATE INDEX IF NOT EXISTS idx_annotations_status ON annotations(status)",
        "CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project_id)",
        "CREATE INDEX IF NOT EXISTS idx_action_logs_entity ON action_logs(entity_type, entity_id)",
        "CREATE INDEX IF NOT EXISTS idx_action_logs_user ON action_logs(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_import_batches_document ON import_batches(document_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Migration v1: Created lookup indexes");
    Ok(())
}

/// Migration v2: add the optimistic-concurrency `version` column
///
/// Databases created before the change tracker existed lack the column.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('annotations') WHERE name = 'version'",
    )
    .fetch_one(pool)
    .await?;

    if has_column == 0 {
        sqlx::query("ALTER TABLE annotations ADD COLUMN version INTEGER NOT NULL DEFAULT 1")
            .execute(pool)
            .await?;
        info!("Migration v2: Added version column to annotations");
    } else {
        info!("Migration v2: annotations.version already present");
    }

    Ok(())
}
