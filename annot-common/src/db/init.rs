//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! creates every table idempotently before running versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Applied to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent) and run pending migrations
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_projects_table(pool).await?;
    create_documents_table(pool).await?;

    // Lookup tables
    create_domains_table(pool).await?;
    create_pos_table(pool).await?;
    create_domain_relations_table(pool).await?;

    create_annotations_table(pool).await?;
    create_action_logs_table(pool).await?;
    create_import_batches_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            google_id TEXT UNIQUE,
            avatar TEXT,
            role TEXT NOT NULL CHECK (role IN ('editor', 'reviewer')),
            column_preferences TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            owner_id TEXT NOT NULL REFERENCES users(id),
            reviewers TEXT NOT NULL DEFAULT '[]',
            contact_email TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            created_by TEXT NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            description TEXT,
            doc_type TEXT NOT NULL,
            language TEXT NOT NULL,
            notes TEXT,
            storage_path_pdf TEXT,
            storage_path_txt TEXT,
            status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Domains are unique on (name, type); the lookup registry relies on this constraint
async fn create_domains_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS domains (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            domain_type TEXT NOT NULL CHECK (domain_type IN ('source', 'target')),
            created_at TEXT NOT NULL,
            UNIQUE (name, domain_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pos (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_domain_relations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS domain_relations (
            id TEXT PRIMARY KEY,
            domain_a TEXT NOT NULL REFERENCES domains(id) ON DELETE CASCADE,
            domain_b TEXT NOT NULL REFERENCES domains(id) ON DELETE CASCADE,
            relation_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Annotations
///
/// `updates` is a JSON array that is only ever appended to (json_insert at `$[#]`).
/// `version` backs the optimistic concurrency check of the change tracker.
async fn create_annotations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotations (
            id TEXT PRIMARY KEY,
            custom_id TEXT NOT NULL UNIQUE,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            expression TEXT NOT NULL,
            section TEXT NOT NULL,
            subsection TEXT,
            subsection2 TEXT,
            subsection3 TEXT,
            subsection4 TEXT,
            page TEXT NOT NULL,
            order_label TEXT,
            trigger_word TEXT NOT NULL,
            trigger_word_loc TEXT,
            lemma TEXT NOT NULL,
            pos_id TEXT REFERENCES pos(id),
            context TEXT NOT NULL,
            literal_meaning TEXT NOT NULL,
            contextual_meaning TEXT NOT NULL,
            source_domain_id TEXT NOT NULL REFERENCES domains(id),
            target_domain_id TEXT NOT NULL REFERENCES domains(id),
            conceptual_metaphor TEXT NOT NULL,
            ontological_mappings TEXT NOT NULL DEFAULT '[]',
            epistemic_mappings TEXT NOT NULL DEFAULT '[]',
            novelty_type TEXT NOT NULL,
            function_type TEXT NOT NULL,
            status TEXT NOT NULL,
            comments TEXT NOT NULL DEFAULT '[]',
            created_by TEXT NOT NULL REFERENCES users(id),
            updates TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_action_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS action_logs (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            user_email TEXT NOT NULL,
            details TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_import_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            file_name TEXT,
            file_sha256 TEXT NOT NULL,
            rows_total INTEGER NOT NULL,
            rows_skipped INTEGER NOT NULL,
            created_count INTEGER NOT NULL,
            errors TEXT NOT NULL DEFAULT '[]',
            started_at TEXT NOT NULL,
            ended_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
