//! Database initialization against real files

use annot_common::db::init::init_database;
use annot_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("annot.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("annot.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("annot.db")).await.unwrap();

    for table in [
        "users",
        "projects",
        "documents",
        "domains",
        "pos",
        "domain_relations",
        "annotations",
        "action_logs",
        "import_batches",
        "schema_version",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_migrations_reach_current_version_and_are_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("annot.db");

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

    annot_common::db::migrations::run_migrations(&pool).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);
}

#[tokio::test]
async fn test_domain_name_and_type_unique() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("annot.db")).await.unwrap();

    let insert = "INSERT INTO domains (id, name, domain_type, created_at) VALUES (?, ?, ?, ?)";
    let now = annot_common::time::now().to_rfc3339();

    sqlx::query(insert)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind("WAR")
        .bind("source")
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

    // Same name with the other type is a different domain
    sqlx::query(insert)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind("WAR")
        .bind("target")
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

    let duplicate = sqlx::query(insert)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind("WAR")
        .bind("source")
        .bind(&now)
        .execute(&pool)
        .await;
    assert!(duplicate.is_err());
}
