//! Part-of-speech lookup table

use annot_common::db::get_uuid;
use annot_common::models::Pos;
use annot_common::time::{now, to_db_string};
use annot_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn pos_from_row(row: &SqliteRow) -> Result<Pos> {
    Ok(Pos {
        id: get_uuid(row, "id")?,
        name: row.try_get("name")?,
    })
}

pub async fn find_pos(pool: &SqlitePool, name: &str) -> Result<Option<Pos>> {
    let row = sqlx::query("SELECT id, name FROM pos WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(pos_from_row).transpose()
}

/// Insert without translating constraint errors
pub async fn insert_pos(pool: &SqlitePool, name: &str) -> Result<Pos> {
    let id = Uuid::new_v4();

    sqlx::query("INSERT INTO pos (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(to_db_string(&now()))
        .execute(pool)
        .await?;

    Ok(Pos {
        id,
        name: name.to_string(),
    })
}

pub async fn list_pos(pool: &SqlitePool) -> Result<Vec<Pos>> {
    let rows = sqlx::query("SELECT id, name FROM pos ORDER BY name")
        .fetch_all(pool)
        .await?;

    rows.iter().map(pos_from_row).collect()
}
