//! Decoding helpers for rows whose ids, enums and lists are stored as TEXT

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Read a TEXT column holding a UUID
pub fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| Error::Internal(format!("Corrupt id in column {}: {} ({})", column, raw, e)))
}

/// Read a nullable TEXT column holding a UUID
pub fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        Uuid::parse_str(&s)
            .map_err(|e| Error::Internal(format!("Corrupt id in column {}: {} ({})", column, s, e)))
    })
    .transpose()
}

/// Read a TEXT column holding an RFC 3339 timestamp
pub fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Read a TEXT column holding an enum label
pub fn get_enum<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e| Error::Internal(format!("Corrupt value in column {}: {}", column, e)))
}

/// Read a TEXT column holding JSON
pub fn get_json<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Internal(format!("Corrupt JSON in column {}: {}", column, e)))
}

/// Convert a stored count to usize
pub fn get_count(row: &SqliteRow, column: &str) -> Result<usize> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as usize)
}
