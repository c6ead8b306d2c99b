//! Annotation record store
//!
//! `updates` is append-only: the only statement that touches it is the
//! versioned UPDATE in [`write_update`], which appends with
//! `json_insert(updates, '$[#]', ...)` in the same statement that writes the
//! fields. Callers never rewrite the array.

use annot_common::db::{get_enum, get_json, get_opt_uuid, get_timestamp, get_uuid};
use annot_common::models::{
    AnnotationRecord, AnnotationStatus, AuditEntry, FunctionType, NewAnnotation, NoveltyType,
};
use annot_common::time::{now, to_db_string};
use annot_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::pagination::{calculate_pagination, Page, PAGE_SIZE};

const ANNOTATION_COLUMNS: &str = "a.id, a.custom_id, a.document_id, a.expression, a.section, \
     a.subsection, a.subsection2, a.subsection3, a.subsection4, a.page, a.order_label, \
     a.trigger_word, a.trigger_word_loc, a.lemma, a.pos_id, a.context, a.literal_meaning, \
     a.contextual_meaning, a.source_domain_id, a.target_domain_id, a.conceptual_metaphor, \
     a.ontological_mappings, a.epistemic_mappings, a.novelty_type, a.function_type, a.status, \
     a.comments, a.created_by, a.updates, a.version, a.created_at, a.updated_at";

fn record_from_row(row: &SqliteRow) -> Result<AnnotationRecord> {
    Ok(AnnotationRecord {
        id: get_uuid(row, "id")?,
        custom_id: row.try_get("custom_id")?,
        document_id: get_uuid(row, "document_id")?,
        expression: row.try_get("expression")?,
        section: row.try_get("section")?,
        subsection: row.try_get("subsection")?,
        subsection2: row.try_get("subsection2")?,
        subsection3: row.try_get("subsection3")?,
        subsection4: row.try_get("subsection4")?,
        page: row.try_get("page")?,
        order: row.try_get("order_label")?,
        trigger_word: row.try_get("trigger_word")?,
        trigger_word_loc: row.try_get("trigger_word_loc")?,
        lemma: row.try_get("lemma")?,
        pos: get_opt_uuid(row, "pos_id")?,
        context: row.try_get("context")?,
        literal_meaning: row.try_get("literal_meaning")?,
        contextual_meaning: row.try_get("contextual_meaning")?,
        source_domain: get_uuid(row, "source_domain_id")?,
        target_domain: get_uuid(row, "target_domain_id")?,
        conceptual_metaphor: row.try_get("conceptual_metaphor")?,
        ontological_mappings: get_json(row, "ontological_mappings")?,
        epistemic_mappings: get_json(row, "epistemic_mappings")?,
        novelty_type: get_enum(row, "novelty_type")?,
        function_type: get_enum(row, "function_type")?,
        status: get_enum(row, "status")?,
        comments: get_json(row, "comments")?,
        created_by: get_uuid(row, "created_by")?,
        version: row.try_get("version")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
        updates: get_json(row, "updates")?,
    })
}

/// Listing filters (`?status=approved&noveltyType=conventional&search=road`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFilter {
    #[serde(default)]
    pub status: Option<AnnotationStatus>,
    #[serde(default)]
    pub novelty_type: Option<NoveltyType>,
    #[serde(default)]
    pub function_type: Option<FunctionType>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    /// Substring match on expression or customId
    #[serde(default)]
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, document_id: Uuid, filter: &AnnotationFilter) {
    qb.push(" WHERE a.document_id = ").push_bind(document_id.to_string());

    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status.as_str());
    }
    if let Some(novelty) = filter.novelty_type {
        qb.push(" AND a.novelty_type = ").push_bind(novelty.as_str());
    }
    if let Some(function) = filter.function_type {
        qb.push(" AND a.function_type = ").push_bind(function.as_str());
    }
    if let Some(user) = filter.created_by {
        qb.push(" AND a.created_by = ").push_bind(user.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (a.expression LIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.custom_id LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Check the fields every stored annotation must carry
fn validate_new(new: &NewAnnotation) -> Result<()> {
    if new.custom_id.trim().is_empty() {
        return Err(Error::InvalidInput("customId is required".to_string()));
    }
    if new.expression.trim().is_empty() {
        return Err(Error::InvalidInput("expression is required".to_string()));
    }
    Ok(())
}

/// Insert a new annotation
///
/// A duplicate `customId` surfaces as a database uniqueness violation
/// (`Error::is_unique_violation`); callers decide how to report it.
pub async fn insert_annotation(pool: &SqlitePool, new: &NewAnnotation) -> Result<AnnotationRecord> {
    validate_new(new)?;

    let id = Uuid::new_v4();
    let ts = to_db_string(&now());

    sqlx::query(
        r#"
        INSERT INTO annotations (
            id, custom_id, document_id, expression, section,
            subsection, subsection2, subsection3, subsection4, page, order_label,
            trigger_word, trigger_word_loc, lemma, pos_id, context, literal_meaning,
            contextual_meaning, source_domain_id, target_domain_id, conceptual_metaphor,
            ontological_mappings, epistemic_mappings, novelty_type, function_type, status,
            comments, created_by, updates, version, created_at, updated_at
        ) VALUES (
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', 1, ?, ?
        )
        "#,
    )
    .bind(id.to_string())
    .bind(new.custom_id.trim())
    .bind(new.document_id.to_string())
    .bind(&new.expression)
    .bind(&new.section)
    .bind(&new.subsection)
    .bind(&new.subsection2)
    .bind(&new.subsection3)
    .bind(&new.subsection4)
    .bind(&new.page)
    .bind(&new.order)
    .bind(&new.trigger_word)
    .bind(&new.trigger_word_loc)
    .bind(&new.lemma)
    .bind(new.pos.map(|p| p.to_string()))
    .bind(&new.context)
    .bind(&new.literal_meaning)
    .bind(&new.contextual_meaning)
    .bind(new.source_domain.to_string())
    .bind(new.target_domain.to_string())
    .bind(&new.conceptual_metaphor)
    .bind(serde_json::to_string(&new.ontological_mappings)?)
    .bind(serde_json::to_string(&new.epistemic_mappings)?)
    .bind(new.novelty_type.as_str())
    .bind(new.function_type.as_str())
    .bind(new.status.as_str())
    .bind(serde_json::to_string(&new.comments)?)
    .bind(new.created_by.to_string())
    .bind(&ts)
    .bind(&ts)
    .execute(pool)
    .await?;

    get_annotation(pool, id).await
}

pub async fn find_annotation(pool: &SqlitePool, id: Uuid) -> Result<Option<AnnotationRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM annotations a WHERE a.id = ?",
        ANNOTATION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

pub async fn get_annotation(pool: &SqlitePool, id: Uuid) -> Result<AnnotationRecord> {
    find_annotation(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Annotation {}", id)))
}

/// One page of a document's annotations, in creation order
pub async fn list_annotations(
    pool: &SqlitePool,
    document_id: Uuid,
    filter: &AnnotationFilter,
    requested_page: i64,
) -> Result<Page<AnnotationRecord>> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM annotations a");
    push_filters(&mut count, document_id, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let pagination = calculate_pagination(total, requested_page);

    let mut select = QueryBuilder::new(format!("SELECT {} FROM annotations a", ANNOTATION_COLUMNS));
    push_filters(&mut select, document_id, filter);
    select
        .push(" ORDER BY a.created_at, a.rowid LIMIT ")
        .push_bind(PAGE_SIZE)
        .push(" OFFSET ")
        .push_bind(pagination.offset);

    let rows = select.build().fetch_all(pool).await?;
    let items = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        pagination,
    })
}

/// Flattened annotation with lookup names resolved, for spreadsheet export
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationExportRow {
    pub custom_id: String,
    pub expression: String,
    pub trigger_word: String,
    pub lemma: String,
    pub novelty_type: NoveltyType,
    pub function_type: FunctionType,
    pub status: AnnotationStatus,
    pub conceptual_metaphor: String,
    pub source_domain: String,
    pub target_domain: String,
    pub pos: Option<String>,
}

/// Every annotation matching the filter, in creation order
pub async fn list_for_export(
    pool: &SqlitePool,
    document_id: Uuid,
    filter: &AnnotationFilter,
) -> Result<Vec<AnnotationExportRow>> {
    let mut select = QueryBuilder::new(
        r#"
        SELECT a.custom_id, a.expression, a.trigger_word, a.lemma, a.novelty_type,
               a.function_type, a.status, a.conceptual_metaphor,
               sd.name AS source_domain_name, td.name AS target_domain_name, p.name AS pos_name
        FROM annotations a
        JOIN domains sd ON sd.id = a.source_domain_id
        JOIN domains td ON td.id = a.target_domain_id
        LEFT JOIN pos p ON p.id = a.pos_id
        "#,
    );
    push_filters(&mut select, document_id, filter);
    select.push(" ORDER BY a.created_at, a.rowid");

    let rows = select.build().fetch_all(pool).await?;

    rows.iter()
        .map(|row| -> Result<AnnotationExportRow> {
            Ok(AnnotationExportRow {
                custom_id: row.try_get("custom_id")?,
                expression: row.try_get("expression")?,
                trigger_word: row.try_get("trigger_word")?,
                lemma: row.try_get("lemma")?,
                novelty_type: get_enum(row, "novelty_type")?,
                function_type: get_enum(row, "function_type")?,
                status: get_enum(row, "status")?,
                conceptual_metaphor: row.try_get("conceptual_metaphor")?,
                source_domain: row.try_get("source_domain_name")?,
                target_domain: row.try_get("target_domain_name")?,
                pos: row.try_get("pos_name")?,
            })
        })
        .collect()
}

const APPEND_AUDIT_ENTRY: &str = ", updates = json_insert(updates, '$[#]', json(?))";

/// Write every mutable field of `record`, conditional on `expected_version`
///
/// When `audit` is present it is appended to `updates` by the same
/// statement. Returns `false` when no row matched (the record was deleted or
/// another writer bumped the version first).
pub async fn write_update(
    pool: &SqlitePool,
    record: &AnnotationRecord,
    expected_version: i64,
    audit: Option<&AuditEntry>,
    updated_at: DateTime<Utc>,
) -> Result<bool> {
    let sql = format!(
        r#"
        UPDATE annotations SET
            custom_id = ?, expression = ?, section = ?, subsection = ?, subsection2 = ?,
            subsection3 = ?, subsection4 = ?, page = ?, order_label = ?, trigger_word = ?,
            trigger_word_loc = ?, lemma = ?, pos_id = ?, context = ?, literal_meaning = ?,
            contextual_meaning = ?, source_domain_id = ?, target_domain_id = ?,
            conceptual_metaphor = ?, ontological_mappings = ?, epistemic_mappings = ?,
            novelty_type = ?, function_type = ?, status = ?, comments = ?,
            version = version + 1, updated_at = ?{}
        WHERE id = ? AND version = ?
        "#,
        if audit.is_some() { APPEND_AUDIT_ENTRY } else { "" }
    );

    let mut query = sqlx::query(&sql)
        .bind(&record.custom_id)
        .bind(&record.expression)
        .bind(&record.section)
        .bind(&record.subsection)
        .bind(&record.subsection2)
        .bind(&record.subsection3)
        .bind(&record.subsection4)
        .bind(&record.page)
        .bind(&record.order)
        .bind(&record.trigger_word)
        .bind(&record.trigger_word_loc)
        .bind(&record.lemma)
        .bind(record.pos.map(|p| p.to_string()))
        .bind(&record.context)
        .bind(&record.literal_meaning)
        .bind(&record.contextual_meaning)
        .bind(record.source_domain.to_string())
        .bind(record.target_domain.to_string())
        .bind(&record.conceptual_metaphor)
        .bind(serde_json::to_string(&record.ontological_mappings)?)
        .bind(serde_json::to_string(&record.epistemic_mappings)?)
        .bind(record.novelty_type.as_str())
        .bind(record.function_type.as_str())
        .bind(record.status.as_str())
        .bind(serde_json::to_string(&record.comments)?)
        .bind(to_db_string(&updated_at));

    if let Some(entry) = audit {
        query = query.bind(serde_json::to_string(entry)?);
    }

    let result = query
        .bind(record.id.to_string())
        .bind(expected_version)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete_annotation(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM annotations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Annotation {}", id)));
    }
    Ok(())
}
