//! In-place annotation edits with an append-only audit trail
//!
//! An update diffs the patch against the stored record using the serialized
//! JSON form of each field, writes the merged record and, when anything
//! changed, appends one audit entry, all in a single conditional UPDATE.
//! The UPDATE only applies if the record still has the version the diff was
//! computed against; otherwise the record is reloaded and the diff redone.

use annot_common::models::{
    AnnotationPatch, AnnotationRecord, AuditEntry, AuditMetadata, FieldChange,
};
use annot_common::time::now;
use annot_common::{Error, Result};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;

/// Reload-and-retry attempts after the first version conflict
pub const MAX_VERSION_RETRIES: usize = 3;

/// Fields of `patch` whose serialized value differs from `record`
///
/// Keys are the camelCase names used in the serialized record. Comparison is
/// deep and order-sensitive, so reordering a list counts as a change.
pub fn diff(record: &AnnotationRecord, patch: &AnnotationPatch) -> Result<BTreeMap<String, FieldChange>> {
    let current = serde_json::to_value(record)?;
    let proposed = serde_json::to_value(patch)?;

    let mut changes = BTreeMap::new();
    if let Value::Object(fields) = proposed {
        for (field, after) in fields {
            let before = current.get(&field).cloned().unwrap_or(Value::Null);
            if before != after {
                changes.insert(field, FieldChange { before, after });
            }
        }
    }
    Ok(changes)
}

/// The record with every field of `patch` applied
fn apply(record: &AnnotationRecord, patch: &AnnotationPatch) -> Result<AnnotationRecord> {
    let mut merged = serde_json::to_value(record)?;
    if let (Value::Object(target), Value::Object(fields)) = (&mut merged, serde_json::to_value(patch)?) {
        for (field, value) in fields {
            target.insert(field, value);
        }
    }
    Ok(serde_json::from_value(merged)?)
}

/// Patch with text normalised the way it will be stored
fn normalize(patch: &AnnotationPatch) -> AnnotationPatch {
    let mut normalized = patch.clone();
    if let Some(custom_id) = normalized.custom_id.as_mut() {
        *custom_id = custom_id.trim().to_string();
    }
    normalized
}

fn validate(patch: &AnnotationPatch) -> Result<()> {
    if matches!(&patch.custom_id, Some(id) if id.trim().is_empty()) {
        return Err(Error::InvalidInput("customId cannot be empty".to_string()));
    }
    if matches!(&patch.expression, Some(expr) if expr.trim().is_empty()) {
        return Err(Error::InvalidInput("expression cannot be empty".to_string()));
    }
    Ok(())
}

/// Apply `patch` to annotation `id` on behalf of `user_id`
///
/// Returns the stored record and the audit entry this call appended, if any.
/// NotFound when the record does not exist. A patch that changes nothing
/// still bumps the version but appends no audit entry.
pub async fn update_one(
    pool: &SqlitePool,
    id: Uuid,
    patch: &AnnotationPatch,
    user_id: Uuid,
) -> Result<(AnnotationRecord, Option<AuditEntry>)> {
    let patch = &normalize(patch);
    validate(patch)?;

    for attempt in 0..=MAX_VERSION_RETRIES {
        let current = db::annotations::get_annotation(pool, id).await?;

        let changes = diff(&current, patch)?;
        let updated = apply(&current, patch)?;
        let timestamp = now();

        let audit = (!changes.is_empty()).then(|| AuditEntry {
            metadata: AuditMetadata {
                timestamp,
                user: user_id,
            },
            changes,
        });

        let written = db::annotations::write_update(pool, &updated, current.version, audit.as_ref(), timestamp)
            .await
            .map_err(|e| translate_write_error(e, patch))?;

        if written {
            match &audit {
                Some(entry) => info!(
                    annotation_id = %id,
                    user_id = %user_id,
                    fields = ?entry.changes.keys().collect::<Vec<_>>(),
                    "Annotation updated"
                ),
                None => debug!(annotation_id = %id, "Annotation update changed nothing"),
            }
            let record = db::annotations::get_annotation(pool, id).await?;
            return Ok((record, audit));
        }

        warn!(
            annotation_id = %id,
            attempt = attempt + 1,
            expected_version = current.version,
            "Version conflict, reloading annotation"
        );
    }

    Err(Error::Conflict(format!(
        "Annotation {} kept changing concurrently; update abandoned after {} retries",
        id, MAX_VERSION_RETRIES
    )))
}

fn translate_write_error(err: Error, patch: &AnnotationPatch) -> Error {
    if err.is_unique_violation() {
        let custom_id = patch.custom_id.as_deref().unwrap_or_default();
        return Error::Conflict(format!("customId already in use: {}", custom_id));
    }
    if err.is_foreign_key_violation() {
        return Error::InvalidInput(
            "sourceDomain, targetDomain or pos refers to an unknown entry".to_string(),
        );
    }
    err
}

/// Outcome of a bulk status or comment change
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateOutcome {
    pub updated: Vec<AnnotationRecord>,
    pub not_found: Vec<Uuid>,
}

/// Apply the same patch to many records, each through [`update_one`]
///
/// Unknown ids are collected rather than failing the batch; any other
/// error stops it.
pub async fn update_many(
    pool: &SqlitePool,
    ids: &[Uuid],
    patch: &AnnotationPatch,
    user_id: Uuid,
) -> Result<BulkUpdateOutcome> {
    let mut outcome = BulkUpdateOutcome::default();

    for id in ids {
        match update_one(pool, *id, patch, user_id).await {
            Ok((record, _)) => outcome.updated.push(record),
            Err(Error::NotFound(_)) => outcome.not_found.push(*id),
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annot_common::models::{AnnotationStatus, NewAnnotation};
    use serde_json::json;

    fn record() -> AnnotationRecord {
        let new = NewAnnotation::with_defaults(
            "M-1",
            Uuid::new_v4(),
            "a rocky road",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        AnnotationRecord {
            id: Uuid::new_v4(),
            custom_id: new.custom_id,
            document_id: new.document_id,
            expression: new.expression,
            section: new.section,
            subsection: None,
            subsection2: None,
            subsection3: None,
            subsection4: None,
            page: new.page,
            order: None,
            trigger_word: new.trigger_word,
            trigger_word_loc: None,
            lemma: new.lemma,
            pos: None,
            context: new.context,
            literal_meaning: new.literal_meaning,
            contextual_meaning: new.contextual_meaning,
            source_domain: new.source_domain,
            target_domain: new.target_domain,
            conceptual_metaphor: new.conceptual_metaphor,
            ontological_mappings: vec!["a".into(), "b".into()],
            epistemic_mappings: Vec::new(),
            novelty_type: new.novelty_type,
            function_type: new.function_type,
            status: AnnotationStatus::UnderReview,
            comments: Vec::new(),
            created_by: new.created_by,
            version: 1,
            created_at: now(),
            updated_at: now(),
            updates: Vec::new(),
        }
    }

    #[test]
    fn test_diff_only_reports_changed_fields() {
        let rec = record();
        let patch = AnnotationPatch {
            status: Some(AnnotationStatus::Approved),
            expression: Some("a rocky road".into()),
            ..AnnotationPatch::default()
        };

        let changes = diff(&rec, &patch).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["status"].before, json!("under_review"));
        assert_eq!(changes["status"].after, json!("approved"));
    }

    #[test]
    fn test_diff_is_order_sensitive_for_lists() {
        let rec = record();
        let patch = AnnotationPatch {
            ontological_mappings: Some(vec!["b".into(), "a".into()]),
            ..AnnotationPatch::default()
        };

        let changes = diff(&rec, &patch).unwrap();
        assert_eq!(changes["ontologicalMappings"].before, json!(["a", "b"]));
        assert_eq!(changes["ontologicalMappings"].after, json!(["b", "a"]));
    }

    #[test]
    fn test_empty_patch_has_no_changes() {
        assert!(diff(&record(), &AnnotationPatch::default()).unwrap().is_empty());
    }

    #[test]
    fn test_apply_merges_patch() {
        let rec = record();
        let patch = AnnotationPatch {
            lemma: Some("road".into()),
            pos: Some(Some(Uuid::nil())),
            ..AnnotationPatch::default()
        };

        let merged = apply(&rec, &patch).unwrap();
        assert_eq!(merged.lemma, "road");
        assert_eq!(merged.pos, Some(Uuid::nil()));
        assert_eq!(merged.expression, rec.expression);
        assert_eq!(merged.version, rec.version);
    }

    #[test]
    fn test_padded_custom_id_matches_stored_value() {
        let rec = record();
        let patch = normalize(&AnnotationPatch {
            custom_id: Some(" M-1 ".into()),
            ..AnnotationPatch::default()
        });
        assert!(diff(&rec, &patch).unwrap().is_empty());
    }

    #[test]
    fn test_null_clears_optional_field() {
        let mut rec = record();
        rec.pos = Some(Uuid::nil());
        let patch: AnnotationPatch = serde_json::from_value(json!({ "pos": null })).unwrap();

        let changes = diff(&rec, &patch).unwrap();
        assert_eq!(changes["pos"].before, json!(Uuid::nil()));
        assert_eq!(changes["pos"].after, Value::Null);
        assert_eq!(apply(&rec, &patch).unwrap().pos, None);
    }

    #[test]
    fn test_empty_custom_id_rejected() {
        let patch = AnnotationPatch {
            custom_id: Some("  ".into()),
            ..AnnotationPatch::default()
        };
        assert!(matches!(validate(&patch), Err(Error::InvalidInput(_))));
    }
}
