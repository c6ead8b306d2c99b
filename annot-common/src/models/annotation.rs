//! Annotated metaphor records and their audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::text_enum;

/// Fallback for free-text fields that have no better default
pub const FALLBACK_UNDEFINED: &str = "undefined";
/// Fallback trigger word
pub const FALLBACK_TRIGGER_WORD: &str = "unknown_word";
/// Fallback lemma
pub const FALLBACK_LEMMA: &str = "unknown_lemma";
/// Fallback page label
pub const FALLBACK_PAGE: &str = "0";

/// How established a metaphorical expression is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoveltyType {
    #[serde(rename = "novel/creative")]
    NovelCreative,
    #[default]
    #[serde(rename = "conventional")]
    Conventional,
    #[serde(rename = "lexicalized")]
    Lexicalized,
    #[serde(rename = "fossilized")]
    Fossilized,
}

text_enum!(NoveltyType {
    NovelCreative => "novel/creative",
    Conventional => "conventional",
    Lexicalized => "lexicalized",
    Fossilized => "fossilized",
});

impl NoveltyType {
    /// Lenient parse for spreadsheet cells (case-insensitive, accepts aliases)
    pub fn from_cell(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "novel/creative" | "novel" | "creative" => Some(NoveltyType::NovelCreative),
            "conventional" => Some(NoveltyType::Conventional),
            "lexicalized" => Some(NoveltyType::Lexicalized),
            "fossilized" => Some(NoveltyType::Fossilized),
            _ => None,
        }
    }
}

/// Conceptual function of the metaphor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionType {
    #[default]
    Structural,
    Ontological,
    Orientational,
}

text_enum!(FunctionType {
    Structural => "structural",
    Ontological => "ontological",
    Orientational => "orientational",
});

impl FunctionType {
    /// Lenient parse for spreadsheet cells (case-insensitive)
    pub fn from_cell(value: &str) -> Option<Self> {
        value.trim().to_lowercase().parse().ok()
    }
}

/// Review status. Flat set: any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    #[default]
    UnderReview,
    Approved,
    ToEdit,
    Discarded,
    Metonymy,
}

text_enum!(AnnotationStatus {
    UnderReview => "under_review",
    Approved => "approved",
    ToEdit => "to_edit",
    Discarded => "discarded",
    Metonymy => "metonymy",
});

/// Who changed a record and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub timestamp: DateTime<Utc>,
    pub user: Uuid,
}

/// Serialized value of one field before and after an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// One entry of a record's append-only update history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub metadata: AuditMetadata,
    /// Only the fields whose value actually changed, keyed by serialized field name
    pub changes: BTreeMap<String, FieldChange>,
}

/// A stored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub id: Uuid,
    pub custom_id: String,
    pub document_id: Uuid,
    pub expression: String,
    pub section: String,
    pub subsection: Option<String>,
    pub subsection2: Option<String>,
    pub subsection3: Option<String>,
    pub subsection4: Option<String>,
    pub page: String,
    pub order: Option<String>,
    pub trigger_word: String,
    pub trigger_word_loc: Option<String>,
    pub lemma: String,
    pub pos: Option<Uuid>,
    pub context: String,
    pub literal_meaning: String,
    pub contextual_meaning: String,
    pub source_domain: Uuid,
    pub target_domain: Uuid,
    pub conceptual_metaphor: String,
    pub ontological_mappings: Vec<String>,
    pub epistemic_mappings: Vec<String>,
    pub novelty_type: NoveltyType,
    pub function_type: FunctionType,
    pub status: AnnotationStatus,
    pub comments: Vec<String>,
    pub created_by: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updates: Vec<AuditEntry>,
}

/// Fully resolved annotation ready for insertion
///
/// Lookup references are already ids; `status` and `created_by` are set by
/// the caller, never taken from user-supplied rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    pub custom_id: String,
    pub document_id: Uuid,
    pub expression: String,
    #[serde(default = "undefined")]
    pub section: String,
    #[serde(default)]
    pub subsection: Option<String>,
    #[serde(default)]
    pub subsection2: Option<String>,
    #[serde(default)]
    pub subsection3: Option<String>,
    #[serde(default)]
    pub subsection4: Option<String>,
    #[serde(default = "fallback_page")]
    pub page: String,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default = "fallback_trigger_word")]
    pub trigger_word: String,
    #[serde(default)]
    pub trigger_word_loc: Option<String>,
    #[serde(default = "fallback_lemma")]
    pub lemma: String,
    #[serde(default)]
    pub pos: Option<Uuid>,
    #[serde(default = "undefined")]
    pub context: String,
    #[serde(default = "undefined")]
    pub literal_meaning: String,
    #[serde(default = "undefined")]
    pub contextual_meaning: String,
    pub source_domain: Uuid,
    pub target_domain: Uuid,
    #[serde(default = "undefined")]
    pub conceptual_metaphor: String,
    #[serde(default)]
    pub ontological_mappings: Vec<String>,
    #[serde(default)]
    pub epistemic_mappings: Vec<String>,
    #[serde(default)]
    pub novelty_type: NoveltyType,
    #[serde(default)]
    pub function_type: FunctionType,
    #[serde(default)]
    pub status: AnnotationStatus,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_by: Uuid,
}

fn undefined() -> String {
    FALLBACK_UNDEFINED.to_string()
}

fn fallback_page() -> String {
    FALLBACK_PAGE.to_string()
}

fn fallback_trigger_word() -> String {
    FALLBACK_TRIGGER_WORD.to_string()
}

fn fallback_lemma() -> String {
    FALLBACK_LEMMA.to_string()
}

impl NewAnnotation {
    /// Annotation with every optional field at its fallback value
    pub fn with_defaults(
        custom_id: impl Into<String>,
        document_id: Uuid,
        expression: impl Into<String>,
        source_domain: Uuid,
        target_domain: Uuid,
        created_by: Uuid,
    ) -> Self {
        Self {
            custom_id: custom_id.into(),
            document_id,
            expression: expression.into(),
            section: undefined(),
            subsection: None,
            subsection2: None,
            subsection3: None,
            subsection4: None,
            page: fallback_page(),
            order: None,
            trigger_word: fallback_trigger_word(),
            trigger_word_loc: None,
            lemma: fallback_lemma(),
            pos: None,
            context: undefined(),
            literal_meaning: undefined(),
            contextual_meaning: undefined(),
            source_domain,
            target_domain,
            conceptual_metaphor: undefined(),
            ontological_mappings: Vec::new(),
            epistemic_mappings: Vec::new(),
            novelty_type: NoveltyType::default(),
            function_type: FunctionType::default(),
            status: AnnotationStatus::default(),
            comments: Vec::new(),
            created_by,
        }
    }
}

/// Partial update of an annotation
///
/// The closed set of editable fields. `documentId`, `createdBy`, `id`,
/// `version`, timestamps and `updates` are deliberately absent, and unknown
/// fields are rejected during deserialization.
///
/// Optional record fields are `Option<Option<T>>`: absent leaves the field
/// alone, `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub subsection: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub subsection2: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub subsection3: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub subsection4: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub order: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_word: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub trigger_word_loc: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub pos: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_domain: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conceptual_metaphor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontological_mappings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epistemic_mappings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub novelty_type: Option<NoveltyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_type: Option<FunctionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AnnotationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent key (`None`)
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl AnnotationPatch {
    /// Patch that only changes the status
    pub fn status(status: AnnotationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that only replaces the comment list
    pub fn comments(comments: Vec<String>) -> Self {
        Self {
            comments: Some(comments),
            ..Self::default()
        }
    }
}

/// Split a flat `a; b; c` cell into trimmed, non-empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_serialization_matches_stored_labels() {
        assert_eq!(json!(NoveltyType::NovelCreative), json!("novel/creative"));
        assert_eq!(json!(FunctionType::Orientational), json!("orientational"));
        assert_eq!(json!(AnnotationStatus::UnderReview), json!("under_review"));
        assert_eq!(json!(AnnotationStatus::ToEdit), json!("to_edit"));

        for status in AnnotationStatus::ALL {
            assert_eq!(json!(status), json!(status.as_str()));
            assert_eq!(status.as_str().parse::<AnnotationStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(NoveltyType::default(), NoveltyType::Conventional);
        assert_eq!(FunctionType::default(), FunctionType::Structural);
        assert_eq!(AnnotationStatus::default(), AnnotationStatus::UnderReview);
    }

    #[test]
    fn test_novelty_cell_aliases() {
        assert_eq!(NoveltyType::from_cell(" Novel "), Some(NoveltyType::NovelCreative));
        assert_eq!(NoveltyType::from_cell("CREATIVE"), Some(NoveltyType::NovelCreative));
        assert_eq!(NoveltyType::from_cell("Lexicalized"), Some(NoveltyType::Lexicalized));
        assert_eq!(NoveltyType::from_cell("dead"), None);
        assert_eq!(FunctionType::from_cell("Ontological"), Some(FunctionType::Ontological));
        assert_eq!(FunctionType::from_cell("spatial"), None);
    }

    #[test]
    fn test_unknown_status_is_invalid_input() {
        let err = "archived".parse::<AnnotationStatus>().unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" LIFE is a JOURNEY ;; goals = destinations; "),
            vec!["LIFE is a JOURNEY".to_string(), "goals = destinations".to_string()]
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" ; ").is_empty());
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        let err = serde_json::from_value::<AnnotationPatch>(json!({
            "status": "approved",
            "documentId": "00000000-0000-0000-0000-000000000000"
        }));
        assert!(err.is_err());

        let err = serde_json::from_value::<AnnotationPatch>(json!({ "createdBy": "x" }));
        assert!(err.is_err());

        let err = serde_json::from_value::<AnnotationPatch>(json!({ "updates": [] }));
        assert!(err.is_err());
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = AnnotationPatch::status(AnnotationStatus::Approved);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "status": "approved" }));
    }

    #[test]
    fn test_patch_null_clears_optional_field() {
        let patch: AnnotationPatch =
            serde_json::from_value(json!({ "pos": null, "subsection": "1.2" })).unwrap();
        assert_eq!(patch.pos, Some(None));
        assert_eq!(patch.subsection, Some(Some("1.2".to_string())));
        assert_eq!(patch.order, None);

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "pos": null, "subsection": "1.2" })
        );
    }

    #[test]
    fn test_new_annotation_json_applies_fallbacks() {
        let doc = Uuid::new_v4();
        let src = Uuid::new_v4();
        let tgt = Uuid::new_v4();
        let user = Uuid::new_v4();
        let parsed: NewAnnotation = serde_json::from_value(json!({
            "customId": "M-1",
            "documentId": doc,
            "expression": "a rocky road",
            "sourceDomain": src,
            "targetDomain": tgt,
            "createdBy": user,
        }))
        .unwrap();

        assert_eq!(parsed, NewAnnotation::with_defaults("M-1", doc, "a rocky road", src, tgt, user));
        assert_eq!(parsed.trigger_word, FALLBACK_TRIGGER_WORD);
        assert_eq!(parsed.lemma, FALLBACK_LEMMA);
        assert_eq!(parsed.page, FALLBACK_PAGE);
        assert_eq!(parsed.section, FALLBACK_UNDEFINED);
    }
}
