//! Annotation endpoints: listing, single edits, status transitions, bulk
//! changes, spreadsheet import and export

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use annot_common::models::{
    ActionType, AnnotationPatch, AnnotationRecord, AnnotationStatus, EntityType, NewAnnotation,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::db;
use crate::db::annotations::AnnotationFilter;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, PageQuery};
use crate::services::bulk_import::{bulk_import, ImportOutcome};
use crate::services::change_tracker::{update_many, update_one, BulkUpdateOutcome};
use crate::services::export::{export_annotations, XLSX_CONTENT_TYPE};
use crate::AppState;

/// GET /api/documents/:id/annotations?page=N&status=...&search=...
pub async fn list_annotations(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<AnnotationFilter>,
) -> ApiResult<Json<Page<AnnotationRecord>>> {
    db::documents::get_document(&state.db, document_id).await?;
    Ok(Json(
        db::annotations::list_annotations(&state.db, document_id, &filter, page.page).await?,
    ))
}

/// POST /api/documents/:id/annotations
///
/// `documentId` and `createdBy` come from the path and the token; the
/// status always starts at `under_review`.
pub async fn create_annotation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(document_id): Path<Uuid>,
    Json(mut body): Json<Value>,
) -> ApiResult<(StatusCode, Json<AnnotationRecord>)> {
    db::documents::get_document(&state.db, document_id).await?;

    let fields = body
        .as_object_mut()
        .ok_or_else(|| ApiError::BadRequest("Annotation must be a JSON object".to_string()))?;
    fields.insert("documentId".to_string(), json!(document_id));
    fields.insert("createdBy".to_string(), json!(user.id));
    fields.remove("status");

    let new: NewAnnotation = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid annotation: {}", e)))?;

    let record = db::annotations::insert_annotation(&state.db, &new)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict(format!("Duplicate customId: {}", new.custom_id))
            } else if e.is_foreign_key_violation() {
                ApiError::BadRequest("sourceDomain, targetDomain or pos refers to an unknown entry".to_string())
            } else {
                ApiError::from(e)
            }
        })?;

    db::action_logs::record_action(
        &state.db,
        ActionType::Create,
        EntityType::Annotation,
        record.id,
        &user,
        Some(json!({ "customId": record.custom_id })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/annotations/:id (includes the update history)
pub async fn get_annotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    Ok(Json(db::annotations::get_annotation(&state.db, id).await?))
}

async fn apply_patch(
    state: &AppState,
    user: &annot_common::models::User,
    id: Uuid,
    patch: &AnnotationPatch,
) -> ApiResult<AnnotationRecord> {
    let (record, entry) = update_one(&state.db, id, patch, user.id).await?;

    // Only log edits that produced a new audit entry
    if let Some(entry) = entry {
        let fields: Vec<&String> = entry.changes.keys().collect();
        db::action_logs::record_action(
            &state.db,
            ActionType::Update,
            EntityType::Annotation,
            id,
            user,
            Some(json!({ "fields": fields })),
        )
        .await?;
    }

    Ok(record)
}

/// PATCH /api/annotations/:id
pub async fn update_annotation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AnnotationPatch>,
) -> ApiResult<Json<AnnotationRecord>> {
    Ok(Json(apply_patch(&state, &user, id, &patch).await?))
}

async fn transition(
    state: AppState,
    user: annot_common::models::User,
    id: Uuid,
    status: AnnotationStatus,
) -> ApiResult<Json<AnnotationRecord>> {
    Ok(Json(
        apply_patch(&state, &user, id, &AnnotationPatch::status(status)).await?,
    ))
}

/// PATCH /api/annotations/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    transition(state, user, id, AnnotationStatus::Approved).await
}

/// PATCH /api/annotations/:id/to-edit
pub async fn to_edit(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    transition(state, user, id, AnnotationStatus::ToEdit).await
}

/// PATCH /api/annotations/:id/discard
pub async fn discard(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    transition(state, user, id, AnnotationStatus::Discarded).await
}

/// PATCH /api/annotations/:id/metonymy
pub async fn metonymy(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    transition(state, user, id, AnnotationStatus::Metonymy).await
}

/// PATCH /api/annotations/:id/under-review
pub async fn under_review(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotationRecord>> {
    transition(state, user, id, AnnotationStatus::UnderReview).await
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkStatusRequest {
    pub ids: Vec<Uuid>,
    pub status: AnnotationStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkCommentsRequest {
    pub ids: Vec<Uuid>,
    pub comments: Vec<String>,
}

async fn log_bulk(
    state: &AppState,
    user: &annot_common::models::User,
    outcome: &BulkUpdateOutcome,
    details: Value,
) -> ApiResult<()> {
    for record in &outcome.updated {
        db::action_logs::record_action(
            &state.db,
            ActionType::Update,
            EntityType::Annotation,
            record.id,
            user,
            Some(details.clone()),
        )
        .await?;
    }
    Ok(())
}

/// PATCH /api/annotations/bulk/status
pub async fn bulk_status(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<BulkStatusRequest>,
) -> ApiResult<Json<BulkUpdateOutcome>> {
    let outcome = update_many(&state.db, &body.ids, &AnnotationPatch::status(body.status), user.id).await?;
    log_bulk(&state, &user, &outcome, json!({ "bulk": "status", "status": body.status })).await?;
    Ok(Json(outcome))
}

/// PATCH /api/annotations/bulk/comments
pub async fn bulk_comments(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<BulkCommentsRequest>,
) -> ApiResult<Json<BulkUpdateOutcome>> {
    let outcome = update_many(&state.db, &body.ids, &AnnotationPatch::comments(body.comments), user.id).await?;
    log_bulk(&state, &user, &outcome, json!({ "bulk": "comments" })).await?;
    Ok(Json(outcome))
}

/// DELETE /api/annotations/:id
pub async fn delete_annotation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    db::annotations::delete_annotation(&state.db, id).await?;
    db::action_logs::record_action(&state.db, ActionType::Delete, EntityType::Annotation, id, &user, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/documents/:id/annotations/import (multipart, `file` part)
pub async fn import_annotations(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(document_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportOutcome>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' part".to_string()))?;

    let outcome = bulk_import(&state.db, &bytes, file_name.as_deref(), document_id, &user).await?;
    Ok(Json(outcome))
}

/// GET /api/documents/:id/annotations/export?status=...
pub async fn export(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(filter): Query<AnnotationFilter>,
) -> ApiResult<Response> {
    let bytes = export_annotations(&state.db, document_id, &filter).await?;
    let disposition = format!("attachment; filename=\"metaphors-{}.xlsx\"", document_id);

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub fn annotation_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/documents/:id/annotations",
            get(list_annotations).post(create_annotation),
        )
        .route(
            "/api/documents/:id/annotations/import",
            post(import_annotations).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/documents/:id/annotations/export", get(export))
        .route("/api/annotations/bulk/status", patch(bulk_status))
        .route("/api/annotations/bulk/comments", patch(bulk_comments))
        .route(
            "/api/annotations/:id",
            get(get_annotation)
                .patch(update_annotation)
                .delete(delete_annotation),
        )
        .route("/api/annotations/:id/approve", patch(approve))
        .route("/api/annotations/:id/to-edit", patch(to_edit))
        .route("/api/annotations/:id/discard", patch(discard))
        .route("/api/annotations/:id/metonymy", patch(metonymy))
        .route("/api/annotations/:id/under-review", patch(under_review))
}
