//! Document endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use annot_common::models::{ActionType, Document, DocumentPatch, EntityType};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/documents/:id
pub async fn get_document(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Document>> {
    Ok(Json(db::documents::get_document(&state.db, id).await?))
}

/// PATCH /api/documents/:id
pub async fn update_document(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DocumentPatch>,
) -> ApiResult<Json<Document>> {
    let document = db::documents::update_document(&state.db, id, &patch).await?;

    db::action_logs::record_action(
        &state.db,
        ActionType::Update,
        EntityType::Document,
        id,
        &user,
        Some(serde_json::to_value(&patch).map_err(annot_common::Error::from)?),
    )
    .await?;

    Ok(Json(document))
}

/// DELETE /api/documents/:id (cascades to its annotations)
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    db::documents::delete_document(&state.db, id).await?;
    db::action_logs::record_action(&state.db, ActionType::Delete, EntityType::Document, id, &user, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn document_routes() -> Router<AppState> {
    Router::new().route(
        "/api/documents/:id",
        get(get_document).patch(update_document).delete(delete_document),
    )
}
