//! Import batch history endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use annot_common::models::ImportBatch;
use uuid::Uuid;

use crate::db;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/documents/:id/imports
pub async fn list_imports(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ImportBatch>>> {
    db::documents::get_document(&state.db, document_id).await?;
    Ok(Json(db::import_batches::list_batches(&state.db, document_id).await?))
}

/// GET /api/imports/:id
pub async fn get_import(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ImportBatch>> {
    Ok(Json(db::import_batches::get_batch(&state.db, id).await?))
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/api/documents/:id/imports", get(list_imports))
        .route("/api/imports/:id", get(get_import))
}
