//! Action log queries

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use annot_common::models::{ActionLog, EntityType};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/logs/:entity_type/:entity_id (entity type: projects, documents, annotations)
pub async fn entity_logs(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Vec<ActionLog>>> {
    let entity_type = EntityType::from_path_segment(&entity_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown entity type: {}", entity_type)))?;

    Ok(Json(
        db::action_logs::logs_for_entity(&state.db, entity_type, entity_id).await?,
    ))
}

/// GET /api/users/:id/logs
pub async fn user_logs(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> ApiResult<Json<Vec<ActionLog>>> {
    Ok(Json(db::action_logs::logs_for_user(&state.db, user_id).await?))
}

pub fn log_routes() -> Router<AppState> {
    Router::new()
        .route("/api/logs/:entity_type/:entity_id", get(entity_logs))
        .route("/api/users/:id/logs", get(user_logs))
}
