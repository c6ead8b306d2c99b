//! User endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use annot_common::models::{NewUser, User, UserPatch};
use serde_json::Value;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/me
pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<User> {
    Json(user)
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(db::users::list_users(&state.db).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = db::users::create_user(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<User>> {
    Ok(Json(db::users::get_user(&state.db, id).await?))
}

/// PATCH /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> ApiResult<Json<User>> {
    Ok(Json(db::users::update_user(&state.db, id, &patch).await?))
}

/// DELETE /api/users/:id
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    db::users::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:id/column-preferences
pub async fn set_column_preferences(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(preferences): Json<Value>,
) -> ApiResult<Json<User>> {
    Ok(Json(
        db::users::set_column_preferences(&state.db, id, &preferences).await?,
    ))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/users/:id/column-preferences", put(set_column_preferences))
}
