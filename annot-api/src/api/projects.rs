//! Project endpoints, including the documents nested under a project

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use annot_common::models::{
    ActionType, Document, EntityType, NewDocument, NewProject, Project, ProjectPatch,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::db;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub owner: Option<Uuid>,
}

/// GET /api/projects?owner=<id>
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(db::projects::list_projects(&state.db, query.owner).await?))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = db::projects::create_project(&state.db, &body, user.id).await?;

    db::action_logs::record_action(
        &state.db,
        ActionType::Create,
        EntityType::Project,
        project.id,
        &user,
        Some(json!({ "name": project.name })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:id
pub async fn get_project(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Project>> {
    Ok(Json(db::projects::get_project(&state.db, id).await?))
}

/// PATCH /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<Json<Project>> {
    let project = db::projects::update_project(&state.db, id, &patch).await?;

    db::action_logs::record_action(
        &state.db,
        ActionType::Update,
        EntityType::Project,
        id,
        &user,
        Some(serde_json::to_value(&patch).map_err(annot_common::Error::from)?),
    )
    .await?;

    Ok(Json(project))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    db::projects::delete_project(&state.db, id).await?;
    db::action_logs::record_action(&state.db, ActionType::Delete, EntityType::Project, id, &user, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/:id/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Document>>> {
    db::projects::get_project(&state.db, project_id).await?;
    Ok(Json(db::documents::list_documents(&state.db, project_id).await?))
}

/// POST /api/projects/:id/documents
pub async fn create_document(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let document = db::documents::create_document(&state.db, project_id, &body, user.id).await?;

    db::action_logs::record_action(
        &state.db,
        ActionType::Create,
        EntityType::Document,
        document.id,
        &user,
        Some(json!({ "projectId": project_id, "title": document.title })),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route(
            "/api/projects/:id/documents",
            get(list_documents).post(create_document),
        )
}
