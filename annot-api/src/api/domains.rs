//! Lookup endpoints: domains, domain relations, parts of speech

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use annot_common::models::{
    Domain, DomainPatch, DomainRelation, DomainRelationPatch, DomainType, NewDomain,
    NewDomainRelation, Pos,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    #[serde(rename = "type")]
    pub domain_type: Option<DomainType>,
}

/// GET /api/domains?type=source
pub async fn list_domains(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> ApiResult<Json<Vec<Domain>>> {
    Ok(Json(db::domains::list_domains(&state.db, query.domain_type).await?))
}

/// POST /api/domains
pub async fn create_domain(
    State(state): State<AppState>,
    Json(body): Json<NewDomain>,
) -> ApiResult<(StatusCode, Json<Domain>)> {
    let domain = db::domains::create_domain(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn get_domain(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Domain>> {
    Ok(Json(db::domains::get_domain(&state.db, id).await?))
}

pub async fn update_domain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DomainPatch>,
) -> ApiResult<Json<Domain>> {
    Ok(Json(db::domains::update_domain(&state.db, id, &patch).await?))
}

pub async fn delete_domain(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    db::domains::delete_domain(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_relations(State(state): State<AppState>) -> ApiResult<Json<Vec<DomainRelation>>> {
    Ok(Json(db::domain_relations::list_relations(&state.db).await?))
}

pub async fn create_relation(
    State(state): State<AppState>,
    Json(body): Json<NewDomainRelation>,
) -> ApiResult<(StatusCode, Json<DomainRelation>)> {
    let relation = db::domain_relations::create_relation(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(relation)))
}

pub async fn get_relation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DomainRelation>> {
    Ok(Json(db::domain_relations::get_relation(&state.db, id).await?))
}

pub async fn update_relation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DomainRelationPatch>,
) -> ApiResult<Json<DomainRelation>> {
    Ok(Json(
        db::domain_relations::update_relation(&state.db, id, &patch).await?,
    ))
}

pub async fn delete_relation(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    db::domain_relations::delete_relation(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/pos
pub async fn list_pos(State(state): State<AppState>) -> ApiResult<Json<Vec<Pos>>> {
    Ok(Json(db::pos::list_pos(&state.db).await?))
}

pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/domains", get(list_domains).post(create_domain))
        .route(
            "/api/domains/:id",
            get(get_domain).patch(update_domain).delete(delete_domain),
        )
        .route("/api/domain-relations", get(list_relations).post(create_relation))
        .route(
            "/api/domain-relations/:id",
            get(get_relation).patch(update_relation).delete(delete_relation),
        )
        .route("/api/pos", get(list_pos))
}
