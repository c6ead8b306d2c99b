//! HTTP-level tests driven through the router with `oneshot`

mod common;

use annot_api::api::auth::{issue_token, AuthConfig};
use annot_api::services::export::XLSX_CONTENT_TYPE;
use annot_api::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{body_bytes, body_json, csv, HEADER};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

const BOUNDARY: &str = "annot-test-boundary";

fn request(method: &str, uri: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", user.to_string())
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, user: Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", user.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(uri: &str, user: Uuid, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-User-Id", user.to_string())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = body_bytes(response.into_body()).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn import_sample(app: &Router, env: &common::TestEnv) -> Value {
    let file = csv(&[
        HEADER,
        "A-1,time is running out,TIME IS A RESOURCE,RESOURCE,TIME,running,run,verb,conventional,structural",
        "A-2,a rocky road,LIFE IS A JOURNEY,JOURNEY,LIFE,road,road,noun,novel,ontological",
    ]);
    let uri = format!("/api/documents/{}/annotations/import", env.document.id);
    let (status, body) = send(app, upload_request(&uri, env.user.id, "sample.csv", &file)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "annot-api");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let req = Request::builder().uri("/api/me").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_user_is_unauthorized() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (status, _) = send(&app, request("GET", "/api/me", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_acting_user() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (status, body) = send(&app, request("GET", "/api/me", env.user.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.org");
    assert_eq!(body["role"], "editor");
}

#[tokio::test]
async fn test_bearer_token_mode() {
    let env = common::setup().await;
    let auth = AuthConfig::with_secret("test-secret", 3600);
    let token = issue_token(&auth, &env.user).unwrap();
    let app = build_router(AppState::new(env.pool.clone(), auth));

    let ok = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, ok).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], env.user.id.to_string());

    // The development header is ignored once a secret is configured
    let (status, _) = send(&app, request("GET", "/api/me", env.user.id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {}x", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Projects and documents
// =============================================================================

#[tokio::test]
async fn test_project_and_document_crud() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (status, project) = send(
        &app,
        json_request(
            "POST",
            "/api/projects",
            env.user.id,
            json!({ "name": "Corpus B", "contactEmail": "b@example.org" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["owner"], env.user.id.to_string());
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, document) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/projects/{}/documents", project_id),
            env.user.id,
            json!({ "title": "Essay", "type": "article", "language": "es" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["status"], "draft");
    let document_id = document["id"].as_str().unwrap().to_string();

    let (status, patched) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/documents/{}", document_id),
            env.user.id,
            json!({ "status": "published" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "published");

    let (status, listed) = send(
        &app,
        request("GET", &format!("/api/projects/{}/documents", project_id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/projects/{}", project_id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/documents/{}", document_id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_project_changes_are_logged() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (_, project) = send(
        &app,
        json_request(
            "POST",
            "/api/projects",
            env.user.id,
            json!({ "name": "Logged", "contactEmail": "l@example.org" }),
        ),
    )
    .await;
    let project_id = project["id"].as_str().unwrap();

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/projects/{}", project_id),
            env.user.id,
            json!({ "notes": "second pass" }),
        ),
    )
    .await;

    let (status, logs) = send(
        &app,
        request("GET", &format!("/api/logs/projects/{}", project_id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["UPDATE", "CREATE"]);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/logs/users/{}", project_id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Annotations
// =============================================================================

#[tokio::test]
async fn test_import_list_and_filter() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let outcome = import_sample(&app, &env).await;
    assert_eq!(outcome["created"].as_array().unwrap().len(), 2);
    assert!(outcome["errors"].as_array().unwrap().is_empty());
    assert!(outcome["batchId"].is_string());

    let base = format!("/api/documents/{}/annotations", env.document.id);
    let (status, page) = send(&app, request("GET", &base, env.user.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["totalPages"], 1);
    assert_eq!(page["items"][0]["customId"], "A-1");

    let (_, filtered) = send(
        &app,
        request("GET", &format!("{}?noveltyType=novel%2Fcreative", base), env.user.id),
    )
    .await;
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["items"][0]["customId"], "A-2");

    let (_, searched) = send(&app, request("GET", &format!("{}?search=rocky", base), env.user.id)).await;
    assert_eq!(searched["total"], 1);

    let (status, batches) = send(
        &app,
        request("GET", &format!("/api/documents/{}/imports", env.document.id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batches[0]["fileName"], "sample.csv");
    assert_eq!(batches[0]["createdCount"], 2);
}

#[tokio::test]
async fn test_import_without_file_part_is_bad_request() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/documents/{}/annotations/import", env.document.id))
        .header("X-User-Id", env.user.id.to_string())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(format!("--{}--\r\n", BOUNDARY)))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_missing_column_is_rejected() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let file = csv(&["customId,expression", "Z-1,lonely"]);
    let uri = format!("/api/documents/{}/annotations/import", env.document.id);
    let (status, body) = send(&app, upload_request(&uri, env.user.id, "bad.csv", &file)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "IMPORT_REJECTED");
}

#[tokio::test]
async fn test_create_and_edit_annotation() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (_, source) = send(
        &app,
        json_request("POST", "/api/domains", env.user.id, json!({ "name": "WAR", "type": "source" })),
    )
    .await;
    let (_, target) = send(
        &app,
        json_request("POST", "/api/domains", env.user.id, json!({ "name": "ARGUMENT", "type": "target" })),
    )
    .await;

    let uri = format!("/api/documents/{}/annotations", env.document.id);
    let body = json!({
        "customId": "W-1",
        "expression": "he attacked every weak point",
        "sourceDomain": source["id"],
        "targetDomain": target["id"],
        "status": "approved",
    });
    let (status, created) = send(&app, json_request("POST", &uri, env.user.id, body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "under_review");
    assert_eq!(created["createdBy"], env.user.id.to_string());
    assert_eq!(created["lemma"], "unknown_lemma");

    let (status, _) = send(&app, json_request("POST", &uri, env.user.id, body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = created["id"].as_str().unwrap();
    let (status, approved) = send(
        &app,
        request("PATCH", &format!("/api/annotations/{}/approve", id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["updates"].as_array().unwrap().len(), 1);
    assert_eq!(approved["updates"][0]["changes"]["status"]["before"], "under_review");

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/annotations/{}", id),
            env.user.id,
            json!({ "createdBy": Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, logs) = send(
        &app,
        request("GET", &format!("/api/logs/annotations/{}", id), env.user.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_status_change() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let outcome = import_sample(&app, &env).await;
    let ids: Vec<Value> = outcome["created"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].clone())
        .collect();
    let missing = Uuid::new_v4();

    let mut all = ids.clone();
    all.push(json!(missing));
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            "/api/annotations/bulk/status",
            env.user.id,
            json!({ "ids": all, "status": "discarded" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"].as_array().unwrap().len(), 2);
    assert_eq!(body["notFound"][0], missing.to_string());

    let (_, page) = send(
        &app,
        request(
            "GET",
            &format!("/api/documents/{}/annotations?status=discarded", env.document.id),
            env.user.id,
        ),
    )
    .await;
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn test_export_returns_workbook() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);
    import_sample(&app, &env).await;

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/documents/{}/annotations/export", env.document.id),
            env.user.id,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        XLSX_CONTENT_TYPE
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(".xlsx"));

    let bytes = body_bytes(response.into_body()).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_export_unknown_document_is_not_found() {
    let env = common::setup().await;
    let app = common::dev_router(&env.pool);

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/api/documents/{}/annotations/export", Uuid::new_v4()),
            env.user.id,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
