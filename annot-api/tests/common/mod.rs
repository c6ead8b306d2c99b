//! Shared fixtures for annot-api integration tests
#![allow(dead_code)]

use annot_api::api::auth::AuthConfig;
use annot_api::{build_router, db, AppState};
use annot_common::models::{Document, DocumentStatus, NewDocument, NewProject, NewUser, Project, User, UserRole};
use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A fresh database with one user, project and document
pub struct TestEnv {
    /// Keeps the database directory alive for the test's duration
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub user: User,
    pub project: Project,
    pub document: Document,
}

pub async fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let pool = annot_common::db::init_database(&dir.path().join("annot.db"))
        .await
        .unwrap();

    let user = create_user(&pool, "Ada Annotator", "ada@example.org").await;

    let project = db::projects::create_project(
        &pool,
        &NewProject {
            name: "Corpus A".to_string(),
            description: None,
            owner: None,
            reviewers: vec![],
            contact_email: "ada@example.org".to_string(),
            notes: None,
        },
        user.id,
    )
    .await
    .unwrap();

    let document = create_document(&pool, &project, &user, "Chapter 1").await;

    TestEnv {
        dir,
        pool,
        user,
        project,
        document,
    }
}

pub async fn create_user(pool: &SqlitePool, name: &str, email: &str) -> User {
    db::users::create_user(
        pool,
        &NewUser {
            name: name.to_string(),
            email: email.to_string(),
            google_id: None,
            avatar: None,
            role: UserRole::Editor,
        },
    )
    .await
    .unwrap()
}

pub async fn create_document(pool: &SqlitePool, project: &Project, user: &User, title: &str) -> Document {
    db::documents::create_document(
        pool,
        project.id,
        &NewDocument {
            title: title.to_string(),
            description: None,
            doc_type: "book".to_string(),
            language: "en".to_string(),
            notes: None,
            storage_path_pdf: None,
            storage_path_txt: None,
            status: DocumentStatus::Draft,
        },
        user.id,
    )
    .await
    .unwrap()
}

/// Router in development auth mode (acting user from `X-User-Id`)
pub fn dev_router(pool: &SqlitePool) -> Router {
    build_router(AppState::new(pool.clone(), AuthConfig::development()))
}

/// Build a CSV upload from a header line and data lines
pub fn csv(lines: &[&str]) -> Vec<u8> {
    let mut text = lines.join("\n");
    text.push('\n');
    text.into_bytes()
}

pub const HEADER: &str =
    "Custom ID,Expression,Conceptual Metaphor,Source Domain,Target Domain,Trigger Word,Lemma,POS,Novelty Type,Function Type";

pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}
