//! annot-api library: HTTP service for metaphor annotation projects
//!
//! Exposes the router and application state so integration tests can drive
//! the service without binding a socket.

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{http::HeaderValue, middleware, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::auth::AuthConfig;

/// Default upper bound for spreadsheet uploads
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Token verification settings
    pub auth: AuthConfig,
    /// Body limit for the import endpoint
    pub max_upload_bytes: usize,
    /// Allowed browser origin, if any
    pub cors_origin: Option<String>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, auth: AuthConfig) -> Self {
        Self {
            db,
            auth,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origin: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    match origin.parse::<HeaderValue>() {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
        Err(e) => {
            warn!("Ignoring invalid cors_origin '{}': {}", origin, e);
            None
        }
    }
}

/// Build application router
///
/// `/health` is public; every `/api` route passes through the auth middleware.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(api::user_routes())
        .merge(api::project_routes())
        .merge(api::document_routes())
        .merge(api::lookup_routes())
        .merge(api::annotation_routes(state.max_upload_bytes))
        .merge(api::import_routes())
        .merge(api::log_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let mut router = Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = state.cors_origin.as_deref().and_then(cors_layer) {
        router = router.layer(cors);
    }

    router.with_state(state)
}
