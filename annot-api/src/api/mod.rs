//! HTTP API handlers for annot-api

pub mod annotations;
pub mod auth;
pub mod documents;
pub mod domains;
pub mod health;
pub mod imports;
pub mod logs;
pub mod projects;
pub mod users;

pub use annotations::annotation_routes;
pub use auth::{auth_middleware, AuthUser};
pub use documents::document_routes;
pub use domains::lookup_routes;
pub use health::health_routes;
pub use imports::import_routes;
pub use logs::log_routes;
pub use projects::project_routes;
pub use users::user_routes;
