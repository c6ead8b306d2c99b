//! # Annotation Common Library
//!
//! Shared code for the metaphor annotation service:
//! - Domain models (annotations, lookups, projects, documents, users)
//! - Database initialization and schema migrations
//! - Configuration loading
//! - Error types
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
