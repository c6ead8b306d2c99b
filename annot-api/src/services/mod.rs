//! Annotation workflows built on top of the repositories

pub mod bulk_import;
pub mod change_tracker;
pub mod export;
pub mod lookup_registry;
pub mod sheet;
