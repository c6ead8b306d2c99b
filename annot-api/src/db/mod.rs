//! Database access layer for annot-api
//!
//! One module per table. Every function takes the pool explicitly and
//! returns `annot_common::Result`; ids and timestamps are stored as TEXT.

pub mod action_logs;
pub mod annotations;
pub mod documents;
pub mod domain_relations;
pub mod domains;
pub mod import_batches;
pub mod pos;
pub mod projects;
pub mod users;
