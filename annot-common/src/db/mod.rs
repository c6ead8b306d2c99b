//! Database initialization, migrations and row decoding helpers

pub mod init;
pub mod migrations;
pub mod row;

pub use init::*;
pub use migrations::*;
pub use row::*;
