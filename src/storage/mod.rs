//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables (named `{prefix}_{table}`):
//! - meta(id, class)
//! - attribute(id, attribute, value)
//! - link(id_parent, id_child, attribute)
//! - cache(id, resource)

pub mod schema;
pub mod sqlite;

pub use schema::Dialect;
pub use sqlite::{SqliteStore, Statement};
