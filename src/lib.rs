//! # Silo - Entity-attribute-link resource store
//!
//! Arbitrary resources carry a class label, a scalar attribute map and
//! directed, labeled links to other resources, all persisted in SQLite.
//!
//! Silo provides:
//! - Identity management (id + class) and per-resource attribute maps
//! - A directed link graph grouped by link label
//! - A snapshot cache (inline table or sharded files) refilled after every mutation
//! - A small filter/sort/paginate query builder

pub mod value;
pub mod resource;
pub mod storage;
pub mod cache;
pub mod query;
pub mod silo;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::AttributeValue;
pub use resource::{Attributes, LinkMap, Linked, Links, Meta, Resource};
pub use storage::SqliteStore;
pub use cache::{CacheBackend, SnapshotCache};
pub use query::{build_filter, build_group, FilterValue, Predicate, SearchOptions, SearchResults, SortKey};
pub use silo::{parse_id, Silo};

/// Result type alias for Silo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Silo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bad arguments count: {0}")]
    BadArgumentCount(String),

    #[error("Bad id: {0}")]
    InvalidId(String),

    #[error("Attribute value is not scalar: {0}")]
    InvalidAttributeType(String),

    #[error("Bad table prefix: {0} (letters, digits and '_' only)")]
    InvalidPrefix(String),

    #[error("Unsupported backend driver: {0}")]
    UnsupportedBackend(String),

    #[error("Bad request: {0}")]
    BadFilter(String),

    #[error("Can't create cache directory {}: {source}", path.display())]
    CacheIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by a malformed request rather than by the store.
    ///
    /// Front ends map these to a 400-style response.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::BadFilter(_)
                | Error::InvalidId(_)
                | Error::InvalidAttributeType(_)
                | Error::InvalidPrefix(_)
                | Error::BadArgumentCount(_)
        )
    }
}
