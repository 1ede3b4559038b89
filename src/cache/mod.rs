//! Snapshot Cache - denormalized meta + attributes per resource
//!
//! Two interchangeable backends behind [`SnapshotCache`]:
//! - [`InlineCache`]: one row per resource in the `{prefix}_cache` table
//! - [`FileCache`]: one JSON file per resource in a sharded directory tree
//!
//! Both store the same JSON encoding. Entries are derived data: they can be
//! dropped at any time and are never the origin of links.

pub mod file;
pub mod inline;

pub use file::FileCache;
pub use inline::InlineCache;

use std::path::PathBuf;
use crate::Result;
use crate::resource::Resource;

/// Backend selection at construction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// No snapshot cache, every read goes to storage
    Disabled,
    /// Snapshot rows in the store's cache table
    #[default]
    Inline,
    /// Snapshot files under the given root directory
    File(PathBuf),
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Disabled => "disabled",
            CacheBackend::Inline => "inline",
            CacheBackend::File(_) => "file",
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::File(root) => write!(f, "file ({})", root.display()),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Storage of resource snapshots keyed by resource id
pub trait SnapshotCache {
    /// Short backend name, for logs
    fn kind(&self) -> &'static str;

    /// Fetch a snapshot; `None` is a miss
    fn get(&self, id: u64) -> Result<Option<Resource>>;

    /// Store or overwrite a snapshot; `None` deletes the entry
    fn set(&self, id: u64, snapshot: Option<&Resource>) -> Result<()>;

    /// Drop every entry
    fn clear(&self) -> Result<()>;
}

/// Encode a snapshot (links are never cached)
pub fn encode(resource: &Resource) -> Result<String> {
    Ok(serde_json::to_string(&resource.snapshot())?)
}

/// Decode a snapshot; empty or undecodable payloads count as a miss
pub fn decode(id: u64, payload: &str) -> Option<Resource> {
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str(payload) {
        Ok(resource) => Some(resource),
        Err(e) => {
            tracing::warn!(id, "Discarding undecodable cache entry: {}", e);
            None
        }
    }
}
