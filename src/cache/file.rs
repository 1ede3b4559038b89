//! File backend - one JSON file per resource
//!
//! Layout: `{root}/{namespace}/{h[0]}/{h[1]}/{h}` where `h` is the hex
//! BLAKE3 digest of the decimal resource id. Writes go straight to the
//! target file, so a racing reader may see a partial file (treated as a miss).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use crate::{Error, Result};
use crate::resource::Resource;
use super::{decode, encode, SnapshotCache};

/// Snapshot cache in a sharded directory tree
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    namespace: String,
}

impl FileCache {
    /// `namespace` is usually the store's table prefix
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespace: namespace.into(),
        }
    }

    /// Directory holding every entry of this namespace
    pub fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }

    /// Path of the cache file for a resource id
    pub fn entry_path(&self, id: u64) -> PathBuf {
        let hash = blake3::hash(id.to_string().as_bytes()).to_hex();
        let hash = hash.as_str();
        self.namespace_dir()
            .join(&hash[0..1])
            .join(&hash[1..2])
            .join(hash)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            fs::create_dir_all(dir).map_err(|source| Error::CacheIo {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

impl SnapshotCache for FileCache {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn get(&self, id: u64) -> Result<Option<Resource>> {
        let bytes = match fs::read(self.entry_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match std::str::from_utf8(&bytes) {
            Ok(payload) => Ok(decode(id, payload)),
            Err(e) => {
                tracing::warn!(id, error = %e, "Cache entry is not valid UTF-8, ignoring");
                Ok(None)
            }
        }
    }

    fn set(&self, id: u64, snapshot: Option<&Resource>) -> Result<()> {
        let path = self.entry_path(id);
        match snapshot {
            Some(resource) => {
                if let Some(dir) = path.parent() {
                    self.ensure_dir(dir)?;
                }
                fs::write(&path, encode(resource)?)?;
            }
            None => match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(self.namespace_dir()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attributes, Meta};
    use tempfile::TempDir;

    fn sample(id: u64) -> Resource {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), "Régis Doe".into());
        Resource::from_parts(Meta { id, class: "person".into() }, attributes)
    }

    #[test]
    fn test_sharded_layout() {
        let cache = FileCache::new("/tmp/cache", "resource");
        let path = cache.entry_path(1);
        let hash = blake3::hash(b"1").to_hex().to_string();

        assert_eq!(hash.len(), 64);
        assert_eq!(
            path,
            PathBuf::from("/tmp/cache/resource")
                .join(&hash[0..1])
                .join(&hash[1..2])
                .join(&hash)
        );
    }

    #[test]
    fn test_set_get_delete() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), "test");

        assert!(cache.get(3).unwrap().is_none());
        cache.set(3, Some(&sample(3))).unwrap();
        assert!(cache.entry_path(3).is_file());
        assert_eq!(cache.get(3).unwrap(), Some(sample(3)));

        cache.set(3, None).unwrap();
        assert!(cache.get(3).unwrap().is_none());
        // deleting a missing entry is fine
        cache.set(3, None).unwrap();
    }

    #[test]
    fn test_partial_file_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), "test");
        cache.set(5, Some(&sample(5))).unwrap();
        fs::write(cache.entry_path(5), "{\"id\":5,").unwrap();
        assert!(cache.get(5).unwrap().is_none());
    }

    #[test]
    fn test_write_cut_mid_character_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), "test");
        cache.set(5, Some(&sample(5))).unwrap();

        let full = fs::read(cache.entry_path(5)).unwrap();
        // keep the first byte of the two-byte 'é'
        let cut = full.iter().position(|&b| b == 0xC3).unwrap() + 1;
        fs::write(cache.entry_path(5), &full[..cut]).unwrap();

        assert!(cache.get(5).unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_tree() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), "test");
        cache.set(1, Some(&sample(1))).unwrap();
        cache.set(2, Some(&sample(2))).unwrap();

        cache.clear().unwrap();
        assert!(!cache.namespace_dir().exists());
        assert!(cache.get(1).unwrap().is_none());
        cache.clear().unwrap();
    }

    #[test]
    fn test_unwritable_root_is_cache_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let cache = FileCache::new(&blocker, "test");
        let err = cache.set(1, Some(&sample(1))).unwrap_err();
        assert!(matches!(err, Error::CacheIo { .. }));
    }
}
