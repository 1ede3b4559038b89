//! Inline backend - snapshots stored as rows of the cache table

use std::rc::Rc;
use crate::Result;
use crate::resource::Resource;
use crate::storage::SqliteStore;
use super::{decode, encode, SnapshotCache};

/// Snapshot cache kept in the same database as the resources
pub struct InlineCache {
    store: Rc<SqliteStore>,
}

impl InlineCache {
    pub fn new(store: Rc<SqliteStore>) -> Self {
        Self { store }
    }
}

impl SnapshotCache for InlineCache {
    fn kind(&self) -> &'static str {
        "inline"
    }

    fn get(&self, id: u64) -> Result<Option<Resource>> {
        Ok(self
            .store
            .select_cache(id)?
            .and_then(|payload| decode(id, &payload)))
    }

    fn set(&self, id: u64, snapshot: Option<&Resource>) -> Result<()> {
        match snapshot {
            Some(resource) => self.store.replace_cache(id, &encode(resource)?),
            None => self.store.delete_cache(id),
        }
    }

    fn clear(&self) -> Result<()> {
        self.store.delete_all_cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attributes, Meta};

    fn cache() -> InlineCache {
        let store = SqliteStore::open_in_memory("test").unwrap();
        store.create_schema().unwrap();
        InlineCache::new(Rc::new(store))
    }

    fn sample(id: u64) -> Resource {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), format!("resource {}", id));
        Resource::from_parts(Meta { id, class: "sample".into() }, attributes)
    }

    #[test]
    fn test_set_get_delete() {
        let cache = cache();
        assert!(cache.get(1).unwrap().is_none());

        cache.set(1, Some(&sample(1))).unwrap();
        assert_eq!(cache.get(1).unwrap(), Some(sample(1)));

        cache.set(1, None).unwrap();
        assert!(cache.get(1).unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = cache();
        cache.set(1, Some(&sample(1))).unwrap();
        cache.set(2, Some(&sample(2))).unwrap();
        cache.clear().unwrap();
        assert!(cache.get(1).unwrap().is_none());
        assert!(cache.get(2).unwrap().is_none());
    }
}
