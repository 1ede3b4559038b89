//! Resource facade - the single entry point over identity, attributes,
//! links, snapshot cache and listings.
//!
//! Cache discipline: reads are cache-first. Every identity or attribute
//! mutation re-reads the resource from storage with the cache bypassed and
//! writes that fresh snapshot back (bypass-refill). Multi-step mutations
//! defer the refill of their inner steps and refill once at the end. Link
//! mutations never touch the cache, since snapshots never contain links.
//!
//! Nothing here is transactional: `create` and `set_all_attributes` are
//! sequences of independent statements.

use std::rc::Rc;
use crate::{Error, Result};
use crate::cache::{CacheBackend, FileCache, InlineCache, SnapshotCache};
use crate::query::{self, SearchOptions, SearchResults};
use crate::resource::{Attributes, LinkMap, Linked, Links, Meta, Resource};
use crate::storage::SqliteStore;
use crate::value::{is_empty_text, is_reserved, AttributeValue};

/// Whether a read may be served from the snapshot cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheRead {
    Use,
    Bypass,
}

/// When a mutation refreshes the cached snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refill {
    Now,
    Deferred,
}

/// Parse a textual resource id.
///
/// Empty (or `0`) means "no id"; anything else must be a non-negative integer.
pub fn parse_id(s: &str) -> Result<Option<u64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let id: u64 = s.parse().map_err(|_| Error::InvalidId(s.to_string()))?;
    Ok(Some(id).filter(|&id| id != 0))
}

/// Entity-attribute-link resource store
pub struct Silo {
    store: Rc<SqliteStore>,
    cache: Option<Box<dyn SnapshotCache>>,
}

impl Silo {
    /// Create a silo over a store, with the selected cache backend
    pub fn new(store: SqliteStore, backend: CacheBackend) -> Self {
        let store = Rc::new(store);
        let cache: Option<Box<dyn SnapshotCache>> = match backend {
            CacheBackend::Disabled => None,
            CacheBackend::Inline => Some(Box::new(InlineCache::new(Rc::clone(&store)))),
            CacheBackend::File(root) => Some(Box::new(FileCache::new(root, store.prefix()))),
        };
        Self { store, cache }
    }

    /// In-memory silo with its schema created (for testing)
    pub fn open_in_memory(prefix: &str, backend: CacheBackend) -> Result<Self> {
        let silo = Self::new(SqliteStore::open_in_memory(prefix)?, backend);
        silo.create_schema()?;
        Ok(silo)
    }

    /// Underlying store
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Name of the active cache backend, if any
    pub fn cache_kind(&self) -> Option<&'static str> {
        self.cache.as_ref().map(|c| c.kind())
    }

    /// Create the tables for the current prefix
    pub fn create_schema(&self) -> Result<()> {
        self.store.create_schema()
    }

    /// Drop the tables for the current prefix (data included).
    ///
    /// Snapshots outside the database are removed too. Dropping tables that
    /// are already gone is not an error.
    pub fn destroy_schema(&self) -> Result<()> {
        if let Some(cache) = self.cache.as_deref().filter(|c| c.kind() != "inline") {
            cache.clear()?;
        }
        self.store.destroy_schema()
    }

    // ========== Resources ==========

    /// Store a new resource of `class` with `attributes`, returning its id
    pub fn create<I, K, V>(&self, class: &str, attributes: I) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let id = self.write_meta(None, class, Refill::Deferred)?;
        let attributes = collect_attributes(attributes);
        if !attributes.is_empty() {
            self.write_all_attributes(id, &attributes, Refill::Deferred)?;
        }
        self.refill(id)?;
        tracing::debug!(id, class, "Created resource");
        Ok(id)
    }

    /// Store a new resource and return it in full.
    ///
    /// `None` only if the resource was deleted between creation and read-back.
    pub fn create_full<I, K, V>(&self, class: &str, attributes: I) -> Result<Option<Resource>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let id = self.create(class, attributes)?;
        self.get(id, false, false)
    }

    /// Store a new resource from a JSON object of attributes.
    ///
    /// Fails with `InvalidAttributeType` on any array or object value,
    /// before anything is written.
    pub fn create_from_json(&self, class: &str, attributes: &serde_json::Map<String, serde_json::Value>) -> Result<u64> {
        let attributes = attributes
            .iter()
            .map(|(k, v)| Ok((k.clone(), AttributeValue::try_from(v)?)))
            .collect::<Result<Vec<_>>>()?;
        self.create(class, attributes)
    }

    /// Retrieve a resource, optionally with its links (ids, or resolved one level deep)
    pub fn get(&self, id: u64, with_links: bool, resolve_links: bool) -> Result<Option<Resource>> {
        let Some(mut resource) = self.load(id, CacheRead::Use)? else {
            return Ok(None);
        };
        if with_links {
            resource.links = Some(Links {
                from: self.to(id, resolve_links)?,
                to: self.from(id, resolve_links)?,
            });
        }
        Ok(Some(resource))
    }

    fn load(&self, id: u64, read: CacheRead) -> Result<Option<Resource>> {
        let cache = self.cache.as_deref().filter(|_| read == CacheRead::Use);

        if let Some(cache) = cache {
            if let Some(resource) = cache.get(id)? {
                tracing::debug!(id, backend = cache.kind(), "Cache hit");
                return Ok(Some(resource));
            }
            tracing::debug!(id, backend = cache.kind(), "Cache miss");
        }

        let Some(meta) = self.store.select_meta(id)? else {
            return Ok(None);
        };
        let resource = Resource::from_parts(meta, self.store.select_all_attributes(id)?);

        if let Some(cache) = cache {
            cache.set(id, Some(&resource))?;
        }
        Ok(Some(resource))
    }

    /// Rewrite the cached snapshot from storage (or drop it if the resource is gone)
    fn refill(&self, id: u64) -> Result<()> {
        let Some(cache) = self.cache.as_deref() else {
            return Ok(());
        };
        let snapshot = self.load(id, CacheRead::Bypass)?;
        tracing::debug!(id, backend = cache.kind(), present = snapshot.is_some(), "Refilling cache");
        cache.set(id, snapshot.as_ref())
    }

    /// Drop every cache entry of the active backend
    pub fn empty_cache(&self) -> Result<()> {
        if let Some(cache) = self.cache.as_deref() {
            tracing::info!(backend = cache.kind(), "Emptying snapshot cache");
            cache.clear()?;
        }
        Ok(())
    }

    // ========== Meta ==========

    /// Identity row of a resource
    pub fn get_meta(&self, id: u64) -> Result<Option<Meta>> {
        self.store.select_meta(id)
    }

    /// Insert (`id` absent) or re-class (`id` present) a resource.
    ///
    /// An explicit id that matches no row is not created: zero rows are
    /// updated and the id is still returned.
    pub fn set_meta(&self, id: Option<u64>, class: &str) -> Result<u64> {
        self.write_meta(id, class, Refill::Now)
    }

    fn write_meta(&self, id: Option<u64>, class: &str, refill: Refill) -> Result<u64> {
        let id = match id.filter(|&id| id != 0) {
            None => self.store.insert_meta(class)?,
            Some(id) => {
                if self.store.update_meta(id, class)? == 0 {
                    tracing::debug!(id, class, "Class update matched no resource, nothing created");
                }
                id
            }
        };
        if refill == Refill::Now {
            self.refill(id)?;
        }
        Ok(id)
    }

    // ========== Attributes ==========

    /// Get an attribute value
    pub fn get_attribute(&self, id: u64, name: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .select_attribute(id, name)?
            .filter(|value| !is_empty_text(value)))
    }

    /// Set an attribute, returning the stored text.
    ///
    /// Reserved names return `None` without writing; falsy values delete the
    /// attribute and return `None`. The text `"0"` is falsy, so a CLI value
    /// of `0` deletes as well.
    pub fn set_attribute(&self, id: u64, name: &str, value: impl Into<AttributeValue>) -> Result<Option<String>> {
        self.write_attribute(id, name, &value.into(), Refill::Now)
    }

    /// Set an attribute from a JSON value; arrays and objects are rejected
    pub fn set_attribute_json(&self, id: u64, name: &str, value: &serde_json::Value) -> Result<Option<String>> {
        let value = AttributeValue::try_from(value)?;
        self.write_attribute(id, name, &value, Refill::Now)
    }

    fn write_attribute(&self, id: u64, name: &str, value: &AttributeValue, refill: Refill) -> Result<Option<String>> {
        if is_reserved(name) {
            return Ok(None);
        }
        let stored = value.to_stored();
        match &stored {
            Some(text) => self.store.replace_attribute(id, name, text)?,
            None => self.store.delete_attribute(id, name)?,
        }
        if refill == Refill::Now {
            self.refill(id)?;
        }
        Ok(stored)
    }

    /// Every attribute of a resource
    pub fn get_all_attributes(&self, id: u64) -> Result<Attributes> {
        self.store.select_all_attributes(id)
    }

    /// Replace every attribute of a resource, returning what was stored.
    ///
    /// The returned map is the stored text of each kept entry, not the input:
    /// reserved names and falsy values are missing from it.
    ///
    /// Deletes all attributes, then sets each entry: a concurrent reader can
    /// observe the resource with no attributes in between.
    pub fn set_all_attributes<I, K, V>(&self, id: u64, attributes: I) -> Result<Attributes>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.write_all_attributes(id, &collect_attributes(attributes), Refill::Now)
    }

    /// Delete every attribute of a resource
    pub fn delete_all_attributes(&self, id: u64) -> Result<()> {
        self.store.delete_all_attributes(id)?;
        self.refill(id)
    }

    fn write_all_attributes(&self, id: u64, attributes: &[(String, AttributeValue)], refill: Refill) -> Result<Attributes> {
        self.store.delete_all_attributes(id)?;
        let mut stored = Attributes::new();
        for (name, value) in attributes {
            if let Some(text) = self.write_attribute(id, name, value, Refill::Deferred)? {
                stored.insert(name.clone(), text);
            }
        }
        if refill == Refill::Now {
            self.refill(id)?;
        }
        Ok(stored)
    }

    // ========== Links ==========

    /// Link `parent` to `child`, labeled `attribute` (default: the child's class).
    ///
    /// Returns `false` when either resource does not exist.
    pub fn link(&self, parent: u64, child: u64, attribute: Option<&str>) -> Result<bool> {
        let (Some(parent), Some(child)) = (self.store.select_meta(parent)?, self.store.select_meta(child)?) else {
            return Ok(false);
        };
        let attribute = attribute.filter(|a| !a.is_empty()).unwrap_or(&child.class);
        self.store.replace_link(parent.id, child.id, attribute)?;
        tracing::debug!(parent = parent.id, child = child.id, attribute, "Linked");
        Ok(true)
    }

    /// Remove links.
    ///
    /// - both ids: every link from `parent` to `child`, whatever its label
    /// - only `parent`: every link from it
    /// - only `child`: every link to it
    /// - neither: nothing
    pub fn unlink(&self, parent: Option<u64>, child: Option<u64>) -> Result<bool> {
        match (parent.filter(|&id| id != 0), child.filter(|&id| id != 0)) {
            (None, None) => {}
            (None, Some(child)) => self.store.delete_links_to(child)?,
            (Some(parent), None) => self.store.delete_links_from(parent)?,
            (Some(parent), Some(child)) => self.store.delete_link(parent, child)?,
        }
        Ok(true)
    }

    /// Remove every link from or to `id`
    pub fn unlink_all(&self, id: u64) -> Result<bool> {
        self.unlink(Some(id), None)?;
        self.unlink(None, Some(id))
    }

    /// Links from `id`, grouped by label
    pub fn from(&self, id: u64, resolve: bool) -> Result<LinkMap> {
        let rows = self.store.select_children(id)?;
        self.group_links(rows, resolve)
    }

    /// Links to `id`, grouped by label
    pub fn to(&self, id: u64, resolve: bool) -> Result<LinkMap> {
        let rows = self.store.select_parents(id)?;
        self.group_links(rows, resolve)
    }

    fn group_links(&self, rows: Vec<(String, u64)>, resolve: bool) -> Result<LinkMap> {
        let mut links = LinkMap::new();
        for (attribute, id) in rows {
            let linked = if resolve {
                match self.get(id, false, false)? {
                    Some(resource) => Linked::Resource(Box::new(resource)),
                    None => {
                        tracing::debug!(id, attribute = %attribute, "Skipping link to missing resource");
                        continue;
                    }
                }
            } else {
                Linked::Id(id)
            };
            links.entry(attribute).or_default().push(linked);
        }
        Ok(links)
    }

    // ========== Listings ==========

    /// List resource ids matching the options
    pub fn search(&self, options: &SearchOptions) -> Result<SearchResults> {
        query::search(&self.store, options)
    }

    /// List matching resources in full
    pub fn search_resources(&self, options: &SearchOptions, with_links: bool, resolve_links: bool) -> Result<Vec<Resource>> {
        let found = self.search(options)?;
        let mut resources = Vec::with_capacity(found.results.len());
        for id in found.results {
            if let Some(resource) = self.get(id, with_links, resolve_links)? {
                resources.push(resource);
            }
        }
        Ok(resources)
    }
}

fn collect_attributes<I, K, V>(attributes: I) -> Vec<(String, AttributeValue)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    attributes
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
