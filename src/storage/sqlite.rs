//! SQLite storage implementation

use std::path::Path;
use rusqlite::{CachedStatement, Connection, OptionalExtension, params, params_from_iter};
use rusqlite::types::Value;
use crate::Result;
use crate::resource::{Attributes, Meta};
use super::schema;

/// Fixed set of statements the store prepares.
///
/// Each statement is rendered once per store (prefix applied) and prepared
/// on first use through the connection's statement cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    SelectMeta,
    InsertMeta,
    UpdateMeta,
    SelectAttribute,
    SelectAllAttributes,
    ReplaceAttribute,
    DeleteAttribute,
    DeleteAllAttributes,
    ReplaceLink,
    DeleteLink,
    DeleteLinksFrom,
    DeleteLinksTo,
    SelectChildren,
    SelectParents,
    SelectCache,
    ReplaceCache,
    DeleteCache,
    DeleteAllCache,
}

impl Statement {
    /// Get all statements, in discriminant order
    pub fn all() -> &'static [Statement] {
        &[
            Statement::SelectMeta,
            Statement::InsertMeta,
            Statement::UpdateMeta,
            Statement::SelectAttribute,
            Statement::SelectAllAttributes,
            Statement::ReplaceAttribute,
            Statement::DeleteAttribute,
            Statement::DeleteAllAttributes,
            Statement::ReplaceLink,
            Statement::DeleteLink,
            Statement::DeleteLinksFrom,
            Statement::DeleteLinksTo,
            Statement::SelectChildren,
            Statement::SelectParents,
            Statement::SelectCache,
            Statement::ReplaceCache,
            Statement::DeleteCache,
            Statement::DeleteAllCache,
        ]
    }

    /// SQL template, `PREFIX` stands for the table prefix
    fn template(&self) -> &'static str {
        match self {
            Statement::SelectMeta => "SELECT id, class FROM PREFIX_meta WHERE id = ?1",
            Statement::InsertMeta => "INSERT INTO PREFIX_meta (class) VALUES (?1)",
            Statement::UpdateMeta => "UPDATE PREFIX_meta SET class = ?1 WHERE id = ?2",
            Statement::SelectAttribute => "SELECT value FROM PREFIX_attribute WHERE id = ?1 AND attribute = ?2 LIMIT 1",
            Statement::SelectAllAttributes => "SELECT attribute, value FROM PREFIX_attribute WHERE id = ?1",
            Statement::ReplaceAttribute => "INSERT OR REPLACE INTO PREFIX_attribute (id, attribute, value) VALUES (?1, ?2, ?3)",
            Statement::DeleteAttribute => "DELETE FROM PREFIX_attribute WHERE id = ?1 AND attribute = ?2",
            Statement::DeleteAllAttributes => "DELETE FROM PREFIX_attribute WHERE id = ?1",
            Statement::ReplaceLink => "INSERT OR REPLACE INTO PREFIX_link (id_parent, id_child, attribute) VALUES (?1, ?2, ?3)",
            Statement::DeleteLink => "DELETE FROM PREFIX_link WHERE id_parent = ?1 AND id_child = ?2",
            Statement::DeleteLinksFrom => "DELETE FROM PREFIX_link WHERE id_parent = ?1",
            Statement::DeleteLinksTo => "DELETE FROM PREFIX_link WHERE id_child = ?1",
            Statement::SelectChildren => "SELECT attribute, id_child FROM PREFIX_link WHERE id_parent = ?1 ORDER BY rowid",
            Statement::SelectParents => "SELECT attribute, id_parent FROM PREFIX_link WHERE id_child = ?1 ORDER BY rowid",
            Statement::SelectCache => "SELECT resource FROM PREFIX_cache WHERE id = ?1",
            Statement::ReplaceCache => "INSERT OR REPLACE INTO PREFIX_cache (id, resource) VALUES (?1, ?2)",
            Statement::DeleteCache => "DELETE FROM PREFIX_cache WHERE id = ?1",
            Statement::DeleteAllCache => "DELETE FROM PREFIX_cache",
        }
    }
}

/// SQLite-backed storage for resources, attributes, links and cache rows
pub struct SqliteStore {
    conn: Connection,
    prefix: String,
    sql: Vec<String>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        Self::with_connection(Connection::open(path)?, prefix)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(prefix: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, prefix)
    }

    /// Wrap an existing connection
    pub fn with_connection(conn: Connection, prefix: &str) -> Result<Self> {
        let prefix = schema::normalize_prefix(prefix)?;
        let sql = Statement::all()
            .iter()
            .map(|stmt| stmt.template().replace(schema::PREFIX, &prefix))
            .collect();
        conn.set_prepared_statement_cache_capacity(Statement::all().len() + 4);
        Ok(Self { conn, prefix, sql })
    }

    /// Table prefix in use
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full name of one of the store's tables
    pub fn table(&self, suffix: &str) -> String {
        schema::table_name(&self.prefix, suffix)
    }

    /// Name of the backend driver, used to pick the schema dialect
    pub fn driver(&self) -> &'static str {
        "sqlite"
    }

    fn prepare(&self, stmt: Statement) -> Result<CachedStatement<'_>> {
        Ok(self.conn.prepare_cached(&self.sql[stmt as usize])?)
    }

    // ========== Schema ==========

    /// Create the store tables for the current prefix
    pub fn create_schema(&self) -> Result<()> {
        for stmt in schema::create_statements(self.driver(), &self.prefix)? {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    /// Drop the store tables for the current prefix (data included)
    pub fn destroy_schema(&self) -> Result<()> {
        self.conn.flush_prepared_statement_cache();
        for stmt in schema::drop_statements(&self.prefix) {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    /// List the tables present in the database
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tables)
    }

    // ========== Meta Operations ==========

    /// Get the identity row of a resource
    pub fn select_meta(&self, id: u64) -> Result<Option<Meta>> {
        self.prepare(Statement::SelectMeta)?
            .query_row([id as i64], |row| {
                Ok(Meta {
                    id: row.get::<_, i64>(0)? as u64,
                    class: row.get(1)?,
                })
            })
            .optional()
            .map_err(Into::into)
    }

    /// Insert a new identity row, returning the assigned id
    pub fn insert_meta(&self, class: &str) -> Result<u64> {
        self.prepare(Statement::InsertMeta)?.execute([class])?;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    /// Change the class of an identity row, returning the affected row count
    pub fn update_meta(&self, id: u64, class: &str) -> Result<usize> {
        let changed = self.prepare(Statement::UpdateMeta)?.execute(params![class, id as i64])?;
        Ok(changed)
    }

    // ========== Attribute Operations ==========

    /// Get a single attribute value
    pub fn select_attribute(&self, id: u64, name: &str) -> Result<Option<String>> {
        self.prepare(Statement::SelectAttribute)?
            .query_row(params![id as i64, name], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Get every attribute of a resource
    pub fn select_all_attributes(&self, id: u64) -> Result<Attributes> {
        let mut stmt = self.prepare(Statement::SelectAllAttributes)?;
        let rows = stmt.query_map([id as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut attributes = Attributes::new();
        for row in rows {
            let (name, value): (String, String) = row?;
            attributes.insert(name, value);
        }
        Ok(attributes)
    }

    /// Insert or replace an attribute value
    pub fn replace_attribute(&self, id: u64, name: &str, value: &str) -> Result<()> {
        self.prepare(Statement::ReplaceAttribute)?.execute(params![id as i64, name, value])?;
        Ok(())
    }

    /// Delete an attribute
    pub fn delete_attribute(&self, id: u64, name: &str) -> Result<()> {
        self.prepare(Statement::DeleteAttribute)?.execute(params![id as i64, name])?;
        Ok(())
    }

    /// Delete every attribute of a resource
    pub fn delete_all_attributes(&self, id: u64) -> Result<()> {
        self.prepare(Statement::DeleteAllAttributes)?.execute([id as i64])?;
        Ok(())
    }

    // ========== Link Operations ==========

    /// Insert or replace a link
    pub fn replace_link(&self, parent: u64, child: u64, attribute: &str) -> Result<()> {
        self.prepare(Statement::ReplaceLink)?
            .execute(params![parent as i64, child as i64, attribute])?;
        Ok(())
    }

    /// Delete every link between parent and child, whatever its attribute
    pub fn delete_link(&self, parent: u64, child: u64) -> Result<()> {
        self.prepare(Statement::DeleteLink)?.execute(params![parent as i64, child as i64])?;
        Ok(())
    }

    /// Delete every link from a parent
    pub fn delete_links_from(&self, parent: u64) -> Result<()> {
        self.prepare(Statement::DeleteLinksFrom)?.execute([parent as i64])?;
        Ok(())
    }

    /// Delete every link to a child
    pub fn delete_links_to(&self, child: u64) -> Result<()> {
        self.prepare(Statement::DeleteLinksTo)?.execute([child as i64])?;
        Ok(())
    }

    /// Links from a resource as `(attribute, child id)`, in insertion order
    pub fn select_children(&self, id: u64) -> Result<Vec<(String, u64)>> {
        self.select_neighbors(Statement::SelectChildren, id)
    }

    /// Links to a resource as `(attribute, parent id)`, in insertion order
    pub fn select_parents(&self, id: u64) -> Result<Vec<(String, u64)>> {
        self.select_neighbors(Statement::SelectParents, id)
    }

    fn select_neighbors(&self, stmt: Statement, id: u64) -> Result<Vec<(String, u64)>> {
        let mut stmt = self.prepare(stmt)?;
        let links = stmt
            .query_map([id as i64], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    // ========== Cache Rows ==========

    /// Get an encoded snapshot
    pub fn select_cache(&self, id: u64) -> Result<Option<String>> {
        self.prepare(Statement::SelectCache)?
            .query_row([id as i64], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Insert or replace an encoded snapshot
    pub fn replace_cache(&self, id: u64, payload: &str) -> Result<()> {
        self.prepare(Statement::ReplaceCache)?.execute(params![id as i64, payload])?;
        Ok(())
    }

    /// Delete a cached snapshot
    pub fn delete_cache(&self, id: u64) -> Result<()> {
        self.prepare(Statement::DeleteCache)?.execute([id as i64])?;
        Ok(())
    }

    /// Delete every cached snapshot
    pub fn delete_all_cache(&self) -> Result<()> {
        self.prepare(Statement::DeleteAllCache)?.execute([])?;
        Ok(())
    }

    // ========== Dynamic Queries ==========

    /// Run a listing query returning ids in row order
    pub fn query_ids(&self, sql: &str, params: &[Value]) -> Result<Vec<u64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?
            .map(|r| r.map(|id| id as u64))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Count the rows of a query
    pub fn count_rows(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let count_sql = format!("SELECT COUNT(*) FROM (\n{}\n)", sql);
        let count: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Count identity rows
    pub fn count_resources(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table("meta"));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
