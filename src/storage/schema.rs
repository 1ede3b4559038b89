//! Database schema definitions
//!
//! Table names are built from the store prefix: `PREFIX` in every
//! statement is replaced with the (lowercased) prefix.

use crate::{Error, Result};

/// Placeholder substituted with the table prefix
pub const PREFIX: &str = "PREFIX";

/// Default table prefix
pub const DEFAULT_PREFIX: &str = "resource";

/// Table suffixes, in creation order
pub const TABLES: &[&str] = &["meta", "attribute", "link", "cache"];

/// SQL dialects the schema is provided for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
}

impl Dialect {
    /// Resolve a driver name as reported by the backend
    pub fn from_driver(driver: &str) -> Result<Self> {
        match driver.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            _ => Err(Error::UnsupportedBackend(driver.to_string())),
        }
    }

    fn statements(&self) -> &'static [&'static str] {
        match self {
            Dialect::Sqlite => SQLITE_SCHEMA,
            Dialect::Mysql => MYSQL_SCHEMA,
        }
    }
}

const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS PREFIX_meta ( id INTEGER PRIMARY KEY, class VARCHAR(255) NOT NULL )",
    "CREATE TABLE IF NOT EXISTS PREFIX_attribute ( id INTEGER NOT NULL, attribute VARCHAR(255) NOT NULL, value TEXT NOT NULL, PRIMARY KEY (id, attribute) )",
    "CREATE TABLE IF NOT EXISTS PREFIX_link ( id_parent INTEGER NOT NULL, id_child INTEGER NOT NULL, attribute VARCHAR(255) NOT NULL, PRIMARY KEY (id_parent, id_child, attribute) )",
    "CREATE TABLE IF NOT EXISTS PREFIX_cache ( id INTEGER NOT NULL, resource TEXT NOT NULL, PRIMARY KEY (id) )",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_meta_class ON PREFIX_meta (class)",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_attribute_name ON PREFIX_attribute (attribute)",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_attribute_id ON PREFIX_attribute (id)",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_link_parent ON PREFIX_link (id_parent)",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_link_child ON PREFIX_link (id_child)",
    "CREATE INDEX IF NOT EXISTS PREFIX_idx_link_attribute ON PREFIX_link (attribute)",
];

const MYSQL_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS `PREFIX_meta` ( `id` INT(10) UNSIGNED NOT NULL AUTO_INCREMENT, `class` VARCHAR(255) NOT NULL, PRIMARY KEY (`id`), INDEX `class` (`class`) )",
    "CREATE TABLE IF NOT EXISTS `PREFIX_attribute` ( `id` INT(10) UNSIGNED NOT NULL, `attribute` VARCHAR(255) NOT NULL, `value` LONGTEXT NOT NULL, PRIMARY KEY (`id`, `attribute`), INDEX `attribute` (`attribute`), INDEX `id` (`id`) ) COLLATE=\"utf8_unicode_ci\"",
    "CREATE TABLE IF NOT EXISTS `PREFIX_link` ( `id_parent` INT(10) UNSIGNED NOT NULL, `id_child` INT(10) UNSIGNED NOT NULL, `attribute` VARCHAR(255) NOT NULL, PRIMARY KEY (`id_parent`, `id_child`, `attribute`), INDEX `id_parent` (`id_parent`), INDEX `id_child` (`id_child`), INDEX `attribute` (`attribute`) ) COLLATE=\"utf8_unicode_ci\"",
    "CREATE TABLE IF NOT EXISTS `PREFIX_cache` ( `id` INT(10) UNSIGNED NOT NULL, `resource` LONGTEXT NOT NULL, PRIMARY KEY (`id`) ) COLLATE=\"utf8_unicode_ci\"",
];

/// Normalize a user supplied prefix; empty means the default.
///
/// The prefix ends up in table names and cache paths, so only ASCII
/// letters, digits and `_` are accepted.
pub fn normalize_prefix(prefix: &str) -> Result<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(DEFAULT_PREFIX.to_string());
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidPrefix(prefix.to_string()));
    }
    Ok(prefix.to_ascii_lowercase())
}

/// All schema creation statements for a driver, with the prefix applied
pub fn create_statements(driver: &str, prefix: &str) -> Result<Vec<String>> {
    let dialect = Dialect::from_driver(driver)?;
    Ok(dialect
        .statements()
        .iter()
        .map(|stmt| stmt.replace(PREFIX, prefix))
        .collect())
}

/// Statements dropping every table of the prefix (data included)
pub fn drop_statements(prefix: &str) -> Vec<String> {
    TABLES
        .iter()
        .map(|table| format!("DROP TABLE IF EXISTS {}_{}", prefix, table))
        .collect()
}

/// Full table name for a suffix
pub fn table_name(prefix: &str, suffix: &str) -> String {
    format!("{}_{}", prefix, suffix)
}
