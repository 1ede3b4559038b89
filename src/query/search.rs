//! Resource listing - filter, composite sort and pagination
//!
//! The base listing selects resource ids joined with their attributes:
//!
//! ```text
//! SELECT id FROM {prefix}_meta LEFT JOIN {prefix}_attribute USING (id)
//! WHERE <predicate> GROUP BY id
//! ```
//!
//! Sort keys wrap that query in reverse declaration order. Each wrap joins
//! the previous query with the attribute table on the key's attribute and
//! ranks rows by `(value, previous rank)`. The outermost wrap belongs to the
//! first key, so it dominates and later keys only break ties. Values are
//! compared as text. A resource without a sort attribute drops out of the
//! sorted listing.

use std::str::FromStr;
use std::time::{Duration, Instant};
use rusqlite::types::Value;
use serde::{Serialize, Serializer};
use crate::{Error, Result};
use crate::storage::SqliteStore;
use super::filter::Predicate;

/// One sort key: attribute name and direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attribute: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self { attribute: attribute.into(), descending: false }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self { attribute: attribute.into(), descending: true }
    }

    /// Parse `"name"`, `"name ASC"` or `"name DESC"`.
    ///
    /// Anything but exactly two words ending in `DESC` sorts ascending.
    pub fn parse(s: &str) -> Result<Self> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let attribute = words
            .first()
            .ok_or_else(|| Error::BadFilter("empty sort key".to_string()))?;
        let descending = words.len() == 2 && words[1].eq_ignore_ascii_case("DESC");
        Ok(Self { attribute: attribute.to_string(), descending })
    }

    fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SortKey::parse(s)
    }
}

/// Listing options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub filter: Option<Predicate>,
    pub order: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Return the assembled query instead of executing it
    pub debug: bool,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Append sort keys from a comma-separated list, e.g. `"name, age DESC"`
    pub fn order_by(mut self, keys: &str) -> Result<Self> {
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            self.order.push(key.parse()?);
        }
        Ok(self)
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.order.push(key);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Outcome of a listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    /// Matching rows before limit/offset
    pub total: u64,
    /// Ids of the requested page, in order
    pub results: Vec<u64>,
    /// Time spent executing the queries
    #[serde(serialize_with = "as_seconds")]
    pub duration: Duration,
    /// Assembled query, set in debug mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

fn as_seconds<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// SQL for a listing, with and without pagination
#[derive(Debug, Clone)]
pub struct AssembledQuery {
    pub sql: String,
    pub params: Vec<Value>,
    pub paged_sql: String,
    pub paged_params: Vec<Value>,
}

fn indent(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().map(|line| format!("\t{}", line)).collect()
}

/// Assemble the listing query for the given tables
pub fn assemble(options: &SearchOptions, meta_table: &str, attribute_table: &str) -> AssembledQuery {
    let mut params = Vec::new();
    let sorted = !options.order.is_empty();

    let mut lines = vec![
        if sorted {
            "SELECT id, ROW_NUMBER() OVER (ORDER BY id) AS sort_rank".to_string()
        } else {
            "SELECT id".to_string()
        },
        format!("FROM {}", meta_table),
        format!("LEFT JOIN {} USING (id)", attribute_table),
    ];
    if let Some(predicate) = &options.filter {
        lines.push(format!("WHERE {}", predicate.to_sql(&mut params)));
    }
    lines.push("GROUP BY id".to_string());

    if sorted {
        for key in options.order.iter().rev() {
            let mut wrapped = vec![
                format!(
                    "SELECT sorted.id AS id, ROW_NUMBER() OVER (ORDER BY sorted.value {}, ranked.sort_rank) AS sort_rank",
                    key.direction()
                ),
                format!("FROM {} AS sorted", attribute_table),
                "JOIN (".to_string(),
            ];
            wrapped.extend(indent(lines));
            wrapped.push(") AS ranked ON ranked.id = sorted.id".to_string());
            wrapped.push("WHERE sorted.attribute = ?".to_string());
            params.push(Value::Text(key.attribute.clone()));
            lines = wrapped;
        }
        let mut outer = vec!["SELECT id FROM (".to_string()];
        outer.extend(indent(lines));
        outer.push(")".to_string());
        outer.push("ORDER BY sort_rank".to_string());
        lines = outer;
    } else {
        lines.push("ORDER BY id".to_string());
    }

    let sql = lines.join("\n");
    let mut paged_sql = sql.clone();
    let mut paged_params = params.clone();
    match (options.limit, options.offset) {
        (Some(limit), Some(offset)) => {
            paged_sql.push_str("\nLIMIT ? OFFSET ?");
            paged_params.push(Value::Integer(limit as i64));
            paged_params.push(Value::Integer(offset as i64));
        }
        (Some(limit), None) => {
            paged_sql.push_str("\nLIMIT ?");
            paged_params.push(Value::Integer(limit as i64));
        }
        (None, Some(offset)) => {
            paged_sql.push_str("\nLIMIT -1 OFFSET ?");
            paged_params.push(Value::Integer(offset as i64));
        }
        (None, None) => {}
    }

    AssembledQuery { sql, params, paged_sql, paged_params }
}

/// Run a listing against the store
pub fn search(store: &SqliteStore, options: &SearchOptions) -> Result<SearchResults> {
    let query = assemble(options, &store.table("meta"), &store.table("attribute"));

    if options.debug {
        return Ok(SearchResults {
            query: Some(query.paged_sql),
            ..Default::default()
        });
    }

    tracing::trace!(sql = %query.paged_sql, "Running resource listing");
    let start = Instant::now();
    let total = store.count_rows(&query.sql, &query.params)?;
    let results = store.query_ids(&query.paged_sql, &query.paged_params)?;
    let duration = start.elapsed();

    tracing::debug!(total, returned = results.len(), ?duration, "Listing done");
    Ok(SearchResults {
        total,
        results,
        duration,
        query: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::build_filter;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("name").unwrap(), SortKey::asc("name"));
        assert_eq!(SortKey::parse("name desc").unwrap(), SortKey::desc("name"));
        assert_eq!(SortKey::parse("name ASC").unwrap(), SortKey::asc("name"));
        assert_eq!(SortKey::parse("name DESC extra").unwrap(), SortKey::asc("name"));
        assert!(SortKey::parse("  ").is_err());
    }

    #[test]
    fn test_order_by_list() {
        let options = SearchOptions::new().order_by("last, first DESC").unwrap();
        assert_eq!(options.order, vec![SortKey::asc("last"), SortKey::desc("first")]);
    }

    #[test]
    fn test_unsorted_query() {
        let options = SearchOptions::new()
            .filter(build_filter("class", "=", "person").unwrap())
            .limit(10);
        let query = assemble(&options, "r_meta", "r_attribute");

        assert_eq!(
            query.sql,
            "SELECT id\nFROM r_meta\nLEFT JOIN r_attribute USING (id)\nWHERE class = ?\nGROUP BY id\nORDER BY id"
        );
        assert!(query.paged_sql.ends_with("LIMIT ?"));
        assert_eq!(query.params.len(), 1);
        assert_eq!(query.paged_params.len(), 2);
    }

    #[test]
    fn test_sort_keys_wrap_in_reverse_order() {
        let options = SearchOptions::new().order_by("last, first DESC").unwrap();
        let query = assemble(&options, "r_meta", "r_attribute");

        // innermost wrap binds the last key first
        assert_eq!(
            query.params,
            vec![Value::Text("first".into()), Value::Text("last".into())]
        );
        let desc = query.sql.find("sorted.value DESC").unwrap();
        let asc = query.sql.find("sorted.value ASC").unwrap();
        assert!(asc < desc, "outermost wrap must belong to the first key");
        assert!(query.sql.ends_with("ORDER BY sort_rank"));
    }

    #[test]
    fn test_offset_without_limit() {
        let query = assemble(&SearchOptions::new().offset(5), "r_meta", "r_attribute");
        assert!(query.paged_sql.ends_with("LIMIT -1 OFFSET ?"));
    }
}
