//! Filter predicates - structured `WHERE` fragments for resource listings
//!
//! A predicate is built with [`build_filter`] / [`build_group`] and rendered
//! to SQL with every literal bound as a parameter:
//! - `id` / `class` compare the identity columns directly
//! - any other field tests attribute membership: `attribute = ? AND value <op> ?`

use rusqlite::types::Value;
use std::str::FromStr;
use crate::{Error, Result};

/// Comparison operators accepted by [`build_filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    Different,
    Like,
    In,
}

impl Operator {
    /// Get the SQL spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Different => "<>",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }

    /// Get all operators
    pub fn all() -> &'static [Operator] {
        &[
            Operator::Eq,
            Operator::NotEq,
            Operator::LessOrEqual,
            Operator::GreaterOrEqual,
            Operator::Less,
            Operator::Greater,
            Operator::Different,
            Operator::Like,
            Operator::In,
        ]
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Operator::all()
            .iter()
            .find(|op| op.as_str() == upper)
            .copied()
            .ok_or_else(|| Error::BadFilter(format!("unknown operator '{}'", s)))
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean operator joining grouped predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOp {
    And,
    Or,
}

impl GroupOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOp::And => "AND",
            GroupOp::Or => "OR",
        }
    }
}

impl FromStr for GroupOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(GroupOp::And),
            "OR" => Ok(GroupOp::Or),
            _ => Err(Error::BadFilter(format!("unknown group operator '{}'", s))),
        }
    }
}

/// Field a predicate applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Class,
    Attribute(String),
}

impl Field {
    pub fn parse(name: &str) -> Self {
        match name {
            "id" => Field::Id,
            "class" => Field::Class,
            other => Field::Attribute(other.to_string()),
        }
    }

    fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Field::Id => "id".to_string(),
            Field::Class => "class".to_string(),
            Field::Attribute(name) => {
                params.push(Value::Text(name.clone()));
                "attribute = ? AND value".to_string()
            }
        }
    }
}

/// Right-hand side of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    fn type_name(&self) -> &'static str {
        match self {
            FilterValue::Text(_) => "string",
            FilterValue::List(_) => "list",
            FilterValue::Integer(_) => "integer",
            FilterValue::Float(_) => "float",
            FilterValue::Bool(_) => "boolean",
            FilterValue::Null => "null",
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        FilterValue::List(list)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(list: Vec<&str>) -> Self {
        FilterValue::List(list.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for FilterValue {
    fn from(list: &[&str]) -> Self {
        FilterValue::List(list.iter().map(|s| s.to_string()).collect())
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Integer(i)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        FilterValue::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

/// A composable piece of listing logic
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> value`
    Compare {
        field: Field,
        operator: Operator,
        value: String,
    },
    /// `field IN (values...)`
    Membership { field: Field, values: Vec<String> },
    /// `(p1) OP (p2) OP ...`
    Group { op: GroupOp, parts: Vec<Predicate> },
}

impl Predicate {
    /// Render to SQL, appending bound values to `params` in placeholder order
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Compare { field, operator, value } => {
                let lhs = field.to_sql(params);
                params.push(Value::Text(value.clone()));
                format!("{} {} ?", lhs, operator)
            }
            Predicate::Membership { field, values } => {
                let lhs = field.to_sql(params);
                params.extend(values.iter().cloned().map(Value::Text));
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ( {} )", lhs, placeholders)
            }
            Predicate::Group { op, parts } => parts
                .iter()
                .map(|part| format!("( {} )", part.to_sql(params)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op.as_str())),
        }
    }
}

/// Build a single-field predicate.
///
/// `IN` takes a list or a comma-separated string (elements are trimmed);
/// every other operator takes a string.
pub fn build_filter(field: &str, operator: &str, value: impl Into<FilterValue>) -> Result<Predicate> {
    let operator: Operator = operator.parse()?;
    let field = Field::parse(field);
    let value = value.into();

    if operator == Operator::In {
        let values: Vec<String> = match value {
            FilterValue::List(list) => list.iter().map(|v| v.trim().to_string()).collect(),
            FilterValue::Text(text) => text.split(',').map(|v| v.trim().to_string()).collect(),
            other => {
                return Err(Error::BadFilter(format!(
                    "IN expects a list or a comma-separated string, got {}",
                    other.type_name()
                )));
            }
        };
        if values.is_empty() {
            return Err(Error::BadFilter("IN expects at least one value".to_string()));
        }
        return Ok(Predicate::Membership { field, values });
    }

    match value {
        FilterValue::Text(value) => Ok(Predicate::Compare { field, operator, value }),
        other => Err(Error::BadFilter(format!(
            "{} expects a string, got {}",
            operator,
            other.type_name()
        ))),
    }
}

/// Join predicates with `AND` / `OR` (case-insensitive)
pub fn build_group(op: &str, parts: impl IntoIterator<Item = Predicate>) -> Result<Predicate> {
    let op: GroupOp = op.parse()?;
    let parts: Vec<Predicate> = parts.into_iter().collect();
    if parts.is_empty() {
        return Err(Error::BadFilter(format!("{} group needs at least one filter", op.as_str())));
    }
    Ok(Predicate::Group { op, parts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(params: &[Value]) -> Vec<String> {
        params
            .iter()
            .map(|v| match v {
                Value::Text(s) => s.clone(),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_meta_field_filter() {
        let mut params = Vec::new();
        let sql = build_filter("class", "=", "person").unwrap().to_sql(&mut params);
        assert_eq!(sql, "class = ?");
        assert_eq!(texts(&params), vec!["person"]);
    }

    #[test]
    fn test_attribute_filter_binds_name_and_value() {
        let mut params = Vec::new();
        let sql = build_filter("name", "like", "%Doe").unwrap().to_sql(&mut params);
        assert_eq!(sql, "attribute = ? AND value LIKE ?");
        assert_eq!(texts(&params), vec!["name", "%Doe"]);
    }

    #[test]
    fn test_values_are_never_interpolated() {
        let mut params = Vec::new();
        let sql = build_filter("name", "=", "x' OR '1'='1").unwrap().to_sql(&mut params);
        assert!(!sql.contains('\''));
        assert_eq!(texts(&params)[1], "x' OR '1'='1");
    }

    #[test]
    fn test_in_from_string_and_list() {
        let mut params = Vec::new();
        let sql = build_filter("id", "in", "1, 2,3").unwrap().to_sql(&mut params);
        assert_eq!(sql, "id IN ( ?, ?, ? )");
        assert_eq!(texts(&params), vec!["1", "2", "3"]);

        let from_list = build_filter("id", "IN", vec!["1", "2", "3"]).unwrap();
        assert_eq!(from_list, build_filter("id", "IN", "1,2,3").unwrap());
    }

    #[test]
    fn test_bad_filters() {
        assert!(matches!(build_filter("id", "BETWEEN", "1"), Err(Error::BadFilter(_))));
        assert!(matches!(build_filter("id", "=", 5i64), Err(Error::BadFilter(_))));
        assert!(matches!(build_filter("id", "LIKE", vec!["a"]), Err(Error::BadFilter(_))));
        assert!(matches!(build_filter("id", "IN", true), Err(Error::BadFilter(_))));
    }

    #[test]
    fn test_group_rendering() {
        let a = build_filter("class", "=", "person").unwrap();
        let b = build_filter("name", "!=", "John").unwrap();
        let mut params = Vec::new();
        let sql = build_group(" or ", vec![a, b]).unwrap().to_sql(&mut params);
        assert_eq!(sql, "( class = ? ) OR ( attribute = ? AND value != ? )");
        assert_eq!(texts(&params), vec!["person", "name", "John"]);
    }

    #[test]
    fn test_bad_groups() {
        let a = build_filter("class", "=", "person").unwrap();
        assert!(matches!(build_group("AND", Vec::new()), Err(Error::BadFilter(_))));
        assert!(matches!(build_group("XOR", vec![a]), Err(Error::BadFilter(_))));
    }
}
