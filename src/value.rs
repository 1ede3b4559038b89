//! Attribute values - scalar input accepted by the attribute store
//!
//! Every attribute is persisted as text. Input values are scalars:
//! - `Null`, `Bool`, `Integer`, `Float`, `Text`
//!
//! A falsy scalar (`null`, `false`, `0`, `0.0`, `""`, `"0"`) means "no value"
//! and deletes the attribute instead of storing it.

use crate::{Error, Result};

/// Names that belong to the resource itself and can never be attributes.
pub const RESERVED_NAMES: &[&str] = &["id", "class", "links"];

/// Check whether `name` is reserved (ASCII case-insensitive)
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Stored text that reads as "no value"
pub fn is_empty_text(s: &str) -> bool {
    s.is_empty() || s == "0"
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    /// Falsy values are equivalent to absence
    pub fn is_falsy(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Bool(b) => !b,
            AttributeValue::Integer(i) => *i == 0,
            AttributeValue::Float(f) => *f == 0.0,
            AttributeValue::Text(s) => is_empty_text(s),
        }
    }

    /// Textual form as persisted in the attribute table.
    ///
    /// Returns `None` for falsy values, which are never stored.
    pub fn to_stored(&self) -> Option<String> {
        if self.is_falsy() {
            return None;
        }
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(_) => Some("1".to_string()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Float(f) => Some(f.to_string()),
            AttributeValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<&String> for AttributeValue {
    fn from(s: &String) -> Self {
        AttributeValue::Text(s.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

impl TryFrom<&serde_json::Value> for AttributeValue {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(AttributeValue::Null),
            Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(AttributeValue::Integer(i)),
                None => Ok(AttributeValue::Float(n.as_f64().unwrap_or_default())),
            },
            Value::String(s) => Ok(AttributeValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(Error::InvalidAttributeType(value.to_string())),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_stored().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_names_case_insensitive() {
        for name in ["id", "class", "links", "ID", "Id", "CLASS", "Links"] {
            assert!(is_reserved(name), "{} should be reserved", name);
        }
        assert!(!is_reserved("name"));
        assert!(!is_reserved("identity"));
    }

    #[test]
    fn test_falsy_values() {
        assert!(AttributeValue::Null.is_falsy());
        assert!(AttributeValue::from("").is_falsy());
        assert!(AttributeValue::from(0).is_falsy());
        assert!(AttributeValue::from(false).is_falsy());
        assert!(AttributeValue::from(0.0).is_falsy());
        assert!(AttributeValue::from(None::<&str>).is_falsy());

        assert!(AttributeValue::from("0").is_falsy());
        assert!(!AttributeValue::from("00").is_falsy());
        assert!(!AttributeValue::from("0.0").is_falsy());
        assert!(!AttributeValue::from(-1).is_falsy());
    }

    #[test]
    fn test_stored_text() {
        assert_eq!(AttributeValue::from("abc").to_stored().as_deref(), Some("abc"));
        assert_eq!(AttributeValue::from(true).to_stored().as_deref(), Some("1"));
        assert_eq!(AttributeValue::from(42).to_stored().as_deref(), Some("42"));
        assert_eq!(AttributeValue::from(1.5).to_stored().as_deref(), Some("1.5"));
        assert_eq!(AttributeValue::from("").to_stored(), None);
    }

    #[test]
    fn test_json_conversion_rejects_non_scalars() {
        assert_eq!(
            AttributeValue::try_from(&json!("val")).unwrap(),
            AttributeValue::Text("val".into())
        );
        assert_eq!(AttributeValue::try_from(&json!(7)).unwrap(), AttributeValue::Integer(7));

        let err = AttributeValue::try_from(&json!(["value"])).unwrap_err();
        assert!(matches!(err, Error::InvalidAttributeType(_)));
        let err = AttributeValue::try_from(&json!({"a": 1})).unwrap_err();
        assert!(matches!(err, Error::InvalidAttributeType(_)));
    }
}
