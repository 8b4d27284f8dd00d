//! Typed field values and coercion rules

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The declared coercion target of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// An extracted field value.
///
/// `Integer` is listed before `Float` so untagged deserialization keeps
/// integral numbers integral instead of widening them to `f64`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl FieldKind {
    /// Coerce a non-null JSON leaf into a typed value.
    ///
    /// Returns a description of the offending shape on failure; the caller
    /// attaches field and path context.
    pub fn coerce(&self, raw: &Value) -> Result<FieldValue, String> {
        match self {
            FieldKind::Integer => coerce_integer(raw),
            FieldKind::Float => match raw.as_f64() {
                Some(v) => Ok(FieldValue::Float(v)),
                None => Err(shape_of(raw).to_string()),
            },
            FieldKind::Text => match raw {
                Value::String(v) => Ok(FieldValue::Text(v.clone())),
                other => Err(shape_of(other).to_string()),
            },
        }
    }
}

/// Integral numbers pass even when the provider serializes them with a
/// fractional point (`94.0`); genuinely fractional numbers do not.
fn coerce_integer(raw: &Value) -> Result<FieldValue, String> {
    let number = match raw {
        Value::Number(n) => n,
        other => return Err(shape_of(other).to_string()),
    };

    if let Some(v) = number.as_i64() {
        return Ok(FieldValue::Integer(v));
    }
    if let Some(v) = number.as_f64() {
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
            return Ok(FieldValue::Integer(v as i64));
        }
        if v.fract() != 0.0 {
            return Err("fractional number".to_string());
        }
    }
    Err("number out of range".to_string())
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
