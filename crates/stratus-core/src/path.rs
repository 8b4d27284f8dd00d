//! Path expressions into nested documents
//!
//! A path like `weather[0].description` is parsed once into key/index
//! segments. The same compiled form drives in-process extraction and the
//! generated MySQL JSON paths, so the two read paths cannot diverge.

use crate::{FlattenError, FlattenResult};
use serde_json::Value;
use std::fmt;

/// One step into a document: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse an expression of the form `key[idx].key...`.
    pub fn parse(expr: &str) -> FlattenResult<Self> {
        if expr.is_empty() {
            return Err(invalid(expr, "empty expression"));
        }

        let mut segments = Vec::new();
        for part in expr.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(invalid(expr, "empty key segment"));
            }
            segments.push(Segment::Key(key.to_string()));

            while !rest.is_empty() {
                if !rest.starts_with('[') {
                    return Err(invalid(expr, "expected `[` after index"));
                }
                let close = rest
                    .find(']')
                    .ok_or_else(|| invalid(expr, "unclosed `[`"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid(expr, "index is not a number"))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the document; any failed step resolves to `None`.
    ///
    /// Descent through a node of the wrong shape (a scalar where an object
    /// is needed, an object where an array is needed) also yields `None`;
    /// only leaf values are subject to shape errors, and those are judged
    /// by the caller's coercion.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut node = root;
        for segment in &self.segments {
            node = match segment {
                Segment::Key(key) => node.as_object()?.get(key)?,
                Segment::Index(index) => node.as_array()?.get(*index)?,
            };
        }
        Some(node)
    }

    /// Render as a MySQL JSON path (`$.weather[0].description`).
    pub fn to_mysql(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            match segment {
                Segment::Key(key) if is_bare_key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                Segment::Key(key) => {
                    out.push_str(".\"");
                    out.push_str(key);
                    out.push('"');
                }
                Segment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
            first = false;
        }
        Ok(())
    }
}

fn invalid(expr: &str, reason: &str) -> FlattenError {
    FlattenError::InvalidPath {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}

/// MySQL JSON paths only allow unquoted ECMAScript-identifier keys.
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
