//! Schema flattening for nested weather-observation documents
//!
//! This crate maps one provider document onto a fixed relational schema:
//! a declarative field table drives per-field extraction, record assembly,
//! read-time reconstruction, and the storage strategy plans. It is pure
//! and synchronous; persistence lives in `stratus-db`.

pub mod document;
pub mod fields;
pub mod flatten;
pub mod path;
pub mod record;
pub mod strategy;
pub mod value;

pub use document::*;
pub use fields::*;
pub use flatten::*;
pub use path::*;
pub use record::*;
pub use strategy::*;
pub use value::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("document is not valid JSON: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("malformed field `{field}` at {path}: expected {expected}, found {found}")]
    MalformedField {
        field: &'static str,
        path: &'static str,
        expected: value::FieldKind,
        found: String,
    },

    #[error("required field `{field}` missing at {path}")]
    RequiredFieldMissing {
        field: &'static str,
        path: &'static str,
    },

    #[error("invalid path expression `{expr}`: {reason}")]
    InvalidPath { expr: String, reason: String },
}

pub type FlattenResult<T> = Result<T, FlattenError>;
