//! Source documents as delivered by the upstream provider

use crate::FlattenResult;
use serde_json::Value;

/// One provider document: the parsed tree plus the payload text that will
/// be persisted verbatim by the raw and hybrid families.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    root: Value,
    text: String,
}

impl SourceDocument {
    /// Parse a document from the provider's response body. The body text
    /// is kept as the payload.
    pub fn from_text(text: &str) -> FlattenResult<Self> {
        let root: Value = serde_json::from_str(text)?;
        Ok(Self {
            root,
            text: text.to_string(),
        })
    }

    /// Wrap an already-parsed document; the payload becomes its
    /// serialization.
    pub fn from_value(root: Value) -> FlattenResult<Self> {
        let text = serde_json::to_string(&root)?;
        Ok(Self { root, text })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn payload(&self) -> &str {
        &self.text
    }
}
